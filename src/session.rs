use crossbeam::channel::{self, Receiver, Sender, TrySendError};

use crate::{
    error::ShapeResult,
    shaper::{ShaperConfig, SpectrumShaper},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    TrackStarted { band_count: usize },
    Resumed,
    Paused,
    Stopped,
    SurfaceResized { band_count: usize },
    SessionEnded,
}

/// Bar heights for one analyzer callback.
#[derive(Debug, Clone, PartialEq)]
pub struct BarFrame {
    pub sequence: u64,
    pub heights: Vec<f32>,
}

pub fn frame_channel(capacity: usize) -> (Sender<BarFrame>, Receiver<BarFrame>) {
    channel::bounded(capacity)
}

pub struct VisualizerSession {
    config: ShaperConfig,
    shaper: Option<SpectrumShaper>,
    playing: bool,
    volume: f32,
    sequence: u64,
    dropped: u64,
    frames: Sender<BarFrame>,
}

impl VisualizerSession {
    pub fn new(config: ShaperConfig, frames: Sender<BarFrame>) -> Self {
        VisualizerSession {
            config,
            shaper: None,
            playing: false,
            volume: 1.0,
            sequence: 0,
            dropped: 0,
            frames,
        }
    }

    pub fn handle(&mut self, event: PlaybackEvent) -> ShapeResult<()> {
        log::debug!("session event: {event:?}");
        match event {
            PlaybackEvent::TrackStarted { band_count } => {
                self.initialize(band_count)?;
                self.playing = true;
            }
            PlaybackEvent::SurfaceResized { band_count } => self.initialize(band_count)?,
            PlaybackEvent::Resumed => self.playing = self.shaper.is_some(),
            PlaybackEvent::Paused | PlaybackEvent::Stopped => {
                self.playing = false;
                if let Some(shaper) = self.shaper.as_mut() {
                    shaper.reset();
                    let baseline = vec![0.0; shaper.band_count()];
                    self.publish(baseline);
                }
            }
            PlaybackEvent::SessionEnded => {
                self.playing = false;
                self.shaper = None;
            }
        }
        Ok(())
    }

    pub fn drain_events(&mut self, events: &Receiver<PlaybackEvent>) {
        for event in events.try_iter() {
            if let Err(e) = self.handle(event) {
                log::warn!("ignoring {event:?}: {e}");
            }
        }
    }

    /// `Ok(false)` when idle or the renderer is behind. A malformed frame is
    /// skipped and the renderer keeps the previous one.
    pub fn on_magnitudes(&mut self, raw_db: &[f32]) -> ShapeResult<bool> {
        let Some(shaper) = self.shaper.as_mut().filter(|_| self.playing) else {
            return Ok(false);
        };

        match shaper.update(raw_db, self.volume) {
            Ok(heights) => Ok(self.publish(heights)),
            Err(e) => {
                log::warn!("skipping analyzer frame: {e}");
                Err(e)
            }
        }
    }

    pub fn set_volume(&mut self, fraction: f32) {
        self.volume = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    }

    /// Takes a 0–100 volume slider reading.
    pub fn set_volume_percent(&mut self, percent: f32) {
        self.set_volume(percent / 100.0);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn shaper(&self) -> Option<&SpectrumShaper> {
        self.shaper.as_ref()
    }

    pub fn dropped_frames(&self) -> u64 {
        self.dropped
    }

    fn initialize(&mut self, band_count: usize) -> ShapeResult<()> {
        match self.shaper.as_mut() {
            Some(shaper) => shaper.initialize(band_count),
            None => {
                self.shaper = Some(SpectrumShaper::new(self.config, band_count)?);
                Ok(())
            }
        }
    }

    fn publish(&mut self, heights: Vec<f32>) -> bool {
        self.sequence += 1;
        let frame = BarFrame {
            sequence: self.sequence,
            heights,
        };
        match self.frames.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                log::trace!("render side behind, dropped frame {}", self.sequence);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}
