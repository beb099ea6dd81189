use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use super::{BandHandle, EqualizerBand, EqualizerStage, GainControl, GainListener, GainRange};

/// Centre frequencies of the ten-band layout media frameworks ship with.
pub const TEN_BAND_CENTRES: [f32; 10] = [
    32.0, 64.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
];

/// One band of a [`SoftwareEqualizer`]. Gain is stored as atomic bits so a
/// control listener can write it from any thread.
#[derive(Debug)]
pub struct SoftwareBand {
    centre_hz: f32,
    range: GainRange,
    gain: AtomicU64,
}

impl SoftwareBand {
    fn new(centre_hz: f32, range: GainRange) -> Self {
        SoftwareBand {
            centre_hz,
            range,
            gain: AtomicU64::new(0.0_f64.to_bits()),
        }
    }

    pub fn centre_hz(&self) -> f32 {
        self.centre_hz
    }
}

impl EqualizerBand for SoftwareBand {
    fn set_gain(&self, gain_db: f64) {
        let gain = self.range.clamp(gain_db);
        self.gain.store(gain.to_bits(), Ordering::Relaxed);
    }

    fn gain(&self) -> f64 {
        f64::from_bits(self.gain.load(Ordering::Relaxed))
    }
}

/// In-memory equalizer stage: an enable flag plus a gain per band.
///
/// It holds settings only. Filtering audio with them is the playback
/// engine's job.
#[derive(Debug)]
pub struct SoftwareEqualizer {
    enabled: AtomicBool,
    range: GainRange,
    bands: Vec<Arc<SoftwareBand>>,
}

impl SoftwareEqualizer {
    pub fn new(centres: &[f32], range: GainRange) -> Self {
        SoftwareEqualizer {
            enabled: AtomicBool::new(false),
            range,
            bands: centres
                .iter()
                .map(|&hz| Arc::new(SoftwareBand::new(hz, range)))
                .collect(),
        }
    }

    pub fn ten_band() -> Self {
        SoftwareEqualizer::new(&TEN_BAND_CENTRES, GainRange::default())
    }

    pub fn band_gains(&self) -> Vec<f64> {
        self.bands.iter().map(|b| b.gain()).collect()
    }

    pub fn band(&self, index: usize) -> Option<&SoftwareBand> {
        self.bands.get(index).map(|b| &**b)
    }
}

impl EqualizerStage for SoftwareEqualizer {
    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn bands(&self) -> Vec<BandHandle> {
        self.bands
            .iter()
            .map(|b| Arc::clone(b) as BandHandle)
            .collect()
    }

    fn gain_range(&self) -> GainRange {
        self.range
    }
}

/// A headless slider: clamps to its range and notifies its listener on every
/// change.
#[derive(Default)]
pub struct GainSlider {
    range: GainRange,
    value: f64,
    listener: Option<GainListener>,
}

impl GainSlider {
    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn range(&self) -> GainRange {
        self.range
    }

    pub fn is_bound(&self) -> bool {
        self.listener.is_some()
    }
}

impl std::fmt::Debug for GainSlider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GainSlider")
            .field("range", &self.range)
            .field("value", &self.value)
            .field("bound", &self.listener.is_some())
            .finish()
    }
}

impl GainControl for GainSlider {
    fn set_range(&mut self, range: GainRange) {
        self.range = range;
        self.value = range.clamp(self.value);
    }

    fn set_value(&mut self, value: f64) {
        self.value = self.range.clamp(value);
        if let Some(listener) = self.listener.as_mut() {
            listener(self.value);
        }
    }

    fn set_listener(&mut self, listener: GainListener) {
        self.listener = Some(listener);
    }
}
