use std::{
    io::Write,
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossbeam::channel::{self, Receiver};
use rand::Rng;
use vuvox::{
    BarFrame, PlaybackEvent, VisualizerSession,
    config::{self, VuConfig},
    equalizer::{GainControl, GainSlider, SoftwareEqualizer},
    frame_channel,
};
use vuvox_io::{BandAnalyzer, Delivery, TapWriter, downmix, new_tap};

const CHANNELS: u16 = 2;
const BLOCKS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let arg = args.next();
    let path = match arg.as_deref() {
        Some("--init-config") => {
            let path = config::config_path().context("no config directory on this platform")?;
            config::save_config(&VuConfig::default(), &path)?;
            println!("wrote {}", path.display());
            return Ok(());
        }
        Some(path) => Some(PathBuf::from(path)),
        None => config::config_path(),
    };

    let config = match path {
        Some(path) => config::load_config(&path),
        None => VuConfig::default(),
    };

    run(config)
}

fn run(config: VuConfig) -> Result<()> {
    let settings = config.analyzer_settings();
    let band_count = settings.band_count;

    let eq = SoftwareEqualizer::ten_band();
    let mut sliders: Vec<GainSlider> = (0..config.equalizer.band_map.len())
        .map(|_| GainSlider::default())
        .collect();
    let binding = config
        .equalizer_mapper()?
        .bind_stage(&mut sliders, &eq)?;
    for failure in binding.failures() {
        log::warn!("{failure}");
    }
    if let Some(bass) = sliders.first_mut() {
        bass.set_value(4.0);
    }
    log::info!("equalizer gains: {:?}", eq.band_gains());

    let (tap_writer, mut tap_reader) = new_tap(settings.fft_size * CHANNELS as usize * 4);
    let running = Arc::new(AtomicBool::new(true));
    let generator = spawn_generator(tap_writer, settings.sample_rate, Arc::clone(&running))?;

    let (events_tx, events_rx) = channel::unbounded();
    let (frames_tx, frames_rx) = frame_channel(4);

    let mut session = VisualizerSession::new(config.shaper, frames_tx);
    session.set_volume_percent(80.0);
    let mut analyzer = BandAnalyzer::new(settings.clone())?;
    let window = settings.fft_size * CHANNELS as usize;
    let mut interleaved = Vec::with_capacity(window);

    let delivery = Delivery::spawn("vuvox-spectrum", config.shaper.callback_interval(), move || {
        session.drain_events(&events_rx);
        tap_reader.latest_into(window, &mut interleaved);
        let mono = downmix(&interleaved, CHANNELS);
        match analyzer.analyze(&mono) {
            Ok(readings) => {
                let _ = session.on_magnitudes(readings);
            }
            Err(e) => log::trace!("{e}"),
        }
    })?;

    let scale = config.shaper.max_bar_scale;
    events_tx.send(PlaybackEvent::TrackStarted { band_count })?;
    render_for(&frames_rx, scale, Duration::from_secs(4));

    events_tx.send(PlaybackEvent::Paused)?;
    render_for(&frames_rx, scale, Duration::from_millis(500));

    events_tx.send(PlaybackEvent::Resumed)?;
    render_for(&frames_rx, scale, Duration::from_secs(2));

    events_tx.send(PlaybackEvent::Stopped)?;
    render_for(&frames_rx, scale, Duration::from_millis(200));
    events_tx.send(PlaybackEvent::SessionEnded)?;
    println!();

    delivery.stop();
    running.store(false, Ordering::Relaxed);
    if generator.join().is_err() {
        log::warn!("signal generator panicked");
    }
    Ok(())
}

fn render_for(frames: &Receiver<BarFrame>, scale: f32, duration: Duration) {
    let deadline = Instant::now() + duration;
    let mut stdout = std::io::stdout();
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        let Ok(frame) = frames.recv_timeout(remaining) else {
            break;
        };
        let line: String = frame
            .heights
            .iter()
            .map(|&h| {
                let level = if scale > 0.0 { (h / scale).clamp(0.0, 1.0) } else { 0.0 };
                BLOCKS[(level * (BLOCKS.len() - 1) as f32).round() as usize]
            })
            .collect();
        let _ = write!(stdout, "\r{line}");
        let _ = stdout.flush();
    }
}

/// Feeds a slow log sweep with some noise into the tap, roughly in real
/// time.
fn spawn_generator(
    mut tap: TapWriter,
    sample_rate: u32,
    running: Arc<AtomicBool>,
) -> Result<thread::JoinHandle<()>> {
    let chunk_frames = (sample_rate / 100) as usize;
    let handle = thread::Builder::new()
        .name("vuvox-signal".into())
        .spawn(move || {
            let mut rng = rand::rng();
            let mut phase = 0.0_f32;
            let mut elapsed = 0.0_f32;
            let dt = 1.0 / sample_rate as f32;
            let mut block = Vec::with_capacity(chunk_frames * CHANNELS as usize);

            while running.load(Ordering::Relaxed) {
                block.clear();
                for _ in 0..chunk_frames {
                    let sweep = (elapsed * 0.25).fract();
                    let freq = 60.0 * (8000.0_f32 / 60.0).powf(sweep);
                    phase = (phase + std::f32::consts::TAU * freq * dt) % std::f32::consts::TAU;
                    let noise: f32 = rng.random_range(-0.02..0.02);
                    let left = 0.6 * phase.sin() + noise;
                    block.push(left);
                    block.push(left * 0.8);
                    elapsed += dt;
                }
                tap.push(&block);
                thread::sleep(Duration::from_millis(10));
            }
        })?;
    Ok(handle)
}
