use spectrum_analyzer::{FrequencyLimit, samples_fft_to_spectrum, windows::hann_window};

use crate::error::{AnalyzerError, AnalyzerResult};

/// Largest window `spectrum-analyzer` accepts.
pub const MAX_FFT_SIZE: usize = 16384;
const MIN_FFT_SIZE: usize = 64;

/// Hann window coherent gain, folded into the amplitude estimate.
const HANN_GAIN: f32 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerSettings {
    pub sample_rate: u32,
    /// Samples per analysis window. Must be a power of two.
    pub fft_size: usize,
    pub band_count: usize,
    /// Readings never go below this value (dB).
    pub floor_db: f32,
    pub min_freq: f32,
    pub max_freq: f32,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        AnalyzerSettings {
            sample_rate: 44_100,
            fft_size: 2048,
            band_count: 32,
            floor_db: -90.0,
            min_freq: 20.0,
            max_freq: 20_000.0,
        }
    }
}

pub struct BandAnalyzer {
    settings: AnalyzerSettings,
    /// `band_count + 1` ascending edges in Hz.
    edges: Vec<f32>,
    magnitudes: Vec<f32>,
}

impl BandAnalyzer {
    pub fn new(mut settings: AnalyzerSettings) -> AnalyzerResult<Self> {
        if settings.sample_rate == 0 {
            return Err(AnalyzerError::InvalidSettings(
                "sample rate must be non-zero".into(),
            ));
        }
        if !settings.fft_size.is_power_of_two()
            || !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&settings.fft_size)
        {
            return Err(AnalyzerError::InvalidSettings(format!(
                "fft size {} must be a power of two in {MIN_FFT_SIZE}..={MAX_FFT_SIZE}",
                settings.fft_size
            )));
        }
        if settings.band_count == 0 {
            return Err(AnalyzerError::InvalidSettings(
                "band count must be at least 1".into(),
            ));
        }
        if settings.floor_db.is_nan() || settings.floor_db >= 0.0 {
            return Err(AnalyzerError::InvalidSettings(format!(
                "noise floor {} dB must be negative",
                settings.floor_db
            )));
        }

        let nyquist = settings.sample_rate as f32 / 2.0;
        settings.max_freq = settings.max_freq.min(nyquist);
        if !(settings.min_freq > 0.0 && settings.min_freq < settings.max_freq) {
            return Err(AnalyzerError::InvalidSettings(format!(
                "frequency range {}..{} Hz is empty",
                settings.min_freq, settings.max_freq
            )));
        }

        let edges = log_edges(settings.min_freq, settings.max_freq, settings.band_count);
        let magnitudes = vec![settings.floor_db; settings.band_count];

        Ok(BandAnalyzer {
            settings,
            edges,
            magnitudes,
        })
    }

    pub fn settings(&self) -> &AnalyzerSettings {
        &self.settings
    }

    pub fn band_count(&self) -> usize {
        self.settings.band_count
    }

    /// `(low, high)` bounds of band `index` in Hz.
    pub fn band_range(&self, index: usize) -> Option<(f32, f32)> {
        Some((*self.edges.get(index)?, *self.edges.get(index + 1)?))
    }

    /// One dB reading per band from the newest `fft_size` samples.
    pub fn analyze(&mut self, mono: &[f32]) -> AnalyzerResult<&[f32]> {
        let fft_size = self.settings.fft_size;
        if mono.len() < fft_size {
            return Err(AnalyzerError::NotEnoughSamples {
                needed: fft_size,
                got: mono.len(),
            });
        }

        let windowed = hann_window(&mono[mono.len() - fft_size..]);
        let spectrum = samples_fft_to_spectrum(
            &windowed,
            self.settings.sample_rate,
            FrequencyLimit::Range(self.settings.min_freq, self.settings.max_freq),
            None,
        )
        .map_err(|e| AnalyzerError::Fft(format!("{e:?}")))?;

        let data = spectrum.data();
        // Raw bin magnitude back to a linear amplitude where a full-scale
        // sine reads 1.0.
        let to_amplitude = 2.0 / (fft_size as f32 * HANN_GAIN);
        let floor = self.settings.floor_db;

        for (band, slot) in self.magnitudes.iter_mut().enumerate() {
            let (lo, hi) = (self.edges[band], self.edges[band + 1]);
            let start = data.partition_point(|(f, _)| f.val() < lo);
            let end = data.partition_point(|(f, _)| f.val() < hi);

            let mag = if end > start {
                data[start..end].iter().map(|(_, m)| m.val()).sum::<f32>() / (end - start) as f32
            } else {
                // Band narrower than one bin: borrow the closest bin.
                let centre = (lo * hi).sqrt();
                data.iter()
                    .min_by(|a, b| {
                        (a.0.val() - centre)
                            .abs()
                            .total_cmp(&(b.0.val() - centre).abs())
                    })
                    .map(|(_, m)| m.val())
                    .unwrap_or(0.0)
            };

            *slot = (20.0 * (mag * to_amplitude).log10()).max(floor);
        }

        Ok(&self.magnitudes)
    }
}

pub fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    if channels == 0 {
        return Vec::new();
    }
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks_exact(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

fn log_edges(min: f32, max: f32, bands: usize) -> Vec<f32> {
    let ratio = max / min;
    (0..=bands)
        .map(|k| min * ratio.powf(k as f32 / bands as f32))
        .collect()
}
