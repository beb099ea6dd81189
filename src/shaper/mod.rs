mod policy;

pub use policy::BoostPolicy;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ShapeError, ShapeResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaperConfig {
    /// Reading that counts as silence (dB, negative).
    pub floor_db: f32,
    /// Fall per `tuned_interval_ms`, in normalized units.
    pub decay_step: f32,
    pub tuned_interval_ms: u64,
    pub max_bar_scale: f32,
    /// Actual analyzer callback period.
    pub callback_interval_ms: u64,
    pub policy: BoostPolicy,
}

impl Default for ShaperConfig {
    fn default() -> Self {
        ShaperConfig {
            floor_db: -90.0,
            decay_step: 0.02,
            tuned_interval_ms: 16,
            max_bar_scale: 500.0,
            callback_interval_ms: 16,
            policy: BoostPolicy::default(),
        }
    }
}

impl ShaperConfig {
    pub fn callback_interval(&self) -> Duration {
        Duration::from_millis(self.callback_interval_ms)
    }

    /// `decay_step` rescaled to the callback interval, so bars fall at the
    /// same speed whatever rate the analyzer runs at.
    pub fn decay_per_callback(&self) -> f32 {
        match self.tuned_interval_ms {
            0 => self.decay_step,
            tuned => self.decay_step * self.callback_interval_ms as f32 / tuned as f32,
        }
    }

    pub fn decay_per_second(&self) -> f32 {
        match self.tuned_interval_ms {
            0 => 0.0,
            tuned => self.decay_step * 1000.0 / tuned as f32,
        }
    }
}

/// Per-band gravity state for one playback session.
///
/// `decay` always holds values in `[0, 1]`. Only one thread should drive a
/// shaper; it holds no locks and does no I/O.
#[derive(Debug, Clone)]
pub struct SpectrumShaper {
    config: ShaperConfig,
    decay: Vec<f32>,
}

impl SpectrumShaper {
    pub fn new(config: ShaperConfig, band_count: usize) -> ShapeResult<Self> {
        let mut shaper = SpectrumShaper {
            config,
            decay: Vec::new(),
        };
        shaper.initialize(band_count)?;
        Ok(shaper)
    }

    /// Discards any decay state and starts over with `band_count` zeroed
    /// bands.
    pub fn initialize(&mut self, band_count: usize) -> ShapeResult<()> {
        if band_count == 0 {
            return Err(ShapeError::InvalidInput {
                what: "band count",
                expected: 1,
                actual: 0,
            });
        }
        self.decay = vec![0.0; band_count];
        log::debug!("shaper initialized with {band_count} bands");
        Ok(())
    }

    pub fn update(&mut self, raw_db: &[f32], volume: f32) -> ShapeResult<Vec<f32>> {
        let mut heights = Vec::with_capacity(self.decay.len());
        self.update_into(raw_db, volume, &mut heights)?;
        Ok(heights)
    }

    /// Shapes one analyzer frame into `heights`, reusing its allocation.
    ///
    /// `volume` is the output volume as a fraction of maximum and is clamped
    /// to `[0, 1]`. A frame of the wrong length is rejected before any state
    /// changes, and `heights` is left untouched.
    pub fn update_into(
        &mut self,
        raw_db: &[f32],
        volume: f32,
        heights: &mut Vec<f32>,
    ) -> ShapeResult<()> {
        if raw_db.len() != self.decay.len() {
            return Err(ShapeError::InvalidInput {
                what: "magnitude frame length",
                expected: self.decay.len(),
                actual: raw_db.len(),
            });
        }

        let volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
        let scale = self.config.max_bar_scale * volume;
        let floor = self.config.floor_db;
        let step = self.config.decay_per_callback();

        heights.clear();
        for (band, (&raw, memory)) in raw_db.iter().zip(self.decay.iter_mut()).enumerate() {
            let normalized = (raw - floor) / -floor;
            let boosted = self.config.policy.apply(band, normalized);
            let n = if boosted.is_nan() { 0.0 } else { boosted.clamp(0.0, 1.0) };

            if n > *memory {
                *memory = n;
            } else {
                *memory = (*memory - step).max(0.0);
            }

            heights.push(*memory * scale);
        }

        Ok(())
    }

    /// Zeroes every band in place so resumed playback starts from baseline.
    pub fn reset(&mut self) {
        self.decay.fill(0.0);
    }

    pub fn band_count(&self) -> usize {
        self.decay.len()
    }

    pub fn decay_memory(&self) -> &[f32] {
        &self.decay
    }

    pub fn config(&self) -> &ShaperConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SILENT: f32 = -120.0;

    fn shaper(bands: usize) -> SpectrumShaper {
        SpectrumShaper::new(ShaperConfig::default(), bands).unwrap()
    }

    #[test]
    fn test_low_band_gate_forces_zero() {
        let mut s = shaper(1);
        let heights = s.update(&[-85.0], 1.0).unwrap();

        assert_eq!(heights, vec![0.0]);
        assert_eq!(s.decay_memory(), &[0.0]);
    }

    #[test]
    fn test_high_band_boost_clamps_to_full_bar() {
        let mut s = shaper(10);
        let mut frame = vec![SILENT; 10];
        frame[8] = -30.0;

        let heights = s.update(&frame, 1.0).unwrap();

        assert_eq!(s.decay_memory()[8], 1.0);
        assert_eq!(heights[8], 500.0);
        assert!(heights.iter().enumerate().all(|(i, &h)| i == 8 || h == 0.0));
    }

    #[test]
    fn test_instant_attack() {
        let mut s = shaper(1);
        s.update(&[-60.0], 1.0).unwrap();
        s.update(&[-40.0], 1.0).unwrap();

        let expected = 50.0 / 90.0;
        assert!((s.decay_memory()[0] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_linear_fall_until_zero() {
        let mut s = shaper(1);
        s.update(&[0.0], 1.0).unwrap();
        assert_eq!(s.decay_memory()[0], 1.0);

        let mut previous = 1.0;
        for _ in 0..60 {
            s.update(&[SILENT], 1.0).unwrap();
            let current = s.decay_memory()[0];
            if previous >= 0.02 {
                assert!((previous - current - 0.02).abs() < 1e-5);
            } else {
                assert_eq!(current, 0.0);
            }
            assert!(current >= 0.0);
            previous = current;
        }
        assert_eq!(s.decay_memory()[0], 0.0);
    }

    #[test]
    fn test_quieter_reading_still_falls_by_step() {
        let mut s = shaper(1);
        s.update(&[0.0], 1.0).unwrap();
        // 0.5 normalized is below memory, so it decays rather than snapping.
        s.update(&[-45.0], 1.0).unwrap();
        assert!((s.decay_memory()[0] - 0.98).abs() < 1e-6);
    }

    #[test]
    fn test_output_range_with_volume() {
        let mut s = shaper(16);
        let frames = [
            vec![0.0; 16],
            vec![10.0; 16],
            vec![-45.0; 16],
            vec![f32::NAN; 16],
            vec![SILENT; 16],
        ];
        for volume in [0.0_f32, 0.3, 1.0, 1.7, -0.2] {
            let cap = 500.0 * volume.clamp(0.0, 1.0);
            for frame in &frames {
                let heights = s.update(frame, volume).unwrap();
                assert_eq!(heights.len(), 16);
                assert!(heights.iter().all(|&h| (0.0..=cap).contains(&h)));
                assert!(s.decay_memory().iter().all(|&m| (0.0..=1.0).contains(&m)));
            }
        }
    }

    #[test]
    fn test_length_mismatch_leaves_state_untouched() {
        let mut s = shaper(4);
        s.update(&[0.0, -10.0, -20.0, -30.0], 1.0).unwrap();
        let before = s.decay_memory().to_vec();

        let mut out = vec![7.0];
        let err = s.update_into(&[0.0; 3], 1.0, &mut out).unwrap_err();

        assert_eq!(
            err,
            ShapeError::InvalidInput {
                what: "magnitude frame length",
                expected: 4,
                actual: 3
            }
        );
        assert_eq!(s.decay_memory(), before.as_slice());
        assert_eq!(out, vec![7.0]);
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut s = shaper(3);
        s.update(&[0.0, 0.0, 0.0], 1.0).unwrap();

        s.reset();
        let once = s.decay_memory().to_vec();
        s.reset();

        assert_eq!(once, vec![0.0; 3]);
        assert_eq!(s.decay_memory(), once.as_slice());
        assert_eq!(s.band_count(), 3);
    }

    #[test]
    fn test_initialize_replaces_memory() {
        let mut s = shaper(2);
        s.update(&[0.0, 0.0], 1.0).unwrap();

        s.initialize(5).unwrap();
        assert_eq!(s.decay_memory(), &[0.0; 5]);
        assert!(s.initialize(0).is_err());
        assert_eq!(s.band_count(), 5);
    }

    #[test]
    fn test_linear_policy_has_no_gate() {
        let config = ShaperConfig {
            policy: BoostPolicy::linear(),
            ..Default::default()
        };
        let mut s = SpectrumShaper::new(config, 1).unwrap();
        let heights = s.update(&[-85.0], 1.0).unwrap();

        assert!((heights[0] - 500.0 * 5.0 / 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_slower_callbacks_fall_further_per_call() {
        let config = ShaperConfig {
            callback_interval_ms: 32,
            ..Default::default()
        };
        let mut s = SpectrumShaper::new(config, 1).unwrap();
        s.update(&[0.0], 1.0).unwrap();
        s.update(&[SILENT], 1.0).unwrap();

        assert!((s.decay_memory()[0] - 0.96).abs() < 1e-6);
        assert!((config.decay_per_second() - ShaperConfig::default().decay_per_second()).abs() < 1e-4);
        assert_eq!(ShaperConfig::default().decay_per_callback(), 0.02);
    }
}
