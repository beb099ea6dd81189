mod stage;

pub use stage::{GainSlider, SoftwareBand, SoftwareEqualizer, TEN_BAND_CENTRES};

use std::{collections::HashSet, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::error::{ShapeError, ShapeResult};

/// Supported gain bounds in dB.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GainRange {
    pub min: f64,
    pub max: f64,
}

impl GainRange {
    pub const fn new(min: f64, max: f64) -> Self {
        GainRange { min, max }
    }

    pub fn clamp(&self, gain: f64) -> f64 {
        if gain.is_nan() {
            return 0.0_f64.clamp(self.min, self.max);
        }
        gain.clamp(self.min, self.max)
    }

    pub fn contains(&self, gain: f64) -> bool {
        (self.min..=self.max).contains(&gain)
    }

    /// Overlap of two ranges. Disjoint ranges yield `other`.
    pub fn intersect(&self, other: GainRange) -> GainRange {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        if min <= max { GainRange::new(min, max) } else { other }
    }
}

impl Default for GainRange {
    fn default() -> Self {
        GainRange::new(-24.0, 12.0)
    }
}

/// A gain-adjustable band owned by the playback engine.
pub trait EqualizerBand: Send + Sync {
    fn set_gain(&self, gain_db: f64);
    fn gain(&self) -> f64;
}

pub type BandHandle = Arc<dyn EqualizerBand>;

pub type GainListener = Box<dyn FnMut(f64) + Send>;

/// A UI control (slider, knob) whose value is a gain in dB.
pub trait GainControl {
    fn set_range(&mut self, range: GainRange);
    fn set_value(&mut self, value: f64);
    /// Installs `listener` as the control's value-change handler, replacing
    /// whatever was bound for the previous track.
    fn set_listener(&mut self, listener: GainListener);
}

impl<T: GainControl + ?Sized> GainControl for Box<T> {
    fn set_range(&mut self, range: GainRange) {
        (**self).set_range(range)
    }

    fn set_value(&mut self, value: f64) {
        (**self).set_value(value)
    }

    fn set_listener(&mut self, listener: GainListener) {
        (**self).set_listener(listener)
    }
}

/// The engine's equalizer as a whole.
pub trait EqualizerStage {
    fn set_enabled(&self, enabled: bool);
    fn is_enabled(&self) -> bool;
    fn bands(&self) -> Vec<BandHandle>;
    fn gain_range(&self) -> GainRange;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BandBinding {
    pub control: usize,
    pub band: usize,
}

impl BandBinding {
    pub const fn new(control: usize, band: usize) -> Self {
        BandBinding { control, band }
    }
}

/// Six controls spread over a ten-band equalizer.
pub const DEFAULT_BAND_MAP: [BandBinding; 6] = [
    BandBinding::new(0, 0),
    BandBinding::new(1, 2),
    BandBinding::new(2, 4),
    BandBinding::new(3, 5),
    BandBinding::new(4, 7),
    BandBinding::new(5, 9),
];

/// Outcome of one binding pass, one entry per configured pair.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingResult {
    outcomes: Vec<(BandBinding, ShapeResult<()>)>,
}

impl BindingResult {
    pub fn outcomes(&self) -> &[(BandBinding, ShapeResult<()>)] {
        &self.outcomes
    }

    pub fn bound(&self) -> usize {
        self.outcomes.iter().filter(|(_, r)| r.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ShapeError> {
        self.outcomes.iter().filter_map(|(_, r)| r.as_ref().err())
    }

    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|(_, r)| r.is_ok())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EqualizerMapper {
    band_map: Vec<BandBinding>,
    gain_range: GainRange,
}

impl Default for EqualizerMapper {
    fn default() -> Self {
        EqualizerMapper {
            band_map: DEFAULT_BAND_MAP.to_vec(),
            gain_range: GainRange::default(),
        }
    }
}

impl EqualizerMapper {
    /// Control indices must cover `0..band_map.len()` exactly once.
    pub fn new(band_map: Vec<BandBinding>, gain_range: GainRange) -> ShapeResult<Self> {
        let mut seen = HashSet::with_capacity(band_map.len());
        for binding in &band_map {
            if binding.control >= band_map.len() || !seen.insert(binding.control) {
                return Err(ShapeError::InvalidInput {
                    what: "control index in band map",
                    expected: band_map.len(),
                    actual: binding.control,
                });
            }
        }
        Ok(EqualizerMapper {
            band_map,
            gain_range,
        })
    }

    pub fn band_map(&self) -> &[BandBinding] {
        &self.band_map
    }

    pub fn gain_range(&self) -> GainRange {
        self.gain_range
    }

    pub fn control_count(&self) -> usize {
        self.band_map.len()
    }

    /// Binds each control to its band. A band index past the end of `bands`
    /// is recorded in the result and the remaining pairs still bind.
    pub fn bind<C: GainControl>(
        &self,
        controls: &mut [C],
        bands: &[BandHandle],
    ) -> ShapeResult<BindingResult> {
        self.bind_in_range(controls, bands, self.gain_range)
    }

    /// Turns the stage's equalizer on if this is the first bind of the
    /// session, then binds against its bands. Controls get the part of the
    /// configured range the stage actually supports.
    pub fn bind_stage<C: GainControl>(
        &self,
        controls: &mut [C],
        stage: &dyn EqualizerStage,
    ) -> ShapeResult<BindingResult> {
        if !stage.is_enabled() {
            stage.set_enabled(true);
            log::debug!("equalizer enabled");
        }
        let range = self.gain_range.intersect(stage.gain_range());
        self.bind_in_range(controls, &stage.bands(), range)
    }

    fn bind_in_range<C: GainControl>(
        &self,
        controls: &mut [C],
        bands: &[BandHandle],
        range: GainRange,
    ) -> ShapeResult<BindingResult> {
        if controls.len() != self.band_map.len() {
            return Err(ShapeError::InvalidInput {
                what: "control count",
                expected: self.band_map.len(),
                actual: controls.len(),
            });
        }

        let outcomes = self
            .band_map
            .iter()
            .map(|&binding| {
                let Some(band) = bands.get(binding.band) else {
                    let err = ShapeError::BandIndexOutOfRange {
                        control: binding.control,
                        band: binding.band,
                        available: bands.len(),
                    };
                    log::warn!("skipping equalizer binding: {err}");
                    return (binding, Err(err));
                };

                let control = &mut controls[binding.control];
                control.set_range(range);
                control.set_value(0.0);
                band.set_gain(0.0);

                let band = Arc::clone(band);
                control.set_listener(Box::new(move |gain| band.set_gain(gain)));

                (binding, Ok(()))
            })
            .collect();

        let result = BindingResult { outcomes };
        log::debug!(
            "bound {}/{} equalizer controls",
            result.bound(),
            self.band_map.len()
        );
        Ok(result)
    }
}
