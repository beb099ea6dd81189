use serde::{Deserialize, Serialize};

/// Noise gate and per-band boost applied to a normalized reading before it
/// reaches the decay stage.
///
/// Music spectra lose energy toward the treble, so higher bands get a larger
/// multiplier. Two tunings exist; [`BoostPolicy::GateBoost`] is the default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoostPolicy {
    /// Bass bands (`band < low_band_cutoff`) are gated at `low_gate` and left
    /// unboosted. The rest are gated at `high_gate` and multiplied by
    /// `base_boost + (band - low_band_cutoff) * per_band_increment`.
    GateBoost {
        low_band_cutoff: usize,
        low_gate: f32,
        high_gate: f32,
        base_boost: f32,
        per_band_increment: f32,
    },
    /// No gate. Every band is multiplied by
    /// `base_boost + band * per_band_increment`.
    Linear {
        base_boost: f32,
        per_band_increment: f32,
    },
}

impl BoostPolicy {
    pub const fn gate_boost() -> Self {
        BoostPolicy::GateBoost {
            low_band_cutoff: 5,
            low_gate: 0.2,
            high_gate: 0.05,
            base_boost: 1.2,
            per_band_increment: 0.15,
        }
    }

    pub const fn linear() -> Self {
        BoostPolicy::Linear {
            base_boost: 1.0,
            per_band_increment: 0.15,
        }
    }

    /// Gates and boosts `n` for `band`. The result is not clamped.
    #[inline]
    pub fn apply(&self, band: usize, n: f32) -> f32 {
        match *self {
            BoostPolicy::GateBoost {
                low_band_cutoff,
                low_gate,
                high_gate,
                base_boost,
                per_band_increment,
            } => {
                if band < low_band_cutoff {
                    if n < low_gate { 0.0 } else { n }
                } else if n < high_gate {
                    0.0
                } else {
                    n * (base_boost + (band - low_band_cutoff) as f32 * per_band_increment)
                }
            }
            BoostPolicy::Linear {
                base_boost,
                per_band_increment,
            } => n * (base_boost + band as f32 * per_band_increment),
        }
    }
}

impl Default for BoostPolicy {
    fn default() -> Self {
        BoostPolicy::gate_boost()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_boost_low_bands_gate_without_boost() {
        let policy = BoostPolicy::gate_boost();
        assert_eq!(policy.apply(0, 0.19), 0.0);
        assert_eq!(policy.apply(4, 0.5), 0.5);
    }

    #[test]
    fn test_gate_boost_high_bands_scale_with_index() {
        let policy = BoostPolicy::gate_boost();
        assert_eq!(policy.apply(5, 0.04), 0.0);
        assert!((policy.apply(5, 0.5) - 0.6).abs() < 1e-6);
        assert!((policy.apply(8, 0.5) - 0.825).abs() < 1e-6);
    }

    #[test]
    fn test_linear_boosts_every_band_without_gate() {
        let policy = BoostPolicy::linear();
        assert!((policy.apply(0, 0.01) - 0.01).abs() < 1e-6);
        assert!((policy.apply(4, 0.5) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_policy_toml_shape() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: BoostPolicy,
        }

        let parsed: Wrapper = toml::from_str(
            r#"
            [policy]
            kind = "linear"
            base_boost = 1.0
            per_band_increment = 0.2
            "#,
        )
        .unwrap();

        assert_eq!(
            parsed.policy,
            BoostPolicy::Linear {
                base_boost: 1.0,
                per_band_increment: 0.2
            }
        );
    }
}
