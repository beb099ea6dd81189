use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use vuvox_io::AnalyzerSettings;

use crate::{
    equalizer::{BandBinding, DEFAULT_BAND_MAP, EqualizerMapper, GainRange},
    shaper::ShaperConfig,
};

const CONFIG_DIR: &str = "vuvox";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VuConfig {
    pub shaper: ShaperConfig,
    pub analyzer: AnalyzerConfig,
    pub equalizer: EqualizerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub sample_rate: u32,
    pub fft_size: usize,
    /// Number of bars on the visual surface.
    pub band_count: usize,
    pub min_freq: f32,
    pub max_freq: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        let settings = AnalyzerSettings::default();
        AnalyzerConfig {
            sample_rate: settings.sample_rate,
            fft_size: settings.fft_size,
            band_count: settings.band_count,
            min_freq: settings.min_freq,
            max_freq: settings.max_freq,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EqualizerConfig {
    pub band_map: Vec<BandBinding>,
    pub gain_range: GainRange,
}

impl Default for EqualizerConfig {
    fn default() -> Self {
        EqualizerConfig {
            band_map: DEFAULT_BAND_MAP.to_vec(),
            gain_range: GainRange::default(),
        }
    }
}

impl VuConfig {
    pub fn analyzer_settings(&self) -> AnalyzerSettings {
        AnalyzerSettings {
            sample_rate: self.analyzer.sample_rate,
            fft_size: self.analyzer.fft_size,
            band_count: self.analyzer.band_count,
            floor_db: self.shaper.floor_db,
            min_freq: self.analyzer.min_freq,
            max_freq: self.analyzer.max_freq,
        }
    }

    pub fn equalizer_mapper(&self) -> Result<EqualizerMapper> {
        EqualizerMapper::new(
            self.equalizer.band_map.clone(),
            self.equalizer.gain_range,
        )
        .context("invalid equalizer band map")
    }

    pub fn validate(&self) -> Result<()> {
        let shaper = &self.shaper;
        ensure!(
            shaper.floor_db < 0.0,
            "shaper.floor_db must be negative, got {}",
            shaper.floor_db
        );
        ensure!(
            shaper.decay_step > 0.0 && shaper.decay_step <= 1.0,
            "shaper.decay_step must be in (0, 1], got {}",
            shaper.decay_step
        );
        ensure!(
            shaper.max_bar_scale >= 0.0,
            "shaper.max_bar_scale must not be negative"
        );
        ensure!(
            shaper.tuned_interval_ms > 0,
            "shaper.tuned_interval_ms must be positive"
        );
        ensure!(
            shaper.callback_interval_ms > 0,
            "shaper.callback_interval_ms must be positive"
        );
        ensure!(
            self.analyzer.band_count > 0,
            "analyzer.band_count must be at least 1"
        );
        ensure!(
            self.equalizer.gain_range.min <= self.equalizer.gain_range.max,
            "equalizer.gain_range is inverted"
        );
        self.equalizer_mapper()?;
        Ok(())
    }
}

/// `<platform config dir>/vuvox/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
}

pub fn try_load_config(path: &Path) -> Result<VuConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    let config: VuConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Like [`try_load_config`], but any failure yields the defaults.
pub fn load_config(path: &Path) -> VuConfig {
    if !path.exists() {
        log::info!("no config at {}, using defaults", path.display());
        return VuConfig::default();
    }

    match try_load_config(path) {
        Ok(config) => {
            log::info!("loaded config from {}", path.display());
            config
        }
        Err(e) => {
            log::warn!("{e:#}; using defaults");
            VuConfig::default()
        }
    }
}

pub fn save_config(config: &VuConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(path, contents)
        .with_context(|| format!("failed to write config file {}", path.display()))?;

    log::info!("saved config to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shaper::BoostPolicy;

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = load_config(Path::new("/nonexistent/vuvox/config.toml"));
        assert_eq!(config, VuConfig::default());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
            [shaper]
            decay_step = 0.05

            [analyzer]
            band_count = 24
            "#,
        )
        .unwrap();

        let config = try_load_config(&path).unwrap();
        assert_eq!(config.shaper.decay_step, 0.05);
        assert_eq!(config.shaper.floor_db, -90.0);
        assert_eq!(config.shaper.policy, BoostPolicy::gate_boost());
        assert_eq!(config.analyzer.band_count, 24);
        assert_eq!(config.equalizer.band_map, DEFAULT_BAND_MAP.to_vec());
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = VuConfig::default();
        config.shaper.policy = BoostPolicy::linear();
        config.shaper.callback_interval_ms = 33;
        config.equalizer.gain_range = GainRange::new(-12.0, 12.0);

        save_config(&config, &path).unwrap();
        assert_eq!(load_config(&path), config);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[shaper]\nfloor_db = 10.0\n").unwrap();

        assert!(try_load_config(&path).is_err());
        assert_eq!(load_config(&path), VuConfig::default());
    }

    #[test]
    fn test_zero_tuned_interval_rejected() {
        let mut config = VuConfig::default();
        config.shaper.tuned_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_analyzer_settings_share_floor() {
        let mut config = VuConfig::default();
        config.shaper.floor_db = -70.0;
        assert_eq!(config.analyzer_settings().floor_db, -70.0);
    }
}
