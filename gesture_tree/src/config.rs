//! Application configuration: a TOML file, command-line overrides and
//! validation.
//!
//! Every section falls back to its defaults, so an empty file (or no file
//! at all) is a valid configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use hand_gesture::ClassifierConfig;
use tree_morph::SceneConfig;

/// Upper bound on the total number of procedural particles.
pub const MAX_PARTICLES: usize = 200_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Io {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// ════════════════════════════════════════════════════════════════════════════
// Sections
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub width:  usize,
    pub height: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        WindowConfig { width: 1200, height: 800 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// Wait between attempts to open an unavailable sensor.
    pub retry_delay_ms: u64,
    /// Reading cadence of the simulated hand.
    pub sim_period_ms:  u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        SensorConfig { retry_delay_ms: 1000, sim_period_ms: 33 }
    }
}

impl SensorConfig {
    pub fn retry_delay(&self) -> Duration { Duration::from_millis(self.retry_delay_ms) }
    pub fn sim_period(&self)  -> Duration { Duration::from_millis(self.sim_period_ms) }
}

// ════════════════════════════════════════════════════════════════════════════
// AppConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Seeds the procedural layout.
    pub seed:       u64,
    pub window:     WindowConfig,
    pub scene:      SceneConfig,
    pub classifier: ClassifierConfig,
    pub sensor:     SensorConfig,
    /// Images shown as photo cards, loaded at startup.
    pub photos:     Vec<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            seed:       2024,
            window:     WindowConfig::default(),
            scene:      SceneConfig::default(),
            classifier: ClassifierConfig::default(),
            sensor:     SensorConfig::default(),
            photos:     Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        let w = &self.window;
        if !(64..=8192).contains(&w.width) || !(64..=8192).contains(&w.height) {
            return invalid(format!("window size {}x{} out of range", w.width, w.height));
        }

        let m = &self.scene.morph;
        positive("morph.global_rate", m.global_rate)?;
        positive("morph.max_dt", m.max_dt)?;
        positive("morph.speed_multiplier", m.speed_multiplier)?;

        let c = &self.scene.camera;
        positive("camera.min_radius", c.min_radius)?;
        if c.min_radius > c.max_radius {
            return invalid(format!(
                "camera.min_radius {} exceeds camera.max_radius {}",
                c.min_radius, c.max_radius
            ));
        }
        if !c.damping.is_finite() || c.damping < 0.0 {
            return invalid(format!("camera.damping must be non-negative, got {}", c.damping));
        }

        let g = &self.scene.groups;
        positive("groups.scatter_radius", g.scatter_radius)?;
        positive("groups.magnify_radius", g.magnify_radius)?;
        positive("groups.magnify_speed", g.magnify_speed)?;
        positive("groups.foliage_cone.height", g.foliage_cone.height)?;
        positive("groups.ornament_cone.height", g.ornament_cone.height)?;
        let total = g.foliage_count
            + g.heavy_count
            + g.light_count
            + g.extra_light_count
            + g.trail_count;
        if total > MAX_PARTICLES {
            return invalid(format!("{} particles requested, at most {} allowed", total, MAX_PARTICLES));
        }

        let k = &self.classifier;
        positive("classifier.pinch_threshold", k.pinch_threshold)?;
        if k.open_min_open > 5 || k.fist_max_open >= k.open_min_open {
            return invalid(format!(
                "classifier needs fist_max_open < open_min_open <= 5, got {} and {}",
                k.fist_max_open, k.open_min_open
            ));
        }

        if self.sensor.sim_period_ms == 0 {
            return invalid("sensor.sim_period_ms must be positive".to_string());
        }
        Ok(())
    }
}

fn invalid<T>(msg: String) -> ConfigResult<T> {
    Err(ConfigError::Invalid(msg))
}

fn positive(name: &str, v: f32) -> ConfigResult<()> {
    if v.is_finite() && v > 0.0 {
        Ok(())
    } else {
        invalid(format!("{} must be positive, got {}", name, v))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Command line
// ════════════════════════════════════════════════════════════════════════════

/// `gesture_tree [--config FILE] [--seed N] [PHOTO...]`
#[derive(Debug, Clone, Default, PartialEq, Parser)]
#[command(name = "gesture_tree", version, about = "Hand-gesture controlled particle tree")]
pub struct CliArgs {
    /// TOML configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Layout seed, overrides the config file
    #[arg(long, value_name = "N")]
    pub seed:   Option<u64>,
    /// Images shown as photo cards, after any from the config file
    #[arg(value_name = "PHOTO")]
    pub photos: Vec<PathBuf>,
}

impl CliArgs {
    /// Load the config file if given, apply overrides and validate.
    pub fn into_config(self) -> ConfigResult<AppConfig> {
        let mut cfg = match &self.config {
            Some(path) => AppConfig::load(path)?,
            None       => AppConfig::default(),
        };
        if let Some(seed) = self.seed {
            cfg.seed = seed;
        }
        cfg.photos.extend(self.photos);
        cfg.validate()?;
        Ok(cfg)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use tree_morph::sampler::DensityBias;

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg = AppConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, AppConfig::default());
        cfg.validate().unwrap();
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = AppConfig::from_toml_str(
            r#"
            seed = 99
            photos = ["a.png", "b.jpg"]

            [scene.morph]
            global_rate = 3.0

            [scene.groups]
            foliage_count = 10

            [scene.groups.foliage_cone]
            height = 10.0
            base_radius = 4.0
            y_offset = -5.0
            thickness = 0.2
            bias = { dense_bottom = 2.0 }

            [classifier]
            pinch_threshold = 0.04
            "#,
        )
        .unwrap();
        assert_eq!(cfg.seed, 99);
        assert_eq!(cfg.photos.len(), 2);
        assert_eq!(cfg.scene.morph.global_rate, 3.0);
        assert_eq!(cfg.scene.morph.max_dt, 0.1);
        assert_eq!(cfg.scene.groups.foliage_count, 10);
        assert_eq!(cfg.scene.groups.trail_count, 500);
        assert_eq!(cfg.scene.groups.foliage_cone.bias, DensityBias::DenseBottom(2.0));
        assert_eq!(cfg.classifier.pinch_threshold, 0.04);
        assert_eq!(cfg.classifier.open_min_open, 4);
        cfg.validate().unwrap();
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = AppConfig::from_toml_str("seed = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = AppConfig::load("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn non_positive_rate_rejected() {
        let mut cfg = AppConfig::default();
        cfg.scene.morph.global_rate = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn inverted_zoom_range_rejected() {
        let mut cfg = AppConfig::default();
        cfg.scene.camera.min_radius = 80.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn overlapping_finger_thresholds_rejected() {
        let mut cfg = AppConfig::default();
        cfg.classifier.fist_max_open = 4;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn too_many_particles_rejected() {
        let mut cfg = AppConfig::default();
        cfg.scene.groups.foliage_count = MAX_PARTICLES;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn cli_collects_options_and_photos() {
        let args = CliArgs::try_parse_from(["gesture_tree", "--seed", "5", "one.png", "two.jpg"]).unwrap();
        assert_eq!(args.seed, Some(5));
        assert_eq!(args.config, None);
        assert_eq!(args.photos, vec![PathBuf::from("one.png"), PathBuf::from("two.jpg")]);

        let cfg = args.into_config().unwrap();
        assert_eq!(cfg.seed, 5);
        assert_eq!(cfg.photos.len(), 2);
    }

    #[test]
    fn cli_rejects_bad_input() {
        assert!(CliArgs::try_parse_from(["gesture_tree", "--seed"]).is_err());
        assert!(CliArgs::try_parse_from(["gesture_tree", "--seed", "x"]).is_err());
        assert!(CliArgs::try_parse_from(["gesture_tree", "--bogus"]).is_err());
        let help = CliArgs::try_parse_from(["gesture_tree", "--help"]).unwrap_err();
        assert_eq!(help.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn cli_config_file_feeds_overrides() {
        let path = std::env::temp_dir().join(format!("gesture_tree_cli_{}.toml", std::process::id()));
        fs::write(&path, "seed = 3\nphotos = [\"base.png\"]\n").unwrap();
        let file = path.to_string_lossy().into_owned();
        let args = CliArgs::try_parse_from(["gesture_tree", "--config", file.as_str(), "extra.png"]).unwrap();
        let cfg = args.into_config();
        fs::remove_file(&path).ok();
        let cfg = cfg.unwrap();
        assert_eq!(cfg.seed, 3);
        assert_eq!(cfg.photos, vec![PathBuf::from("base.png"), PathBuf::from("extra.png")]);
    }
}
