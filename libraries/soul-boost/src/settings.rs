//! Booster settings
//!
//! The boost scale and the envelope timings are tuning values, so they are
//! loaded like any other setting: an optional TOML file first, then
//! environment overrides prefixed with `SOUL_BOOST`.
//!
//! ```toml
//! enabled = true
//!
//! [gain]
//! scale_db = 15.0
//!
//! [limiter]
//! variant = "favor_frequency_resolution"
//! channel_count = 2
//! attack_ms = 1.0
//! release_ms = 60.0
//! ratio = 10.0
//! threshold_db = -2.0
//! linked = true
//! ```
//!
//! Nested keys use a double underscore in the environment, e.g.
//! `SOUL_BOOST_LIMITER__RELEASE_MS=80`.

use crate::config::{
    LimiterConfig, LimiterVariant, DEFAULT_ATTACK_MS, DEFAULT_CHANNEL_COUNT, DEFAULT_RATIO,
    DEFAULT_RELEASE_MS, DEFAULT_THRESHOLD_DB,
};
use crate::error::{BoostError, Result};
use crate::gain::{GainMapper, DEFAULT_BOOST_SCALE_DB};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable prefix for overrides
pub const ENV_PREFIX: &str = "SOUL_BOOST";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BoostSettings {
    /// Whether the limiter starts enabled on each new session
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_gain")]
    pub gain: GainSettings,

    #[serde(default = "default_limiter")]
    pub limiter: LimiterSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GainSettings {
    /// dB of makeup gain per unit of boost above 1.0
    #[serde(default = "default_scale_db")]
    pub scale_db: f32,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LimiterSettings {
    #[serde(default)]
    pub variant: LimiterVariant,

    #[serde(default = "default_channel_count")]
    pub channel_count: usize,

    #[serde(default = "default_attack_ms")]
    pub attack_ms: f32,

    #[serde(default = "default_release_ms")]
    pub release_ms: f32,

    #[serde(default = "default_ratio")]
    pub ratio: f32,

    #[serde(default = "default_threshold_db")]
    pub threshold_db: f32,

    #[serde(default = "default_linked")]
    pub linked: bool,
}

impl BoostSettings {
    /// Load settings from an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                return Err(BoostError::Settings(format!(
                    "settings file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(config::File::from(path));
        }

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Self = builder.build()?.try_deserialize()?;
        settings.validate()?;

        tracing::debug!(
            "Loaded boost settings: scale {} dB, threshold {} dB, ratio {}:1",
            settings.gain.scale_db,
            settings.limiter.threshold_db,
            settings.limiter.ratio
        );

        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if !(self.gain.scale_db.is_finite() && self.gain.scale_db >= 0.0) {
            return Err(BoostError::Settings(format!(
                "gain.scale_db must be a non-negative number, got {}",
                self.gain.scale_db
            )));
        }

        self.limiter_config()
            .validate()
            .map_err(|e| BoostError::Settings(e.to_string()))
    }

    /// Gain mapper for the configured scale
    pub fn gain_mapper(&self) -> GainMapper {
        GainMapper::new(self.gain.scale_db)
    }

    /// Limiter topology with no post-gain
    pub fn limiter_config(&self) -> LimiterConfig {
        let limiter = &self.limiter;
        LimiterConfig::new(limiter.channel_count)
            .with_variant(limiter.variant)
            .with_attack_ms(limiter.attack_ms)
            .with_release_ms(limiter.release_ms)
            .with_ratio(limiter.ratio)
            .with_threshold_db(limiter.threshold_db)
            .with_linked(limiter.linked)
    }
}

// Default values
fn default_enabled() -> bool {
    true
}

fn default_gain() -> GainSettings {
    GainSettings {
        scale_db: default_scale_db(),
    }
}

fn default_scale_db() -> f32 {
    DEFAULT_BOOST_SCALE_DB
}

fn default_limiter() -> LimiterSettings {
    LimiterSettings {
        variant: LimiterVariant::default(),
        channel_count: default_channel_count(),
        attack_ms: default_attack_ms(),
        release_ms: default_release_ms(),
        ratio: default_ratio(),
        threshold_db: default_threshold_db(),
        linked: default_linked(),
    }
}

fn default_channel_count() -> usize {
    DEFAULT_CHANNEL_COUNT
}

fn default_attack_ms() -> f32 {
    DEFAULT_ATTACK_MS
}

fn default_release_ms() -> f32 {
    DEFAULT_RELEASE_MS
}

fn default_ratio() -> f32 {
    DEFAULT_RATIO
}

fn default_threshold_db() -> f32 {
    DEFAULT_THRESHOLD_DB
}

fn default_linked() -> bool {
    true
}

impl Default for BoostSettings {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            gain: default_gain(),
            limiter: default_limiter(),
        }
    }
}
