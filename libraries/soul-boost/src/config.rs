//! Limiter configuration
//!
//! A [`LimiterConfig`] fixes the compressor topology for the lifetime of a
//! limiter instance. Only the post-gain may change afterwards, and only
//! through [`crate::PeakLimiter::set_post_gain`].

use crate::error::{BoostError, Result};
use serde::{Deserialize, Serialize};

/// Default attack time (ms)
pub const DEFAULT_ATTACK_MS: f32 = 1.0;

/// Default release time (ms)
pub const DEFAULT_RELEASE_MS: f32 = 60.0;

/// Default compression ratio above threshold
pub const DEFAULT_RATIO: f32 = 10.0;

/// Default threshold (dBFS)
pub const DEFAULT_THRESHOLD_DB: f32 = -2.0;

/// Default channel count (stereo)
pub const DEFAULT_CHANNEL_COUNT: usize = 2;

/// Resolution tradeoff of the limiter's level detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimiterVariant {
    /// Peak-hold detection: steadier gain across waveform cycles, lower THD
    #[default]
    FavorFrequencyResolution,
    /// Instantaneous detection: reacts to every sample, tighter transients
    FavorTimeResolution,
}

impl LimiterVariant {
    /// Parse from string (for settings persistence)
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "favor_frequency_resolution" | "frequency" => Some(Self::FavorFrequencyResolution),
            "favor_time_resolution" | "time" => Some(Self::FavorTimeResolution),
            _ => None,
        }
    }

    /// Convert to string for settings persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FavorFrequencyResolution => "favor_frequency_resolution",
            Self::FavorTimeResolution => "favor_time_resolution",
        }
    }
}

/// Compressor topology plus the current post-gain
///
/// # Example
///
/// ```
/// use soul_boost::{LimiterConfig, LimiterVariant};
///
/// let config = LimiterConfig::new(2)
///     .with_variant(LimiterVariant::FavorTimeResolution)
///     .with_attack_ms(2.0)
///     .with_threshold_db(-1.0);
/// assert!(config.validate().is_ok());
/// assert_eq!(config.post_gain_db(), 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimiterConfig {
    variant: LimiterVariant,
    channel_count: usize,
    attack_ms: f32,
    release_ms: f32,
    ratio: f32,
    threshold_db: f32,
    linked: bool,
    post_gain_db: f32,
}

impl LimiterConfig {
    /// Create a config with the default topology
    /// - Attack: 1 ms
    /// - Release: 60 ms
    /// - Ratio: 10:1
    /// - Threshold: -2 dB
    /// - Channels linked, no post-gain
    pub fn new(channel_count: usize) -> Self {
        Self {
            variant: LimiterVariant::default(),
            channel_count,
            attack_ms: DEFAULT_ATTACK_MS,
            release_ms: DEFAULT_RELEASE_MS,
            ratio: DEFAULT_RATIO,
            threshold_db: DEFAULT_THRESHOLD_DB,
            linked: true,
            post_gain_db: 0.0,
        }
    }

    pub fn with_variant(mut self, variant: LimiterVariant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_attack_ms(mut self, attack_ms: f32) -> Self {
        self.attack_ms = attack_ms;
        self
    }

    pub fn with_release_ms(mut self, release_ms: f32) -> Self {
        self.release_ms = release_ms;
        self
    }

    pub fn with_ratio(mut self, ratio: f32) -> Self {
        self.ratio = ratio;
        self
    }

    pub fn with_threshold_db(mut self, threshold_db: f32) -> Self {
        self.threshold_db = threshold_db;
        self
    }

    /// Link all channels to a single detector
    pub fn with_linked(mut self, linked: bool) -> Self {
        self.linked = linked;
        self
    }

    /// Initial post-gain in dB
    pub fn with_post_gain_db(mut self, post_gain_db: f32) -> Self {
        self.post_gain_db = post_gain_db;
        self
    }

    pub fn variant(&self) -> LimiterVariant {
        self.variant
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    pub fn attack_ms(&self) -> f32 {
        self.attack_ms
    }

    pub fn release_ms(&self) -> f32 {
        self.release_ms
    }

    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn threshold_db(&self) -> f32 {
        self.threshold_db
    }

    pub fn linked(&self) -> bool {
        self.linked
    }

    pub fn post_gain_db(&self) -> f32 {
        self.post_gain_db
    }

    pub(crate) fn set_post_gain_db(&mut self, post_gain_db: f32) {
        self.post_gain_db = post_gain_db;
    }

    /// Check every field against its domain
    pub fn validate(&self) -> Result<()> {
        if self.channel_count == 0 {
            return Err(BoostError::InvalidConfig(
                "channel count must be positive".to_string(),
            ));
        }
        if !(self.attack_ms.is_finite() && self.attack_ms > 0.0) {
            return Err(BoostError::InvalidConfig(format!(
                "attack must be positive, got {} ms",
                self.attack_ms
            )));
        }
        if !(self.release_ms.is_finite() && self.release_ms > 0.0) {
            return Err(BoostError::InvalidConfig(format!(
                "release must be positive, got {} ms",
                self.release_ms
            )));
        }
        if !(self.ratio.is_finite() && self.ratio >= 1.0) {
            return Err(BoostError::InvalidConfig(format!(
                "ratio must be at least 1:1, got {}",
                self.ratio
            )));
        }
        if !(self.threshold_db.is_finite() && self.threshold_db <= 0.0) {
            return Err(BoostError::InvalidConfig(format!(
                "threshold must be at or below 0 dB, got {} dB",
                self.threshold_db
            )));
        }
        if !self.post_gain_db.is_finite() {
            return Err(BoostError::InvalidConfig(
                "post-gain must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_topology() {
        let config = LimiterConfig::default();
        assert_eq!(config.channel_count(), 2);
        assert_eq!(config.attack_ms(), 1.0);
        assert_eq!(config.release_ms(), 60.0);
        assert_eq!(config.ratio(), 10.0);
        assert_eq!(config.threshold_db(), -2.0);
        assert_eq!(config.variant(), LimiterVariant::FavorFrequencyResolution);
        assert!(config.linked());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_domain_values() {
        assert!(LimiterConfig::new(0).validate().is_err());
        assert!(LimiterConfig::default().with_attack_ms(0.0).validate().is_err());
        assert!(LimiterConfig::default().with_release_ms(-5.0).validate().is_err());
        assert!(LimiterConfig::default().with_ratio(0.5).validate().is_err());
        assert!(LimiterConfig::default().with_threshold_db(1.0).validate().is_err());
        assert!(LimiterConfig::default()
            .with_post_gain_db(f32::INFINITY)
            .validate()
            .is_err());
    }

    #[test]
    fn unity_ratio_and_zero_threshold_are_valid() {
        let config = LimiterConfig::default().with_ratio(1.0).with_threshold_db(0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn variant_parsing() {
        assert_eq!(
            LimiterVariant::from_str("FAVOR_TIME_RESOLUTION"),
            Some(LimiterVariant::FavorTimeResolution)
        );
        assert_eq!(
            LimiterVariant::from_str("frequency"),
            Some(LimiterVariant::FavorFrequencyResolution)
        );
        assert_eq!(LimiterVariant::from_str("multiband"), None);
        assert_eq!(
            LimiterVariant::from_str(LimiterVariant::FavorTimeResolution.as_str()),
            Some(LimiterVariant::FavorTimeResolution)
        );
    }
}
