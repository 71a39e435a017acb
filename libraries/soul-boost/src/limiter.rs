//! Peak limiter bound to one output session
//!
//! [`PeakLimiter`] owns exactly one facility limiter. The topology is fixed
//! by the [`LimiterConfig`] it was initialized with; the post-gain and the
//! enabled flag are the only things that change afterwards.

use crate::config::LimiterConfig;
use crate::error::{BoostError, Result};
use crate::facility::{EffectsFacility, LimiterEffect, SessionId};

pub struct PeakLimiter {
    session: SessionId,
    config: LimiterConfig,
    enabled: bool,
    /// None once released
    effect: Option<Box<dyn LimiterEffect>>,
}

impl PeakLimiter {
    /// Create a limiter on `session` through `facility`
    ///
    /// Capabilities are checked before anything is allocated, so an
    /// unsupported platform costs nothing.
    pub fn initialize(
        facility: &mut dyn EffectsFacility,
        session: SessionId,
        config: LimiterConfig,
    ) -> Result<Self> {
        let capabilities = facility.capabilities();
        if !capabilities.dynamics_processing {
            return Err(BoostError::UnsupportedPlatform);
        }

        config
            .validate()
            .map_err(|e| BoostError::ResourceInitFailure(e.to_string()))?;

        if !capabilities.supports(&config) {
            return Err(BoostError::ResourceInitFailure(format!(
                "{} channels requested, facility supports {}",
                config.channel_count(),
                capabilities.max_channels
            )));
        }

        let mut effect = facility.create_limiter(session, &config)?;

        if let Err(e) = effect.set_enabled(true) {
            let _ = effect.release();
            return Err(BoostError::ResourceInitFailure(format!(
                "failed to enable limiter: {}",
                e
            )));
        }

        Ok(Self {
            session,
            config,
            enabled: true,
            effect: Some(effect),
        })
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    /// Post-gain last requested (dB)
    pub fn post_gain_db(&self) -> f32 {
        self.config.post_gain_db()
    }

    /// Post-gain the facility reports for channel 0 (dB)
    pub fn applied_post_gain_db(&self) -> Result<f32> {
        match self.effect.as_ref() {
            Some(effect) => effect.post_gain_db(),
            None => Err(BoostError::StaleHandle),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_released(&self) -> bool {
        self.effect.is_none()
    }

    /// Update the post-gain on all channels
    ///
    /// The value is compared with what the facility reports for channel 0.
    /// Returns `Ok(false)` without updating the facility when they match or
    /// the limiter was released.
    pub fn set_post_gain(&mut self, gain_db: f32) -> Result<bool> {
        if !gain_db.is_finite() {
            return Err(BoostError::InvalidConfig(format!(
                "post-gain must be finite, got {}",
                gain_db
            )));
        }

        let Some(effect) = self.effect.as_mut() else {
            return Ok(false);
        };

        if gain_db == effect.post_gain_db()? {
            return Ok(false);
        }

        effect.set_post_gain_all_channels(gain_db)?;
        self.config.set_post_gain_db(gain_db);
        Ok(true)
    }

    /// Enable or bypass the limiter
    ///
    /// Returns `Ok(false)` when nothing changed or the limiter was released.
    pub fn set_enabled(&mut self, enabled: bool) -> Result<bool> {
        let Some(effect) = self.effect.as_mut() else {
            return Ok(false);
        };

        if enabled == self.enabled {
            return Ok(false);
        }

        effect.set_enabled(enabled)?;
        self.enabled = enabled;
        Ok(true)
    }

    /// Free the facility limiter; later calls are no-ops
    pub fn release(&mut self) -> Result<()> {
        match self.effect.take() {
            Some(mut effect) => effect.release(),
            None => Ok(()),
        }
    }
}

impl Drop for PeakLimiter {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
