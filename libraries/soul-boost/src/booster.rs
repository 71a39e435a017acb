//! Loudness booster for a playback pipeline
//!
//! [`LoudnessBooster`] is what the player talks to. It is infallible from the
//! caller's side: every limiter failure is logged. A limiter that fails is
//! released and playback carries on at unity gain; a rejected value leaves
//! the limiter as it was.
//!
//! # Example
//!
//! ```
//! use soul_boost::{BoostSettings, LoudnessBooster, SessionId, SoftwareFacility};
//!
//! let (facility, mut output) = SoftwareFacility::new();
//! let mut booster = LoudnessBooster::new(Box::new(facility), &BoostSettings::default());
//!
//! // Player assigned an output session
//! booster.on_audio_session_assigned(SessionId::new(1));
//! booster.set_boost_level(1.5);
//! assert_eq!(booster.gain_db(), 7.5);
//!
//! let mut buffer = vec![0.05_f32; 512];
//! output.process(SessionId::new(1), &mut buffer, 48000).unwrap();
//!
//! booster.release();
//! assert!(!booster.is_active());
//! ```

use crate::config::LimiterConfig;
use crate::error::BoostError;
use crate::facility::{EffectsFacility, SessionId};
use crate::gain::{GainMapper, UNITY_BOOST_LEVEL};
use crate::limiter::PeakLimiter;
use crate::settings::BoostSettings;
use tracing::{debug, info, warn};

/// How the booster behaves on this platform, decided once at construction
enum Strategy {
    /// Facility supports dynamics processing
    Limiting(Box<dyn EffectsFacility>),
    /// No dynamics processing: every operation is a no-op
    Bypass,
}

pub struct LoudnessBooster {
    strategy: Strategy,
    mapper: GainMapper,
    /// Topology for new limiters; post-gain comes from `boost_level`
    base_config: LimiterConfig,
    limiter: Option<PeakLimiter>,
    boost_level: f32,
    enabled: bool,
    /// Still listening for session notifications
    attached: bool,
}

impl LoudnessBooster {
    /// Create a booster on top of `facility`
    pub fn new(facility: Box<dyn EffectsFacility>, settings: &BoostSettings) -> Self {
        let strategy = if facility.capabilities().dynamics_processing {
            Strategy::Limiting(facility)
        } else {
            info!("Dynamics processing unavailable, loudness boost disabled");
            Strategy::Bypass
        };

        Self {
            strategy,
            mapper: settings.gain_mapper(),
            base_config: settings.limiter_config(),
            limiter: None,
            boost_level: UNITY_BOOST_LEVEL,
            enabled: settings.enabled,
            attached: true,
        }
    }

    /// Create a booster with default settings
    pub fn with_defaults(facility: Box<dyn EffectsFacility>) -> Self {
        Self::new(facility, &BoostSettings::default())
    }

    /// A new output session began: replace any limiter with one bound to it
    ///
    /// The old limiter is always released before the new one is created.
    pub fn on_audio_session_assigned(&mut self, session: SessionId) {
        if !self.attached {
            debug!("Ignoring session {} after release", session);
            return;
        }

        let Strategy::Limiting(facility) = &mut self.strategy else {
            debug!("Ignoring session {}: dynamics processing unsupported", session);
            return;
        };

        if let Some(mut previous) = self.limiter.take() {
            let previous_session = previous.session();
            match previous.release() {
                Ok(()) => info!("Released limiter for session {}", previous_session),
                Err(e) => warn!(
                    "Failed to release limiter for session {}: {}",
                    previous_session, e
                ),
            }
        }

        let config = self
            .base_config
            .with_post_gain_db(self.mapper.gain_db(self.boost_level));

        let mut limiter = match PeakLimiter::initialize(facility.as_mut(), session, config) {
            Ok(limiter) => limiter,
            Err(BoostError::UnsupportedPlatform) => {
                info!("Limiter unsupported for session {}, playing without boost", session);
                return;
            }
            Err(e) => {
                warn!("Failed to initialize limiter for session {}: {}", session, e);
                return;
            }
        };

        if !self.enabled {
            if let Err(e) = limiter.set_enabled(false) {
                warn!("Failed to bypass limiter for session {}: {}", session, e);
                if let Err(e) = limiter.release() {
                    warn!("Failed to release limiter for session {}: {}", session, e);
                }
                return;
            }
        }

        info!(
            "Attached limiter to session {} ({:.1} dB post-gain)",
            session,
            config.post_gain_db()
        );
        self.limiter = Some(limiter);
    }

    /// Set the boost level (1.0 = unity, 2.0 = 200%)
    pub fn set_boost_level(&mut self, level: f32) {
        self.boost_level = level;
        let gain_db = self.mapper.gain_db(level);

        let Some(limiter) = self.limiter.as_mut() else {
            return;
        };

        match limiter.set_post_gain(gain_db) {
            Ok(true) => debug!("Boost level {} -> {:.2} dB post-gain", level, gain_db),
            Ok(false) => debug!("Post-gain already {:.2} dB, skipping update", gain_db),
            Err(e) => self.fall_back("update post-gain", &e),
        }
    }

    /// Enable or bypass the limiter
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;

        let Some(limiter) = self.limiter.as_mut() else {
            return;
        };

        match limiter.set_enabled(enabled) {
            Ok(changed) => {
                if changed {
                    debug!("Limiter {}", if enabled { "enabled" } else { "bypassed" });
                }
            }
            Err(e) => self.fall_back("toggle limiter", &e),
        }
    }

    /// Stop listening for sessions and free the limiter
    ///
    /// Safe to call any number of times, before or after a session exists.
    pub fn release(&mut self) {
        self.attached = false;

        if let Some(mut limiter) = self.limiter.take() {
            let session = limiter.session();
            match limiter.release() {
                Ok(()) => info!("Released limiter for session {}", session),
                Err(e) => warn!("Failed to release limiter for session {}: {}", session, e),
            }
        }
    }

    /// Drop into the bypass state after a failed operation
    fn fall_back(&mut self, operation: &str, err: &BoostError) {
        // A rejected argument leaves the limiter usable
        if matches!(err, BoostError::InvalidConfig(_)) {
            warn!("Rejected request to {}: {}", operation, err);
            return;
        }

        let Some(mut limiter) = self.limiter.take() else {
            return;
        };

        if err.is_stale() {
            debug!("Limiter already released, cannot {}", operation);
            return;
        }

        warn!(
            "Failed to {} on session {}: {}; continuing without boost",
            operation,
            limiter.session(),
            err
        );
        if let Err(e) = limiter.release() {
            warn!("Failed to release limiter: {}", e);
        }
    }

    /// Last requested boost level
    pub fn boost_level(&self) -> f32 {
        self.boost_level
    }

    /// Post-gain the current boost level maps to (dB)
    pub fn gain_db(&self) -> f32 {
        self.mapper.gain_db(self.boost_level)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether the platform supports dynamics processing
    pub fn is_supported(&self) -> bool {
        matches!(self.strategy, Strategy::Limiting(_))
    }

    /// Whether a limiter is currently attached to a session
    pub fn is_active(&self) -> bool {
        self.limiter.is_some()
    }

    /// Whether `release()` has been called
    pub fn is_released(&self) -> bool {
        !self.attached
    }

    /// Session the active limiter is bound to
    pub fn session(&self) -> Option<SessionId> {
        self.limiter.as_ref().map(PeakLimiter::session)
    }

    /// Post-gain read back from the active limiter (dB)
    pub fn applied_gain_db(&self) -> Option<f32> {
        self.limiter
            .as_ref()
            .and_then(|limiter| limiter.applied_post_gain_db().ok())
    }
}

impl Drop for LoudnessBooster {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facility::{
        Capabilities, LimiterEffect, MockEffectsFacility, MockLimiterEffect, UnsupportedFacility,
    };
    use mockall::predicate::eq;

    fn supported() -> Capabilities {
        Capabilities {
            dynamics_processing: true,
            max_channels: 2,
        }
    }

    fn facility_with(effect: MockLimiterEffect) -> MockEffectsFacility {
        let mut facility = MockEffectsFacility::new();
        facility.expect_capabilities().returning(supported);
        facility
            .expect_create_limiter()
            .times(1)
            .return_once(move |_, _| Ok(Box::new(effect) as Box<dyn LimiterEffect>));
        facility
    }

    #[test]
    fn unsupported_platform_is_silent_noop() {
        let mut booster = LoudnessBooster::with_defaults(Box::new(UnsupportedFacility));
        assert!(!booster.is_supported());

        booster.on_audio_session_assigned(SessionId::new(1));
        booster.set_boost_level(2.0);
        booster.set_enabled(false);

        assert!(!booster.is_active());
        assert_eq!(booster.gain_db(), 15.0);
        booster.release();
    }

    #[test]
    fn capability_is_queried_once() {
        let mut facility = MockEffectsFacility::new();
        facility
            .expect_capabilities()
            .times(1)
            .returning(Capabilities::unsupported);
        facility.expect_create_limiter().times(0);

        let mut booster = LoudnessBooster::with_defaults(Box::new(facility));
        booster.on_audio_session_assigned(SessionId::new(1));
        booster.on_audio_session_assigned(SessionId::new(2));
        assert!(!booster.is_active());
    }

    #[test]
    fn init_failure_leaves_booster_inactive() {
        let mut facility = MockEffectsFacility::new();
        facility.expect_capabilities().returning(supported);
        facility
            .expect_create_limiter()
            .returning(|_, _| Err(BoostError::ResourceInitFailure("no effect".to_string())));

        let mut booster = LoudnessBooster::with_defaults(Box::new(facility));
        booster.on_audio_session_assigned(SessionId::new(1));
        assert!(!booster.is_active());

        // Later calls are no-ops
        booster.set_boost_level(1.8);
        booster.set_enabled(false);
        assert!(!booster.is_active());
        assert_eq!(booster.boost_level(), 1.8);
    }

    #[test]
    fn update_failure_falls_back_to_bypass() {
        let mut effect = MockLimiterEffect::new();
        effect.expect_set_enabled().returning(|_| Ok(()));
        effect.expect_post_gain_db().returning(|| Ok(0.0));
        effect
            .expect_set_post_gain_all_channels()
            .returning(|_| Err(BoostError::ResourceInitFailure("effect died".to_string())));
        effect.expect_release().times(1).returning(|| Ok(()));

        let mut booster = LoudnessBooster::with_defaults(Box::new(facility_with(effect)));
        booster.on_audio_session_assigned(SessionId::new(1));
        assert!(booster.is_active());

        booster.set_boost_level(2.0);
        assert!(!booster.is_active());
    }

    #[test]
    fn rejected_gain_keeps_limiter() {
        let mut effect = MockLimiterEffect::new();
        effect.expect_set_enabled().returning(|_| Ok(()));
        effect.expect_post_gain_db().returning(|| Ok(0.0));
        effect
            .expect_set_post_gain_all_channels()
            .with(eq(15.0))
            .times(1)
            .returning(|_| Err(BoostError::InvalidConfig("gain out of range".to_string())));
        effect
            .expect_set_post_gain_all_channels()
            .with(eq(7.5))
            .times(1)
            .returning(|_| Ok(()));
        effect.expect_release().times(1).returning(|| Ok(()));

        let mut booster = LoudnessBooster::with_defaults(Box::new(facility_with(effect)));
        booster.on_audio_session_assigned(SessionId::new(1));

        booster.set_boost_level(2.0);
        assert!(booster.is_active());

        booster.set_boost_level(1.5);
        assert!(booster.is_active());
    }

    #[test]
    fn stale_handle_drops_limiter_quietly() {
        let mut effect = MockLimiterEffect::new();
        effect.expect_set_enabled().returning(|_| Ok(()));
        effect
            .expect_post_gain_db()
            .returning(|| Err(BoostError::StaleHandle));
        effect.expect_set_post_gain_all_channels().times(0);
        effect.expect_release().returning(|| Ok(()));

        let mut booster = LoudnessBooster::with_defaults(Box::new(facility_with(effect)));
        booster.on_audio_session_assigned(SessionId::new(1));

        booster.set_boost_level(1.5);
        assert!(!booster.is_active());
        assert_eq!(booster.boost_level(), 1.5);
    }

    #[test]
    fn new_session_starts_with_current_boost() {
        let mut effect = MockLimiterEffect::new();
        effect.expect_set_enabled().returning(|_| Ok(()));
        effect.expect_post_gain_db().returning(|| Ok(7.5));
        effect.expect_release().returning(|| Ok(()));

        let mut facility = MockEffectsFacility::new();
        facility.expect_capabilities().returning(supported);
        facility
            .expect_create_limiter()
            .withf(|_, config| config.post_gain_db() == 7.5)
            .times(1)
            .return_once(move |_, _| Ok(Box::new(effect) as Box<dyn LimiterEffect>));

        let mut booster = LoudnessBooster::with_defaults(Box::new(facility));
        booster.set_boost_level(1.5);
        booster.on_audio_session_assigned(SessionId::new(1));

        assert_eq!(booster.applied_gain_db(), Some(7.5));
    }

    #[test]
    fn disabled_setting_bypasses_new_limiter() {
        let mut effect = MockLimiterEffect::new();
        effect
            .expect_set_enabled()
            .with(eq(true))
            .times(1)
            .returning(|_| Ok(()));
        effect
            .expect_set_enabled()
            .with(eq(false))
            .times(1)
            .returning(|_| Ok(()));
        effect.expect_release().returning(|| Ok(()));

        let mut settings = BoostSettings::default();
        settings.enabled = false;

        let mut booster = LoudnessBooster::new(Box::new(facility_with(effect)), &settings);
        booster.on_audio_session_assigned(SessionId::new(3));
        assert!(booster.is_active());
        assert!(!booster.is_enabled());
    }

    #[test]
    fn release_before_any_session() {
        let (facility, _output) = crate::software::SoftwareFacility::new();
        let mut booster = LoudnessBooster::with_defaults(Box::new(facility));

        booster.release();
        booster.release();
        assert!(booster.is_released());
        assert!(!booster.is_active());

        // Detached: late notifications are ignored
        booster.on_audio_session_assigned(SessionId::new(1));
        assert!(!booster.is_active());
    }
}
