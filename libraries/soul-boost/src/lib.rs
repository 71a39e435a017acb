//! Loudness boost for Soul Player
//!
//! This crate provides:
//! - Mapping from a user boost level (1.0 - 2.0) to a post-gain in dB
//! - A single-band peak limiter that applies the post-gain without clipping
//! - Session lifecycle: one limiter per output session, released before the next
//! - Fallback to unity gain when dynamics processing is unavailable or fails
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌──────────────────┐     ┌────────────────┐
//! │ Boost Level │ ──► │ LoudnessBooster  │ ──► │  PeakLimiter   │
//! └─────────────┘     └──────────────────┘     └────────────────┘
//!                              │                        │
//!                              ▼                        ▼
//!                      ┌──────────────┐       ┌──────────────────┐
//!                      │  GainMapper  │       │ EffectsFacility  │
//!                      └──────────────┘       └──────────────────┘
//!
//! Audio Thread:
//! ┌─────────────┐     ┌──────────────────┐     ┌────────────────┐
//! │ Audio Data  │ ──► │  EffectOutput    │ ──► │ LimiterProcessor│
//! └─────────────┘     └──────────────────┘     └────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use soul_boost::{boost_to_gain_db, LoudnessBooster, SessionId, SoftwareFacility};
//!
//! assert_eq!(boost_to_gain_db(1.5), 7.5);
//!
//! let (facility, mut output) = SoftwareFacility::new();
//! let mut booster = LoudnessBooster::with_defaults(Box::new(facility));
//! booster.on_audio_session_assigned(SessionId::new(1));
//! booster.set_boost_level(2.0);
//!
//! let mut buffer = vec![0.5_f32; 1024];
//! output.process(SessionId::new(1), &mut buffer, 44100).unwrap();
//! assert!(buffer.iter().all(|s| s.is_finite()));
//! ```

#![deny(unsafe_code)]

mod booster;
mod config;
mod effect;
mod error;
mod facility;
mod gain;
mod limiter;
mod processor;
mod settings;
mod software;

pub use booster::LoudnessBooster;
pub use config::{
    LimiterConfig, LimiterVariant, DEFAULT_ATTACK_MS, DEFAULT_CHANNEL_COUNT, DEFAULT_RATIO,
    DEFAULT_RELEASE_MS, DEFAULT_THRESHOLD_DB,
};
pub use effect::AudioEffect;
pub use error::{BoostError, Result};
pub use facility::{Capabilities, EffectsFacility, LimiterEffect, SessionId, UnsupportedFacility};
pub use gain::{
    boost_to_gain_db, db_to_linear, linear_to_db, GainMapper, DEFAULT_BOOST_SCALE_DB,
    MAX_BOOST_LEVEL, MAX_POST_GAIN_DB, UNITY_BOOST_LEVEL,
};
pub use limiter::PeakLimiter;
pub use processor::LimiterProcessor;
pub use settings::{BoostSettings, GainSettings, LimiterSettings, ENV_PREFIX};
pub use software::{EffectOutput, SoftwareFacility, SoftwareLimiter, DEFAULT_MAX_CHANNELS};
