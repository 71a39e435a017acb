//! Audio-effects facility abstraction
//!
//! The limiter itself lives behind an effects facility that attaches
//! processing to an output session. A facility may be absent (e.g. the
//! platform is too old), which it reports through [`Capabilities`] rather
//! than by failing every call.

use crate::config::LimiterConfig;
use crate::error::{BoostError, Result};
use std::fmt;

/// Identifier of an audio output session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(i32);

impl SessionId {
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    pub const fn as_i32(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for SessionId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

/// What a facility can do on this platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Dynamics processing (limiter) is available
    pub dynamics_processing: bool,
    /// Highest channel count the facility can configure
    pub max_channels: usize,
}

impl Capabilities {
    /// No dynamics processing at all
    pub const fn unsupported() -> Self {
        Self {
            dynamics_processing: false,
            max_channels: 0,
        }
    }

    /// Whether a limiter with `config` can be created
    pub fn supports(&self, config: &LimiterConfig) -> bool {
        self.dynamics_processing && config.channel_count() <= self.max_channels
    }
}

/// Creates limiters bound to output sessions
#[cfg_attr(test, mockall::automock)]
pub trait EffectsFacility: Send {
    /// Query what this facility supports
    fn capabilities(&self) -> Capabilities;

    /// Create a limiter attached to `session`
    ///
    /// The limiter starts enabled with `config`'s post-gain on every channel.
    fn create_limiter(
        &mut self,
        session: SessionId,
        config: &LimiterConfig,
    ) -> Result<Box<dyn LimiterEffect>>;
}

/// A limiter owned by the facility
///
/// Once [`LimiterEffect::release`] has been called, every other method
/// returns [`BoostError::StaleHandle`]. Releasing again is a no-op.
#[cfg_attr(test, mockall::automock)]
pub trait LimiterEffect: Send {
    /// Session this limiter is attached to
    fn session(&self) -> SessionId;

    /// Post-gain currently configured on channel 0 (dB)
    fn post_gain_db(&self) -> Result<f32>;

    /// Apply a post-gain to every channel in one update
    fn set_post_gain_all_channels(&mut self, gain_db: f32) -> Result<()>;

    fn set_enabled(&mut self, enabled: bool) -> Result<()>;

    /// Free the underlying resource
    fn release(&mut self) -> Result<()>;
}

/// Facility for platforms without dynamics processing
///
/// Every creation attempt fails with [`BoostError::UnsupportedPlatform`].
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedFacility;

impl EffectsFacility for UnsupportedFacility {
    fn capabilities(&self) -> Capabilities {
        Capabilities::unsupported()
    }

    fn create_limiter(
        &mut self,
        _session: SessionId,
        _config: &LimiterConfig,
    ) -> Result<Box<dyn LimiterEffect>> {
        Err(BoostError::UnsupportedPlatform)
    }
}
