//! In-process effects facility
//!
//! [`SoftwareFacility`] is the control-thread side: it creates limiters and
//! hands out [`LimiterEffect`] handles. [`EffectOutput`] is the audio-thread
//! side: it owns the [`LimiterProcessor`]s and runs them over each session's
//! buffers.
//!
//! The two sides only talk through channels, so the audio thread never takes
//! a lock. Commands are drained with `try_recv` at the start of each buffer.
//!
//! ```
//! use soul_boost::{EffectsFacility, LimiterConfig, SessionId, SoftwareFacility};
//!
//! let (mut facility, mut output) = SoftwareFacility::new();
//! let session = SessionId::new(7);
//!
//! let mut limiter = facility
//!     .create_limiter(session, &LimiterConfig::default().with_post_gain_db(6.0))
//!     .unwrap();
//!
//! let mut buffer = vec![0.1_f32; 256];
//! output.process(session, &mut buffer, 48000).unwrap();
//! assert!(buffer[255] > 0.19);
//!
//! limiter.release().unwrap();
//! output.sync();
//! assert_eq!(output.active_limiters(), 0);
//! ```

use crate::config::LimiterConfig;
use crate::effect::AudioEffect;
use crate::error::{BoostError, Result};
use crate::facility::{Capabilities, EffectsFacility, LimiterEffect, SessionId};
use crate::processor::LimiterProcessor;
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use tracing::{debug, warn};

/// Default highest channel count (7.1)
pub const DEFAULT_MAX_CHANNELS: usize = 8;

/// Commands sent to the audio thread
#[derive(Debug, Clone, Copy, PartialEq)]
enum LimiterCommand {
    /// Set post-gain on all channels (dB)
    SetPostGain(f32),
    /// Enable or bypass the limiter
    SetEnabled(bool),
    /// Detach and drop the processor
    Release,
}

/// A new limiter on its way to the audio thread
struct Attachment {
    session: SessionId,
    processor: LimiterProcessor,
    commands: Receiver<LimiterCommand>,
}

/// Limiter running on the audio thread
struct AttachedLimiter {
    session: SessionId,
    processor: LimiterProcessor,
    commands: Receiver<LimiterCommand>,
}

impl AttachedLimiter {
    /// Apply pending commands; returns false once the limiter is released
    fn apply_commands(&mut self) -> bool {
        loop {
            match self.commands.try_recv() {
                Ok(LimiterCommand::SetPostGain(gain_db)) => {
                    self.processor.set_post_gain_db(gain_db);
                }
                Ok(LimiterCommand::SetEnabled(enabled)) => {
                    self.processor.set_enabled(enabled);
                }
                // Handle dropped without an explicit release counts as one
                Ok(LimiterCommand::Release) | Err(TryRecvError::Disconnected) => return false,
                Err(TryRecvError::Empty) => return true,
            }
        }
    }
}

/// Control-thread side of the in-process facility
pub struct SoftwareFacility {
    attach_tx: Sender<Attachment>,
    max_channels: usize,
}

impl SoftwareFacility {
    /// Create a facility and the audio-thread output it feeds
    pub fn new() -> (Self, EffectOutput) {
        Self::with_max_channels(DEFAULT_MAX_CHANNELS)
    }

    /// Create a facility limited to `max_channels`
    pub fn with_max_channels(max_channels: usize) -> (Self, EffectOutput) {
        let (attach_tx, attach_rx) = unbounded();
        (
            Self {
                attach_tx,
                max_channels,
            },
            EffectOutput {
                attach_rx,
                limiters: Vec::with_capacity(4),
            },
        )
    }
}

impl EffectsFacility for SoftwareFacility {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            dynamics_processing: true,
            max_channels: self.max_channels,
        }
    }

    fn create_limiter(
        &mut self,
        session: SessionId,
        config: &LimiterConfig,
    ) -> Result<Box<dyn LimiterEffect>> {
        config
            .validate()
            .map_err(|e| BoostError::ResourceInitFailure(e.to_string()))?;

        if config.channel_count() > self.max_channels {
            return Err(BoostError::ResourceInitFailure(format!(
                "{} channels requested, facility supports {}",
                config.channel_count(),
                self.max_channels
            )));
        }

        let (command_tx, command_rx) = unbounded();
        let attachment = Attachment {
            session,
            processor: LimiterProcessor::new(*config),
            commands: command_rx,
        };

        self.attach_tx.send(attachment).map_err(|_| {
            BoostError::ResourceInitFailure("effect output has shut down".to_string())
        })?;

        debug!(
            "Created software limiter for session {} ({} channels, {:?})",
            session,
            config.channel_count(),
            config.variant()
        );

        Ok(Box::new(SoftwareLimiter {
            session,
            commands: command_tx,
            post_gain_db: config.post_gain_db(),
            released: false,
        }))
    }
}

/// Control-thread handle to a software limiter
pub struct SoftwareLimiter {
    session: SessionId,
    commands: Sender<LimiterCommand>,
    /// Mirror of the post-gain last sent to the audio thread
    post_gain_db: f32,
    released: bool,
}

impl SoftwareLimiter {
    fn send(&self, command: LimiterCommand) -> Result<()> {
        if self.released {
            return Err(BoostError::StaleHandle);
        }
        // A disconnected output already dropped the processor
        self.commands
            .send(command)
            .map_err(|_| BoostError::StaleHandle)
    }
}

impl LimiterEffect for SoftwareLimiter {
    fn session(&self) -> SessionId {
        self.session
    }

    fn post_gain_db(&self) -> Result<f32> {
        if self.released {
            return Err(BoostError::StaleHandle);
        }
        Ok(self.post_gain_db)
    }

    fn set_post_gain_all_channels(&mut self, gain_db: f32) -> Result<()> {
        self.send(LimiterCommand::SetPostGain(gain_db))?;
        self.post_gain_db = gain_db;
        Ok(())
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        self.send(LimiterCommand::SetEnabled(enabled))
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        // Output may already be gone; either way nothing is left to free
        let _ = self.commands.send(LimiterCommand::Release);
        Ok(())
    }
}

impl Drop for SoftwareLimiter {
    fn drop(&mut self) {
        let _ = self.release();
    }
}

/// Audio-thread side of the in-process facility
///
/// # Real-Time Safety
/// - Never blocks: commands are drained with `try_recv`
/// - Allocates only when a new limiter attaches
pub struct EffectOutput {
    attach_rx: Receiver<Attachment>,
    limiters: Vec<AttachedLimiter>,
}

impl EffectOutput {
    /// Pick up new limiters and pending commands, drop released limiters
    pub fn sync(&mut self) {
        while let Ok(attachment) = self.attach_rx.try_recv() {
            self.limiters.push(AttachedLimiter {
                session: attachment.session,
                processor: attachment.processor,
                commands: attachment.commands,
            });
        }

        self.limiters.retain_mut(AttachedLimiter::apply_commands);
    }

    /// Run every limiter attached to `session` over an interleaved buffer
    ///
    /// Buffers for sessions without a limiter pass through untouched.
    pub fn process(
        &mut self,
        session: SessionId,
        buffer: &mut [f32],
        sample_rate: u32,
    ) -> Result<()> {
        self.sync();

        for limiter in self.limiters.iter_mut().filter(|l| l.session == session) {
            let channels = limiter.processor.config().channel_count();
            if buffer.len() % channels != 0 {
                let err = BoostError::ChannelMismatch {
                    expected: channels,
                    actual: buffer.len(),
                };
                warn!("Skipping limiter on session {}: {}", session, err);
                return Err(err);
            }
            limiter.processor.process(buffer, sample_rate);
        }

        Ok(())
    }

    /// Number of limiters currently attached
    pub fn active_limiters(&self) -> usize {
        self.limiters.len()
    }

    /// Number of limiters attached to `session`
    pub fn active_limiters_for(&self, session: SessionId) -> usize {
        self.limiters.iter().filter(|l| l.session == session).count()
    }

    /// Deepest gain reduction on `session`, if a limiter is attached
    pub fn gain_reduction_db(&self, session: SessionId) -> Option<f32> {
        self.limiters
            .iter()
            .filter(|l| l.session == session)
            .map(|l| l.processor.gain_reduction_db())
            .reduce(f32::min)
    }
}
