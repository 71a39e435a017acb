//! Shared helpers for integration tests

#![allow(dead_code)]

use soul_boost::{
    BoostError, Capabilities, EffectsFacility, LimiterConfig, LimiterEffect, Result, SessionId,
};
use std::sync::{Arc, Mutex, Once};

static INIT: Once = Once::new();

/// Route tracing output to the test harness, once per binary
pub fn init_tracing() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    });
}

/// Something a [`RecordingFacility`] limiter was asked to do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    Created { session: SessionId, post_gain_db: f32 },
    PostGain { session: SessionId, gain_db: f32 },
    Enabled { session: SessionId, enabled: bool },
    Released { session: SessionId },
}

#[derive(Debug, Default)]
struct Log {
    events: Vec<Event>,
    live: usize,
    max_live: usize,
    fail_create: bool,
    fail_updates: bool,
}

/// Facility that records every call made through it
///
/// Clones share the same log, so a test can keep one while the booster owns
/// the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingFacility {
    log: Arc<Mutex<Log>>,
}

impl RecordingFacility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `create_limiter` call fail
    pub fn fail_create(&self) {
        self.log.lock().unwrap().fail_create = true;
    }

    /// Make every post-gain update fail
    pub fn fail_updates(&self) {
        self.log.lock().unwrap().fail_updates = true;
    }

    pub fn events(&self) -> Vec<Event> {
        self.log.lock().unwrap().events.clone()
    }

    /// Post-gain updates only
    pub fn post_gains(&self) -> Vec<f32> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::PostGain { gain_db, .. } => Some(gain_db),
                _ => None,
            })
            .collect()
    }

    /// Limiters created and not yet released
    pub fn live(&self) -> usize {
        self.log.lock().unwrap().live
    }

    /// Highest number of limiters alive at the same time
    pub fn max_live(&self) -> usize {
        self.log.lock().unwrap().max_live
    }

    pub fn count(&self, matches: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|e| matches(e)).count()
    }
}

impl EffectsFacility for RecordingFacility {
    fn capabilities(&self) -> Capabilities {
        Capabilities {
            dynamics_processing: true,
            max_channels: 2,
        }
    }

    fn create_limiter(
        &mut self,
        session: SessionId,
        config: &LimiterConfig,
    ) -> Result<Box<dyn LimiterEffect>> {
        let mut log = self.log.lock().unwrap();
        if log.fail_create {
            return Err(BoostError::ResourceInitFailure(
                "effect engine unavailable".to_string(),
            ));
        }

        log.events.push(Event::Created {
            session,
            post_gain_db: config.post_gain_db(),
        });
        log.live += 1;
        log.max_live = log.max_live.max(log.live);

        Ok(Box::new(RecordingLimiter {
            session,
            post_gain_db: config.post_gain_db(),
            released: false,
            log: Arc::clone(&self.log),
        }))
    }
}

struct RecordingLimiter {
    session: SessionId,
    post_gain_db: f32,
    released: bool,
    log: Arc<Mutex<Log>>,
}

impl LimiterEffect for RecordingLimiter {
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
        if self.released {
            return Err(BoostError::StaleHandle);
        }
        let mut log = self.log.lock().unwrap();
        if log.fail_updates {
            return Err(BoostError::ResourceInitFailure("effect died".to_string()));
        }
        log.events.push(Event::PostGain {
            session: self.session,
            gain_db,
        });
        self.post_gain_db = gain_db;
        Ok(())
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<()> {
        if self.released {
            return Err(BoostError::StaleHandle);
        }
        self.log.lock().unwrap().events.push(Event::Enabled {
            session: self.session,
            enabled,
        });
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;
        let mut log = self.log.lock().unwrap();
        log.events.push(Event::Released {
            session: self.session,
        });
        log.live -= 1;
        Ok(())
    }
}

/// Interleaved stereo sine at `amplitude`
pub fn stereo_sine(frequency: f32, amplitude: f32, sample_rate: u32, frames: usize) -> Vec<f32> {
    let mut buffer = Vec::with_capacity(frames * 2);
    for i in 0..frames {
        let t = i as f32 / sample_rate as f32;
        let sample = amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin();
        buffer.push(sample);
        buffer.push(sample);
    }
    buffer
}

pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0_f32, f32::max)
}
