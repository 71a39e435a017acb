//! Single-band peak limiter with makeup gain
//!
//! The post-gain is applied ahead of the gain computer, so the boosted level
//! is what gets compared with the threshold. Anything the boost pushes over
//! the threshold is compressed back toward it by `ratio`, which is what lets
//! the post-gain exceed the available headroom without hard clipping.
//!
//! Two-stage design:
//! 1. Level detection. `FavorFrequencyResolution` uses instant attack with a
//!    slow peak-hold decay so the level is stable across waveform cycles.
//!    `FavorTimeResolution` follows the instantaneous sample peak.
//! 2. Gain reduction smoothing with the configured attack/release times.

use crate::config::{LimiterConfig, LimiterVariant};
use crate::effect::AudioEffect;
use crate::gain::{db_to_linear, linear_to_db};

/// Number of frames over which post-gain changes are ramped
/// At 48kHz, 64 frames = ~1.3ms, which is imperceptible but prevents clicks
const SMOOTH_FRAMES: u32 = 64;

/// Peak-hold decay time for the frequency-resolution detector (ms)
const PEAK_HOLD_MS: f32 = 50.0;

const NOISE_FLOOR_DB: f32 = -120.0;

/// Gain reduction closer to 0 dB than this snaps to 0 while bypassing
const SETTLED_DB: f32 = 1e-4;

#[derive(Debug, Clone, Copy)]
struct Detector {
    level_db: f32,
    gain_reduction_db: f32,
}

impl Detector {
    const fn new() -> Self {
        Self {
            level_db: NOISE_FLOOR_DB,
            gain_reduction_db: 0.0,
        }
    }
}

/// Sample-level limiter processor
///
/// # Real-Time Safety
/// - Detector state is allocated in the constructor
/// - No allocations in `process()`
pub struct LimiterProcessor {
    config: LimiterConfig,
    enabled: bool,

    // One detector when channels are linked, one per channel otherwise
    detectors: Vec<Detector>,

    /// Post-gain being applied right now (dB)
    post_gain_db: f32,
    /// Frames remaining until `post_gain_db` reaches its target
    smooth_frames_remaining: u32,

    attack_coeff: f32,
    release_coeff: f32,
    peak_release_coeff: f32,

    sample_rate: u32,
    needs_update: bool,
}

impl LimiterProcessor {
    /// Create a processor for a validated configuration
    pub fn new(config: LimiterConfig) -> Self {
        let detector_count = if config.linked() {
            1
        } else {
            config.channel_count().max(1)
        };

        let mut processor = Self {
            config,
            enabled: true,
            detectors: vec![Detector::new(); detector_count],
            post_gain_db: config.post_gain_db(),
            smooth_frames_remaining: 0,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            peak_release_coeff: 0.0,
            sample_rate: 48000,
            needs_update: true,
        };
        processor.update_coefficients();
        processor
    }

    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    /// Set the makeup gain in dB
    ///
    /// The change is ramped over 64 frames to prevent zipper noise.
    pub fn set_post_gain_db(&mut self, gain_db: f32) {
        if (gain_db - self.config.post_gain_db()).abs() > 1e-6 {
            self.config.set_post_gain_db(gain_db);
            self.smooth_frames_remaining = SMOOTH_FRAMES;
        }
    }

    /// Configured (target) post-gain in dB
    pub fn post_gain_db(&self) -> f32 {
        self.config.post_gain_db()
    }

    /// Post-gain currently applied, including any ramp in progress
    pub fn current_post_gain_db(&self) -> f32 {
        self.post_gain_db
    }

    /// Deepest gain reduction across detectors (dB, <= 0)
    pub fn gain_reduction_db(&self) -> f32 {
        self.detectors
            .iter()
            .map(|d| d.gain_reduction_db)
            .fold(0.0_f32, f32::min)
    }

    /// The limiter has no lookahead
    pub fn latency_samples(&self) -> usize {
        0
    }

    /// Whether processing would leave samples untouched
    pub fn is_transparent(&self) -> bool {
        !self.enabled
            && self.smooth_frames_remaining == 0
            && self.post_gain_db == 0.0
            && self.detectors.iter().all(|d| d.gain_reduction_db == 0.0)
    }

    fn target_post_gain_db(&self) -> f32 {
        if self.enabled {
            self.config.post_gain_db()
        } else {
            0.0
        }
    }

    /// Update internal coefficients based on settings and sample rate
    fn update_coefficients(&mut self) {
        if !self.needs_update {
            return;
        }

        let sr = self.sample_rate as f32;

        // coeff = exp(-1 / (time_ms * sample_rate / 1000))
        // gives 63.2% (1 - 1/e) response at the specified time
        let attack_samples = self.config.attack_ms() * sr / 1000.0;
        let release_samples = self.config.release_ms() * sr / 1000.0;
        let peak_release_samples = PEAK_HOLD_MS * sr / 1000.0;

        self.attack_coeff = (-1.0 / attack_samples).exp();
        self.release_coeff = (-1.0 / release_samples).exp();
        self.peak_release_coeff = (-1.0 / peak_release_samples).exp();

        self.needs_update = false;
    }

    /// Ramp post-gain toward its target
    ///
    /// While bypassing, the post-gain relaxes on the release envelope together
    /// with the gain reduction, so their sum glides back to unity.
    #[inline]
    fn smooth_post_gain(&mut self) {
        if !self.enabled {
            self.post_gain_db *= self.release_coeff;
            if self.post_gain_db.abs() < SETTLED_DB {
                self.post_gain_db = 0.0;
            }
            self.smooth_frames_remaining = 0;
            return;
        }

        let target = self.config.post_gain_db();

        if self.smooth_frames_remaining == 0 {
            self.post_gain_db = target;
            return;
        }

        let alpha = 1.0 / self.smooth_frames_remaining as f32;
        self.post_gain_db += alpha * (target - self.post_gain_db);
        self.smooth_frames_remaining -= 1;

        if self.smooth_frames_remaining == 0 {
            self.post_gain_db = target;
        }
    }

    /// Gain reduction (dB, <= 0) for a boosted input level, hard knee
    #[inline]
    fn compute_gain_reduction(&self, level_db: f32) -> f32 {
        let threshold = self.config.threshold_db();
        if level_db <= threshold {
            0.0
        } else {
            let output_db = threshold + (level_db - threshold) / self.config.ratio();
            output_db - level_db
        }
    }

    /// Run one detector for one frame and return the linear gain to apply
    #[inline]
    fn detect(&mut self, index: usize, peak: f32, active: bool) -> f32 {
        let boosted_db = linear_to_db(peak, NOISE_FLOOR_DB) + self.post_gain_db;
        let variant = self.config.variant();
        let peak_release_coeff = self.peak_release_coeff;

        let level_db = {
            let detector = &mut self.detectors[index];
            detector.level_db = match variant {
                LimiterVariant::FavorTimeResolution => boosted_db,
                LimiterVariant::FavorFrequencyResolution => {
                    if boosted_db > detector.level_db {
                        boosted_db
                    } else {
                        // Decay toward the noise floor, not toward the input:
                        // the input drops to -inf at every zero crossing
                        peak_release_coeff * (detector.level_db - NOISE_FLOOR_DB)
                            + NOISE_FLOOR_DB
                    }
                }
            };
            detector.level_db
        };

        let target_gr_db = if active {
            self.compute_gain_reduction(level_db)
        } else {
            0.0
        };

        let attack_coeff = self.attack_coeff;
        let release_coeff = self.release_coeff;
        let detector = &mut self.detectors[index];

        // More negative target = attacking
        let coeff = if target_gr_db < detector.gain_reduction_db {
            attack_coeff
        } else {
            release_coeff
        };
        detector.gain_reduction_db =
            coeff * detector.gain_reduction_db + (1.0 - coeff) * target_gr_db;

        if !active && detector.gain_reduction_db > -SETTLED_DB {
            detector.gain_reduction_db = 0.0;
        }

        db_to_linear(self.post_gain_db + detector.gain_reduction_db)
    }
}

impl AudioEffect for LimiterProcessor {
    fn process(&mut self, buffer: &mut [f32], sample_rate: u32) {
        if buffer.is_empty() || self.is_transparent() {
            return;
        }

        if self.sample_rate != sample_rate && sample_rate > 0 {
            self.sample_rate = sample_rate;
            self.needs_update = true;
        }
        self.update_coefficients();

        // An unvalidated config may carry zero channels
        let channels = self.config.channel_count().max(1);
        let linked = self.detectors.len() == 1;
        let active = self.enabled;

        for frame in buffer.chunks_exact_mut(channels) {
            self.smooth_post_gain();

            // Inf/NaN would poison the envelope for good; mute them instead
            for sample in frame.iter_mut() {
                if !sample.is_finite() {
                    *sample = 0.0;
                }
            }

            if linked {
                // Louder channel drives all channels, preserving the stereo image
                let peak = frame.iter().fold(0.0_f32, |acc, s| acc.max(s.abs()));
                let gain = self.detect(0, peak, active);
                for sample in frame.iter_mut() {
                    *sample *= gain;
                }
            } else {
                for (ch, sample) in frame.iter_mut().enumerate() {
                    let gain = self.detect(ch, sample.abs(), active);
                    *sample *= gain;
                }
            }
        }
    }

    fn reset(&mut self) {
        for detector in &mut self.detectors {
            *detector = Detector::new();
        }
        self.post_gain_db = self.target_post_gain_db();
        self.smooth_frames_remaining = 0;
    }

    fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            self.enabled = enabled;
            if enabled {
                self.smooth_frames_remaining = SMOOTH_FRAMES;
            }
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn name(&self) -> &str {
        "Peak Limiter"
    }
}
