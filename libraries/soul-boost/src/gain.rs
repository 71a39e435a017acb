//! Boost level to post-gain mapping
//!
//! The user-facing boost level is a loudness multiplier: 1.0 is unity and
//! 2.0 is "200%". The limiter's post-gain stage works in decibels, so the
//! level is mapped linearly onto a makeup gain above unity.
//!
//! ```
//! use soul_boost::GainMapper;
//!
//! let mapper = GainMapper::default();
//! assert_eq!(mapper.gain_db(1.0), 0.0);
//! assert_eq!(mapper.gain_db(1.5), 7.5);
//! assert_eq!(mapper.gain_db(2.0), 15.0);
//! ```

/// Boost level that leaves the signal untouched
pub const UNITY_BOOST_LEVEL: f32 = 1.0;

/// Highest boost level exposed to users (200%)
pub const MAX_BOOST_LEVEL: f32 = 2.0;

/// Default makeup gain per unit of boost above unity (dB)
pub const DEFAULT_BOOST_SCALE_DB: f32 = 15.0;

/// Ceiling on the mapped post-gain (dB)
///
/// Far above anything the UI can request, but keeps huge levels finite.
pub const MAX_POST_GAIN_DB: f32 = 48.0;

/// Maps a boost level to the limiter's post-gain in dB
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GainMapper {
    scale_db: f32,
}

impl GainMapper {
    /// Create a mapper with a custom dB-per-unit scale
    ///
    /// Negative or non-finite scales fall back to the default, so the mapping
    /// stays non-decreasing.
    pub fn new(scale_db: f32) -> Self {
        let scale_db = if scale_db.is_finite() && scale_db >= 0.0 {
            scale_db
        } else {
            DEFAULT_BOOST_SCALE_DB
        };
        Self { scale_db }
    }

    /// dB of makeup gain per unit of boost
    pub fn scale_db(&self) -> f32 {
        self.scale_db
    }

    /// Post-gain in dB for a boost level
    ///
    /// Total over all inputs and always finite: levels at or below unity and
    /// NaN map to 0 dB. Levels above [`MAX_BOOST_LEVEL`] keep following the
    /// same line up to [`MAX_POST_GAIN_DB`].
    #[inline]
    pub fn gain_db(&self, level: f32) -> f32 {
        if level.is_nan() || level <= UNITY_BOOST_LEVEL || self.scale_db == 0.0 {
            return 0.0;
        }
        ((level - UNITY_BOOST_LEVEL) * self.scale_db).min(MAX_POST_GAIN_DB)
    }
}

impl Default for GainMapper {
    fn default() -> Self {
        Self::new(DEFAULT_BOOST_SCALE_DB)
    }
}

/// Post-gain in dB for a boost level using the default scale
pub fn boost_to_gain_db(level: f32) -> f32 {
    GainMapper::default().gain_db(level)
}

/// Convert dB to linear gain
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to dB, floored at `floor_db` for silence
#[inline]
pub fn linear_to_db(linear: f32, floor_db: f32) -> f32 {
    if linear > 1e-10 {
        (20.0 * linear.log10()).max(floor_db)
    } else {
        floor_db
    }
}
