//! In-place processing interface for session effects
//!
//! A session's buffers are interleaved frames of `channel_count` samples
//! (`[L, R, L, R, ...]` for stereo, one sample per frame for mono). The
//! frame layout comes from the effect's own configuration, not the buffer.

/// Effect run by [`EffectOutput`](crate::EffectOutput) on the audio thread
///
/// `process` is called once per buffer with no locks held, so it must not
/// allocate or block. The effect is moved to the audio thread on attach,
/// hence `Send`.
pub trait AudioEffect: Send {
    /// Process one interleaved buffer in place
    ///
    /// A trailing partial frame is left untouched. A change in `sample_rate`
    /// between calls recomputes the envelope coefficients.
    fn process(&mut self, buffer: &mut [f32], sample_rate: u32);

    /// Drop envelope state, e.g. after a seek
    fn reset(&mut self);

    /// Toggle bypass; disabling relaxes to unity instead of cutting off
    fn set_enabled(&mut self, enabled: bool);

    fn is_enabled(&self) -> bool;

    /// Human-readable effect name
    fn name(&self) -> &str;
}
