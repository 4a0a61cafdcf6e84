//! Peak normalisation
//!
//! Runs after every effect so outputs land at full scale.

use crate::engine::PcmBuffer;

/// Absolute peak every normalised buffer reaches
pub const TARGET_PEAK: f32 = 1.0;

/// Scale `pcm` so its largest absolute sample equals [`TARGET_PEAK`]
///
/// Silent buffers are left untouched. Returns the gain that was applied.
pub fn peak_normalize(pcm: &mut PcmBuffer) -> f32 {
    let peak = pcm.peak();
    if peak == 0.0 || !peak.is_finite() {
        return 1.0;
    }

    // Divide rather than multiply by the reciprocal so the peak sample
    // lands on exactly TARGET_PEAK.
    let divisor = peak / TARGET_PEAK;
    pcm.map_samples(|s| s / divisor);
    TARGET_PEAK / peak
}
