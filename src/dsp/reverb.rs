//! Echo-train reverb
//!
//! The dry signal is summed with copies of itself delayed by `i * delay` and
//! attenuated by `decay^i`. Echoes are added while the attenuation stays at or
//! above [`ECHO_THRESHOLD`], up to [`MAX_ECHOES`]. The output is extended so
//! the last echo tail is never cut off, as long as that tail stays within
//! [`MAX_TAIL_SECS`].

use crate::engine::PcmBuffer;
use crate::error::{LabError, Result};

/// Echoes quieter than this (relative to the dry signal) are dropped
pub const ECHO_THRESHOLD: f32 = 1.0 / 1000.0;

/// Hard cap on the number of echoes
pub const MAX_ECHOES: usize = 64;

/// Longest echo tail appended to the input, in seconds
pub const MAX_TAIL_SECS: f64 = 300.0;

/// Number of echoes produced for a given decay
pub fn echo_count(decay: f32) -> usize {
    let mut count = 0;
    let mut gain = decay;
    while count < MAX_ECHOES && gain >= ECHO_THRESHOLD {
        count += 1;
        gain *= decay;
    }
    count
}

/// Delay between echoes in samples (at least one)
pub fn delay_samples(delay_ms: f32, sample_rate: u32) -> usize {
    ((delay_ms as f64 * sample_rate as f64 / 1000.0).round() as usize).max(1)
}

/// Apply the echo train to every channel
///
/// # Arguments
/// * `decay` - Attenuation per echo, in (0, 1)
/// * `delay_ms` - Spacing between echoes in milliseconds
///
/// # Errors
/// `OutputTooLong` if the echo tail would exceed [`MAX_TAIL_SECS`]; nothing
/// is allocated in that case.
pub fn reverb(pcm: &PcmBuffer, decay: f32, delay_ms: f32) -> Result<PcmBuffer> {
    let echoes = echo_count(decay);
    let tail_secs = echoes as f64 * delay_ms as f64 / 1000.0;
    if tail_secs > MAX_TAIL_SECS {
        return Err(LabError::OutputTooLong {
            effect: "reverb".to_string(),
            extra_secs: tail_secs,
            limit_secs: MAX_TAIL_SECS,
        });
    }

    let delay = delay_samples(delay_ms, pcm.sample_rate());
    let frames = pcm.frame_count();
    let out_len = frames + echoes * delay;

    tracing::debug!(echoes, delay, out_len, "reverb echo train");

    let channels = pcm
        .channels()
        .iter()
        .map(|dry| {
            let mut wet = vec![0.0_f32; out_len];
            wet[..frames].copy_from_slice(dry);

            let mut gain = 1.0_f32;
            for i in 1..=echoes {
                gain *= decay;
                let offset = i * delay;
                for (out, &s) in wet[offset..offset + frames].iter_mut().zip(dry) {
                    *out += s * gain;
                }
            }
            wet
        })
        .collect();

    PcmBuffer::new(channels, pcm.sample_rate())
}
