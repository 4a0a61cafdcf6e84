//! 8D auto-pan
//!
//! The mono mix is swept between the speakers by a slow sinusoidal LFO with
//! equal-power gains, then a little of each channel is fed into the other so
//! the movement doesn't sound like a hard left/right switch. Crossfeed runs
//! left first: the right channel picks up the already crossfed left.

use std::f64::consts::PI;

use crate::engine::PcmBuffer;
use crate::error::Result;

/// Rotate the source around the listener
///
/// # Arguments
/// * `pan_speed_hz` - Full left-right-left cycles per second
/// * `intensity` - How far the pan swings from centre (0.1 to 1)
/// * `crossfeed` - Fraction of each channel mixed into the other (0 to 0.6)
pub fn eight_d(
    pcm: &PcmBuffer,
    pan_speed_hz: f32,
    intensity: f32,
    crossfeed: f32,
) -> Result<PcmBuffer> {
    let mono = pcm.mixdown();
    let sample_rate = pcm.sample_rate() as f64;
    let omega = 2.0 * PI * pan_speed_hz as f64 / sample_rate;
    let intensity = intensity as f64;
    let crossfeed = crossfeed as f64;

    let (left, right): (Vec<f32>, Vec<f32>) = mono
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            // 0 = hard left, 1 = hard right
            let pan = 0.5 + 0.5 * intensity * (omega * i as f64).sin();
            let l = s as f64 * (1.0 - pan).sqrt();
            let r = s as f64 * pan.sqrt();

            let l_out = l * (1.0 - crossfeed) + r * crossfeed;
            let r_out = r * (1.0 - crossfeed) + l_out * crossfeed;
            (l_out as f32, r_out as f32)
        })
        .unzip();

    PcmBuffer::stereo(left, right, pcm.sample_rate())
}
