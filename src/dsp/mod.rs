//! Effect Engine
//!
//! Pure transformations `PcmBuffer -> PcmBuffer`. Every effect:
//! 1. validates its parameters before touching any samples
//! 2. runs the transformation
//! 3. rejects NaN/Inf output
//! 4. peak-normalises the result

pub mod effect;
pub mod eq;
pub mod normalize;
pub mod pan;
pub mod pitch;
pub mod reverb;
pub mod reverse;
pub mod stereo;
pub mod trim;

pub use effect::{
    EffectKind, EffectRequest, EightDParams, EqualizerParams, PitchShiftParams, ReverbParams,
    Stereo3dParams, TrimParams,
};
pub use normalize::peak_normalize;

use std::time::Instant;

use tracing::{debug, info};

use crate::engine::PcmBuffer;
use crate::error::{LabError, Result};

/// Apply one effect and peak-normalise the result
///
/// The input is never modified. Errors are returned before any processing
/// when the parameters (or the trim window) are invalid.
pub fn apply(request: &EffectRequest, pcm: &PcmBuffer) -> Result<PcmBuffer> {
    request.validate()?;
    let started = Instant::now();

    let mut output = match request {
        EffectRequest::Reverse => reverse::reverse(pcm)?,
        EffectRequest::PitchShift(p) => pitch::pitch_shift(pcm, p.semitones)?,
        EffectRequest::Reverb(p) => reverb::reverb(pcm, p.decay, p.delay_ms)?,
        EffectRequest::Stereo3d(p) => stereo::stereo_widen(pcm, p.width)?,
        EffectRequest::Trim(p) => trim::trim(pcm, p.start_s, p.end_s)?,
        EffectRequest::EightD(p) => pan::eight_d(pcm, p.pan_speed_hz, p.intensity, p.crossfeed)?,
        EffectRequest::Equalizer(p) => eq::equalize(pcm, p)?,
    };

    if !output.is_finite() {
        return Err(LabError::NonFiniteOutput {
            effect: request.kind().to_string(),
        });
    }

    let gain = peak_normalize(&mut output);
    debug!(effect = %request.kind(), gain, "normalised output");

    info!(
        effect = %request.kind(),
        in_frames = pcm.frame_count(),
        out_frames = output.frame_count(),
        channels = output.channel_count(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "effect applied"
    );

    Ok(output)
}
