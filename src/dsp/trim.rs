//! Trim to a time window

use crate::engine::PcmBuffer;
use crate::error::{LabError, Result};

/// Resolve a `[start_s, end_s)` window to frame indices
///
/// `end_s = None` means the end of the clip. The end may overshoot the
/// duration by at most half a frame (rounding slack for "trim to the end").
pub fn trim_frames(pcm: &PcmBuffer, start_s: f64, end_s: Option<f64>) -> Result<(usize, usize)> {
    let duration = pcm.duration_secs();
    let sample_rate = pcm.sample_rate() as f64;
    let end_s = end_s.unwrap_or(duration);
    let slack = 0.5 / sample_rate;

    if !start_s.is_finite() || start_s < 0.0 {
        return Err(LabError::InvalidTrimWindow {
            reason: format!("start ({}) must be >= 0", start_s),
        });
    }
    if !end_s.is_finite() || end_s <= start_s {
        return Err(LabError::InvalidTrimWindow {
            reason: format!(
                "start ({:.3}s) must be less than end ({:.3}s)",
                start_s, end_s
            ),
        });
    }
    if start_s >= duration {
        return Err(LabError::InvalidTrimWindow {
            reason: format!(
                "start ({:.3}s) exceeds audio duration ({:.3}s)",
                start_s, duration
            ),
        });
    }
    if end_s > duration + slack {
        return Err(LabError::InvalidTrimWindow {
            reason: format!(
                "end ({:.3}s) exceeds audio duration ({:.3}s)",
                end_s, duration
            ),
        });
    }

    let start = (start_s * sample_rate).round() as usize;
    let end = ((end_s * sample_rate).round() as usize).min(pcm.frame_count());
    if end <= start {
        return Err(LabError::InvalidTrimWindow {
            reason: "window is shorter than one sample".to_string(),
        });
    }
    Ok((start, end))
}

/// Keep only the frames inside the window
pub fn trim(pcm: &PcmBuffer, start_s: f64, end_s: Option<f64>) -> Result<PcmBuffer> {
    let (start, end) = trim_frames(pcm, start_s, end_s)?;
    let channels = pcm
        .channels()
        .iter()
        .map(|ch| ch[start..end].to_vec())
        .collect();
    PcmBuffer::new(channels, pcm.sample_rate())
}
