//! Waveform envelope (min/max per bucket)

use serde::{Deserialize, Serialize};

use crate::engine::PcmBuffer;
use crate::error::{LabError, Result};

/// Extremes of one horizontal slice of the waveform
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WaveformBucket {
    pub min: f32,
    pub max: f32,
}

/// Reduce the mono mixdown of `pcm` to `target_points` min/max buckets
///
/// Buckets are contiguous and cover the whole clip. When the clip has fewer
/// frames than buckets, each bucket repeats its nearest sample; an empty clip
/// yields all-zero buckets.
pub fn waveform(pcm: &PcmBuffer, target_points: usize) -> Result<Vec<WaveformBucket>> {
    if target_points == 0 {
        return Err(LabError::invalid_param(
            "target_points",
            target_points,
            "at least 1",
        ));
    }

    let mono = pcm.mixdown();
    let n = mono.len();
    if n == 0 {
        return Ok(vec![WaveformBucket::default(); target_points]);
    }

    let buckets = (0..target_points)
        .map(|i| {
            let start = i * n / target_points;
            // start < n, so every bucket holds at least one sample
            let end = ((i + 1) * n / target_points).max(start + 1);
            let (min, max) = mono[start..end]
                .iter()
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &s| {
                    (lo.min(s), hi.max(s))
                });
            WaveformBucket { min, max }
        })
        .collect();

    Ok(buckets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_points_rejected() {
        let pcm = PcmBuffer::mono(vec![0.0; 10], 8000).unwrap();
        assert!(matches!(
            waveform(&pcm, 0),
            Err(LabError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_bucket_extremes() {
        let pcm = PcmBuffer::mono(vec![0.1, -0.5, 0.3, 0.9, -0.2, 0.0], 8000).unwrap();
        let buckets = waveform(&pcm, 2).unwrap();
        assert_eq!(
            buckets,
            vec![
                WaveformBucket { min: -0.5, max: 0.3 },
                WaveformBucket { min: -0.2, max: 0.9 },
            ]
        );
    }

    #[test]
    fn test_channels_are_averaged() {
        let pcm = PcmBuffer::stereo(vec![1.0, 1.0], vec![0.0, -1.0], 8000).unwrap();
        let buckets = waveform(&pcm, 1).unwrap();
        assert_eq!(buckets[0], WaveformBucket { min: 0.0, max: 0.5 });
    }

    #[test]
    fn test_short_clip_repeats_samples() {
        let pcm = PcmBuffer::mono(vec![0.25, -0.75], 8000).unwrap();
        let buckets = waveform(&pcm, 4).unwrap();
        assert_eq!(buckets.len(), 4);
        assert_eq!(buckets[0], WaveformBucket { min: 0.25, max: 0.25 });
        assert_eq!(buckets[1], WaveformBucket { min: 0.25, max: 0.25 });
        assert_eq!(buckets[2], WaveformBucket { min: -0.75, max: -0.75 });
        assert_eq!(buckets[3], WaveformBucket { min: -0.75, max: -0.75 });
    }

    #[test]
    fn test_empty_clip() {
        let pcm = PcmBuffer::mono(vec![], 8000).unwrap();
        let buckets = waveform(&pcm, 3).unwrap();
        assert_eq!(buckets, vec![WaveformBucket::default(); 3]);
    }

    #[test]
    fn test_deterministic() {
        let samples: Vec<f32> = (0..1000).map(|i| ((i * 37) % 101) as f32 / 101.0 - 0.5).collect();
        let pcm = PcmBuffer::mono(samples, 8000).unwrap();
        assert_eq!(waveform(&pcm, 17).unwrap(), waveform(&pcm, 17).unwrap());
    }
}
