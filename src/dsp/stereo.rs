//! Stereo widening ("3D" effect)
//!
//! The right channel is crossfaded toward a copy of itself that is delayed by
//! [`WIDEN_DELAY_MS`] and attenuated by up to [`MAX_GAIN_DIFF_DB`]; afterwards
//! the side (L-R) component is boosted. Both stages scale with `width`, so a
//! width of zero reproduces the input exactly. Mono input is first duplicated
//! to two channels.

use crate::engine::buffer::db_to_linear;
use crate::engine::PcmBuffer;
use crate::error::Result;

/// Inter-channel delay at full width
pub const WIDEN_DELAY_MS: f32 = 10.0;

/// Right-channel attenuation at full width
pub const MAX_GAIN_DIFF_DB: f32 = 3.0;

/// Side-signal boost at full width
pub const SIDE_BOOST: f32 = 0.3;

/// Widen the stereo image
///
/// Output is always stereo with the input's frame count.
pub fn stereo_widen(pcm: &PcmBuffer, width: f32) -> Result<PcmBuffer> {
    let sample_rate = pcm.sample_rate();
    let left = pcm.channel(0).to_vec();
    let right = if pcm.channel_count() > 1 {
        pcm.channel(1).to_vec()
    } else {
        left.clone()
    };

    if width == 0.0 {
        return PcmBuffer::stereo(left, right, sample_rate);
    }

    let delay = ((WIDEN_DELAY_MS * sample_rate as f32 / 1000.0).round() as usize).max(1);
    let gain = db_to_linear(-MAX_GAIN_DIFF_DB * width);

    // Decorrelate the right channel
    let shifted: Vec<f32> = (0..right.len())
        .map(|n| {
            let delayed = if n >= delay { right[n - delay] } else { 0.0 };
            (1.0 - width) * right[n] + width * gain * delayed
        })
        .collect();

    // Mid/side boost
    let boost = SIDE_BOOST * width;
    let (out_left, out_right): (Vec<f32>, Vec<f32>) = left
        .iter()
        .zip(&shifted)
        .map(|(&l, &r)| {
            let side = 0.5 * (l - r);
            (l + boost * side, r - boost * side)
        })
        .unzip();

    PcmBuffer::stereo(out_left, out_right, sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::buffer::generate_stereo_test_tone;

    /// Normalised correlation between the two channels
    fn channel_correlation(pcm: &PcmBuffer) -> f64 {
        let (l, r) = (pcm.channel(0), pcm.channel(1));
        let dot: f64 = l.iter().zip(r).map(|(&a, &b)| a as f64 * b as f64).sum();
        let el: f64 = l.iter().map(|&a| (a as f64).powi(2)).sum();
        let er: f64 = r.iter().map(|&b| (b as f64).powi(2)).sum();
        dot / (el.sqrt() * er.sqrt())
    }

    #[test]
    fn test_zero_width_is_identity() {
        let pcm = generate_stereo_test_tone(440.0, 660.0, 0.1, 44100).unwrap();
        assert_eq!(stereo_widen(&pcm, 0.0).unwrap(), pcm);
    }

    #[test]
    fn test_mono_is_duplicated() {
        let pcm = PcmBuffer::mono(vec![0.1, 0.2, 0.3], 44100).unwrap();
        let out = stereo_widen(&pcm, 0.0).unwrap();
        assert_eq!(out.channel_count(), 2);
        assert_eq!(out.channel(0), out.channel(1));
    }

    #[test]
    fn test_preserves_frame_count() {
        let pcm = generate_stereo_test_tone(220.0, 220.0, 0.3, 22050).unwrap();
        let out = stereo_widen(&pcm, 1.0).unwrap();
        assert_eq!(out.frame_count(), pcm.frame_count());
        assert_eq!(out.sample_rate(), 22050);
    }

    #[test]
    fn test_width_decorrelates_mono_source() {
        // Broadband-ish source so a 10 ms delay actually decorrelates
        let samples: Vec<f32> = (0..8000)
            .map(|i| {
                let t = i as f32 / 8000.0;
                (2.0 * std::f32::consts::PI * 97.0 * t).sin() * 0.4
                    + (2.0 * std::f32::consts::PI * 1234.0 * t * t).sin() * 0.4
            })
            .collect();
        let pcm = PcmBuffer::mono(samples, 8000).unwrap();

        let narrow = stereo_widen(&pcm, 0.0).unwrap();
        let wide = stereo_widen(&pcm, 1.0).unwrap();
        assert!((channel_correlation(&narrow) - 1.0).abs() < 1e-9);
        assert!(channel_correlation(&wide) < 0.95);
    }
}
