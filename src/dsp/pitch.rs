//! Duration-preserving pitch shift
//!
//! Two stages per channel:
//! 1. WSOLA time-stretch by the pitch ratio `2^(semitones/12)`
//! 2. Linear-interpolation resample back to the original frame count
//!
//! Stretching by `r` and then reading the result `r` times faster raises the
//! pitch by `r` while the duration comes out unchanged.

use std::f64::consts::PI;

use crate::engine::PcmBuffer;
use crate::error::Result;

/// Analysis/synthesis frame length in samples
const FRAME_SIZE: usize = 1024;

/// Synthesis hop (75% overlap)
const SYNTHESIS_HOP: usize = FRAME_SIZE / 4;

/// How far (in samples) the analysis position may move to find the best
/// waveform match
const SEARCH_TOLERANCE: usize = SYNTHESIS_HOP / 2;

/// Samples compared when scoring a candidate position
const MATCH_LENGTH: usize = FRAME_SIZE - SYNTHESIS_HOP;

/// Only every n-th sample enters the similarity score
const MATCH_DECIMATION: usize = 4;

/// Pitch ratio for a shift in semitones
#[inline]
pub fn semitone_ratio(semitones: f32) -> f64 {
    2.0_f64.powf(semitones as f64 / 12.0)
}

/// Shift pitch by `semitones` keeping the frame count
///
/// Zero semitones returns the input unchanged.
pub fn pitch_shift(pcm: &PcmBuffer, semitones: f32) -> Result<PcmBuffer> {
    if semitones == 0.0 || pcm.is_empty() {
        return Ok(pcm.clone());
    }

    let ratio = semitone_ratio(semitones);
    let frames = pcm.frame_count();
    let window = hann_window(FRAME_SIZE);

    let channels = pcm
        .channels()
        .iter()
        .map(|channel| {
            let stretched = time_stretch(channel, ratio, &window);
            resample_linear(&stretched, frames)
        })
        .collect();

    PcmBuffer::new(channels, pcm.sample_rate())
}

/// Periodic Hann window offset by half a sample so no coefficient is zero
fn hann_window(size: usize) -> Vec<f64> {
    (0..size)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * (n as f64 + 0.5) / size as f64).cos())
        .collect()
}

/// Waveform-similarity overlap-add time stretch
///
/// Output length is `round(len * ratio)`. Frames are laid down every
/// `SYNTHESIS_HOP` samples; each is read from near `k * SYNTHESIS_HOP / ratio`
/// in the input, nudged to the position that best continues the previously
/// copied frame.
fn time_stretch(input: &[f32], ratio: f64, window: &[f64]) -> Vec<f32> {
    let out_len = ((input.len() as f64) * ratio).round().max(1.0) as usize;
    let last = input.len() - 1;
    let sample = |i: usize| input[i.min(last)] as f64;

    let analysis_hop = SYNTHESIS_HOP as f64 / ratio;
    let mut output = vec![0.0_f64; out_len];
    let mut weight = vec![0.0_f64; out_len];
    let mut previous: Option<usize> = None;

    let mut k = 0;
    loop {
        let synthesis_pos = k * SYNTHESIS_HOP;
        if synthesis_pos >= out_len {
            break;
        }

        let nominal = (k as f64 * analysis_hop).round() as usize;
        let analysis_pos = match previous {
            Some(prev) => best_match(input, nominal, prev + SYNTHESIS_HOP),
            None => nominal,
        };

        for (n, &w) in window.iter().enumerate() {
            let o = synthesis_pos + n;
            if o >= out_len {
                break;
            }
            output[o] += w * sample(analysis_pos + n);
            weight[o] += w;
        }

        previous = Some(analysis_pos);
        k += 1;
    }

    output
        .iter()
        .zip(&weight)
        .map(|(&y, &w)| if w > 1e-9 { (y / w) as f32 } else { 0.0 })
        .collect()
}

/// Pick the analysis position within the search tolerance of `nominal`
/// whose waveform best matches the natural continuation at `target`
fn best_match(input: &[f32], nominal: usize, target: usize) -> usize {
    let last = input.len() - 1;
    let sample = |i: usize| input[i.min(last)] as f64;

    let score = |candidate: usize| -> f64 {
        let mut dot = 0.0;
        let mut energy = 0.0;
        for m in (0..MATCH_LENGTH).step_by(MATCH_DECIMATION) {
            let c = sample(candidate + m);
            dot += c * sample(target + m);
            energy += c * c;
        }
        if energy > 1e-12 {
            dot / energy.sqrt()
        } else {
            0.0
        }
    };

    let lo = nominal.saturating_sub(SEARCH_TOLERANCE);
    let hi = nominal + SEARCH_TOLERANCE;

    let mut best = nominal;
    let mut best_score = score(nominal);
    for candidate in lo..=hi {
        let s = score(candidate);
        if s > best_score + 1e-9 {
            best = candidate;
            best_score = s;
        }
    }
    best
}

/// Resample `input` to exactly `out_len` samples by linear interpolation
fn resample_linear(input: &[f32], out_len: usize) -> Vec<f32> {
    if input.is_empty() {
        return vec![0.0; out_len];
    }
    let last = input.len() - 1;
    let step = input.len() as f64 / out_len as f64;

    (0..out_len)
        .map(|j| {
            let pos = j as f64 * step;
            let i = (pos.floor() as usize).min(last);
            let frac = (pos - i as f64).clamp(0.0, 1.0) as f32;
            let a = input[i];
            let b = input[(i + 1).min(last)];
            a + (b - a) * frac
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::buffer::generate_test_tone;

    /// Count rising zero crossings, a cheap frequency estimate
    fn rising_crossings(samples: &[f32]) -> usize {
        samples
            .windows(2)
            .filter(|w| w[0] <= 0.0 && w[1] > 0.0)
            .count()
    }

    #[test]
    fn test_semitone_ratio() {
        assert!((semitone_ratio(12.0) - 2.0).abs() < 1e-12);
        assert!((semitone_ratio(-12.0) - 0.5).abs() < 1e-12);
        assert!((semitone_ratio(0.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_shift_is_identity() {
        let pcm = generate_test_tone(440.0, 0.5, 0.25, 44100).unwrap();
        assert_eq!(pitch_shift(&pcm, 0.0).unwrap(), pcm);
    }

    #[test]
    fn test_preserves_frame_count_and_layout() {
        let left = generate_test_tone(220.0, 0.5, 0.5, 22050).unwrap().into_channels();
        let right = generate_test_tone(330.0, 0.5, 0.5, 22050).unwrap().into_channels();
        let pcm = PcmBuffer::new(vec![left[0].clone(), right[0].clone()], 22050).unwrap();

        for semitones in [-12.0, -3.5, 5.0, 12.0] {
            let out = pitch_shift(&pcm, semitones).unwrap();
            assert_eq!(out.frame_count(), pcm.frame_count());
            assert_eq!(out.channel_count(), 2);
            assert!(out.is_finite());
        }
    }

    #[test]
    fn test_octave_up_doubles_frequency() {
        let pcm = generate_test_tone(200.0, 0.8, 1.0, 16000).unwrap();
        let out = pitch_shift(&pcm, 12.0).unwrap();

        let before = rising_crossings(pcm.channel(0)) as f64;
        let after = rising_crossings(out.channel(0)) as f64;
        let ratio = after / before;
        assert!(
            (1.8..=2.2).contains(&ratio),
            "expected ~2x crossings, got {} -> {}",
            before,
            after
        );
    }

    #[test]
    fn test_octave_down_halves_frequency() {
        let pcm = generate_test_tone(400.0, 0.8, 1.0, 16000).unwrap();
        let out = pitch_shift(&pcm, -12.0).unwrap();

        let before = rising_crossings(pcm.channel(0)) as f64;
        let after = rising_crossings(out.channel(0)) as f64;
        let ratio = after / before;
        assert!(
            (0.4..=0.6).contains(&ratio),
            "expected ~0.5x crossings, got {} -> {}",
            before,
            after
        );
    }

    #[test]
    fn test_resample_linear_endpoints() {
        let out = resample_linear(&[0.0, 1.0, 2.0, 3.0], 2);
        assert_eq!(out, vec![0.0, 2.0]);
        assert_eq!(resample_linear(&[], 3), vec![0.0; 3]);
    }

    #[test]
    fn test_short_input() {
        let pcm = PcmBuffer::mono(vec![0.5, -0.5, 0.25], 44100).unwrap();
        let out = pitch_shift(&pcm, 7.0).unwrap();
        assert_eq!(out.frame_count(), 3);
    }
}
