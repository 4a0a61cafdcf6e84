//! Seven-band graphic equalizer
//!
//! One constant-Q peaking biquad per band, run in series. Band centres are
//! fixed; only the gains are adjustable.

use std::f64::consts::PI;

use super::effect::EqualizerParams;
use crate::engine::PcmBuffer;
use crate::error::Result;

/// Band centre frequencies in Hz, lowest band first
pub const BAND_FREQUENCIES: [f64; 7] = [60.0, 170.0, 500.0, 1000.0, 3000.0, 6000.0, 12000.0];

/// Q shared by all bands
pub const BAND_Q: f64 = 1.4;

/// Gains smaller than this (in dB) leave the band bypassed
const BYPASS_GAIN_DB: f32 = 0.01;

/// Biquad filter coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (a0 + a1*z^-1 + a2*z^-2)
/// Normalized: all coefficients divided by a0
#[derive(Debug, Clone, Copy, Default)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}

impl BiquadCoeffs {
    /// Peaking EQ coefficients (Audio EQ Cookbook)
    /// Reference: https://www.w3.org/2011/audio/audio-eq-cookbook.html
    fn peaking(sample_rate: f64, frequency: f64, gain_db: f64, q: f64) -> Self {
        let w0 = 2.0 * PI * frequency / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);
        let a = 10.0_f64.powf(gain_db / 40.0);

        let a0 = 1.0 + alpha / a;
        BiquadCoeffs {
            b0: (1.0 + alpha * a) / a0,
            b1: (-2.0 * cos_w0) / a0,
            b2: (1.0 - alpha * a) / a0,
            a1: (-2.0 * cos_w0) / a0,
            a2: (1.0 - alpha / a) / a0,
        }
    }
}

/// Biquad filter state for one channel
#[derive(Debug, Clone, Copy, Default)]
struct BiquadState {
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl BiquadState {
    /// Direct Form I
    fn process(&mut self, input: f64, c: &BiquadCoeffs) -> f64 {
        let output = c.b0 * input + c.b1 * self.x1 + c.b2 * self.x2
            - c.a1 * self.y1
            - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = input;
        self.y2 = self.y1;
        self.y1 = output;

        output
    }
}

/// Coefficients for every active band at this sample rate
///
/// Bands at or above Nyquist are skipped, as are near-zero gains.
fn active_bands(params: &EqualizerParams, sample_rate: u32) -> Vec<BiquadCoeffs> {
    let sample_rate = sample_rate as f64;
    let nyquist = sample_rate / 2.0;

    params
        .gains()
        .iter()
        .zip(BAND_FREQUENCIES)
        .filter(|((_, gain), freq)| gain.abs() >= BYPASS_GAIN_DB && *freq < nyquist)
        .map(|((_, gain), freq)| BiquadCoeffs::peaking(sample_rate, freq, *gain as f64, BAND_Q))
        .collect()
}

/// Apply the equalizer to every channel
pub fn equalize(pcm: &PcmBuffer, params: &EqualizerParams) -> Result<PcmBuffer> {
    let bands = active_bands(params, pcm.sample_rate());
    if bands.is_empty() {
        return Ok(pcm.clone());
    }

    let channels = pcm
        .channels()
        .iter()
        .map(|channel| {
            let mut states = vec![BiquadState::default(); bands.len()];
            channel
                .iter()
                .map(|&s| {
                    let mut x = s as f64;
                    for (state, coeffs) in states.iter_mut().zip(&bands) {
                        x = state.process(x, coeffs);
                    }
                    x as f32
                })
                .collect()
        })
        .collect();

    PcmBuffer::new(channels, pcm.sample_rate())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::buffer::generate_test_tone;

    /// RMS over the second half, past the filter's settling time
    fn settled_rms(pcm: &PcmBuffer) -> f64 {
        let ch = pcm.channel(0);
        let tail = &ch[ch.len() / 2..];
        (tail.iter().map(|&s| (s as f64).powi(2)).sum::<f64>() / tail.len() as f64).sqrt()
    }

    #[test]
    fn test_flat_eq_is_bypass() {
        let pcm = generate_test_tone(1000.0, 0.5, 0.1, 44100).unwrap();
        let out = equalize(&pcm, &EqualizerParams::default()).unwrap();
        assert_eq!(out, pcm);
    }

    #[test]
    fn test_boost_at_band_centre() {
        let pcm = generate_test_tone(1000.0, 0.25, 0.5, 44100).unwrap();
        let params = EqualizerParams {
            mid: 12.0,
            ..Default::default()
        };
        let out = equalize(&pcm, &params).unwrap();

        let gain_db = 20.0 * (settled_rms(&out) / settled_rms(&pcm)).log10();
        assert!((gain_db - 12.0).abs() < 0.5, "gain was {} dB", gain_db);
    }

    #[test]
    fn test_cut_leaves_distant_band_alone() {
        let pcm = generate_test_tone(6000.0, 0.5, 0.5, 44100).unwrap();
        let params = EqualizerParams {
            sub_bass: -12.0,
            ..Default::default()
        };
        let out = equalize(&pcm, &params).unwrap();

        let gain_db = 20.0 * (settled_rms(&out) / settled_rms(&pcm)).log10();
        assert!(gain_db.abs() < 0.2, "gain was {} dB", gain_db);
    }

    #[test]
    fn test_bands_above_nyquist_skipped() {
        let params = EqualizerParams {
            brilliance: 6.0,
            ..Default::default()
        };
        // 12 kHz is above Nyquist at 16 kHz
        assert!(active_bands(&params, 16000).is_empty());
        assert_eq!(active_bands(&params, 44100).len(), 1);
    }
}
