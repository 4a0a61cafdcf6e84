//! Short-time Fourier transform magnitude in dB

use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};

use crate::engine::PcmBuffer;
use crate::error::{LabError, Result};

/// Lowest level kept in the grid, relative to the loudest bin
pub const DB_FLOOR: f32 = -80.0;

/// Smallest accepted analysis window
pub const MIN_WINDOW_SIZE: usize = 16;

/// Magnitude grid: one row per frequency bin, one column per time step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spectrogram {
    /// Number of frequency bins (`window_size / 2 + 1`)
    pub bins: usize,
    /// Number of time steps (`ceil(frame_count / hop_size)`)
    pub frames: usize,
    pub sample_rate: u32,
    pub window_size: usize,
    pub hop_size: usize,
    /// Row-major dB values, `bins * frames` long, in `[DB_FLOOR, 0]`
    pub db: Vec<f32>,
}

impl Spectrogram {
    /// dB value at `(bin, frame)`
    #[inline]
    pub fn get(&self, bin: usize, frame: usize) -> Option<f32> {
        if bin < self.bins && frame < self.frames {
            Some(self.db[bin * self.frames + frame])
        } else {
            None
        }
    }

    /// Centre frequency of a bin in Hz
    pub fn bin_frequency(&self, bin: usize) -> f32 {
        bin as f32 * self.sample_rate as f32 / self.window_size as f32
    }

    /// Bin with the most energy in a column
    pub fn peak_bin(&self, frame: usize) -> Option<usize> {
        (0..self.bins)
            .filter_map(|bin| self.get(bin, frame).map(|db| (bin, db)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(bin, _)| bin)
    }
}

/// Periodic Hann window
fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|n| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * n as f32 / size as f32).cos())
        .collect()
}

/// Compute the dB spectrogram of the mono mixdown
///
/// # Arguments
/// * `window_size` - FFT length, a power of two >= 16
/// * `hop_size` - Step between frames, `0 < hop_size <= window_size`
pub fn spectrogram(pcm: &PcmBuffer, window_size: usize, hop_size: usize) -> Result<Spectrogram> {
    if window_size < MIN_WINDOW_SIZE || !window_size.is_power_of_two() {
        return Err(LabError::invalid_param(
            "window_size",
            window_size,
            "a power of two of at least 16",
        ));
    }
    if hop_size == 0 || hop_size > window_size {
        return Err(LabError::invalid_param(
            "hop_size",
            hop_size,
            "greater than 0 and at most window_size",
        ));
    }

    let mono = pcm.mixdown();
    let bins = window_size / 2 + 1;
    let frames = mono.len().div_ceil(hop_size);
    let window = hann_window(window_size);

    let mut planner = FftPlanner::<f32>::new();
    let fft = planner.plan_fft_forward(window_size);
    let mut scratch: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); window_size];

    // Magnitudes, row-major by bin
    let mut magnitudes = vec![0.0_f32; bins * frames];
    for frame in 0..frames {
        let start = frame * hop_size;
        for (n, slot) in scratch.iter_mut().enumerate() {
            let s = mono.get(start + n).copied().unwrap_or(0.0);
            *slot = Complex::new(s * window[n], 0.0);
        }
        fft.process(&mut scratch);
        for (bin, value) in scratch.iter().take(bins).enumerate() {
            magnitudes[bin * frames + frame] = value.norm();
        }
    }

    let reference = magnitudes.iter().copied().fold(0.0_f32, f32::max);
    let db = magnitudes
        .iter()
        .map(|&m| {
            if reference > 0.0 && m > 0.0 {
                (20.0 * (m / reference).log10()).max(DB_FLOOR)
            } else {
                DB_FLOOR
            }
        })
        .collect();

    Ok(Spectrogram {
        bins,
        frames,
        sample_rate: pcm.sample_rate(),
        window_size,
        hop_size,
        db,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::buffer::generate_test_tone;

    #[test]
    fn test_grid_shape() {
        let pcm = PcmBuffer::mono(vec![0.1; 1000], 8000).unwrap();
        let grid = spectrogram(&pcm, 256, 100).unwrap();
        assert_eq!(grid.bins, 129);
        assert_eq!(grid.frames, 10);
        assert_eq!(grid.db.len(), 129 * 10);

        let grid = spectrogram(&pcm, 256, 128).unwrap();
        assert_eq!(grid.frames, 8);
    }

    #[test]
    fn test_rejects_bad_window() {
        let pcm = PcmBuffer::mono(vec![0.0; 100], 8000).unwrap();
        assert!(spectrogram(&pcm, 100, 50).is_err());
        assert!(spectrogram(&pcm, 8, 4).is_err());
        assert!(spectrogram(&pcm, 64, 0).is_err());
        assert!(spectrogram(&pcm, 64, 65).is_err());
    }

    #[test]
    fn test_values_within_range() {
        let pcm = generate_test_tone(1000.0, 0.5, 0.25, 8000).unwrap();
        let grid = spectrogram(&pcm, 512, 128).unwrap();
        assert!(grid.db.iter().all(|&v| (DB_FLOOR..=0.0).contains(&v)));
        assert!(grid.db.iter().any(|&v| v == 0.0));
    }

    #[test]
    fn test_tone_peaks_at_its_bin() {
        // 1 kHz at 8 kHz with a 512-point FFT: bin spacing 15.625 Hz, bin 64
        let pcm = generate_test_tone(1000.0, 0.5, 0.5, 8000).unwrap();
        let grid = spectrogram(&pcm, 512, 256).unwrap();
        assert_eq!(grid.peak_bin(2), Some(64));
        assert!((grid.bin_frequency(64) - 1000.0).abs() < 1e-3);
    }

    #[test]
    fn test_silence_is_floor() {
        let pcm = PcmBuffer::mono(vec![0.0; 600], 8000).unwrap();
        let grid = spectrogram(&pcm, 128, 64).unwrap();
        assert!(grid.db.iter().all(|&v| v == DB_FLOOR));
    }

    #[test]
    fn test_get_out_of_bounds() {
        let pcm = PcmBuffer::mono(vec![0.1; 64], 8000).unwrap();
        let grid = spectrogram(&pcm, 32, 32).unwrap();
        assert!(grid.get(17, 0).is_none());
        assert!(grid.get(0, 2).is_none());
        assert!(grid.get(16, 1).is_some());
    }
}
