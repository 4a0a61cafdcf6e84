//! PCM Buffer
//!
//! The in-memory representation every effect and visualisation operates on.
//! Samples are stored non-interleaved as 32-bit floats, one `Vec<f32>` per
//! channel.

use crate::error::{LabError, Result};

// ============================================================================
// Constants
// ============================================================================

/// Maximum supported channel count (stereo)
pub const MAX_CHANNELS: usize = 2;

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert decibels to linear amplitude
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Convert linear amplitude to decibels
///
/// Returns -f32::INFINITY for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

// ============================================================================
// Channel Layout
// ============================================================================

/// Audio channel configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChannelLayout {
    /// Single channel (mono)
    #[default]
    Mono,
    /// Two channels (stereo: left, right)
    Stereo,
}

impl ChannelLayout {
    /// Returns the number of channels for this layout
    pub fn num_channels(&self) -> usize {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
        }
    }

    /// Create a ChannelLayout from a channel count
    pub fn from_count(count: usize) -> Option<Self> {
        match count {
            1 => Some(ChannelLayout::Mono),
            2 => Some(ChannelLayout::Stereo),
            _ => None,
        }
    }
}

// ============================================================================
// PCM Buffer
// ============================================================================

/// Decoded audio: one sample sequence per channel, all of equal length
///
/// The constructors enforce the buffer invariants: one or two channels,
/// identical frame counts, positive sample rate. Fields are private so a
/// `PcmBuffer` can never be observed in a ragged state.
///
/// # Example
/// ```
/// use audiolab::engine::buffer::{ChannelLayout, PcmBuffer};
///
/// // One second of stereo silence at 44.1 kHz
/// let buffer = PcmBuffer::silence(44_100, ChannelLayout::Stereo, 44_100).unwrap();
/// assert_eq!(buffer.channel_count(), 2);
/// assert_eq!(buffer.frame_count(), 44_100);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PcmBuffer {
    /// Sample data: outer Vec is channels, inner Vec is frames
    samples: Vec<Vec<f32>>,
    /// Sample rate in Hz
    sample_rate: u32,
}

impl PcmBuffer {
    /// Create a buffer from per-channel sample vectors
    ///
    /// # Errors
    /// `InvalidBuffer` if there are zero or more than two channels, the
    /// channels differ in length, or the sample rate is zero.
    pub fn new(samples: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        if samples.is_empty() || samples.len() > MAX_CHANNELS {
            return Err(LabError::InvalidBuffer {
                reason: format!(
                    "{} channels (only mono/stereo supported)",
                    samples.len()
                ),
            });
        }
        if sample_rate == 0 {
            return Err(LabError::InvalidBuffer {
                reason: "sample rate must be positive".to_string(),
            });
        }
        let frames = samples[0].len();
        if samples.iter().any(|ch| ch.len() != frames) {
            return Err(LabError::InvalidBuffer {
                reason: "channels have different frame counts".to_string(),
            });
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Create a mono buffer
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(vec![samples], sample_rate)
    }

    /// Create a stereo buffer
    pub fn stereo(left: Vec<f32>, right: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::new(vec![left, right], sample_rate)
    }

    /// Create a zero-filled buffer
    pub fn silence(frames: usize, layout: ChannelLayout, sample_rate: u32) -> Result<Self> {
        Self::new(vec![vec![0.0; frames]; layout.num_channels()], sample_rate)
    }

    /// Create a buffer from interleaved sample data (L, R, L, R, ...)
    pub fn from_interleaved(interleaved: &[f32], channels: usize, sample_rate: u32) -> Result<Self> {
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(LabError::InvalidBuffer {
                reason: format!("{} channels (only mono/stereo supported)", channels),
            });
        }
        if interleaved.len() % channels != 0 {
            return Err(LabError::InvalidBuffer {
                reason: format!(
                    "Interleaved data length {} is not divisible by channel count {}",
                    interleaved.len(),
                    channels
                ),
            });
        }

        let frames = interleaved.len() / channels;
        let mut samples = vec![Vec::with_capacity(frames); channels];
        for frame in interleaved.chunks_exact(channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                samples[ch].push(sample);
            }
        }

        Self::new(samples, sample_rate)
    }

    /// Convert the buffer to interleaved format
    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut interleaved = Vec::with_capacity(self.channel_count() * self.frame_count());
        for frame in 0..self.frame_count() {
            for channel in &self.samples {
                interleaved.push(channel[frame]);
            }
        }
        interleaved
    }

    /// Number of channels (1 or 2)
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.samples.len()
    }

    /// Number of samples per channel
    #[inline]
    pub fn frame_count(&self) -> usize {
        self.samples.first().map(|ch| ch.len()).unwrap_or(0)
    }

    /// Sample rate in Hz
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Check if the buffer holds no frames
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frame_count() == 0
    }

    /// Duration in seconds
    #[inline]
    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Channel layout of this buffer
    pub fn layout(&self) -> ChannelLayout {
        if self.channel_count() == 1 {
            ChannelLayout::Mono
        } else {
            ChannelLayout::Stereo
        }
    }

    /// Immutable access to a channel's samples
    ///
    /// # Panics
    /// Panics if the channel index is out of bounds
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.samples[index]
    }

    /// All channels
    #[inline]
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.samples
    }

    /// Consume the buffer, returning its channels
    pub fn into_channels(self) -> Vec<Vec<f32>> {
        self.samples
    }

    /// Get a sample at the specified channel and frame
    #[inline]
    pub fn get_sample(&self, channel: usize, frame: usize) -> Option<f32> {
        self.samples
            .get(channel)
            .and_then(|ch| ch.get(frame).copied())
    }

    /// Largest absolute sample value across all channels
    pub fn peak(&self) -> f32 {
        self.samples
            .iter()
            .flat_map(|channel| channel.iter())
            .map(|&s| s.abs())
            .fold(0.0_f32, f32::max)
    }

    /// Peak level in dB. Returns -f32::INFINITY for silent buffers.
    pub fn peak_db(&self) -> f32 {
        linear_to_db(self.peak())
    }

    /// Sum of squared samples across all channels
    pub fn energy(&self) -> f64 {
        self.samples
            .iter()
            .flat_map(|channel| channel.iter())
            .map(|&s| (s as f64) * (s as f64))
            .sum()
    }

    /// True when every sample is exactly zero
    pub fn is_silent(&self) -> bool {
        self.peak() == 0.0
    }

    /// Check if all samples are finite (not NaN or Infinity)
    pub fn is_finite(&self) -> bool {
        self.samples
            .iter()
            .flat_map(|ch| ch.iter())
            .all(|s| s.is_finite())
    }

    /// Clamp all samples to the valid range [-1.0, 1.0]
    pub fn clamp(&mut self) {
        for channel in &mut self.samples {
            for sample in channel.iter_mut() {
                *sample = sample.clamp(-1.0, 1.0);
            }
        }
    }

    /// Apply `f` to every sample in place
    pub fn map_samples(&mut self, mut f: impl FnMut(f32) -> f32) {
        for channel in &mut self.samples {
            for sample in channel.iter_mut() {
                *sample = f(*sample);
            }
        }
    }

    /// Average of all channels, frame by frame
    pub fn mixdown(&self) -> Vec<f32> {
        if self.channel_count() == 1 {
            return self.samples[0].clone();
        }
        let scale = 1.0 / self.channel_count() as f32;
        (0..self.frame_count())
            .map(|i| self.samples.iter().map(|ch| ch[i]).sum::<f32>() * scale)
            .collect()
    }

    /// Approximate in-memory size of the sample data in bytes
    pub fn size_bytes(&self) -> usize {
        self.channel_count() * self.frame_count() * std::mem::size_of::<f32>()
    }
}

// ============================================================================
// Test Signals
// ============================================================================

/// Generate a mono sine tone
///
/// # Arguments
/// * `frequency` - Frequency of the sine wave in Hz
/// * `amplitude` - Peak amplitude (0.0 to 1.0)
/// * `duration_secs` - Duration of the tone in seconds
/// * `sample_rate` - Sample rate in Hz (must be positive)
pub fn generate_test_tone(
    frequency: f32,
    amplitude: f32,
    duration_secs: f32,
    sample_rate: u32,
) -> Result<PcmBuffer> {
    let num_samples = (duration_secs * sample_rate as f32).round() as usize;
    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;
    let samples = (0..num_samples)
        .map(|i| amplitude * (angular_freq * i as f32).sin())
        .collect();
    PcmBuffer::mono(samples, sample_rate)
}

/// Generate a stereo tone with different frequencies per channel
pub fn generate_stereo_test_tone(
    freq_left: f32,
    freq_right: f32,
    duration_secs: f32,
    sample_rate: u32,
) -> Result<PcmBuffer> {
    let left = generate_test_tone(freq_left, 0.5, duration_secs, sample_rate)?;
    let right = generate_test_tone(freq_right, 0.4, duration_secs, sample_rate)?;
    let mut left = left.into_channels();
    let mut right = right.into_channels();
    PcmBuffer::stereo(left.remove(0), right.remove(0), sample_rate)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_to_linear() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
        assert!((db_to_linear(-6.0206) - 0.5).abs() < 1e-4);
        assert!((db_to_linear(-20.0) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_linear_to_db() {
        assert!((linear_to_db(1.0) - 0.0).abs() < 1e-6);
        assert!((linear_to_db(0.1) - (-20.0)).abs() < 1e-4);
        assert!(linear_to_db(0.0).is_infinite() && linear_to_db(0.0).is_sign_negative());
    }

    #[test]
    fn test_channel_layout() {
        assert_eq!(ChannelLayout::Mono.num_channels(), 1);
        assert_eq!(ChannelLayout::Stereo.num_channels(), 2);
        assert_eq!(ChannelLayout::from_count(2), Some(ChannelLayout::Stereo));
        assert_eq!(ChannelLayout::from_count(6), None);
    }

    #[test]
    fn test_new_rejects_ragged_channels() {
        let result = PcmBuffer::new(vec![vec![0.0; 10], vec![0.0; 9]], 44100);
        assert!(matches!(result, Err(LabError::InvalidBuffer { .. })));
    }

    #[test]
    fn test_new_rejects_bad_channel_count() {
        assert!(PcmBuffer::new(vec![], 44100).is_err());
        assert!(PcmBuffer::new(vec![vec![0.0; 4]; 3], 44100).is_err());
    }

    #[test]
    fn test_new_rejects_zero_sample_rate() {
        assert!(PcmBuffer::mono(vec![0.0; 4], 0).is_err());
    }

    #[test]
    fn test_silence() {
        let buffer = PcmBuffer::silence(1000, ChannelLayout::Stereo, 48000).unwrap();
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frame_count(), 1000);
        assert!(buffer.is_silent());
        assert_eq!(buffer.layout(), ChannelLayout::Stereo);
    }

    #[test]
    fn test_duration() {
        let buffer = PcmBuffer::silence(88200, ChannelLayout::Mono, 44100).unwrap();
        assert!((buffer.duration_secs() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_from_interleaved_stereo() {
        let interleaved = vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let buffer = PcmBuffer::from_interleaved(&interleaved, 2, 44100).unwrap();

        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.frame_count(), 3);
        assert_eq!(buffer.get_sample(0, 0), Some(0.1));
        assert_eq!(buffer.get_sample(1, 0), Some(0.2));
        assert_eq!(buffer.get_sample(0, 1), Some(0.3));
        assert_eq!(buffer.to_interleaved(), interleaved);
    }

    #[test]
    fn test_from_interleaved_invalid() {
        let interleaved = vec![0.1, 0.2, 0.3, 0.4, 0.5];
        assert!(PcmBuffer::from_interleaved(&interleaved, 2, 44100).is_err());
    }

    #[test]
    fn test_peak_and_energy() {
        let buffer = PcmBuffer::stereo(vec![0.25, -0.5], vec![0.1, 0.0], 44100).unwrap();
        assert_eq!(buffer.peak(), 0.5);
        assert!((buffer.peak_db() - (-6.02)).abs() < 0.01);
        assert!((buffer.energy() - (0.0625 + 0.25 + 0.01)).abs() < 1e-6);
    }

    #[test]
    fn test_clamp() {
        let mut buffer = PcmBuffer::mono(vec![-2.0, -0.5, 0.0, 0.5, 2.0], 44100).unwrap();
        buffer.clamp();
        assert_eq!(buffer.channel(0), &[-1.0, -0.5, 0.0, 0.5, 1.0]);
    }

    #[test]
    fn test_is_finite() {
        let buffer = PcmBuffer::mono(vec![0.5; 10], 44100).unwrap();
        assert!(buffer.is_finite());
        let buffer_nan = PcmBuffer::mono(vec![f32::NAN; 10], 44100).unwrap();
        assert!(!buffer_nan.is_finite());
    }

    #[test]
    fn test_mixdown_averages_channels() {
        let buffer = PcmBuffer::stereo(vec![1.0, 0.0], vec![0.0, -1.0], 44100).unwrap();
        assert_eq!(buffer.mixdown(), vec![0.5, -0.5]);
    }
}
