//! Codec adapter
//!
//! Bridges encoded uploads/downloads and the in-memory `PcmBuffer`. The
//! pipeline only sees the `AudioCodec` trait; `WavCodec` is the bundled
//! implementation. Compressed formats (MP3, OGG, FLAC, M4A) are recognised at
//! the upload boundary but need an external codec plugged in behind the trait.

use std::fmt;
use std::io::Cursor;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::engine::buffer::{PcmBuffer, MAX_CHANNELS};
use crate::error::{LabError, Result};

/// Audio container formats accepted at the upload boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Wav,
    Ogg,
    Flac,
    M4a,
}

impl AudioFormat {
    /// All formats accepted for upload
    pub const ALL: [AudioFormat; 5] = [
        AudioFormat::Mp3,
        AudioFormat::Wav,
        AudioFormat::Ogg,
        AudioFormat::Flac,
        AudioFormat::M4a,
    ];

    /// Canonical file extension (without the dot)
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Flac => "flac",
            AudioFormat::M4a => "m4a",
        }
    }

    /// MIME type used for downloads
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "audio/mpeg",
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::Flac => "audio/flac",
            AudioFormat::M4a => "audio/mp4",
        }
    }

    /// Parse a bare extension such as `"wav"` or `".MP3"`
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "mp3" => Some(AudioFormat::Mp3),
            "wav" | "wave" => Some(AudioFormat::Wav),
            "ogg" | "oga" => Some(AudioFormat::Ogg),
            "flac" => Some(AudioFormat::Flac),
            "m4a" | "mp4" => Some(AudioFormat::M4a),
            _ => None,
        }
    }

    /// Parse a MIME content type such as `"audio/wav"`
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "audio/mpeg" | "audio/mp3" => Some(AudioFormat::Mp3),
            "audio/wav" | "audio/x-wav" | "audio/wave" | "audio/vnd.wave" => Some(AudioFormat::Wav),
            "audio/ogg" | "application/ogg" => Some(AudioFormat::Ogg),
            "audio/flac" | "audio/x-flac" => Some(AudioFormat::Flac),
            "audio/mp4" | "audio/x-m4a" | "audio/m4a" => Some(AudioFormat::M4a),
            _ => None,
        }
    }

    /// Resolve a declared type: a MIME type, a file name, or a bare extension
    ///
    /// # Errors
    /// `UnsupportedFormat` when nothing matches the allowed formats.
    pub fn from_declared(declared: &str) -> Result<Self> {
        let declared = declared.trim();
        let by_mime = if declared.contains('/') {
            Self::from_content_type(declared)
        } else {
            None
        };
        let by_name = || {
            Path::new(declared)
                .extension()
                .and_then(|e| e.to_str())
                .and_then(Self::from_extension)
        };

        by_mime
            .or_else(by_name)
            .or_else(|| Self::from_extension(declared))
            .ok_or_else(|| LabError::UnsupportedFormat {
                format: format!(
                    "'{}' (allowed: {})",
                    declared,
                    Self::ALL
                        .iter()
                        .map(|f| f.extension())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            })
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Encoder/decoder seam between encoded bytes and PCM
pub trait AudioCodec: Send + Sync {
    /// Decode encoded bytes of the declared format into a PCM buffer
    ///
    /// # Errors
    /// `UnsupportedFormat` or `CorruptInput`
    fn decode(&self, bytes: &[u8], format: AudioFormat) -> Result<PcmBuffer>;

    /// Encode a PCM buffer into the target format
    fn encode(&self, pcm: &PcmBuffer, format: AudioFormat) -> Result<Vec<u8>>;

    /// Whether [`encode`](Self::encode) can produce `format`
    fn can_encode(&self, format: AudioFormat) -> bool;
}

/// Output sample encoding for `WavCodec`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WavEncoding {
    /// 16-bit signed integer PCM
    #[default]
    Int16,
    /// 32-bit IEEE float
    Float32,
}

/// Sample rate assumed when a header reports none
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// WAV codec backed by `hound`
#[derive(Debug, Clone, Copy)]
pub struct WavCodec {
    encoding: WavEncoding,
    fallback_sample_rate: u32,
}

impl Default for WavCodec {
    fn default() -> Self {
        Self::new(WavEncoding::default())
    }
}

impl WavCodec {
    /// Create a codec writing the given sample encoding
    pub fn new(encoding: WavEncoding) -> Self {
        Self {
            encoding,
            fallback_sample_rate: DEFAULT_SAMPLE_RATE,
        }
    }

    /// Use `rate` for files whose header carries a zero sample rate
    pub fn with_fallback_sample_rate(mut self, rate: u32) -> Self {
        if rate > 0 {
            self.fallback_sample_rate = rate;
        }
        self
    }

    pub fn encoding(&self) -> WavEncoding {
        self.encoding
    }

    fn ensure_wav(format: AudioFormat) -> Result<()> {
        if format == AudioFormat::Wav {
            Ok(())
        } else {
            Err(LabError::UnsupportedFormat {
                format: format!("{} (bundled codec handles WAV only)", format),
            })
        }
    }
}

impl AudioCodec for WavCodec {
    fn decode(&self, bytes: &[u8], format: AudioFormat) -> Result<PcmBuffer> {
        Self::ensure_wav(format)?;

        let reader = WavReader::new(Cursor::new(bytes)).map_err(|e| LabError::CorruptInput {
            reason: format!("Failed to open WAV data: {}", e),
            source: Some(Box::new(e)),
        })?;

        let spec = reader.spec();
        let channels = spec.channels as usize;
        if channels == 0 || channels > MAX_CHANNELS {
            return Err(LabError::UnsupportedFormat {
                format: format!("{}-channel audio (only mono/stereo supported)", channels),
            });
        }

        let sample_rate = if spec.sample_rate == 0 {
            warn!(fallback = self.fallback_sample_rate, "WAV header has no sample rate");
            self.fallback_sample_rate
        } else {
            spec.sample_rate
        };

        let interleaved = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;
        PcmBuffer::from_interleaved(&interleaved, channels, sample_rate).map_err(|e| {
            LabError::CorruptInput {
                reason: e.to_string(),
                source: None,
            }
        })
    }

    fn encode(&self, pcm: &PcmBuffer, format: AudioFormat) -> Result<Vec<u8>> {
        Self::ensure_wav(format)?;

        let spec = WavSpec {
            channels: pcm.channel_count() as u16,
            sample_rate: pcm.sample_rate(),
            bits_per_sample: match self.encoding {
                WavEncoding::Int16 => 16,
                WavEncoding::Float32 => 32,
            },
            sample_format: match self.encoding {
                WavEncoding::Int16 => SampleFormat::Int,
                WavEncoding::Float32 => SampleFormat::Float,
            },
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).map_err(encode_error)?;
            for sample in pcm.to_interleaved() {
                match self.encoding {
                    WavEncoding::Int16 => {
                        let scaled = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
                        writer.write_sample(scaled).map_err(encode_error)?;
                    }
                    WavEncoding::Float32 => {
                        writer.write_sample(sample).map_err(encode_error)?;
                    }
                }
            }
            writer.finalize().map_err(encode_error)?;
        }

        Ok(cursor.into_inner())
    }

    fn can_encode(&self, format: AudioFormat) -> bool {
        format == AudioFormat::Wav
    }
}

fn encode_error(e: hound::Error) -> LabError {
    LabError::EncodeError {
        reason: e.to_string(),
    }
}

/// Read samples from a WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let corrupt = |bits: &str, e: hound::Error| LabError::CorruptInput {
        reason: format!("Failed to read {} samples: {}", bits, e),
        source: Some(Box::new(e)),
    };

    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(|e| corrupt("float", e)),
        SampleFormat::Int => match bits_per_sample {
            8 => reader
                .samples::<i8>()
                .map(|s| s.map(|v| v as f32 / 128.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| corrupt("8-bit", e)),
            16 => reader
                .samples::<i16>()
                .map(|s| s.map(|v| v as f32 / 32768.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| corrupt("16-bit", e)),
            // 24-bit is stored as i32 in hound
            24 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 8388608.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| corrupt("24-bit", e)),
            32 => reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / 2147483648.0))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(|e| corrupt("32-bit int", e)),
            _ => Err(LabError::UnsupportedFormat {
                format: format!("{}-bit integer audio", bits_per_sample),
            }),
        },
    }
}
