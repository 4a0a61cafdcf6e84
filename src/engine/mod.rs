//! Audio Engine Module
//!
//! Core audio representation and the codec boundary:
//! - PCM buffer type and level helpers
//! - Codec adapter (encoded bytes <-> PCM)

pub mod buffer;
pub mod codec;

pub use buffer::{ChannelLayout, PcmBuffer};
pub use codec::{AudioCodec, AudioFormat, WavCodec, WavEncoding};
