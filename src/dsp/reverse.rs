//! Time reversal

use crate::engine::PcmBuffer;
use crate::error::Result;

/// Reverse every channel in time
pub fn reverse(pcm: &PcmBuffer) -> Result<PcmBuffer> {
    let channels = pcm
        .channels()
        .iter()
        .map(|ch| ch.iter().rev().copied().collect())
        .collect();
    PcmBuffer::new(channels, pcm.sample_rate())
}
