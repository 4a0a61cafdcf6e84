//! Visualization Generator
//!
//! Pure analysis (waveform envelope, STFT spectrogram) plus a separate
//! raster stage behind the [`RasterRenderer`] trait.

pub mod render;
pub mod spectrogram;
pub mod waveform;

pub use render::{PngRenderer, RasterRenderer};
pub use spectrogram::{spectrogram, Spectrogram};
pub use waveform::{waveform, WaveformBucket};

use std::time::Instant;

use tracing::info;

use crate::engine::PcmBuffer;
use crate::error::Result;
use crate::state::AssetId;

/// Analysis resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualSettings {
    pub waveform_points: usize,
    pub window_size: usize,
    pub hop_size: usize,
}

impl Default for VisualSettings {
    fn default() -> Self {
        Self {
            waveform_points: 1000,
            window_size: 2048,
            hop_size: 512,
        }
    }
}

/// Numeric arrays and rendered images for one asset
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizationResult {
    pub asset_id: AssetId,
    pub waveform: Vec<WaveformBucket>,
    pub spectrogram: Spectrogram,
    pub waveform_image: Vec<u8>,
    pub spectrogram_image: Vec<u8>,
}

impl VisualizationResult {
    /// Approximate memory held by this result
    pub fn size_bytes(&self) -> usize {
        self.waveform.len() * std::mem::size_of::<WaveformBucket>()
            + self.spectrogram.db.len() * std::mem::size_of::<f32>()
            + self.waveform_image.len()
            + self.spectrogram_image.len()
    }
}

/// Analyse `pcm` and render both images
pub fn visualize(
    asset_id: AssetId,
    pcm: &PcmBuffer,
    settings: &VisualSettings,
    renderer: &dyn RasterRenderer,
) -> Result<VisualizationResult> {
    let started = Instant::now();

    let waveform = waveform(pcm, settings.waveform_points)?;
    let spectrogram = spectrogram(pcm, settings.window_size, settings.hop_size)?;
    let waveform_image = renderer.render_waveform(&waveform)?;
    let spectrogram_image = renderer.render_spectrogram(&spectrogram)?;

    info!(
        asset = %asset_id,
        bins = spectrogram.bins,
        frames = spectrogram.frames,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "visualization generated"
    );

    Ok(VisualizationResult {
        asset_id,
        waveform,
        spectrogram,
        waveform_image,
        spectrogram_image,
    })
}
