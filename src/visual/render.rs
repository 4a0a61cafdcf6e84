//! Raster encoding of waveform and spectrogram data
//!
//! The numeric analysis never depends on this module; swap the renderer to
//! change the image format or styling.

use std::io::Cursor;

use image::{ImageBuffer, ImageFormat, Rgba, RgbaImage};

use super::spectrogram::{Spectrogram, DB_FLOOR};
use super::waveform::WaveformBucket;
use crate::error::{LabError, Result};

/// Turns analysis data into encoded image bytes
pub trait RasterRenderer: Send + Sync {
    /// Encode a min/max envelope
    fn render_waveform(&self, buckets: &[WaveformBucket]) -> Result<Vec<u8>>;

    /// Encode a dB grid (low frequencies at the bottom)
    fn render_spectrogram(&self, spectrogram: &Spectrogram) -> Result<Vec<u8>>;
}

const BACKGROUND: Rgba<u8> = Rgba([0x0f, 0x0f, 0x14, 0xff]);
const WAVE_COLOR: Rgba<u8> = Rgba([0x7c, 0x3a, 0xed, 0xff]);
const AXIS_COLOR: Rgba<u8> = Rgba([0x2a, 0x2a, 0x35, 0xff]);

/// Magma-like colour stops from quiet to loud
const HEAT_STOPS: [[u8; 3]; 5] = [
    [0x00, 0x00, 0x04],
    [0x51, 0x12, 0x7c],
    [0xb7, 0x37, 0x79],
    [0xfc, 0x89, 0x61],
    [0xfc, 0xfd, 0xbf],
];

/// PNG output via the `image` crate
#[derive(Debug, Clone, Copy)]
pub struct PngRenderer {
    pub waveform_size: (u32, u32),
    pub spectrogram_size: (u32, u32),
}

impl Default for PngRenderer {
    fn default() -> Self {
        Self {
            waveform_size: (1200, 300),
            spectrogram_size: (1200, 400),
        }
    }
}

impl PngRenderer {
    pub fn new(waveform_size: (u32, u32), spectrogram_size: (u32, u32)) -> Self {
        Self {
            waveform_size,
            spectrogram_size,
        }
    }
}

impl RasterRenderer for PngRenderer {
    fn render_waveform(&self, buckets: &[WaveformBucket]) -> Result<Vec<u8>> {
        let (width, height) = checked_size(self.waveform_size)?;
        let mut img: RgbaImage = ImageBuffer::from_pixel(width, height, BACKGROUND);

        let to_y = |v: f32| -> u32 {
            let v = if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
            (((1.0 - v) / 2.0) * (height - 1) as f32).round() as u32
        };

        let centre = to_y(0.0);
        for x in 0..width {
            img.put_pixel(x, centre, AXIS_COLOR);
        }

        if !buckets.is_empty() {
            for x in 0..width {
                let index = (x as usize * buckets.len()) / width as usize;
                let bucket = buckets[index.min(buckets.len() - 1)];
                let (top, bottom) = (to_y(bucket.max), to_y(bucket.min));
                for y in top.min(bottom)..=top.max(bottom) {
                    img.put_pixel(x, y, WAVE_COLOR);
                }
            }
        }

        encode_png(&img)
    }

    fn render_spectrogram(&self, spectrogram: &Spectrogram) -> Result<Vec<u8>> {
        let (width, height) = checked_size(self.spectrogram_size)?;
        let mut img: RgbaImage = ImageBuffer::from_pixel(width, height, BACKGROUND);

        if spectrogram.frames > 0 && spectrogram.bins > 0 {
            for x in 0..width {
                let frame = (x as usize * spectrogram.frames) / width as usize;
                for y in 0..height {
                    let row_from_bottom = (height - 1 - y) as usize;
                    let bin = (row_from_bottom * spectrogram.bins) / height as usize;
                    let db = spectrogram.get(bin, frame).unwrap_or(DB_FLOOR);
                    img.put_pixel(x, y, heat_color((db - DB_FLOOR) / -DB_FLOOR));
                }
            }
        }

        encode_png(&img)
    }
}

fn checked_size((width, height): (u32, u32)) -> Result<(u32, u32)> {
    if width == 0 || height == 0 {
        return Err(LabError::RenderError {
            reason: format!("image size {}x{} has no pixels", width, height),
        });
    }
    Ok((width, height))
}

/// Map `t` in [0, 1] onto the heat gradient
fn heat_color(t: f32) -> Rgba<u8> {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (HEAT_STOPS.len() - 1) as f32;
    let i = (scaled.floor() as usize).min(HEAT_STOPS.len() - 2);
    let frac = scaled - i as f32;

    let (a, b) = (HEAT_STOPS[i], HEAT_STOPS[i + 1]);
    let mix = |c: usize| (a[c] as f32 + (b[c] as f32 - a[c] as f32) * frac).round() as u8;
    Rgba([mix(0), mix(1), mix(2), 0xff])
}

fn encode_png(img: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(|e| LabError::RenderError {
            reason: e.to_string(),
        })?;
    Ok(bytes)
}
