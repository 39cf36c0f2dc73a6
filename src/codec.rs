//! JPEG compression of converted key tiles.

use jpeg_encoder::{ColorType, Encoder, SamplingFactor};
use tracing::trace;

use crate::pixel::TileLayout;

/// Default JPEG quality for key tiles.
pub const DEFAULT_QUALITY: u8 = 80;

/// Image encoder used to compress one tile.
///
/// Implementations may keep internal state between calls; a session
/// creates one encoder and reuses it for every tile.
pub trait TileEncoder {
    /// Compress `tile` into `out`, replacing its previous contents.
    ///
    /// # Errors
    ///
    /// Returns the encoder's error message on failure.
    fn encode(
        &mut self,
        tile: &[u8],
        width: usize,
        height: usize,
        layout: TileLayout,
        quality: u8,
        out: &mut Vec<u8>,
    ) -> Result<(), String>;

    /// Worst-case compressed size for a `width`x`height` tile.
    fn max_encoded_len(&self, width: usize, height: usize) -> usize;
}

/// Baseline JPEG encoder with fixed 4:2:0 chroma subsampling.
#[derive(Debug, Default, Clone, Copy)]
pub struct JpegTileEncoder;

impl JpegTileEncoder {
    pub const fn new() -> Self {
        Self
    }
}

/// libjpeg-turbo style upper bound for a 4:2:0 JPEG.
pub const fn jpeg_420_bound(width: usize, height: usize) -> usize {
    let padded_w = width.div_ceil(16) * 16;
    let padded_h = height.div_ceil(16) * 16;
    padded_w * padded_h * 3 + 2048
}

impl TileEncoder for JpegTileEncoder {
    fn encode(
        &mut self,
        tile: &[u8],
        width: usize,
        height: usize,
        layout: TileLayout,
        quality: u8,
        out: &mut Vec<u8>,
    ) -> Result<(), String> {
        let width = u16::try_from(width).map_err(|_| format!("tile width {width} too large"))?;
        let height =
            u16::try_from(height).map_err(|_| format!("tile height {height} too large"))?;
        let color = match layout {
            TileLayout::Rgb => ColorType::Rgb,
            // JPEG has no alpha; the fourth channel is ignored.
            TileLayout::Rgba => ColorType::Rgba,
        };

        out.clear();
        let mut encoder = Encoder::new(&mut *out, quality.clamp(1, 100));
        // 4:2:0
        encoder.set_sampling_factor(SamplingFactor::F_2_2);
        encoder
            .encode(tile, width, height, color)
            .map_err(|e| e.to_string())?;

        trace!(bytes = out.len(), quality, "Encoded tile");
        Ok(())
    }

    fn max_encoded_len(&self, width: usize, height: usize) -> usize {
        jpeg_420_bound(width, height)
    }
}
