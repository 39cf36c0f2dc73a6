//! Pixel formats and per-key tile extraction.
//!
//! The device expects every key image rotated by 180 degrees relative to
//! the panel: destination row `y` comes from source row `key_height - 1 - y`
//! and each row is walked right to left. Pixels are re-emitted in canonical
//! R,G,B (3-channel) or R,G,B,A (4-channel) order.

use std::fmt;

use serde::Serialize;

use crate::device::Geometry;
use crate::error::{Result, ScdkError};

/// Channel layout of a caller-supplied pixel buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Rgb,
    Bgr,
    Rgbx,
    Bgrx,
    Xbgr,
    Xrgb,
    Rgba,
    Bgra,
    Abgr,
    Argb,
}

/// Canonical channel order of a converted tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileLayout {
    /// 3 bytes per pixel: R, G, B
    Rgb,
    /// 4 bytes per pixel: R, G, B, A (X padding lands in the A slot)
    Rgba,
}

impl TileLayout {
    /// Bytes consumed by a single pixel.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb => 3,
            Self::Rgba => 4,
        }
    }
}

impl PixelFormat {
    /// All supported formats.
    pub const ALL: [Self; 10] = [
        Self::Rgb,
        Self::Bgr,
        Self::Rgbx,
        Self::Bgrx,
        Self::Xbgr,
        Self::Xrgb,
        Self::Rgba,
        Self::Bgra,
        Self::Abgr,
        Self::Argb,
    ];

    /// Bytes consumed by a single pixel in this format.
    pub const fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgb | Self::Bgr => 3,
            _ => 4,
        }
    }

    /// Layout of tiles converted from this format.
    pub const fn tile_layout(self) -> TileLayout {
        match self.bytes_per_pixel() {
            3 => TileLayout::Rgb,
            _ => TileLayout::Rgba,
        }
    }

    /// Byte offsets of R, G, B and the fourth channel within one pixel.
    ///
    /// For 3-channel formats the fourth offset is unused.
    const fn channel_offsets(self) -> [usize; 4] {
        match self {
            Self::Rgb => [0, 1, 2, 0],
            Self::Bgr => [2, 1, 0, 0],
            Self::Rgbx | Self::Rgba => [0, 1, 2, 3],
            Self::Bgrx | Self::Bgra => [2, 1, 0, 3],
            Self::Xbgr | Self::Abgr => [3, 2, 1, 0],
            Self::Xrgb | Self::Argb => [1, 2, 3, 0],
        }
    }

    /// Resolve a format from its lowercase name.
    pub fn from_name(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.name() == name.to_ascii_lowercase())
            .ok_or_else(|| ScdkError::UnsupportedPixelFormat(name.to_string()))
    }

    /// Lowercase name of the format.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Rgb => "rgb",
            Self::Bgr => "bgr",
            Self::Rgbx => "rgbx",
            Self::Bgrx => "bgrx",
            Self::Xbgr => "xbgr",
            Self::Xrgb => "xrgb",
            Self::Rgba => "rgba",
            Self::Bgra => "bgra",
            Self::Abgr => "abgr",
            Self::Argb => "argb",
        }
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Byte length of a tile converted from `format` for `geometry`.
pub const fn tile_len(geometry: &Geometry, format: PixelFormat) -> usize {
    geometry.key_width * geometry.key_height * format.bytes_per_pixel()
}

/// Extract the tile for key `(column, row)` from a full panel buffer.
///
/// `dst` must hold at least [`tile_len`] bytes; exactly that many are
/// written. Returns the written length.
#[allow(clippy::too_many_arguments)]
pub fn extract_tile_into(
    panel: &[u8],
    panel_width: usize,
    panel_height: usize,
    format: PixelFormat,
    geometry: &Geometry,
    column: usize,
    row: usize,
    dst: &mut [u8],
) -> Result<usize> {
    geometry.key_index(column, row)?;

    if panel_width != geometry.panel_width() || panel_height != geometry.panel_height() {
        return Err(ScdkError::InvalidImageDimensions {
            expected_w: geometry.panel_width(),
            expected_h: geometry.panel_height(),
            actual_w: panel_width,
            actual_h: panel_height,
        });
    }
    check_buffer(panel, panel_width, panel_height, format)?;

    let (origin_x, origin_y) = geometry.key_origin(column, row);
    let stride = panel_width * format.bytes_per_pixel();
    convert_rotated(
        panel,
        stride,
        origin_x,
        origin_y,
        geometry.key_width,
        geometry.key_height,
        format,
        dst,
    )
}

/// Owned-return variant of [`extract_tile_into`].
pub fn extract_tile(
    panel: &[u8],
    panel_width: usize,
    panel_height: usize,
    format: PixelFormat,
    geometry: &Geometry,
    column: usize,
    row: usize,
) -> Result<Vec<u8>> {
    let mut tile = vec![0u8; tile_len(geometry, format)];
    extract_tile_into(
        panel,
        panel_width,
        panel_height,
        format,
        geometry,
        column,
        row,
        &mut tile,
    )?;
    Ok(tile)
}

/// Convert one caller-supplied key-sized image (top-left origin).
pub fn convert_key_image_into(
    image: &[u8],
    format: PixelFormat,
    geometry: &Geometry,
    dst: &mut [u8],
) -> Result<usize> {
    check_buffer(image, geometry.key_width, geometry.key_height, format)?;
    convert_rotated(
        image,
        geometry.key_width * format.bytes_per_pixel(),
        0,
        0,
        geometry.key_width,
        geometry.key_height,
        format,
        dst,
    )
}

fn check_buffer(buf: &[u8], width: usize, height: usize, format: PixelFormat) -> Result<()> {
    let expected = width * height * format.bytes_per_pixel();
    if buf.len() != expected {
        return Err(ScdkError::BufferLength {
            expected,
            actual: buf.len(),
            format: format.to_string(),
        });
    }
    Ok(())
}

/// Copy a `width`x`height` region rotated by 180 degrees into `dst`.
#[allow(clippy::too_many_arguments)]
fn convert_rotated(
    src: &[u8],
    stride: usize,
    origin_x: usize,
    origin_y: usize,
    width: usize,
    height: usize,
    format: PixelFormat,
    dst: &mut [u8],
) -> Result<usize> {
    let bpp = format.bytes_per_pixel();
    let row_len = width * bpp;
    let len = row_len * height;
    let Some(dst) = dst.get_mut(..len) else {
        return Err(ScdkError::BufferLength {
            expected: len,
            actual: dst.len(),
            format: format.to_string(),
        });
    };

    let [r, g, b, a] = format.channel_offsets();
    for (y, dst_row) in dst.chunks_exact_mut(row_len).enumerate() {
        let src_start = (origin_y + height - 1 - y) * stride + origin_x * bpp;
        let src_row = &src[src_start..src_start + row_len];

        for (out, px) in dst_row
            .chunks_exact_mut(bpp)
            .zip(src_row.chunks_exact(bpp).rev())
        {
            out[0] = px[r];
            out[1] = px[g];
            out[2] = px[b];
            if bpp == 4 {
                out[3] = px[a];
            }
        }
    }

    Ok(len)
}
