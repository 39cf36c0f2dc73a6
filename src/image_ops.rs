//! Loading image files into panel and key buffers.

use std::path::Path;

use clap::ValueEnum;
use image::{DynamicImage, RgbImage};

use crate::device::Geometry;
use crate::error::{Result, ScdkError};

/// Strategy for resizing images to the target size.
#[derive(Debug, Clone, Copy, Default, ValueEnum, PartialEq, Eq)]
pub enum ResizeStrategy {
    /// Fit within target, maintain aspect ratio (black bars).
    #[default]
    Fit,
    /// Fill target, maintain aspect ratio (may crop).
    Fill,
    /// Stretch to fill (may distort).
    Stretch,
}

/// Resize an image to exactly `width`x`height` RGB pixels.
pub fn resize_rgb(
    img: &DynamicImage,
    width: u32,
    height: u32,
    strategy: ResizeStrategy,
) -> RgbImage {
    let filter = image::imageops::FilterType::Lanczos3;

    match strategy {
        ResizeStrategy::Fit => {
            // Letterbox onto a black canvas so the output size is exact.
            let resized = img.resize(width, height, filter).to_rgb8();
            let mut canvas = RgbImage::new(width, height);
            let (rw, rh) = resized.dimensions();
            let x = (width - rw) / 2;
            let y = (height - rh) / 2;
            image::imageops::overlay(&mut canvas, &resized, x.into(), y.into());
            canvas
        }
        ResizeStrategy::Fill => img.resize_to_fill(width, height, filter).to_rgb8(),
        ResizeStrategy::Stretch => img.resize_exact(width, height, filter).to_rgb8(),
    }
}

/// Load an image file.
pub fn load_image(path: &Path) -> Result<DynamicImage> {
    if !path.is_file() {
        return Err(ScdkError::ImageNotFound {
            path: path.display().to_string(),
        });
    }
    image::open(path).map_err(|e| ScdkError::ImageProcessing(e.to_string()))
}

/// A panel-sized RGB buffer filled with one color.
pub fn solid_panel(geometry: &Geometry, color: (u8, u8, u8)) -> Vec<u8> {
    [color.0, color.1, color.2].repeat(geometry.panel_width() * geometry.panel_height())
}
