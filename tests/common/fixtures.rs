//! Test fixture helpers for creating panels and temporary files.

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};
use tempfile::TempDir;

use scdk::Geometry;
use scdk::pixel::PixelFormat;

/// Byte value encoding a pixel position in channel `c`.
///
/// Every pixel gets a distinct (mod 256) pattern so misplaced pixels show up.
#[must_use]
pub fn gradient_byte(x: usize, y: usize, c: usize) -> u8 {
    ((x * 7 + y * 13 + c * 101) % 256) as u8
}

/// A full panel buffer in `format` where every byte is [`gradient_byte`].
#[must_use]
pub fn gradient_panel(geometry: &Geometry, format: PixelFormat) -> Vec<u8> {
    let bpp = format.bytes_per_pixel();
    let (w, h) = (geometry.panel_width(), geometry.panel_height());
    let mut panel = Vec::with_capacity(w * h * bpp);
    for y in 0..h {
        for x in 0..w {
            for c in 0..bpp {
                panel.push(gradient_byte(x, y, c));
            }
        }
    }
    panel
}

/// A full RGB panel where every key has its own flat color.
#[must_use]
pub fn keyed_panel(geometry: &Geometry, seed: u8) -> Vec<u8> {
    let (w, h) = (geometry.panel_width(), geometry.panel_height());
    let pitch_x = geometry.key_width + geometry.gap_width;
    let pitch_y = geometry.key_height + geometry.gap_height;
    let mut panel = Vec::with_capacity(w * h * 3);
    for y in 0..h {
        for x in 0..w {
            let key = (x / pitch_x + (y / pitch_y) * geometry.columns) as u8;
            panel.extend_from_slice(&[key.wrapping_mul(8), seed, 255 - key]);
        }
    }
    panel
}

/// Temporary directory holding generated files.
pub struct TestDir {
    pub dir: TempDir,
}

impl TestDir {
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write a solid-color PNG and return its path.
    ///
    /// # Panics
    ///
    /// Panics if the image cannot be saved.
    #[must_use]
    pub fn png(&self, name: &str, width: u32, height: u32, color: [u8; 3]) -> PathBuf {
        let path = self.dir.path().join(name);
        RgbImage::from_pixel(width, height, Rgb(color))
            .save(&path)
            .expect("Failed to save test image");
        path
    }

    /// Write a text file and return its path.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    #[must_use]
    pub fn file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, content).expect("Failed to write test file");
        path
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}
