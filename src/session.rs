//! Device session: per-device buffers and the panel update pipeline.
//!
//! A session owns the transport handle, the encoder, the fingerprint table
//! and every scratch buffer needed to push a panel to the device. Buffers
//! are allocated once when the session is created and reused on every call.
//!
//! Sessions are not internally synchronised. Wrap one in a `Mutex` if more
//! than one thread needs to drive it.

use std::time::Duration;

use tracing::{debug, info, trace, warn};

use crate::cache::TileCache;
use crate::codec::{DEFAULT_QUALITY, JpegTileEncoder, TileEncoder};
use crate::device::{DeviceDescriptor, Geometry, HidTransport, Transport, open_transport};
use crate::error::{Result, ScdkError};
use crate::pixel::{self, PixelFormat};
use crate::report::{self, INPUT_REPORT_LEN, REPORT_LEN};

/// Tunables applied when a session is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// JPEG quality (0-100) used for every tile.
    pub quality: u8,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            quality: DEFAULT_QUALITY,
        }
    }
}

/// Outcome of one panel or key update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    /// Tiles that were encoded and transmitted.
    pub sent: usize,
    /// Tiles skipped because their content was unchanged.
    pub skipped: usize,
    /// Image reports written.
    pub reports: usize,
}

/// An open device with its scratch buffers.
pub struct DeviceSession<T: Transport, E: TileEncoder = JpegTileEncoder> {
    transport: T,
    encoder: E,
    geometry: &'static Geometry,
    options: SessionOptions,
    tile: Vec<u8>,
    encoded: Vec<u8>,
    report: Box<[u8; REPORT_LEN]>,
    input: Box<[u8; INPUT_REPORT_LEN]>,
    cache: TileCache,
}

impl DeviceSession<HidTransport> {
    /// Open a device by serial (or the only connected one).
    pub fn open(
        serial: Option<&str>,
        options: SessionOptions,
    ) -> Result<(Self, DeviceDescriptor)> {
        let (transport, descriptor) = open_transport(serial)?;
        let session = Self::with_options(
            transport,
            JpegTileEncoder::new(),
            descriptor.model.geometry(),
            options,
        )?;
        info!(serial = %descriptor.serial, model = ?descriptor.model, "Session opened");
        Ok((session, descriptor))
    }
}

impl<T: Transport> DeviceSession<T> {
    /// Create a session over an already opened transport with default options.
    pub fn with_transport(transport: T, geometry: &'static Geometry) -> Result<Self> {
        Self::with_options(
            transport,
            JpegTileEncoder::new(),
            geometry,
            SessionOptions::default(),
        )
    }
}

fn alloc_zeroed(len: usize) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| ScdkError::Allocation { bytes: len })?;
    buf.resize(len, 0);
    Ok(buf)
}

impl<T: Transport, E: TileEncoder> DeviceSession<T, E> {
    /// Create a session from its parts.
    ///
    /// Every buffer is allocated here; allocation failure is returned as
    /// [`ScdkError::Allocation`].
    pub fn with_options(
        transport: T,
        encoder: E,
        geometry: &'static Geometry,
        options: SessionOptions,
    ) -> Result<Self> {
        // Sized for 4-channel tiles so every pixel format fits.
        let tile = alloc_zeroed(pixel::tile_len(geometry, PixelFormat::Rgba))?;

        let bound = encoder.max_encoded_len(geometry.key_width, geometry.key_height);
        let mut encoded = Vec::new();
        encoded
            .try_reserve_exact(bound)
            .map_err(|_| ScdkError::Allocation { bytes: bound })?;

        let cache = TileCache::new(geometry.key_count())?;

        debug!(
            tile_bytes = tile.len(),
            encoded_bytes = bound,
            keys = cache.len(),
            quality = options.quality,
            "Allocated session buffers"
        );

        Ok(Self {
            transport,
            encoder,
            geometry,
            options,
            tile,
            encoded,
            report: Box::new([0u8; REPORT_LEN]),
            input: Box::new([0u8; INPUT_REPORT_LEN]),
            cache,
        })
    }

    /// Panel geometry of the device.
    pub const fn geometry(&self) -> &'static Geometry {
        self.geometry
    }

    /// Current JPEG quality.
    pub const fn quality(&self) -> u8 {
        self.options.quality
    }

    /// Change the JPEG quality used for subsequent tiles.
    ///
    /// Cached fingerprints are kept; only changed tiles pick up the new
    /// quality.
    pub fn set_quality(&mut self, quality: u8) {
        self.options.quality = quality;
    }

    /// Fingerprint table of this session.
    pub const fn cache(&self) -> &TileCache {
        &self.cache
    }

    /// Forget every fingerprint so the next update resends all keys.
    pub fn invalidate_cache(&mut self) {
        self.cache.clear();
    }

    /// Push a full panel image to the device.
    ///
    /// Keys are processed in row-major order. Unchanged tiles are skipped.
    /// The first failure aborts the remaining keys and is returned; the
    /// failing key is invalidated so that a retry resends it.
    pub fn set_panel_image(&mut self, panel: &[u8], format: PixelFormat) -> Result<UpdateStats> {
        let g = self.geometry;
        let mut stats = UpdateStats::default();

        for row in 0..g.rows {
            for column in 0..g.columns {
                let key = g.key_index(column, row)?;
                let len = pixel::extract_tile_into(
                    panel,
                    g.panel_width(),
                    g.panel_height(),
                    format,
                    g,
                    column,
                    row,
                    &mut self.tile,
                )?;
                self.push_tile(key, len, format, &mut stats)?;
            }
        }

        trace!(
            sent = stats.sent,
            skipped = stats.skipped,
            reports = stats.reports,
            "Panel updated"
        );
        Ok(stats)
    }

    /// Push one key-sized image (top-left origin) to key `(column, row)`.
    pub fn set_key_image(
        &mut self,
        column: usize,
        row: usize,
        image: &[u8],
        format: PixelFormat,
    ) -> Result<UpdateStats> {
        let key = self.geometry.key_index(column, row)?;
        let len = pixel::convert_key_image_into(image, format, self.geometry, &mut self.tile)?;
        let mut stats = UpdateStats::default();
        self.push_tile(key, len, format, &mut stats)?;
        Ok(stats)
    }

    fn push_tile(
        &mut self,
        key: u8,
        len: usize,
        format: PixelFormat,
        stats: &mut UpdateStats,
    ) -> Result<()> {
        let tile = &self.tile[..len];
        if !self.cache.should_send(key, tile) {
            stats.skipped += 1;
            return Ok(());
        }

        match self.encode_and_send(key, len, format) {
            Ok(reports) => {
                stats.sent += 1;
                stats.reports += reports;
                Ok(())
            }
            Err(e) => {
                self.cache.invalidate(key);
                Err(e)
            }
        }
    }

    fn encode_and_send(&mut self, key: u8, len: usize, format: PixelFormat) -> Result<usize> {
        let g = self.geometry;
        self.encoder
            .encode(
                &self.tile[..len],
                g.key_width,
                g.key_height,
                format.tile_layout(),
                self.options.quality,
                &mut self.encoded,
            )
            .map_err(|reason| {
                warn!(key, %reason, "Tile encoding failed");
                ScdkError::Encode { key, reason }
            })?;

        trace!(key, bytes = self.encoded.len(), "Sending tile");
        report::send_tile(&mut self.transport, &self.encoded, key, &mut self.report)
    }

    /// Set display brightness; `percent` is clamped to 0-100.
    pub fn set_brightness(&mut self, percent: i32) -> Result<()> {
        let report = report::encode_brightness(percent);
        debug!(level = report[2], "Setting brightness");
        self.transport
            .send_feature_report(&report)
            .map_err(|e| ScdkError::FeatureReport(e.to_string()))
    }

    /// Switch the device to its screensaver.
    pub fn show_screensaver(&mut self) -> Result<()> {
        debug!("Showing screensaver");
        self.transport
            .send_feature_report(&report::encode_screensaver())
            .map_err(|e| ScdkError::FeatureReport(e.to_string()))
    }

    /// Read key states, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` when no input report arrived, otherwise the number
    /// of entries written to `states`.
    pub fn read_key_states(
        &mut self,
        states: &mut [bool],
        timeout: Duration,
    ) -> Result<Option<usize>> {
        let n = self
            .transport
            .read_timeout(self.input.as_mut_slice(), timeout)
            .map_err(|e| ScdkError::InputRead(e.to_string()))?;
        if n == 0 {
            return Ok(None);
        }
        let count = report::decode_key_states(&self.input[..n], states);
        trace!(bytes = n, keys = count, "Decoded input report");
        Ok(Some(count))
    }

    /// Serial number reported by the device.
    pub fn serial_number(&mut self) -> Result<String> {
        self.transport
            .serial_number()
            .map_err(|e| ScdkError::DeviceCommunication(e.to_string()))
            .map(Option::unwrap_or_default)
    }

    /// Close the session, releasing the transport and all buffers.
    pub fn close(self) {
        debug!("Session closed");
    }

    /// Give back the transport, dropping the buffers.
    pub fn into_transport(self) -> T {
        self.transport
    }
}
