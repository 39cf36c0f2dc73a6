//! Device type catalog and descriptor types.

use serde::Serialize;

use crate::error::{Result, ScdkError};

/// USB vendor id shared by every Elgato device.
pub const ELGATO_VENDOR_ID: u16 = 0x0fd9;

/// Panel geometry of a device model.
///
/// Panel dimensions are derived from the grid parameters, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Geometry {
    /// Number of key columns
    pub columns: usize,
    /// Number of key rows
    pub rows: usize,
    /// Width of one key image in pixels
    pub key_width: usize,
    /// Height of one key image in pixels
    pub key_height: usize,
    /// Horizontal gap between keys in pixels
    pub gap_width: usize,
    /// Vertical gap between keys in pixels
    pub gap_height: usize,
}

impl Geometry {
    /// Total number of keys.
    #[must_use]
    pub const fn key_count(&self) -> usize {
        self.columns * self.rows
    }

    /// Width of the full panel, including inter-key gaps.
    #[must_use]
    pub const fn panel_width(&self) -> usize {
        self.columns * self.key_width + self.columns.saturating_sub(1) * self.gap_width
    }

    /// Height of the full panel, including inter-key gaps.
    #[must_use]
    pub const fn panel_height(&self) -> usize {
        self.rows * self.key_height + self.rows.saturating_sub(1) * self.gap_height
    }

    /// Top-left pixel of a key within the panel.
    #[must_use]
    pub const fn key_origin(&self, column: usize, row: usize) -> (usize, usize) {
        (
            column * (self.key_width + self.gap_width),
            row * (self.key_height + self.gap_height),
        )
    }

    /// Validate `(column, row)` and return its linear key index.
    ///
    /// Out-of-range keys are rejected, never clamped.
    /// Indices that do not fit the one-byte report field are rejected too.
    pub fn key_index(&self, column: usize, row: usize) -> Result<u8> {
        let invalid = || ScdkError::InvalidKeyIndex {
            column,
            row,
            columns: self.columns,
            rows: self.rows,
        };
        if column >= self.columns || row >= self.rows {
            return Err(invalid());
        }
        u8::try_from(column + row * self.columns).map_err(|_| invalid())
    }
}

/// Supported device models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceModel {
    /// Stream Deck XL (32 keys, 8x4)
    Xl,
    /// Stream Deck XL V2 (32 keys, 8x4)
    XlV2,
}

const XL_GEOMETRY: Geometry = Geometry {
    columns: 8,
    rows: 4,
    key_width: 96,
    key_height: 96,
    gap_width: 38,
    gap_height: 38,
};

/// One catalog row: a USB product id and what it maps to.
struct CatalogEntry {
    product_id: u16,
    model: DeviceModel,
    geometry: Geometry,
}

static XL: CatalogEntry = CatalogEntry {
    product_id: 0x006c,
    model: DeviceModel::Xl,
    geometry: XL_GEOMETRY,
};

static XL_V2: CatalogEntry = CatalogEntry {
    product_id: 0x008f,
    model: DeviceModel::XlV2,
    geometry: XL_GEOMETRY,
};

static CATALOG: [&CatalogEntry; 2] = [&XL, &XL_V2];

impl DeviceModel {
    /// Resolve a USB product id to a catalog model.
    pub fn from_product_id(product_id: u16) -> Result<Self> {
        CATALOG
            .iter()
            .find(|e| e.product_id == product_id)
            .map(|e| e.model)
            .ok_or(ScdkError::UnknownModel { product_id })
    }

    /// USB product id of this model.
    #[must_use]
    pub fn product_id(self) -> u16 {
        self.entry().product_id
    }

    /// Panel geometry of this model.
    #[must_use]
    pub fn geometry(self) -> &'static Geometry {
        &self.entry().geometry
    }

    /// Returns a human-readable name for this device model.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Xl => "Stream Deck XL",
            Self::XlV2 => "Stream Deck XL V2",
        }
    }

    const fn entry(self) -> &'static CatalogEntry {
        match self {
            Self::Xl => &XL,
            Self::XlV2 => &XL_V2,
        }
    }
}

/// Look up the panel geometry for a USB product id.
pub fn lookup(product_id: u16) -> Result<&'static Geometry> {
    DeviceModel::from_product_id(product_id).map(DeviceModel::geometry)
}

/// A device found during enumeration.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceDescriptor {
    /// Device serial number
    pub serial: String,
    /// Human-readable product name
    pub product_name: String,
    /// USB product id
    pub product_id: u16,
    /// Catalog model
    pub model: DeviceModel,
    /// Panel geometry
    pub geometry: Geometry,
}

impl DeviceDescriptor {
    /// Build a descriptor from a serial and a catalog model.
    #[must_use]
    pub fn new(serial: String, model: DeviceModel) -> Self {
        Self {
            serial,
            product_name: model.display_name().to_string(),
            product_id: model.product_id(),
            model,
            geometry: *model.geometry(),
        }
    }
}

/// Button press/release event.
#[derive(Debug, Clone, Serialize)]
pub struct ButtonEvent {
    /// Key column (0-based)
    pub column: usize,
    /// Key row (0-based)
    pub row: usize,
    /// Linear key index
    pub key: u8,
    /// True if pressed, false if released
    pub pressed: bool,
    /// Timestamp in milliseconds since watch started
    pub timestamp_ms: u64,
}
