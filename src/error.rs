//! Error types for panel streaming operations.

use thiserror::Error;

/// Primary error type for screamdeck operations.
#[derive(Error, Debug)]
pub enum ScdkError {
    // Device selection errors
    #[error("No Stream Deck XL devices found")]
    NoDevicesFound,

    #[error("Device not found: {serial}")]
    DeviceNotFound { serial: String },

    #[error("Multiple devices found, specify --serial: {serials:?}")]
    MultipleDevices { serials: Vec<String> },

    #[error("Failed to open device '{serial}': {reason}")]
    DeviceOpenFailed { serial: String, reason: String },

    #[error("Unknown device model: product id {product_id:#06x}")]
    UnknownModel { product_id: u16 },

    // Configuration errors
    #[error("Invalid key ({column}, {row}): device has {columns}x{rows} keys")]
    InvalidKeyIndex {
        column: usize,
        row: usize,
        columns: usize,
        rows: usize,
    },

    #[error(
        "Invalid image dimensions: expected {expected_w}x{expected_h}, got {actual_w}x{actual_h}"
    )]
    InvalidImageDimensions {
        expected_w: usize,
        expected_h: usize,
        actual_w: usize,
        actual_h: usize,
    },

    #[error("Image buffer has {actual} bytes, expected {expected} for {format}")]
    BufferLength {
        expected: usize,
        actual: usize,
        format: String,
    },

    #[error("Unsupported pixel format: {0}")]
    UnsupportedPixelFormat(String),

    // Transport errors
    #[error("Failed to write report {chunk} for key {key}: {reason}")]
    ReportWrite { key: u8, chunk: u16, reason: String },

    #[error("Failed to send feature report: {0}")]
    FeatureReport(String),

    #[error("Failed to read input report: {0}")]
    InputRead(String),

    #[error("Device communication error: {0}")]
    DeviceCommunication(String),

    // Codec errors
    #[error("JPEG encoding failed for key {key}: {reason}")]
    Encode { key: u8, reason: String },

    // Resource errors
    #[error("Failed to allocate {bytes} bytes for session buffers")]
    Allocation { bytes: usize },

    // Image file errors
    #[error("Image file not found: {path}")]
    ImageNotFound { path: String },

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    // Config file errors
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScdkError {
    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::NoDevicesFound
                | Self::DeviceNotFound { .. }
                | Self::MultipleDevices { .. }
                | Self::InvalidKeyIndex { .. }
                | Self::InvalidImageDimensions { .. }
                | Self::ImageNotFound { .. }
                | Self::ConfigNotFound { .. }
                | Self::ConfigParse(_)
                | Self::InvalidArgument(_)
        )
    }

    /// Returns true for failures that happened while talking to the device.
    ///
    /// A resend of the whole panel after reopening is the expected recovery.
    pub const fn is_transport_error(&self) -> bool {
        matches!(
            self,
            Self::ReportWrite { .. }
                | Self::FeatureReport(_)
                | Self::InputRead(_)
                | Self::DeviceCommunication(_)
                | Self::DeviceOpenFailed { .. }
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NoDevicesFound => Some("Ensure the Stream Deck XL is connected via USB"),
            Self::MultipleDevices { .. } => Some("Use --serial to specify which device"),
            Self::DeviceOpenFailed { .. } => {
                Some("Check udev rules / permissions for the hidraw device")
            }
            Self::InvalidKeyIndex { .. } => Some("Columns and rows are 0-based"),
            Self::ImageNotFound { .. } => Some("Check the image path (a leading ~ is expanded)"),
            Self::ConfigNotFound { .. } => Some("Run: scdk config --robot to see the default path"),
            Self::ReportWrite { .. } => Some("Reconnect the device and resend the whole panel"),
            _ => None,
        }
    }
}

/// Convenience type alias for Results using ScdkError.
pub type Result<T> = std::result::Result<T, ScdkError>;
