//! Device catalog and transport abstraction.
//!
//! This module provides a trait-based abstraction over the raw HID
//! transport, with a real `hidapi` implementation and a recording mock,
//! enabling the whole tile pipeline to be tested without hardware.

mod info;
pub mod mock;
mod real;

pub use info::{
    ButtonEvent, DeviceDescriptor, DeviceModel, ELGATO_VENDOR_ID, Geometry, lookup,
};
pub use real::{HidTransport, list_devices, open_transport};

use std::time::Duration;

use thiserror::Error;

/// Failure reported by a transport primitive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

impl TransportError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

/// Result of a transport primitive.
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Raw report-level access to an opened device.
///
/// Every call blocks until the operation completes. Implementations are
/// not expected to retry.
pub trait Transport {
    /// Write one fixed-length output report; returns bytes written.
    fn write(&mut self, report: &[u8]) -> TransportResult<usize>;

    /// Read one input report, waiting at most `timeout`.
    ///
    /// Returns `Ok(0)` when no report arrived in time.
    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> TransportResult<usize>;

    /// Send a feature report (control commands).
    fn send_feature_report(&mut self, report: &[u8]) -> TransportResult<()>;

    /// Serial number reported by the device, if any.
    fn serial_number(&mut self) -> TransportResult<Option<String>>;
}
