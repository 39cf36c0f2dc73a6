//! Real device transport over `hidapi`.

use std::time::Duration;

use hidapi::{HidApi, HidDevice};
use tracing::{debug, trace};

use super::info::{DeviceDescriptor, DeviceModel, ELGATO_VENDOR_ID};
use super::{Transport, TransportError, TransportResult};
use crate::error::{Result, ScdkError};

/// Transport backed by an open HID device handle.
///
/// The handle is closed when the transport is dropped.
pub struct HidTransport {
    device: HidDevice,
}

impl HidTransport {
    /// Wrap an already opened HID device.
    pub const fn new(device: HidDevice) -> Self {
        Self { device }
    }
}

impl Transport for HidTransport {
    fn write(&mut self, report: &[u8]) -> TransportResult<usize> {
        self.device
            .write(report)
            .map_err(|e| TransportError::new(e.to_string()))
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> TransportResult<usize> {
        let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        self.device
            .read_timeout(buf, millis)
            .map_err(|e| TransportError::new(e.to_string()))
    }

    fn send_feature_report(&mut self, report: &[u8]) -> TransportResult<()> {
        self.device
            .send_feature_report(report)
            .map_err(|e| TransportError::new(e.to_string()))
    }

    fn serial_number(&mut self) -> TransportResult<Option<String>> {
        self.device
            .get_serial_number_string()
            .map_err(|e| TransportError::new(e.to_string()))
    }
}

fn new_hidapi() -> Result<HidApi> {
    HidApi::new().map_err(|e| ScdkError::DeviceCommunication(e.to_string()))
}

fn scan(hid: &HidApi) -> Vec<DeviceDescriptor> {
    hid.device_list()
        .filter(|d| d.vendor_id() == ELGATO_VENDOR_ID)
        .filter_map(|d| {
            let model = DeviceModel::from_product_id(d.product_id()).ok()?;
            let serial = d.serial_number()?.to_string();
            trace!(serial, ?model, "Found device");
            Some(DeviceDescriptor::new(serial, model))
        })
        .collect()
}

/// List all connected devices known to the catalog.
pub fn list_devices() -> Result<Vec<DeviceDescriptor>> {
    let hid = new_hidapi()?;
    let devices = scan(&hid);
    debug!(count = devices.len(), "Enumerated devices");
    Ok(devices)
}

/// Open a device, optionally by serial number.
///
/// Without a serial exactly one device must be connected.
pub fn open_transport(serial: Option<&str>) -> Result<(HidTransport, DeviceDescriptor)> {
    let hid = new_hidapi()?;
    let devices = scan(&hid);

    if devices.is_empty() {
        return Err(ScdkError::NoDevicesFound);
    }

    let target = if let Some(serial) = serial {
        devices
            .into_iter()
            .find(|d| d.serial == serial)
            .ok_or_else(|| ScdkError::DeviceNotFound {
                serial: serial.to_string(),
            })?
    } else if devices.len() == 1 {
        devices.into_iter().next().ok_or(ScdkError::NoDevicesFound)?
    } else {
        let serials = devices.into_iter().map(|d| d.serial).collect();
        return Err(ScdkError::MultipleDevices { serials });
    };

    let device = hid
        .open_serial(ELGATO_VENDOR_ID, target.product_id, &target.serial)
        .map_err(|e| ScdkError::DeviceOpenFailed {
            serial: target.serial.clone(),
            reason: e.to_string(),
        })?;

    debug!(serial = %target.serial, model = ?target.model, "Opened device");
    Ok((HidTransport::new(device), target))
}
