//! HID transport abstraction for device communication.
//!
//! Provides a trait-based transport layer so that real HID devices and
//! mock devices share the same interface. The backend is handed to the
//! device directory and dispatcher explicitly; nothing here is global.

use crate::error::{Error, Result};
use tracing::{trace, warn};

/// Identity of one enumerated HID unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HidDeviceInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub serial: String,
    pub path: String,
}

/// An opened HID device.
pub trait HidHandle {
    /// Write a raw report, returning the number of bytes accepted.
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Release the device. Called exactly once per opened handle.
    fn close(&mut self) -> Result<()>;
}

/// Enumerate and open HID devices.
pub trait HidBackend {
    /// Call `visitor` once for every unit matching `vendor_id`/`product_id`.
    fn enumerate(
        &mut self,
        vendor_id: u16,
        product_id: u16,
        visitor: &mut dyn FnMut(&HidDeviceInfo),
    ) -> Result<()>;

    /// Open the unit with the given serial number.
    fn open(&self, vendor_id: u16, product_id: u16, serial: &str) -> Result<Box<dyn HidHandle>>;
}

/// Scoped ownership of an opened handle.
///
/// The handle is closed by [`OpenHandle::close`] or, failing that, on drop,
/// so every exit path releases it exactly once.
pub struct OpenHandle {
    serial: String,
    handle: Option<Box<dyn HidHandle>>,
}

impl OpenHandle {
    pub fn new(serial: impl Into<String>, handle: Box<dyn HidHandle>) -> Self {
        Self {
            serial: serial.into(),
            handle: Some(handle),
        }
    }

    /// Write a raw report to the device.
    pub fn write(&mut self, data: &[u8]) -> Result<usize> {
        trace!(
            serial = %self.serial,
            report_hex = format_args!("{:02X?}", data),
            "HID TX"
        );
        match self.handle.as_mut() {
            Some(handle) => handle.write(data),
            None => Err(Error::Hid(format!("device {} already closed", self.serial))),
        }
    }

    /// Close the device now and report any error.
    pub fn close(mut self) -> Result<()> {
        self.release()
    }

    fn release(&mut self) -> Result<()> {
        match self.handle.take() {
            Some(mut handle) => handle.close(),
            None => Ok(()),
        }
    }
}

impl Drop for OpenHandle {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(serial = %self.serial, error = %e, "Failed to close HID device");
        }
    }
}

impl std::fmt::Debug for OpenHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenHandle")
            .field("serial", &self.serial)
            .field("open", &self.handle.is_some())
            .finish()
    }
}

/// Backend over the system HID library.
pub struct HidApiBackend {
    api: hidapi::HidApi,
}

impl HidApiBackend {
    pub fn new() -> Result<Self> {
        let api = hidapi::HidApi::new().map_err(|e| Error::Hid(format!("hidapi init: {e}")))?;
        Ok(Self { api })
    }
}

impl HidBackend for HidApiBackend {
    fn enumerate(
        &mut self,
        vendor_id: u16,
        product_id: u16,
        visitor: &mut dyn FnMut(&HidDeviceInfo),
    ) -> Result<()> {
        self.api
            .refresh_devices()
            .map_err(|e| Error::Hid(format!("refresh device list: {e}")))?;

        for info in self.api.device_list() {
            if info.vendor_id() != vendor_id || info.product_id() != product_id {
                continue;
            }
            visitor(&HidDeviceInfo {
                vendor_id: info.vendor_id(),
                product_id: info.product_id(),
                serial: info.serial_number().unwrap_or_default().to_string(),
                path: info.path().to_string_lossy().into_owned(),
            });
        }
        Ok(())
    }

    fn open(&self, vendor_id: u16, product_id: u16, serial: &str) -> Result<Box<dyn HidHandle>> {
        let device = self
            .api
            .open_serial(vendor_id, product_id, serial)
            .map_err(|e| {
                Error::Hid(format!(
                    "open HID device (VID=0x{:04X} PID=0x{:04X} serial={}): {e}",
                    vendor_id, product_id, serial
                ))
            })?;
        Ok(Box::new(HidApiHandle {
            device: Some(device),
        }))
    }
}

struct HidApiHandle {
    device: Option<hidapi::HidDevice>,
}

impl HidHandle for HidApiHandle {
    fn write(&mut self, data: &[u8]) -> Result<usize> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| Error::Hid("write: device closed".to_string()))?;
        device
            .write(data)
            .map_err(|e| Error::Hid(format!("write: {e}")))
    }

    fn close(&mut self) -> Result<()> {
        // hidapi releases the device when the handle is dropped.
        self.device.take();
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::mock::MockBackend;
    use super::*;
    use crate::pids;

    #[test]
    fn open_handle_closes_once_when_closed_explicitly() {
        let backend = MockBackend::new().with_unit(pids::LITRA_GLOW, "A");
        let log = backend.log();
        let handle = backend.open(crate::LOGITECH_VID, pids::LITRA_GLOW, "A").unwrap();

        let open = OpenHandle::new("A", handle);
        open.close().unwrap();

        assert_eq!(log.lock().unwrap().close_count("A"), 1);
    }

    #[test]
    fn open_handle_closes_on_drop() {
        let backend = MockBackend::new().with_unit(pids::LITRA_BEAM, "B");
        let log = backend.log();
        {
            let handle = backend.open(crate::LOGITECH_VID, pids::LITRA_BEAM, "B").unwrap();
            let mut open = OpenHandle::new("B", handle);
            open.write(&[0x11]).unwrap();
        }
        let log = log.lock().unwrap();
        assert_eq!(log.close_count("B"), 1);
        assert_eq!(log.writes_to("B"), vec![vec![0x11]]);
    }

    #[test]
    fn mock_enumerate_filters_by_product() {
        let mut backend = MockBackend::new()
            .with_unit(pids::LITRA_GLOW, "G1")
            .with_unit(pids::LITRA_BEAM, "B1");
        let mut seen = Vec::new();
        backend
            .enumerate(crate::LOGITECH_VID, pids::LITRA_BEAM, &mut |info| {
                seen.push(info.serial.clone())
            })
            .unwrap();
        assert_eq!(seen, vec!["B1".to_string()]);
    }

    #[test]
    fn mock_open_failure_is_reported() {
        let backend = MockBackend::new().with_unopenable_unit(pids::LITRA_GLOW, "X");
        let result = backend.open(crate::LOGITECH_VID, pids::LITRA_GLOW, "X");
        assert!(result.is_err());
        assert!(backend.log().lock().unwrap().opens.is_empty());
    }
}
