//! Device model: product catalog and discovery.
//!
//! A discovery pass enumerates every catalog product, deduplicates units by
//! serial number, and assigns 1-based indices in ascending serial order.
//! Results are transient: every dispatch runs its own pass.

use crate::transport::{HidBackend, HidDeviceInfo, OpenHandle};
use crate::{pids, LOGITECH_VID};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, error, trace, warn};

/// Supported Litra models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LitraModel {
    Glow,
    Beam,
}

impl LitraModel {
    /// Every model, in enumeration order.
    pub const ALL: &'static [LitraModel] = &[LitraModel::Glow, LitraModel::Beam];

    /// Look up model from USB product ID.
    pub fn from_pid(pid: u16) -> Option<Self> {
        match pid {
            pids::LITRA_GLOW => Some(Self::Glow),
            pids::LITRA_BEAM => Some(Self::Beam),
            _ => None,
        }
    }

    /// Short product name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Glow => "Glow",
            Self::Beam => "Beam",
        }
    }

    /// USB Product ID.
    pub fn pid(&self) -> u16 {
        match self {
            Self::Glow => pids::LITRA_GLOW,
            Self::Beam => pids::LITRA_BEAM,
        }
    }
}

impl std::fmt::Display for LitraModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Litra {}", self.name())
    }
}

/// Metadata of a unit found during a discovery pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    /// 1-based position in ascending serial order.
    pub index: usize,
    pub name: String,
    pub serial: String,
    pub product_id: u16,
}

/// A discovered unit together with its open handle.
#[derive(Debug)]
pub struct OpenDevice {
    pub info: DiscoveredDevice,
    pub handle: OpenHandle,
}

/// A unit that was enumerated but could not be opened.
#[derive(Debug, Clone)]
pub struct OpenFailure {
    pub info: DiscoveredDevice,
    pub error: String,
}

/// Logging behavior of discovery passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Log each enumerated unit at debug level instead of trace.
    pub log_devices: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self { log_devices: true }
    }
}

/// Result of one discovery pass.
///
/// Indices cover every enumerated unit. A unit that fails to open keeps its
/// index and is listed in `failures`.
#[derive(Debug, Default)]
pub struct Discovery {
    pub devices: Vec<OpenDevice>,
    pub failures: Vec<OpenFailure>,
}

impl Discovery {
    /// Number of units enumerated, opened or not.
    pub fn enumerated(&self) -> usize {
        self.devices.len() + self.failures.len()
    }

    /// Close every opened handle and return the metadata of all units.
    pub fn into_listing(self) -> Vec<DiscoveredDevice> {
        let mut listing = Vec::with_capacity(self.devices.len());
        for device in self.devices {
            if let Err(e) = device.handle.close() {
                warn!(serial = %device.info.serial, error = %e, "Failed to close HID device");
            }
            listing.push(device.info);
        }
        listing
    }
}

/// Run a discovery pass over the product catalog.
///
/// Enumeration and open failures are logged and skipped; they never abort
/// the pass.
pub fn discover(backend: &mut dyn HidBackend, options: &DiscoveryOptions) -> Discovery {
    debug!("Starting Litra device enumeration");

    // Keyed by serial: ordered ascending, last write wins on duplicates.
    let mut found: BTreeMap<String, (HidDeviceInfo, LitraModel)> = BTreeMap::new();
    for &model in LitraModel::ALL {
        let result = backend.enumerate(LOGITECH_VID, model.pid(), &mut |info| {
            found.insert(info.serial.clone(), (info.clone(), model));
        });
        if let Err(e) = result {
            warn!(
                model = model.name(),
                pid = format_args!("0x{:04X}", model.pid()),
                error = %e,
                "Enumeration failed"
            );
        }
    }

    let mut discovery = Discovery::default();
    for (position, (serial, (info, model))) in found.into_iter().enumerate() {
        let metadata = DiscoveredDevice {
            index: position + 1,
            name: model.name().to_string(),
            serial,
            product_id: info.product_id,
        };

        if options.log_devices {
            debug!(
                index = metadata.index,
                model = model.name(),
                serial = %metadata.serial,
                path = %info.path,
                "Found Litra device"
            );
        } else {
            trace!(index = metadata.index, serial = %metadata.serial, "Found Litra device");
        }

        match backend.open(info.vendor_id, info.product_id, &metadata.serial) {
            Ok(handle) => discovery.devices.push(OpenDevice {
                handle: OpenHandle::new(metadata.serial.clone(), handle),
                info: metadata,
            }),
            Err(e) => {
                error!(index = metadata.index, serial = %metadata.serial, error = %e, "Failed to open device");
                discovery.failures.push(OpenFailure {
                    info: metadata,
                    error: e.to_string(),
                });
            }
        }
    }

    debug!(
        enumerated = discovery.enumerated(),
        opened = discovery.devices.len(),
        "Device enumeration complete"
    );
    discovery
}

/// List connected units. Every handle opened for the listing is closed
/// before returning.
pub fn list_devices(backend: &mut dyn HidBackend, options: &DiscoveryOptions) -> Vec<DiscoveredDevice> {
    discover(backend, options).into_listing()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockBackend;

    const QUIET: DiscoveryOptions = DiscoveryOptions { log_devices: false };

    #[test]
    fn litra_model_from_known_pid() {
        assert_eq!(LitraModel::from_pid(0xC900), Some(LitraModel::Glow));
        assert_eq!(LitraModel::from_pid(0xC901), Some(LitraModel::Beam));
    }

    #[test]
    fn litra_model_from_unknown_pid() {
        assert_eq!(LitraModel::from_pid(0x1234), None);
    }

    #[test]
    fn litra_model_pid_roundtrip() {
        for model in LitraModel::ALL {
            assert_eq!(LitraModel::from_pid(model.pid()), Some(*model));
        }
    }

    #[test]
    fn indices_follow_ascending_serial_order() {
        let mut backend = MockBackend::new()
            .with_unit(pids::LITRA_GLOW, "serial-c")
            .with_unit(pids::LITRA_BEAM, "serial-a")
            .with_unit(pids::LITRA_GLOW, "serial-b");

        let devices = list_devices(&mut backend, &QUIET);

        let summary: Vec<(usize, &str, &str)> = devices
            .iter()
            .map(|d| (d.index, d.serial.as_str(), d.name.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (1, "serial-a", "Beam"),
                (2, "serial-b", "Glow"),
                (3, "serial-c", "Glow"),
            ]
        );
    }

    #[test]
    fn listing_closes_every_handle() {
        let mut backend = MockBackend::new()
            .with_unit(pids::LITRA_GLOW, "g")
            .with_unit(pids::LITRA_BEAM, "b");
        let log = backend.log();

        let devices = list_devices(&mut backend, &QUIET);
        assert_eq!(devices.len(), 2);

        let log = log.lock().unwrap();
        assert_eq!(log.close_count("g"), 1);
        assert_eq!(log.close_count("b"), 1);
        assert!(log.writes.is_empty());
    }

    #[test]
    fn duplicate_serial_last_write_wins() {
        let mut backend = MockBackend::new()
            .with_unit(pids::LITRA_GLOW, "same")
            .with_unit(pids::LITRA_BEAM, "same");

        let devices = list_devices(&mut backend, &QUIET);

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name, "Beam");
        assert_eq!(devices[0].product_id, pids::LITRA_BEAM);
    }

    #[test]
    fn unopenable_unit_is_excluded_but_keeps_its_index() {
        let mut backend = MockBackend::new()
            .with_unit(pids::LITRA_GLOW, "a")
            .with_unopenable_unit(pids::LITRA_GLOW, "b")
            .with_unit(pids::LITRA_BEAM, "c");

        let discovery = discover(&mut backend, &QUIET);

        assert_eq!(discovery.enumerated(), 3);
        let opened: Vec<usize> = discovery.devices.iter().map(|d| d.info.index).collect();
        assert_eq!(opened, vec![1, 3]);
        assert_eq!(discovery.failures.len(), 1);
        assert_eq!(discovery.failures[0].info.index, 2);
    }

    #[test]
    fn enumeration_failure_does_not_abort_pass() {
        let mut backend = MockBackend::new()
            .with_unit(pids::LITRA_GLOW, "g")
            .with_unit(pids::LITRA_BEAM, "b")
            .with_failing_enumeration(pids::LITRA_GLOW);

        let devices = list_devices(&mut backend, &QUIET);

        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].serial, "b");
        assert_eq!(devices[0].index, 1);
    }

    #[test]
    fn empty_bus_yields_empty_listing() {
        let mut backend = MockBackend::new();
        assert!(list_devices(&mut backend, &DiscoveryOptions::default()).is_empty());
    }

    #[test]
    fn listing_serializes_to_json() {
        let mut backend = MockBackend::new().with_unit(pids::LITRA_BEAM, "xyz");
        let devices = list_devices(&mut backend, &QUIET);
        let json = serde_json::to_value(&devices).unwrap();
        assert_eq!(json[0]["index"], 1);
        assert_eq!(json[0]["name"], "Beam");
        assert_eq!(json[0]["serial"], "xyz");
        assert_eq!(json[0]["product_id"], 0xC901);
    }
}
