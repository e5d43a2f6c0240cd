//! Command dispatch: deliver one frame to the targeted units.
//!
//! Every dispatch runs a fresh discovery pass and opens every unit, even
//! when only one is targeted. All opened handles are closed before `send`
//! returns, on every path. Per-device failures are collected in the
//! returned [`DispatchReport`] instead of aborting the pass; nothing is
//! retried.

use crate::command::{CommandFrame, FRAME_LEN};
use crate::device::{self, DiscoveredDevice, DiscoveryOptions};
use crate::transport::HidBackend;
use tracing::{debug, warn};

/// Target index addressing every discovered unit.
pub const BROADCAST: usize = 0;

/// What happened to one enumerated unit during a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The report was written.
    Written { bytes: usize },
    /// The unit was opened but not targeted.
    Skipped,
    /// The unit was targeted but the write failed.
    WriteFailed(String),
    /// The unit could not be opened.
    OpenFailed(String),
}

/// Outcome for one enumerated unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceOutcome {
    pub device: DiscoveredDevice,
    pub delivery: Delivery,
}

/// Aggregated outcome of a dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    /// Requested target (0 = broadcast).
    pub target: usize,
    /// One entry per enumerated unit, in index order.
    pub outcomes: Vec<DeviceOutcome>,
}

impl DispatchReport {
    /// Number of units enumerated (opened or not).
    pub fn discovered(&self) -> usize {
        self.outcomes.len()
    }

    /// Number of units that accepted the write.
    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.delivery, Delivery::Written { .. }))
            .count()
    }

    /// Outcomes for units that failed to open or write.
    pub fn failures(&self) -> impl Iterator<Item = &DeviceOutcome> {
        self.outcomes.iter().filter(|o| {
            matches!(
                o.delivery,
                Delivery::WriteFailed(_) | Delivery::OpenFailed(_)
            )
        })
    }

    /// Whether the target matched any enumerated unit.
    pub fn target_found(&self) -> bool {
        self.target == BROADCAST || self.outcomes.iter().any(|o| o.device.index == self.target)
    }
}

fn is_targeted(target: usize, index: usize) -> bool {
    target == BROADCAST || target == index
}

/// Write `frame` to the unit with index `target`, or to every unit when
/// `target` is [`BROADCAST`].
pub fn send(
    backend: &mut dyn HidBackend,
    frame: &CommandFrame,
    target: usize,
    options: &DiscoveryOptions,
) -> DispatchReport {
    let mut discovery = device::discover(backend, options);
    let mut outcomes = Vec::with_capacity(discovery.enumerated());

    for failure in &discovery.failures {
        outcomes.push(DeviceOutcome {
            device: failure.info.clone(),
            delivery: Delivery::OpenFailed(failure.error.clone()),
        });
    }

    for device in &mut discovery.devices {
        let delivery = if is_targeted(target, device.info.index) {
            match device.handle.write(frame.as_bytes()) {
                Ok(bytes) => {
                    if bytes < FRAME_LEN {
                        warn!(
                            index = device.info.index,
                            serial = %device.info.serial,
                            bytes,
                            "Short write"
                        );
                    }
                    debug!(
                        index = device.info.index,
                        serial = %device.info.serial,
                        opcode = format_args!("0x{:02X}", frame.opcode()),
                        "Report written"
                    );
                    Delivery::Written { bytes }
                }
                Err(e) => {
                    warn!(
                        index = device.info.index,
                        serial = %device.info.serial,
                        error = %e,
                        "Write failed"
                    );
                    Delivery::WriteFailed(e.to_string())
                }
            }
        } else {
            Delivery::Skipped
        };
        outcomes.push(DeviceOutcome {
            device: device.info.clone(),
            delivery,
        });
    }

    for device in discovery.devices {
        if let Err(e) = device.handle.close() {
            warn!(serial = %device.info.serial, error = %e, "Failed to close HID device");
        }
    }

    outcomes.sort_by_key(|o| o.device.index);
    let report = DispatchReport { target, outcomes };
    if !report.target_found() {
        warn!(target, "No device with this index");
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, PowerState};
    use crate::pids;
    use crate::transport::mock::MockBackend;

    const QUIET: DiscoveryOptions = DiscoveryOptions { log_devices: false };

    fn two_lights() -> MockBackend {
        MockBackend::new()
            .with_unit(pids::LITRA_GLOW, "test-serial-Glow")
            .with_unit(pids::LITRA_BEAM, "test-serial-Beam")
    }

    #[test]
    fn broadcast_writes_every_device() {
        let mut backend = two_lights();
        let log = backend.log();
        let frame = Command::Power(PowerState::On).encode();

        let report = send(&mut backend, &frame, BROADCAST, &QUIET);

        assert_eq!(report.delivered(), 2);
        let log = log.lock().unwrap();
        assert_eq!(log.writes_to("test-serial-Glow"), vec![frame.as_bytes().to_vec()]);
        assert_eq!(log.writes_to("test-serial-Beam"), vec![frame.as_bytes().to_vec()]);
        assert_eq!(log.close_count("test-serial-Glow"), 1);
        assert_eq!(log.close_count("test-serial-Beam"), 1);
    }

    #[test]
    fn targeted_send_writes_one_but_closes_all() {
        let mut backend = two_lights();
        let log = backend.log();
        let frame = Command::Power(PowerState::On).encode();

        // Beam sorts first, so it is index 1.
        let report = send(&mut backend, &frame, 1, &QUIET);

        assert_eq!(report.delivered(), 1);
        assert_eq!(report.outcomes[1].delivery, Delivery::Skipped);
        let log = log.lock().unwrap();
        assert_eq!(log.writes_to("test-serial-Beam").len(), 1);
        assert!(log.writes_to("test-serial-Glow").is_empty());
        assert_eq!(log.opens.len(), 2);
        assert_eq!(log.close_count("test-serial-Beam"), 1);
        assert_eq!(log.close_count("test-serial-Glow"), 1);
    }

    #[test]
    fn write_failure_does_not_stop_remaining_devices() {
        let mut backend = MockBackend::new()
            .with_broken_unit(pids::LITRA_GLOW, "a")
            .with_unit(pids::LITRA_BEAM, "b");
        let log = backend.log();
        let frame = Command::Brightness(40).encode();

        let report = send(&mut backend, &frame, BROADCAST, &QUIET);

        assert_eq!(report.delivered(), 1);
        let failures: Vec<&DeviceOutcome> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].device.serial, "a");
        assert!(matches!(failures[0].delivery, Delivery::WriteFailed(_)));

        let log = log.lock().unwrap();
        assert_eq!(log.writes_to("b").len(), 1);
        assert_eq!(log.close_count("a"), 1);
        assert_eq!(log.close_count("b"), 1);
    }

    #[test]
    fn open_failure_is_reported_in_index_order() {
        let mut backend = MockBackend::new()
            .with_unopenable_unit(pids::LITRA_GLOW, "a")
            .with_unit(pids::LITRA_BEAM, "b");
        let frame = Command::Temperature(4000).encode();

        let report = send(&mut backend, &frame, BROADCAST, &QUIET);

        assert_eq!(report.discovered(), 2);
        assert_eq!(report.outcomes[0].device.index, 1);
        assert!(matches!(report.outcomes[0].delivery, Delivery::OpenFailed(_)));
        assert_eq!(report.outcomes[1].delivery, Delivery::Written { bytes: FRAME_LEN });
    }

    #[test]
    fn no_devices_is_an_empty_report() {
        let mut backend = MockBackend::new();
        let frame = Command::Power(PowerState::Off).encode();

        let report = send(&mut backend, &frame, BROADCAST, &QUIET);

        assert_eq!(report.discovered(), 0);
        assert_eq!(report.delivered(), 0);
        assert!(report.target_found());
    }

    #[test]
    fn unknown_target_writes_nothing() {
        let mut backend = two_lights();
        let log = backend.log();
        let frame = Command::Power(PowerState::On).encode();

        let report = send(&mut backend, &frame, 7, &QUIET);

        assert!(!report.target_found());
        assert_eq!(report.delivered(), 0);
        let log = log.lock().unwrap();
        assert!(log.writes.is_empty());
        assert_eq!(log.closes.values().sum::<usize>(), 2);
    }
}
