//! Top-level light operations.
//!
//! Absolute setters encode a command, dispatch it, and then record the
//! requested value against the device's `current` section. Relative
//! adjusters start from the *stored* value (never from the hardware),
//! clamp the result to the valid range, and run the absolute pipeline.
//!
//! State updates are optimistic: the stored value is the one requested, not
//! one read back from the light. If a light is reset behind our back the
//! store drifts until the next absolute write.

use crate::command::{Command, PowerState};
use crate::device::{self, DiscoveredDevice, DiscoveryOptions};
use crate::dispatch::{self, DispatchReport};
use crate::error::{Error, Result};
use crate::profile::{ProfileState, ProfileStore};
use crate::safety::{BRIGHTNESS_MAX, BRIGHTNESS_MIN, TEMPERATURE_MAX, TEMPERATURE_MIN};
use crate::transport::HidBackend;
use tracing::{info, warn};

/// Construction-time settings of a [`Controller`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerOptions {
    pub discovery: DiscoveryOptions,
    /// Skip the state update when no light accepted the write.
    pub require_delivery: bool,
}

/// A command that was dispatched, with its per-device outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub command: Command,
    pub report: DispatchReport,
    /// Whether the state store was updated.
    pub recorded: bool,
}

/// Stored brightness adjusted by `delta`, clamped to 0-100.
///
/// An unset stored value counts as 0. The clamp applies after the delta, so
/// a stored 150 lowered by 10 yields 100.
pub fn adjust_brightness(stored: Option<i64>, delta: i32) -> u8 {
    let base = stored.unwrap_or(BRIGHTNESS_MIN.into());
    base.saturating_add(delta.into())
        .clamp(BRIGHTNESS_MIN.into(), BRIGHTNESS_MAX.into()) as u8
}

/// Stored temperature adjusted by `delta`, clamped to 2700-6500 K.
///
/// An unset stored value counts as 2700.
pub fn adjust_temperature(stored: Option<i64>, delta: i32) -> u16 {
    let base = stored.unwrap_or(TEMPERATURE_MIN.into());
    base.saturating_add(delta.into())
        .clamp(TEMPERATURE_MIN.into(), TEMPERATURE_MAX.into()) as u16
}

/// Drives the lights and keeps the state store in step.
///
/// Device index 0 addresses every light; N addresses light N from the most
/// recent discovery pass.
pub struct Controller {
    backend: Box<dyn HidBackend>,
    store: ProfileStore,
    options: ControllerOptions,
}

impl Controller {
    pub fn new(backend: Box<dyn HidBackend>, store: ProfileStore, options: ControllerOptions) -> Self {
        Self {
            backend,
            store,
            options,
        }
    }

    /// The state store, for preset management.
    pub fn store(&self) -> &ProfileStore {
        &self.store
    }

    /// Connected lights with their indices.
    pub fn list_devices(&mut self) -> Vec<DiscoveredDevice> {
        device::list_devices(self.backend.as_mut(), &self.options.discovery)
    }

    /// Dispatch `command` and record it against `device_index`.
    pub fn apply(&mut self, device_index: usize, command: Command) -> Result<Applied> {
        let frame = command.encode();
        let report = dispatch::send(
            self.backend.as_mut(),
            &frame,
            device_index,
            &self.options.discovery,
        );

        if self.options.require_delivery && report.delivered() == 0 {
            warn!(
                device_index,
                ?command,
                discovered = report.discovered(),
                "No light accepted the command; state not recorded"
            );
            return Ok(Applied {
                command,
                report,
                recorded: false,
            });
        }

        self.store
            .write_state(device_index, &ProfileState::from(command))?;
        Ok(Applied {
            command,
            report,
            recorded: true,
        })
    }

    pub fn set_power(&mut self, device_index: usize, power: PowerState) -> Result<Applied> {
        self.apply(device_index, Command::Power(power))
    }

    pub fn power_on(&mut self, device_index: usize) -> Result<Applied> {
        self.set_power(device_index, PowerState::On)
    }

    pub fn power_off(&mut self, device_index: usize) -> Result<Applied> {
        self.set_power(device_index, PowerState::Off)
    }

    /// Switch off if the stored power is on, otherwise switch on.
    pub fn toggle(&mut self, device_index: usize) -> Result<Applied> {
        let stored = self.store.read_state(device_index)?.power;
        self.set_power(device_index, stored.map_or(PowerState::On, PowerState::toggled))
    }

    /// Set brightness in percent. The level is not range-checked here.
    pub fn set_brightness(&mut self, device_index: usize, level: u8) -> Result<Applied> {
        self.apply(device_index, Command::Brightness(level))
    }

    pub fn bright_up(&mut self, device_index: usize, delta: u8) -> Result<Applied> {
        let stored = self.store.read_state(device_index)?.brightness;
        let level = adjust_brightness(stored, i32::from(delta));
        self.set_brightness(device_index, level)
    }

    pub fn bright_down(&mut self, device_index: usize, delta: u8) -> Result<Applied> {
        let stored = self.store.read_state(device_index)?.brightness;
        let level = adjust_brightness(stored, -i32::from(delta));
        self.set_brightness(device_index, level)
    }

    /// Set color temperature in kelvin. The value is not range-checked here.
    pub fn set_temperature(&mut self, device_index: usize, kelvin: u16) -> Result<Applied> {
        self.apply(device_index, Command::Temperature(kelvin))
    }

    pub fn temp_up(&mut self, device_index: usize, delta: u16) -> Result<Applied> {
        let stored = self.store.read_state(device_index)?.temperature;
        let kelvin = adjust_temperature(stored, i32::from(delta));
        self.set_temperature(device_index, kelvin)
    }

    pub fn temp_down(&mut self, device_index: usize, delta: u16) -> Result<Applied> {
        let stored = self.store.read_state(device_index)?.temperature;
        let kelvin = adjust_temperature(stored, -i32::from(delta));
        self.set_temperature(device_index, kelvin)
    }

    /// Send the fields stored in preset `name` to `device_index`.
    ///
    /// Brightness and temperature go first and power last, so an "off"
    /// preset leaves the light off. Unset fields are skipped; stored values
    /// outside the light's range are clamped.
    pub fn apply_profile(&mut self, name: &str, device_index: usize) -> Result<Vec<Applied>> {
        if !self.store.profile_names()?.iter().any(|n| n == name) {
            return Err(Error::Profile(format!("no such profile: {name}")));
        }
        let preset = self.store.read_profile(name)?;
        info!(profile = name, device_index, ?preset, "Applying profile");

        let mut applied = Vec::new();
        if let Some(level) = preset.brightness {
            applied.push(self.set_brightness(device_index, adjust_brightness(Some(level), 0))?);
        }
        if let Some(kelvin) = preset.temperature {
            applied.push(self.set_temperature(device_index, adjust_temperature(Some(kelvin), 0))?);
        }
        if let Some(power) = preset.power {
            applied.push(self.set_power(device_index, power)?);
        }
        Ok(applied)
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("store", &self.store)
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightness_clamps_at_bounds() {
        assert_eq!(adjust_brightness(Some(5), -10), 0);
        assert_eq!(adjust_brightness(Some(95), 10), 100);
        assert_eq!(adjust_brightness(Some(40), 10), 50);
        assert_eq!(adjust_brightness(Some(40), -10), 30);
    }

    #[test]
    fn temperature_clamps_at_bounds() {
        assert_eq!(adjust_temperature(Some(2800), -200), 2700);
        assert_eq!(adjust_temperature(Some(6400), 200), 6500);
        assert_eq!(adjust_temperature(Some(4000), 500), 4500);
    }

    #[test]
    fn unset_values_start_from_minimum() {
        assert_eq!(adjust_brightness(None, 10), 10);
        assert_eq!(adjust_brightness(None, -10), 0);
        assert_eq!(adjust_temperature(None, 300), 3000);
        assert_eq!(adjust_temperature(None, -300), 2700);
    }

    #[test]
    fn extreme_deltas_do_not_overflow() {
        assert_eq!(adjust_brightness(Some(100), i32::MAX), 100);
        assert_eq!(adjust_temperature(Some(2700), i32::MIN), 2700);
        assert_eq!(adjust_brightness(Some(i64::MAX), 1), 100);
        assert_eq!(adjust_temperature(Some(i64::MIN), -1), 2700);
    }

    #[test]
    fn out_of_range_stored_values_clamp_after_adjusting() {
        assert_eq!(adjust_temperature(Some(2000), 100), 2700);
        assert_eq!(adjust_temperature(Some(9000), -100), 6500);
        assert_eq!(adjust_brightness(Some(150), -10), 100);
        assert_eq!(adjust_brightness(Some(-20), 10), 0);
    }
}
