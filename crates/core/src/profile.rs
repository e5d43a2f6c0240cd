//! Persisted light state and named presets.
//!
//! Every section of the state file holds up to three fields: `brightness`,
//! `temperature`, and `power`. The `current` section records the state last
//! sent to all lights, `current-<N>` the state last sent to light N. Any
//! other section is a user preset.
//!
//! Writes are partial: unset fields of a [`ProfileState`] never touch what is
//! stored. Reads treat missing or non-integer fields as unset. Integers are
//! returned as stored, even outside the light's range; callers clamp.

use crate::command::{Command, PowerState};
use crate::config::{ConfigFile, FileSystem};
use crate::error::{Error, Result};
use crate::safety;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Section holding the state of all lights.
pub const CURRENT_PROFILE_NAME: &str = "current";

pub const KEY_BRIGHTNESS: &str = "brightness";
pub const KEY_TEMPERATURE: &str = "temperature";
pub const KEY_POWER: &str = "power";

/// Section name for a device index; 0 means all lights.
pub fn device_section_name(device_index: usize) -> String {
    if device_index == 0 {
        CURRENT_PROFILE_NAME.to_string()
    } else {
        format!("{CURRENT_PROFILE_NAME}-{device_index}")
    }
}

/// Whether `name` is a per-device section such as `current-2`.
pub fn is_device_section(name: &str) -> bool {
    name.strip_prefix(CURRENT_PROFILE_NAME)
        .and_then(|rest| rest.strip_prefix('-'))
        .is_some_and(|suffix| suffix.parse::<i64>().is_ok())
}

/// Brightness, temperature, and power of one section. `None` is unset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileState {
    /// Percent as stored; may lie outside 0-100.
    pub brightness: Option<i64>,
    /// Kelvin as stored; may lie outside 2700-6500.
    pub temperature: Option<i64>,
    pub power: Option<PowerState>,
}

impl ProfileState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_brightness(mut self, level: u8) -> Self {
        self.brightness = Some(level.into());
        self
    }

    pub fn with_temperature(mut self, kelvin: u16) -> Self {
        self.temperature = Some(kelvin.into());
        self
    }

    pub fn with_power(mut self, power: PowerState) -> Self {
        self.power = Some(power);
        self
    }

    /// True when every field is unset.
    pub fn is_empty(&self) -> bool {
        self.brightness.is_none() && self.temperature.is_none() && self.power.is_none()
    }
}

impl From<Command> for ProfileState {
    fn from(command: Command) -> Self {
        match command {
            Command::Power(state) => Self::new().with_power(state),
            Command::Brightness(level) => Self::new().with_brightness(level),
            Command::Temperature(kelvin) => Self::new().with_temperature(kelvin),
        }
    }
}

fn parse_stored(raw: Option<&str>) -> Option<i64> {
    raw?.trim().parse::<i64>().ok()
}

/// CRUD over the sections of the state file.
///
/// Every operation reads the file afresh; nothing is cached between calls.
#[derive(Debug)]
pub struct ProfileStore {
    file: ConfigFile,
}

impl ProfileStore {
    /// Store at the standard location.
    pub fn open(fs: Box<dyn FileSystem>) -> Result<Self> {
        Ok(Self {
            file: ConfigFile::locate(fs)?,
        })
    }

    /// Store at an explicit path.
    pub fn with_path(fs: Box<dyn FileSystem>, path: impl Into<PathBuf>) -> Self {
        Self {
            file: ConfigFile::at(fs, path),
        }
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Read a named section. A missing section reads as all-unset, and a
    /// power value other than 0 or 1 reads as unknown.
    pub fn read_profile(&self, name: &str) -> Result<ProfileState> {
        let doc = self.file.load()?;
        Ok(ProfileState {
            brightness: parse_stored(doc.get(name, KEY_BRIGHTNESS)),
            temperature: parse_stored(doc.get(name, KEY_TEMPERATURE)),
            power: parse_stored(doc.get(name, KEY_POWER)).and_then(PowerState::from_stored),
        })
    }

    /// Store the set fields of `state` under `name`, creating the section if
    /// absent. An all-unset state leaves the file untouched.
    pub fn add_or_update_profile(&self, name: &str, state: &ProfileState) -> Result<()> {
        safety::validate_section_name(name)?;
        let mut doc = self.file.load()?;
        if state.is_empty() {
            debug!(section = name, "Nothing to store");
            return Ok(());
        }

        doc.add_section(name);
        if let Some(level) = state.brightness {
            doc.set(name, KEY_BRIGHTNESS, &level.to_string());
        }
        if let Some(kelvin) = state.temperature {
            doc.set(name, KEY_TEMPERATURE, &kelvin.to_string());
        }
        if let Some(power) = state.power {
            doc.set(name, KEY_POWER, &power.as_stored().to_string());
        }
        debug!(section = name, ?state, "Storing profile");
        self.file.save(&doc)
    }

    /// Remove a section. Missing sections are not an error and leave the
    /// file unchanged.
    pub fn delete_profile(&self, name: &str) -> Result<()> {
        let mut doc = self.file.load()?;
        if doc.remove_section(name) {
            debug!(section = name, "Deleting profile");
            self.file.save(&doc)?;
        }
        Ok(())
    }

    /// `current` followed by every preset name in file order.
    pub fn profile_names(&self) -> Result<Vec<String>> {
        let doc = self.file.load()?;
        let mut names = vec![CURRENT_PROFILE_NAME.to_string()];
        names.extend(
            doc.section_names()
                .filter(|name| *name != CURRENT_PROFILE_NAME && !is_device_section(name))
                .map(str::to_string),
        );
        Ok(names)
    }

    /// Stored state for a device index (0 = all lights).
    pub fn read_state(&self, device_index: usize) -> Result<ProfileState> {
        self.read_profile(&device_section_name(device_index))
    }

    /// Record state for a device index (0 = all lights).
    pub fn write_state(&self, device_index: usize, state: &ProfileState) -> Result<()> {
        self.add_or_update_profile(&device_section_name(device_index), state)
    }

    /// Copy the stored state of `device_index` into preset `name`.
    pub fn save_state_as_profile(&self, name: &str, device_index: usize) -> Result<ProfileState> {
        let state = self.read_state(device_index)?;
        if state.is_empty() {
            return Err(Error::Profile(format!(
                "no stored state for device {device_index}; nothing to save"
            )));
        }
        self.add_or_update_profile(name, &state)?;
        Ok(state)
    }
}
