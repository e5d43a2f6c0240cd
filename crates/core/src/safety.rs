//! Range validation for user-supplied values.
//!
//! The command codec and dispatcher do not re-check absolute values; callers
//! validate here before building a command. Relative adjustments clamp to
//! the same bounds instead of failing.
//!
//! ## Brightness
//! - **Range**: 0 – 100 percent, mapped onto native 0x14 – 0xFA
//!
//! ## Temperature
//! - **Range**: 2700 – 6500 K (Litra Glow and Litra Beam)

use crate::error::{Error, Result};
use crate::profile::{is_device_section, CURRENT_PROFILE_NAME};

/// Brightness constraints (percent).
pub const BRIGHTNESS_MIN: u8 = 0;
pub const BRIGHTNESS_MAX: u8 = 100;

/// Color temperature constraints (kelvin).
pub const TEMPERATURE_MIN: u16 = 2700;
pub const TEMPERATURE_MAX: u16 = 6500;

/// Validate a brightness level.
pub fn validate_brightness(level: u32) -> Result<u8> {
    if level > u32::from(BRIGHTNESS_MAX) {
        return Err(Error::OutOfRange {
            field: "brightness",
            value: level.into(),
            min: BRIGHTNESS_MIN.into(),
            max: BRIGHTNESS_MAX.into(),
        });
    }
    Ok(level as u8)
}

/// Validate a brightness step for relative adjustment.
pub fn validate_brightness_delta(delta: u32) -> Result<u8> {
    validate_brightness(delta).map_err(|_| Error::OutOfRange {
        field: "brightness_delta",
        value: delta.into(),
        min: BRIGHTNESS_MIN.into(),
        max: BRIGHTNESS_MAX.into(),
    })
}

/// Validate a color temperature.
pub fn validate_temperature(kelvin: u32) -> Result<u16> {
    if !(u32::from(TEMPERATURE_MIN)..=u32::from(TEMPERATURE_MAX)).contains(&kelvin) {
        return Err(Error::OutOfRange {
            field: "temperature",
            value: kelvin.into(),
            min: TEMPERATURE_MIN.into(),
            max: TEMPERATURE_MAX.into(),
        });
    }
    Ok(kelvin as u16)
}

/// Validate a name for a user preset.
///
/// Rejects the reserved device sections (`current-<N>`) and anything that
/// cannot be written as a section header.
pub fn validate_profile_name(name: &str) -> Result<&str> {
    validate_section_name(name)?;
    if is_device_section(name) {
        return Err(Error::Profile(format!(
            "'{name}' is reserved for device state (use a name other than {CURRENT_PROFILE_NAME}-<N>)"
        )));
    }
    Ok(name)
}

/// Reject names that cannot be written as an INI section header.
pub(crate) fn validate_section_name(name: &str) -> Result<()> {
    if name.trim().is_empty() || name.trim() != name {
        return Err(Error::Profile(format!(
            "profile name {name:?} must be non-empty without surrounding spaces"
        )));
    }
    if name.contains(['[', ']', '\n', '\r']) {
        return Err(Error::Profile(format!(
            "profile name {name:?} contains a reserved character"
        )));
    }
    Ok(())
}
