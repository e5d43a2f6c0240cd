//! Litra command frame encoding.
//!
//! Every Litra command is a fixed 20-byte HID feature report:
//! - byte 0: report ID (0x11)
//! - byte 1: vendor marker (0xFF)
//! - byte 2: feature group (0x04)
//! - byte 3: opcode
//! - bytes 4..20: opcode payload followed by zero padding
//!
//! Encoding is pure. Range checks on absolute inputs belong to the caller
//! (see [`crate::safety`]).

use serde::{Deserialize, Serialize};

/// Report ID of every Litra command.
pub const REPORT_ID: u8 = 0x11;
/// Vendor marker byte.
pub const VENDOR_MARKER: u8 = 0xFF;
/// Lighting feature group.
pub const FEATURE_GROUP: u8 = 0x04;
/// Total frame length (including report ID).
pub const FRAME_LEN: usize = 20;
/// Offset of the first payload byte.
pub const PAYLOAD_OFFSET: usize = 4;

/// Litra lighting opcodes.
pub mod opcodes {
    /// Power on/off.
    pub const POWER: u8 = 0x1C;
    /// Brightness level.
    pub const BRIGHTNESS: u8 = 0x4C;
    /// Color temperature in kelvin.
    pub const TEMPERATURE: u8 = 0x9C;
}

/// Power payload: light off.
pub const LIGHT_OFF: u8 = 0x00;
/// Power payload: light on.
pub const LIGHT_ON: u8 = 0x01;

/// Lowest native brightness value (level 0).
pub const BRIGHTNESS_RAW_MIN: u8 = 0x14;
/// Highest native brightness value (level 100).
pub const BRIGHTNESS_RAW_MAX: u8 = 0xFA;

/// Light power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    Off,
    On,
}

impl PowerState {
    /// The opposite state.
    pub fn toggled(self) -> Self {
        match self {
            Self::Off => Self::On,
            Self::On => Self::Off,
        }
    }

    /// Value persisted in the state store (0 or 1).
    pub fn as_stored(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::On => 1,
        }
    }

    /// Parse a persisted value. Anything but 0 or 1 is unknown.
    pub fn from_stored(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Off),
            1 => Some(Self::On),
            _ => None,
        }
    }
}

impl std::fmt::Display for PowerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Off => write!(f, "off"),
            Self::On => write!(f, "on"),
        }
    }
}

/// A lighting command before encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Switch the light on or off.
    Power(PowerState),
    /// Brightness level in percent (0-100).
    Brightness(u8),
    /// Color temperature in kelvin (2700-6500).
    Temperature(u16),
}

impl Command {
    /// Encode into a 20-byte report.
    pub fn encode(&self) -> CommandFrame {
        match *self {
            Self::Power(state) => {
                let code = match state {
                    PowerState::On => LIGHT_ON,
                    PowerState::Off => LIGHT_OFF,
                };
                CommandFrame::new(opcodes::POWER, &[code])
            }
            // Native level travels as a 16-bit big-endian value; the high byte is always 0.
            Self::Brightness(level) => {
                CommandFrame::new(opcodes::BRIGHTNESS, &[0x00, brightness_to_raw(level)])
            }
            Self::Temperature(kelvin) => {
                CommandFrame::new(opcodes::TEMPERATURE, &kelvin.to_be_bytes())
            }
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Power(state) => write!(f, "Power {state}"),
            Self::Brightness(level) => write!(f, "Brightness {level}%"),
            Self::Temperature(kelvin) => write!(f, "Temperature {kelvin} K"),
        }
    }
}

/// Map a 0-100 level linearly onto the native range [0x14, 0xFA].
///
/// `raw = floor(0x14 + level / 100 * (0xFA - 0x14))`. Levels above 100
/// saturate at the native maximum.
pub fn brightness_to_raw(level: u8) -> u8 {
    let span = u32::from(BRIGHTNESS_RAW_MAX - BRIGHTNESS_RAW_MIN);
    let raw = u32::from(BRIGHTNESS_RAW_MIN) + u32::from(level) * span / 100;
    raw.min(u32::from(BRIGHTNESS_RAW_MAX)) as u8
}

/// An encoded Litra report.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame([u8; FRAME_LEN]);

impl CommandFrame {
    fn new(opcode: u8, payload: &[u8]) -> Self {
        let mut buf = [0u8; FRAME_LEN];
        buf[0] = REPORT_ID;
        buf[1] = VENDOR_MARKER;
        buf[2] = FEATURE_GROUP;
        buf[3] = opcode;
        buf[PAYLOAD_OFFSET..PAYLOAD_OFFSET + payload.len()].copy_from_slice(payload);
        Self(buf)
    }

    /// Raw report bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn opcode(&self) -> u8 {
        self.0[3]
    }

    /// Payload region (bytes 4..20, including padding).
    pub fn payload(&self) -> &[u8] {
        &self.0[PAYLOAD_OFFSET..]
    }
}

impl std::fmt::Debug for CommandFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CommandFrame({:02X?})", &self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(frame: &CommandFrame) -> &[u8] {
        &frame.as_bytes()[..3]
    }

    #[test]
    fn power_on_frame_matches_device_protocol() {
        let frame = Command::Power(PowerState::On).encode();
        let mut expected = [0u8; FRAME_LEN];
        expected[..5].copy_from_slice(&[0x11, 0xFF, 0x04, 0x1C, 0x01]);
        assert_eq!(frame.as_bytes(), &expected);
    }

    #[test]
    fn power_off_payload_is_zero() {
        let frame = Command::Power(PowerState::Off).encode();
        assert_eq!(frame.opcode(), opcodes::POWER);
        assert!(frame.payload().iter().all(|&b| b == 0));
    }

    #[test]
    fn brightness_bounds_map_to_native_range() {
        assert_eq!(brightness_to_raw(0), 0x14);
        assert_eq!(brightness_to_raw(100), 0xFA);
        assert_eq!(brightness_to_raw(50), 0x14 + (0xFA - 0x14) / 2);
    }

    #[test]
    fn brightness_mapping_floors() {
        // 7% of 230 = 16.1
        assert_eq!(brightness_to_raw(7), 0x14 + 16);
        assert_eq!(brightness_to_raw(1), 0x14 + 2);
    }

    #[test]
    fn brightness_above_range_saturates() {
        assert_eq!(brightness_to_raw(255), BRIGHTNESS_RAW_MAX);
    }

    #[test]
    fn brightness_frame_places_level_after_zero_byte() {
        let frame = Command::Brightness(50).encode();
        assert_eq!(frame.opcode(), 0x4C);
        assert_eq!(&frame.as_bytes()[4..6], &[0x00, 0x87]);
        assert!(frame.as_bytes()[6..].iter().all(|&b| b == 0));
    }

    #[test]
    fn temperature_is_big_endian() {
        let low = Command::Temperature(2700).encode();
        assert_eq!(&low.as_bytes()[4..6], &[0x0A, 0x8C]);

        let high = Command::Temperature(6500).encode();
        assert_eq!(&high.as_bytes()[4..6], &[0x19, 0x64]);

        let mid = Command::Temperature(4000).encode();
        assert_eq!(mid.opcode(), 0x9C);
        assert_eq!(&mid.as_bytes()[4..6], &[0x0F, 0xA0]);
    }

    #[test]
    fn all_frames_share_length_and_header() {
        let frames = [
            Command::Power(PowerState::On).encode(),
            Command::Brightness(30).encode(),
            Command::Temperature(5000).encode(),
        ];
        for frame in &frames {
            assert_eq!(frame.as_bytes().len(), FRAME_LEN);
            assert_eq!(header(frame), &[REPORT_ID, VENDOR_MARKER, FEATURE_GROUP]);
        }
    }

    #[test]
    fn power_state_stored_values() {
        assert_eq!(PowerState::from_stored(1), Some(PowerState::On));
        assert_eq!(PowerState::from_stored(0), Some(PowerState::Off));
        assert_eq!(PowerState::from_stored(2), None);
        assert_eq!(PowerState::from_stored(-1), None);
        assert_eq!(PowerState::On.as_stored(), 1);
        assert_eq!(PowerState::On.toggled(), PowerState::Off);
    }

    #[test]
    fn command_display_is_human_readable() {
        assert_eq!(Command::Power(PowerState::On).to_string(), "Power on");
        assert_eq!(Command::Brightness(40).to_string(), "Brightness 40%");
        assert_eq!(Command::Temperature(4000).to_string(), "Temperature 4000 K");
    }
}
