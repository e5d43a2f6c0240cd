//! litra-core: Litra light discovery, command encoding, and state persistence.
//!
//! This crate drives Logitech Litra Glow and Litra Beam lights over USB HID
//! and remembers the last values sent to each light, plus named presets, in
//! a small INI file so relative adjustments work without querying hardware.

pub mod command;
pub mod config;
pub mod control;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod ini;
pub mod profile;
pub mod safety;
pub mod transport;

/// Logitech USB Vendor ID.
pub const LOGITECH_VID: u16 = 0x046D;

/// Known Litra product IDs.
pub mod pids {
    /// Litra Glow.
    pub const LITRA_GLOW: u16 = 0xC900;
    /// Litra Beam.
    pub const LITRA_BEAM: u16 = 0xC901;
}
