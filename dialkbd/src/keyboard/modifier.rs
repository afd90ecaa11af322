//! Bits of the modifier byte in a boot keyboard report.

pub const LEFT_CTRL: u8 = 1 << 0;
pub const LEFT_SHIFT: u8 = 1 << 1;
pub const LEFT_ALT: u8 = 1 << 2;
pub const LEFT_GUI: u8 = 1 << 3;
pub const RIGHT_CTRL: u8 = 1 << 4;
pub const RIGHT_SHIFT: u8 = 1 << 5;
pub const RIGHT_ALT: u8 = 1 << 6;
pub const RIGHT_GUI: u8 = 1 << 7;
