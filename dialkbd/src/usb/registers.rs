//! Bit assignments of the RP2040 USB controller.

pub const INTS_SETUP_REQ: u32 = 1 << 16;
pub const INTS_BUS_RESET: u32 = 1 << 12;
pub const INTS_BUFF_STATUS: u32 = 1 << 4;

// SIE_STATUS is write-one-to-clear.
pub const SIE_STATUS_SETUP_REC: u32 = 1 << 17;
pub const SIE_STATUS_BUS_RESET: u32 = 1 << 19;

pub const SIE_CTRL_PULLUP_EN: u32 = 1 << 16;
pub const SIE_CTRL_EP0_INT_1BUF: u32 = 1 << 29;

pub const MAIN_CTRL_CONTROLLER_EN: u32 = 1 << 0;

pub const USB_MUXING_TO_PHY: u32 = 1 << 0;
pub const USB_MUXING_SOFTCON: u32 = 1 << 3;

pub const USB_PWR_VBUS_DETECT: u32 = 1 << 2;
pub const USB_PWR_VBUS_DETECT_OVERRIDE_EN: u32 = 1 << 3;

pub const EP_CTRL_ENABLE: u32 = 1 << 31;
pub const EP_CTRL_INTERRUPT_PER_BUFFER: u32 = 1 << 29;
pub const EP_CTRL_BUFFER_TYPE_LSB: u32 = 26;

pub const BUF_CTRL_FULL: u32 = 1 << 15;
pub const BUF_CTRL_DATA1_PID: u32 = 1 << 13;
pub const BUF_CTRL_AVAIL: u32 = 1 << 10;
pub const BUF_CTRL_LEN_MASK: u32 = 0x3ff;
