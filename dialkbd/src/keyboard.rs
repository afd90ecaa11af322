mod boot_keyboard;
mod device_info;
mod key;
mod keyboard_descriptors;
pub mod modifier;
mod usage_set;
mod usb_keyboard;

pub use boot_keyboard::BootKeyboard;
pub use device_info::DeviceInfo;
pub use key::{Key, ERROR_ROLL_OVER};
pub use keyboard_descriptors::{KeyboardDescriptors, KEYBOARD_ENDPOINT};
pub use usage_set::UsageSet;
pub use usb_keyboard::{KeyEvent, UsbKeyboard};
