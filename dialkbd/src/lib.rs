#![cfg_attr(not(any(test, feature = "test-util")), no_std)]

pub mod dial;
mod error;
pub mod hid;
pub mod keyboard;
pub mod usb;

pub use error::Error;
