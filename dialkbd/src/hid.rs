mod hid_class;
mod hid_report;

pub use hid_class::{HidClass, HidReporter, HidReports, ReportSink};
pub use hid_report::{BootKeyboardReport, BOOT_KEYBOARD_REPORT_SIZE};
