use core::cell::RefCell;

use critical_section::Mutex;

/// The one place a USB device lives once it is constructed.
///
/// The controller's interrupt vector can reach exactly one device, so the
/// slot is filled once at startup and the handler reaches the device through
/// it. Installing a second device panics.
pub struct DeviceSlot<T> {
    inner: Mutex<RefCell<Option<T>>>,
}

impl<T> DeviceSlot<T> {
    pub const fn new() -> Self {
        DeviceSlot {
            inner: Mutex::new(RefCell::new(None)),
        }
    }

    pub fn install(&self, device: T) {
        critical_section::with(|cs| {
            let mut slot = self.inner.borrow_ref_mut(cs);
            assert!(slot.is_none(), "USB device is already installed");
            *slot = Some(device);
        });
    }

    /// Runs `f` on the device, or returns `None` before it is installed.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        critical_section::with(|cs| self.inner.borrow_ref_mut(cs).as_mut().map(f))
    }
}

impl<T> Default for DeviceSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}
