use super::{BootKeyboard, KeyboardDescriptors, KEYBOARD_ENDPOINT};
use crate::{
    hid::{HidClass, HidReporter},
    usb::{DeviceState, UsbController, UsbDevice},
    Error,
};

/// A key event from whatever senses the keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeyEvent {
    Press(u8),
    Release(u8),
    Modifiers(u8),
}

/// A USB boot keyboard: the whole stack behind one value.
pub struct UsbKeyboard<'a, H> {
    device: UsbDevice<'a, H, HidClass<'a, BootKeyboard>>,
}

impl<'a, H: UsbController> UsbKeyboard<'a, H> {
    /// Brings up the controller and connects to the bus.
    pub fn new(controller: H, descriptors: &'a KeyboardDescriptors) -> Result<Self, Error> {
        let class = HidClass::new(
            descriptors.hid(),
            descriptors.report_descriptor(),
            BootKeyboard::new(KEYBOARD_ENDPOINT),
        );
        Ok(UsbKeyboard {
            device: UsbDevice::new(controller, descriptors.usb(), class)?,
        })
    }

    /// Services the controller. Call this from the USB interrupt handler.
    pub fn on_interrupt(&mut self) {
        self.device.on_interrupt();
    }

    pub fn state(&self) -> DeviceState {
        self.device.state()
    }

    pub fn keyboard(&self) -> &BootKeyboard {
        self.device.class().reports()
    }

    pub fn device(&self) -> &UsbDevice<'a, H, HidClass<'a, BootKeyboard>> {
        &self.device
    }

    pub fn press_by_usage_id(&mut self, usage: u8) {
        self.with_keyboard(|keyboard, reporter| keyboard.press(reporter, usage));
    }

    pub fn release_by_usage_id(&mut self, usage: u8) {
        self.with_keyboard(|keyboard, reporter| keyboard.release(reporter, usage));
    }

    pub fn set_modifiers(&mut self, mask: u8) {
        self.with_keyboard(|keyboard, _| keyboard.set_modifiers(mask));
    }

    pub fn modifiers(&self) -> u8 {
        self.keyboard().modifiers()
    }

    pub fn set_auto_key_release(&mut self, enabled: bool) {
        self.with_keyboard(|keyboard, _| keyboard.set_auto_release(enabled));
    }

    pub fn apply(&mut self, event: KeyEvent) {
        match event {
            KeyEvent::Press(usage) => self.press_by_usage_id(usage),
            KeyEvent::Release(usage) => self.release_by_usage_id(usage),
            KeyEvent::Modifiers(mask) => self.set_modifiers(mask),
        }
    }

    fn with_keyboard<T>(
        &mut self,
        f: impl FnOnce(&mut BootKeyboard, &mut HidReporter<'_, '_, H>) -> T,
    ) -> T {
        self.device
            .with_class(|class, transport| class.with_reports(transport, f))
    }
}
