//! A host-side stand-in for the RP2040 USB controller and the USB host on
//! the other end of the cable.

use std::{cell::RefCell, rc::Rc};

use dialkbd::{
    keyboard::{DeviceInfo, KeyboardDescriptors, UsbKeyboard},
    usb::{mock::MockController, Register, UsbController},
};

/// The firmware's handle on the simulated controller, shared with the host.
#[derive(Clone, Default)]
pub struct SharedController(Rc<RefCell<MockController>>);

impl UsbController for SharedController {
    fn reset(&mut self) {
        self.0.borrow_mut().reset();
    }

    fn read(&self, register: Register) -> u32 {
        self.0.borrow().read(register)
    }

    fn write(&mut self, register: Register, value: u32) {
        self.0.borrow_mut().write(register, value);
    }

    fn set_bits(&mut self, register: Register, bits: u32) {
        self.0.borrow_mut().set_bits(register, bits);
    }

    fn read_packet(&self, offset: usize, buffer: &mut [u8]) {
        self.0.borrow().read_packet(offset, buffer);
    }

    fn write_packet(&mut self, offset: usize, data: &[u8]) {
        self.0.borrow_mut().write_packet(offset, data);
    }
}

pub fn dial_descriptors() -> KeyboardDescriptors {
    KeyboardDescriptors::new(&DeviceInfo {
        manufacturer: "Gboard DIY prototype",
        vendor_id: 0x6666,
        product_id: 0x2025,
        device_version: 0x0101,
        product_name: "Gboard Dial version",
        serial_number: "1 Dial",
    })
}

/// Plays the host side of the bus against a `UsbKeyboard`.
pub struct Host<'a> {
    bus: SharedController,
    pub keyboard: UsbKeyboard<'a, SharedController>,
}

impl<'a> Host<'a> {
    pub fn attach(descriptors: &'a KeyboardDescriptors) -> Self {
        let bus = SharedController::default();
        let keyboard = UsbKeyboard::new(bus.clone(), descriptors).unwrap();
        Host { bus, keyboard }
    }

    pub fn register(&self, register: Register) -> u32 {
        self.bus.0.borrow().value(register)
    }

    /// Takes the packet armed on an IN endpoint, if any.
    pub fn take_in(&mut self, endpoint: u8) -> Option<Vec<u8>> {
        let packet = self.bus.0.borrow().in_packet(endpoint)?;
        self.bus.0.borrow_mut().complete_in(endpoint);
        self.keyboard.on_interrupt();
        Some(packet)
    }

    /// Delivers an OUT packet, returning false when the endpoint is not armed.
    pub fn give_out(&mut self, endpoint: u8, data: &[u8]) -> bool {
        if !self.bus.0.borrow().is_out_armed(endpoint) {
            return false;
        }
        self.bus.0.borrow_mut().complete_out(endpoint, data);
        self.keyboard.on_interrupt();
        true
    }

    pub fn setup(&mut self, packet: [u8; 8]) {
        self.bus.0.borrow_mut().setup(packet);
        self.keyboard.on_interrupt();
    }

    pub fn bus_reset(&mut self) {
        self.bus.0.borrow_mut().bus_reset();
        self.keyboard.on_interrupt();
    }

    /// A control read: setup, data stage, then the zero-length status stage.
    pub fn control_in(&mut self, packet: [u8; 8]) -> Vec<u8> {
        self.setup(packet);
        let mut data = Vec::new();
        while let Some(chunk) = self.take_in(0) {
            let short = chunk.len() < 64;
            data.extend_from_slice(&chunk);
            if short {
                break;
            }
        }
        assert!(self.give_out(0, &[]), "status stage was not armed");
        data
    }

    /// A control write, returning whether the device completed the status stage.
    pub fn control_out(&mut self, packet: [u8; 8], data: &[u8]) -> bool {
        self.setup(packet);
        if !data.is_empty() && !self.give_out(0, data) {
            return false;
        }
        self.take_in(0) == Some(Vec::new())
    }

    /// Drains every report the keyboard has queued on its interrupt endpoint.
    pub fn reports(&mut self) -> Vec<Vec<u8>> {
        let mut reports = Vec::new();
        while let Some(report) = self.take_in(1) {
            reports.push(report);
        }
        reports
    }
}
