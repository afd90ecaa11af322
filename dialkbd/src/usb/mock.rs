//! Simulated controller that tests drive in place of the RP2040 block.
//!
//! Built for this crate's unit tests and, behind the `test-util` feature,
//! for integration tests.

use std::collections::HashMap;
use std::vec::Vec;

use usb_device::UsbDirection;

use super::{registers::*, Block, Register, UsbController, PACKET_MEMORY_SIZE};

pub struct MockController {
    registers: HashMap<usize, u32>,
    packet_memory: [u8; PACKET_MEMORY_SIZE],
    pub writes: Vec<(Register, u32)>,
    pub resets: usize,
}

impl Default for MockController {
    fn default() -> Self {
        Self::new()
    }
}

impl MockController {
    pub fn new() -> Self {
        MockController {
            registers: HashMap::new(),
            packet_memory: [0; PACKET_MEMORY_SIZE],
            writes: Vec::new(),
            resets: 0,
        }
    }

    fn register(&self, offset: usize) -> u32 {
        self.registers.get(&offset).copied().unwrap_or(0)
    }

    fn raise(&mut self, register: Register, bits: u32) {
        let (_, offset) = register.location();
        let value = self.register(offset) | bits;
        self.registers.insert(offset, value);
    }

    fn buffer_offset(&self, endpoint: u8, direction: UsbDirection) -> usize {
        if endpoint == 0 {
            0x100
        } else {
            (self.read(Register::EndpointControl(endpoint, direction)) & 0xffff) as usize
        }
    }

    /// The host delivers a setup packet.
    pub fn setup(&mut self, packet: [u8; 8]) {
        self.packet_memory[..8].copy_from_slice(&packet);
        self.raise(Register::SieStatus, SIE_STATUS_SETUP_REC);
    }

    pub fn bus_reset(&mut self) {
        self.raise(Register::SieStatus, SIE_STATUS_BUS_RESET);
    }

    /// The packet armed on an IN buffer, if any.
    pub fn in_packet(&self, endpoint: u8) -> Option<Vec<u8>> {
        let control = self.read(Register::BufferControl(endpoint, UsbDirection::In));
        if control & BUF_CTRL_AVAIL == 0 {
            return None;
        }
        let len = (control & BUF_CTRL_LEN_MASK) as usize;
        let offset = self.buffer_offset(endpoint, UsbDirection::In);
        Some(self.packet_memory[offset..offset + len].to_vec())
    }

    pub fn is_out_armed(&self, endpoint: u8) -> bool {
        self.read(Register::BufferControl(endpoint, UsbDirection::Out)) & BUF_CTRL_AVAIL != 0
    }

    /// The host takes the armed IN packet.
    pub fn complete_in(&mut self, endpoint: u8) {
        let register = Register::BufferControl(endpoint, UsbDirection::In);
        let control = self.read(register);
        self.store(register, control & !(BUF_CTRL_AVAIL | BUF_CTRL_FULL));
        self.raise(Register::BufferStatus, 1 << (endpoint * 2));
    }

    /// The host fills the armed OUT buffer with `data`.
    pub fn complete_out(&mut self, endpoint: u8, data: &[u8]) {
        let offset = self.buffer_offset(endpoint, UsbDirection::Out);
        self.packet_memory[offset..offset + data.len()].copy_from_slice(data);
        let register = Register::BufferControl(endpoint, UsbDirection::Out);
        let control = self.read(register) & BUF_CTRL_DATA1_PID;
        self.store(register, control | BUF_CTRL_FULL | data.len() as u32);
        self.raise(Register::BufferStatus, 1 << (endpoint * 2 + 1));
    }

    pub fn pid(&self, endpoint: u8, direction: UsbDirection) -> u32 {
        self.read(Register::BufferControl(endpoint, direction)) & BUF_CTRL_DATA1_PID
    }

    pub fn value(&self, register: Register) -> u32 {
        self.read(register)
    }

    fn store(&mut self, register: Register, value: u32) {
        match register.location() {
            (Block::Registers, offset) => {
                self.registers.insert(offset, value);
            }
            (Block::PacketMemory, offset) => {
                self.packet_memory[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
            }
        }
    }
}

impl UsbController for MockController {
    fn reset(&mut self) {
        self.resets += 1;
        self.registers.clear();
        self.packet_memory = [0; PACKET_MEMORY_SIZE];
    }

    fn read(&self, register: Register) -> u32 {
        match register {
            Register::InterruptStatus => {
                let sie = self.read(Register::SieStatus);
                let mut ints = 0;
                if sie & SIE_STATUS_SETUP_REC != 0 {
                    ints |= INTS_SETUP_REQ;
                }
                if sie & SIE_STATUS_BUS_RESET != 0 {
                    ints |= INTS_BUS_RESET;
                }
                if self.read(Register::BufferStatus) != 0 {
                    ints |= INTS_BUFF_STATUS;
                }
                ints
            }
            _ => match register.location() {
                (Block::Registers, offset) => self.register(offset),
                (Block::PacketMemory, offset) => {
                    let mut word = [0; 4];
                    word.copy_from_slice(&self.packet_memory[offset..offset + 4]);
                    u32::from_le_bytes(word)
                }
            },
        }
    }

    fn write(&mut self, register: Register, value: u32) {
        self.writes.push((register, value));
        match register {
            Register::SieStatus | Register::BufferStatus => {
                let (_, offset) = register.location();
                let value = self.register(offset) & !value;
                self.registers.insert(offset, value);
            }
            _ => self.store(register, value),
        }
    }

    fn set_bits(&mut self, register: Register, bits: u32) {
        self.writes.push((register, bits));
        let value = self.read(register) | bits;
        self.store(register, value);
    }

    fn read_packet(&self, offset: usize, buffer: &mut [u8]) {
        buffer.copy_from_slice(&self.packet_memory[offset..offset + buffer.len()]);
    }

    fn write_packet(&mut self, offset: usize, data: &[u8]) {
        self.packet_memory[offset..offset + data.len()].copy_from_slice(data);
    }
}
