use usb_device::UsbDirection;

/// Raw access to a device-side USB controller.
///
/// The engine never touches hardware except through this trait, so a board
/// crate binds it to the real registers and tests bind it to a simulation.
/// Packet offsets are byte offsets into the controller's packet memory.
pub trait UsbController {
    /// Returns the controller block to its power-on state and clears its
    /// packet memory.
    fn reset(&mut self);

    fn read(&self, register: Register) -> u32;

    fn write(&mut self, register: Register, value: u32);

    /// Sets `bits` without disturbing the other bits of `register`.
    fn set_bits(&mut self, register: Register, bits: u32);

    fn read_packet(&self, offset: usize, buffer: &mut [u8]);

    fn write_packet(&mut self, offset: usize, data: &[u8]);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Block {
    Registers,
    PacketMemory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    DeviceAddress,
    MainControl,
    SieControl,
    SieStatus,
    BufferStatus,
    Muxing,
    Power,
    InterruptEnable,
    InterruptStatus,
    /// Endpoint control word, endpoints 1 to 15 only.
    EndpointControl(u8, UsbDirection),
    BufferControl(u8, UsbDirection),
}

impl Register {
    /// Block and byte offset of the register on the RP2040.
    pub fn location(self) -> (Block, usize) {
        match self {
            Register::DeviceAddress => (Block::Registers, 0x00),
            Register::MainControl => (Block::Registers, 0x40),
            Register::SieControl => (Block::Registers, 0x4c),
            Register::SieStatus => (Block::Registers, 0x50),
            Register::BufferStatus => (Block::Registers, 0x58),
            Register::Muxing => (Block::Registers, 0x74),
            Register::Power => (Block::Registers, 0x78),
            Register::InterruptEnable => (Block::Registers, 0x90),
            Register::InterruptStatus => (Block::Registers, 0x98),
            Register::EndpointControl(number, direction) => {
                assert!(
                    (1..16).contains(&number),
                    "endpoint {} has no control register",
                    number
                );
                (
                    Block::PacketMemory,
                    0x08 + (number as usize - 1) * 8 + direction_offset(direction),
                )
            }
            Register::BufferControl(number, direction) => {
                assert!(number < 16, "endpoint {} out of range", number);
                (
                    Block::PacketMemory,
                    0x80 + number as usize * 8 + direction_offset(direction),
                )
            }
        }
    }
}

fn direction_offset(direction: UsbDirection) -> usize {
    match direction {
        UsbDirection::In => 0,
        UsbDirection::Out => 4,
    }
}
