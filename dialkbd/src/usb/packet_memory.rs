use crate::Error;

pub const PACKET_MEMORY_SIZE: usize = 4096;
pub const SETUP_PACKET_OFFSET: usize = 0x000;
/// Largest packet a full-speed control or interrupt endpoint may carry.
pub const MAX_PACKET_SIZE: u16 = 64;

const EP0_BUFFER_OFFSET: usize = 0x100;
const ENDPOINT_BUFFER_OFFSET: usize = 0x180;
const BUFFER_ALIGNMENT: usize = 64;

/// A fixed region of packet memory owned by one endpoint direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BufferSlot {
    offset: usize,
    size: usize,
}

impl BufferSlot {
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Offset to copy a packet of `len` bytes through.
    ///
    /// Panics when the packet would run past the slot.
    pub fn checked(&self, len: usize) -> usize {
        assert!(
            len <= self.size,
            "{} byte packet overruns a {} byte buffer",
            len,
            self.size
        );
        self.offset
    }
}

/// Hands out endpoint buffer slots, once, at engine construction.
#[derive(Debug)]
pub struct PacketMemory {
    next: usize,
}

impl PacketMemory {
    pub fn new() -> Self {
        PacketMemory {
            next: ENDPOINT_BUFFER_OFFSET,
        }
    }

    /// The buffer endpoint 0 shares between both directions.
    pub fn control_slot(max_packet_size: u16) -> Result<BufferSlot, Error> {
        validate(max_packet_size)?;
        Ok(BufferSlot {
            offset: EP0_BUFFER_OFFSET,
            size: max_packet_size as usize,
        })
    }

    pub fn allocate(&mut self, max_packet_size: u16) -> Result<BufferSlot, Error> {
        validate(max_packet_size)?;
        let size = (max_packet_size as usize).next_multiple_of(BUFFER_ALIGNMENT);
        let offset = self.next;
        if offset + size > PACKET_MEMORY_SIZE {
            return Err(Error::PacketMemoryExhausted);
        }
        self.next = offset + size;
        Ok(BufferSlot {
            offset,
            size: max_packet_size as usize,
        })
    }
}

impl Default for PacketMemory {
    fn default() -> Self {
        Self::new()
    }
}

fn validate(max_packet_size: u16) -> Result<(), Error> {
    if max_packet_size == 0 || max_packet_size > MAX_PACKET_SIZE {
        Err(Error::InvalidMaxPacketSize(max_packet_size))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_aligned_and_disjoint() {
        let mut memory = PacketMemory::new();
        let first = memory.allocate(8).unwrap();
        let second = memory.allocate(64).unwrap();
        assert_eq!(first.offset(), 0x180);
        assert_eq!(first.size(), 8);
        assert_eq!(second.offset(), 0x1c0);
        assert_eq!(PacketMemory::control_slot(64).unwrap().offset(), 0x100);
    }

    #[test]
    fn exhausts_packet_memory() {
        let mut memory = PacketMemory::new();
        let fits = (PACKET_MEMORY_SIZE - 0x180) / 64;
        for _ in 0..fits {
            memory.allocate(64).unwrap();
        }
        assert_eq!(memory.allocate(64), Err(Error::PacketMemoryExhausted));
    }

    #[test]
    fn rejects_oversized_packets() {
        let mut memory = PacketMemory::new();
        assert_eq!(memory.allocate(512), Err(Error::InvalidMaxPacketSize(512)));
        assert_eq!(
            PacketMemory::control_slot(0),
            Err(Error::InvalidMaxPacketSize(0))
        );
    }

    #[test]
    #[should_panic]
    fn slot_bounds_are_checked() {
        PacketMemory::control_slot(8).unwrap().checked(9);
    }
}
