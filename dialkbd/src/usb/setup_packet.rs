use super::request_type::{BmRequestType, Direction, Recipient, Type};

#[allow(non_snake_case)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetupPacket {
    pub bmRequestType: BmRequestType,
    pub bRequest: u8,
    pub wValue: u16,
    pub wIndex: u16,
    pub wLength: u16,
}

impl SetupPacket {
    pub const LENGTH: usize = 8;

    pub fn parse(bytes: &[u8; Self::LENGTH]) -> Self {
        SetupPacket {
            bmRequestType: BmRequestType(bytes[0]),
            bRequest: bytes[1],
            wValue: u16::from_le_bytes([bytes[2], bytes[3]]),
            wIndex: u16::from_le_bytes([bytes[4], bytes[5]]),
            wLength: u16::from_le_bytes([bytes[6], bytes[7]]),
        }
    }

    pub fn direction(&self) -> Direction {
        self.bmRequestType.direction()
    }

    pub fn request_type(&self) -> Type {
        self.bmRequestType.request_type()
    }

    pub fn recipient(&self) -> Recipient {
        self.bmRequestType.recipient()
    }

    /// High byte of wValue, the descriptor type of a GET_DESCRIPTOR.
    pub fn value_high(&self) -> u8 {
        (self.wValue >> 8) as u8
    }

    pub fn value_low(&self) -> u8 {
        (self.wValue & 0xff) as u8
    }
}
