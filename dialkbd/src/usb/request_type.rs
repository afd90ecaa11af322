const DIRECTION_IN: u8 = 0x80;
const TYPE_SHIFT: u8 = 5;
const TYPE_MASK: u8 = 0b11;
const RECIPIENT_MASK: u8 = 0b1_1111;

/// The bmRequestType byte of a setup packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BmRequestType(pub u8);

impl BmRequestType {
    #[inline]
    pub fn bits(&self) -> u8 {
        self.0
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        match self.0 & DIRECTION_IN {
            0 => Direction::HostToDevice,
            _ => Direction::DeviceToHost,
        }
    }

    #[inline]
    pub fn request_type(&self) -> Type {
        match (self.0 >> TYPE_SHIFT) & TYPE_MASK {
            0 => Type::Standard,
            1 => Type::Class,
            2 => Type::Vendor,
            _ => Type::Reserved,
        }
    }

    #[inline]
    pub fn recipient(&self) -> Recipient {
        match self.0 & RECIPIENT_MASK {
            0 => Recipient::Device,
            1 => Recipient::Interface,
            2 => Recipient::Endpoint,
            3 => Recipient::Other,
            _ => Recipient::Reserved,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    HostToDevice,
    DeviceToHost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Type {
    Standard,
    Class,
    Vendor,
    Reserved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Recipient {
    Device,
    Interface,
    Endpoint,
    Other,
    Reserved,
}
