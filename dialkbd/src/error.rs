use core::fmt::Display;

/// Errors raised while bringing up the USB stack or assembling a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Endpoint buffers do not fit in the controller's packet memory.
    PacketMemoryExhausted,

    /// An endpoint declares a max packet size the controller cannot serve.
    InvalidMaxPacketSize(u16),

    /// More endpoints than the engine tracks.
    TooManyEndpoints,

    /// An endpoint descriptor names endpoint 0 or repeats an endpoint.
    InvalidEndpoint(u8),

    /// A response does not fit in its scratch buffer.
    BufferOverflow,
}

impl Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::PacketMemoryExhausted => write!(f, "packet memory exhausted"),
            Error::InvalidMaxPacketSize(size) => write!(f, "invalid max packet size: {}", size),
            Error::TooManyEndpoints => write!(f, "too many endpoints"),
            Error::InvalidEndpoint(address) => write!(f, "invalid endpoint: {:#04x}", address),
            Error::BufferOverflow => write!(f, "buffer overflow"),
        }
    }
}
