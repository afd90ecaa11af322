//! Rotary dial position tracking from a gray-coded position sensor.

const BASE_POSITION: u8 = 0;

fn gray_to_binary(gray: u8) -> u8 {
    let mut binary = gray;
    let mut mask = gray >> 1;
    while mask != 0 {
        binary ^= mask;
        mask >>= 1;
    }
    binary
}

/// Decides which position a dial was turned to.
///
/// The dial is wound from its base position and springs back. A turn is
/// decided when the dial is back at base, and its value is the farthest
/// position reached on the way.
#[derive(Debug, Default)]
pub struct DialDecoder {
    position: u8,
    max_position: u8,
    decided_position: Option<u8>,
}

impl DialDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one sensor sample.
    pub fn update(&mut self, sensor_gray_code: u8) {
        self.position = gray_to_binary(sensor_gray_code);
        self.max_position = self.max_position.max(self.position);
        if self.position == BASE_POSITION && self.max_position != BASE_POSITION {
            self.decided_position = Some(self.max_position);
            self.max_position = BASE_POSITION;
        }
    }

    pub fn is_base_position(&self) -> bool {
        self.position == BASE_POSITION
    }

    /// The last decided position, 1-based. Taking it clears it.
    pub fn pop_decided_position(&mut self) -> Option<u8> {
        self.decided_position.take()
    }
}
