use embedded_hal::digital::InputPin;

/// A row of photo interrupters read as one binary word, first pin as bit 0.
pub struct PhotoSensor<P: InputPin, const N: usize> {
    pins: [P; N],
}

impl<P: InputPin, const N: usize> PhotoSensor<P, N> {
    pub fn new(pins: [P; N]) -> Self {
        PhotoSensor { pins }
    }

    pub fn read(&mut self) -> u8 {
        self.pins
            .iter_mut()
            .enumerate()
            .fold(0, |value, (bit, pin)| match pin.is_high() {
                Ok(true) => value | 1 << bit,
                _ => value,
            })
    }
}
