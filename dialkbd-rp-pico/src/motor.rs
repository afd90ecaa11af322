use embedded_hal::digital::{OutputPin, PinState};

const PHASES: u8 = 8;

/// A 4-coil stepper that turns the dial back while it is away from base.
///
/// Odd phases energize one coil and even phases rest, so a full turn of the
/// phase counter walks the coils once.
pub struct Motor<P: OutputPin> {
    coils: [P; 4],
    phase: u8,
    running: bool,
}

impl<P: OutputPin> Motor<P> {
    pub fn new(mut coils: [P; 4]) -> Self {
        for coil in coils.iter_mut() {
            coil.set_low().ok();
        }
        Motor {
            coils,
            phase: 0,
            running: false,
        }
    }

    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    /// Advances one phase. Call every `MOTOR_STEP_INTERVAL`.
    pub fn step(&mut self) {
        let on = self.running && self.phase & 1 != 0;
        let coil = (self.phase >> 1) as usize;
        for (i, pin) in self.coils.iter_mut().enumerate() {
            pin.set_state(PinState::from(on && i == coil)).ok();
        }
        self.phase = (self.phase + PHASES - 1) % PHASES;
    }
}
