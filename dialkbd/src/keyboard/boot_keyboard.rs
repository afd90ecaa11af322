use super::{key::ERROR_ROLL_OVER, usage_set::UsageSet};
use crate::hid::{BootKeyboardReport, HidReports, ReportSink};

/// Pressed keys and modifiers of a boot keyboard, and the reports they make.
///
/// One report is in flight at a time. Changes made while a report is
/// transmitting are folded into a single follow-up report built from the
/// latest state once the previous one completes.
#[derive(Debug)]
pub struct BootKeyboard {
    endpoint: u8,
    modifiers: u8,
    pressed: UsageSet,
    in_flight: bool,
    dirty: bool,
    auto_release: bool,
}

impl BootKeyboard {
    const NUM_ROLLOVER: usize = 6;

    /// A keyboard reporting on IN endpoint `endpoint`.
    pub fn new(endpoint: u8) -> Self {
        BootKeyboard {
            endpoint,
            modifiers: 0,
            pressed: UsageSet::new(),
            in_flight: false,
            dirty: false,
            auto_release: false,
        }
    }

    /// Replaces the modifier byte. It goes out with the next report.
    pub fn set_modifiers(&mut self, mask: u8) {
        self.modifiers = mask;
    }

    pub fn modifiers(&self) -> u8 {
        self.modifiers
    }

    /// When enabled, every non-empty report is followed by an all-released one.
    pub fn set_auto_release(&mut self, enabled: bool) {
        self.auto_release = enabled;
    }

    pub fn is_pressed(&self, usage: u8) -> bool {
        self.pressed.contains(usage)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Presses `usage` and reports the state, including any modifier change.
    pub fn press<S: ReportSink>(&mut self, sink: &mut S, usage: u8) {
        self.pressed.insert(usage);
        self.changed(sink);
    }

    /// Releases `usage`; nothing happens if it is not pressed.
    pub fn release<S: ReportSink>(&mut self, sink: &mut S, usage: u8) {
        if self.pressed.remove(usage) {
            self.changed(sink);
        }
    }

    pub fn build_report(&self) -> BootKeyboardReport {
        let mut report = BootKeyboardReport {
            modifier: self.modifiers,
            reserved: 0,
            leds: 0,
            key_codes: [0; 6],
        };
        if self.pressed.len() > Self::NUM_ROLLOVER {
            report.key_codes = [ERROR_ROLL_OVER; 6];
        } else {
            self.pressed
                .iter()
                .enumerate()
                .for_each(|(i, usage)| report.key_codes[i] = usage);
        }
        report
    }

    fn changed<S: ReportSink>(&mut self, sink: &mut S) {
        if self.in_flight {
            self.dirty = true;
        } else {
            self.send_report(sink);
        }
    }

    fn send_report<S: ReportSink>(&mut self, sink: &mut S) {
        let frame = self.build_report().to_bytes();
        self.dirty = false;
        if self.auto_release && !self.pressed.is_empty() {
            self.pressed.clear();
            self.modifiers = 0;
            self.dirty = true;
        }
        self.in_flight = true;
        sink.report(self.endpoint, &frame);
    }
}

impl HidReports for BootKeyboard {
    fn on_send_complete<S: ReportSink>(&mut self, sink: &mut S, endpoint: u8) {
        if endpoint != self.endpoint {
            return;
        }
        self.in_flight = false;
        if self.dirty {
            self.send_report(sink);
        }
    }

    fn on_output_report(&mut self, _data: &[u8]) {
        #[cfg(feature = "defmt")]
        defmt::debug!("LED report discarded: {=[u8]:x}", _data);
    }

    fn on_bus_reset(&mut self) {
        self.in_flight = false;
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyboard::{modifier, Key};

    #[derive(Default)]
    struct Frames(std::vec::Vec<(u8, [u8; 8])>);

    impl ReportSink for Frames {
        fn report(&mut self, endpoint: u8, data: &[u8]) {
            let mut frame = [0; 8];
            frame.copy_from_slice(data);
            self.0.push((endpoint, frame));
        }
    }

    fn complete(keyboard: &mut BootKeyboard, frames: &mut Frames) {
        keyboard.on_send_complete(frames, 1);
    }

    #[test]
    fn reports_keys_in_ascending_order() {
        let mut keyboard = BootKeyboard::new(1);
        let mut frames = Frames::default();
        keyboard.set_modifiers(modifier::LEFT_SHIFT);
        for usage in [0x1d, 0x04, 0x10] {
            keyboard.press(&mut frames, usage);
            complete(&mut keyboard, &mut frames);
        }
        assert_eq!(
            frames.0.last(),
            Some(&(1, [0x02, 0, 0x04, 0x10, 0x1d, 0, 0, 0]))
        );
    }

    #[test]
    fn six_keys_fill_the_report() {
        let mut keyboard = BootKeyboard::new(1);
        let mut frames = Frames::default();
        keyboard.in_flight = true;
        for usage in [0x09, 0x08, 0x07, 0x06, 0x05, 0x04] {
            keyboard.press(&mut frames, usage);
        }
        assert_eq!(
            keyboard.build_report().to_bytes(),
            [0, 0, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09]
        );
    }

    #[test]
    fn more_than_six_keys_roll_over() {
        let mut keyboard = BootKeyboard::new(1);
        let mut frames = Frames::default();
        keyboard.set_modifiers(modifier::RIGHT_ALT);
        for usage in 0x04..0x0b {
            keyboard.press(&mut frames, usage);
        }
        complete(&mut keyboard, &mut frames);
        assert_eq!(
            frames.0.last(),
            Some(&(1, [modifier::RIGHT_ALT, 0, 1, 1, 1, 1, 1, 1]))
        );
    }

    #[test]
    fn changes_while_in_flight_collapse() {
        let mut keyboard = BootKeyboard::new(1);
        let mut frames = Frames::default();
        keyboard.press(&mut frames, Key::A.usage_id());
        assert_eq!(frames.0.len(), 1);

        keyboard.press(&mut frames, Key::B.usage_id());
        keyboard.release(&mut frames, Key::B.usage_id());
        assert_eq!(frames.0.len(), 1);

        complete(&mut keyboard, &mut frames);
        assert_eq!(frames.0.len(), 2);
        assert_eq!(frames.0[1].1, [0, 0, 0x04, 0, 0, 0, 0, 0]);

        complete(&mut keyboard, &mut frames);
        assert_eq!(frames.0.len(), 2);
        assert!(!keyboard.is_in_flight());
    }

    #[test]
    fn releasing_an_unpressed_key_does_nothing() {
        let mut keyboard = BootKeyboard::new(1);
        let mut frames = Frames::default();
        keyboard.release(&mut frames, 0x04);
        assert!(frames.0.is_empty());
        assert!(!keyboard.is_in_flight());

        keyboard.press(&mut frames, 0x04);
        keyboard.release(&mut frames, 0x05);
        complete(&mut keyboard, &mut frames);
        assert_eq!(frames.0.len(), 1);
    }

    #[test]
    fn auto_release_follows_every_press() {
        let mut keyboard = BootKeyboard::new(1);
        let mut frames = Frames::default();
        keyboard.set_auto_release(true);
        keyboard.set_modifiers(modifier::LEFT_CTRL);
        keyboard.press(&mut frames, 0x04);
        assert_eq!(frames.0, [(1, [modifier::LEFT_CTRL, 0, 0x04, 0, 0, 0, 0, 0])]);
        assert!(!keyboard.is_pressed(0x04));
        assert_eq!(keyboard.modifiers(), 0);

        complete(&mut keyboard, &mut frames);
        assert_eq!(frames.0[1], (1, [0; 8]));

        complete(&mut keyboard, &mut frames);
        assert_eq!(frames.0.len(), 2);
    }

    #[test]
    fn other_endpoints_do_not_drain() {
        let mut keyboard = BootKeyboard::new(1);
        let mut frames = Frames::default();
        keyboard.press(&mut frames, 0x04);
        keyboard.on_send_complete(&mut frames, 0);
        assert!(keyboard.is_in_flight());
    }

    #[test]
    fn bus_reset_drops_the_backlog() {
        let mut keyboard = BootKeyboard::new(1);
        let mut frames = Frames::default();
        keyboard.press(&mut frames, 0x04);
        keyboard.press(&mut frames, 0x05);
        keyboard.on_bus_reset();
        assert!(!keyboard.is_in_flight());
        assert!(keyboard.is_pressed(0x05));
        keyboard.release(&mut frames, 0x05);
        assert_eq!(frames.0.len(), 2);
        assert_eq!(frames.0[1].1, [0, 0, 0x04, 0, 0, 0, 0, 0]);
    }
}
