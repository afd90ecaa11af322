use usbd_hid::descriptor::generator_prelude::*;
use usbd_hid_macros::gen_hid_descriptor;

pub const BOOT_KEYBOARD_REPORT_SIZE: usize = 8;

/// Boot keyboard input report, plus the LED output report a host may write.
///
/// The input frame on the wire is modifier, reserved, then six key codes.
#[gen_hid_descriptor(
    (collection = APPLICATION, usage_page = GENERIC_DESKTOP, usage = KEYBOARD) = {
        (usage_page = KEYBOARD, usage_min = 0xe0, usage_max = 0xe7) = {
            #[packed_bits 8] #[item_settings data,variable,absolute] modifier=input;
        };
        (usage_min = 0x00, usage_max = 0xff) = {
            #[item_settings constant,variable,absolute] reserved=input;
        };
        (usage_page = LEDS, usage_min = 0x01, usage_max = 0x05) = {
            #[packed_bits 5] #[item_settings data,variable,absolute] leds=output;
        };
        (usage_page = KEYBOARD, usage_min = 0x00, usage_max = 0xdd) = {
            #[item_settings data,array,absolute] key_codes=input;
        };
    }
)]
#[allow(dead_code)]
#[repr(C)]
pub struct BootKeyboardReport {
    pub modifier: u8,
    pub reserved: u8,
    pub leds: u8,
    pub key_codes: [u8; 6],
}

impl BootKeyboardReport {
    pub fn to_bytes(&self) -> [u8; BOOT_KEYBOARD_REPORT_SIZE] {
        let mut frame = [0; BOOT_KEYBOARD_REPORT_SIZE];
        frame[0] = self.modifier;
        frame[1] = self.reserved;
        frame[2..].copy_from_slice(&self.key_codes);
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn descriptor_is_a_keyboard_collection() {
        let desc = BootKeyboardReport::desc();
        // Usage Page (Generic Desktop), Usage (Keyboard), Collection (Application)
        assert_eq!(&desc[..6], &[0x05, 0x01, 0x09, 0x06, 0xa1, 0x01]);
        assert_eq!(desc.last(), Some(&0xc0));
    }

    #[test]
    fn frame_leaves_out_leds() {
        let report = BootKeyboardReport {
            modifier: 0x02,
            reserved: 0,
            leds: 0x1f,
            key_codes: [0x04, 0x05, 0, 0, 0, 0],
        };
        assert_eq!(report.to_bytes(), [0x02, 0, 0x04, 0x05, 0, 0, 0, 0]);
    }
}
