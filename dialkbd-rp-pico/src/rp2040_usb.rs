use core::ptr;

use dialkbd::usb::{registers::BUF_CTRL_AVAIL, Block, Register, UsbController, PACKET_MEMORY_SIZE};
use rp2040_hal::{
    clocks::UsbClock,
    pac::{RESETS, USBCTRL_DPRAM, USBCTRL_REGS},
};

/// Matches `$register` against the writable controller registers, binding
/// `$reg` to the PAC accessor of the one it names. Anything else falls
/// through to the trailing arms.
macro_rules! writable_register {
    ($regs:expr, $register:expr, $reg:ident => $body:expr, $($rest:pat => $fallback:expr),+ $(,)?) => {
        match $register {
            Register::DeviceAddress => {
                let $reg = $regs.addr_endp();
                $body
            }
            Register::MainControl => {
                let $reg = $regs.main_ctrl();
                $body
            }
            Register::SieControl => {
                let $reg = $regs.sie_ctrl();
                $body
            }
            Register::SieStatus => {
                let $reg = $regs.sie_status();
                $body
            }
            Register::BufferStatus => {
                let $reg = $regs.buff_status();
                $body
            }
            Register::Muxing => {
                let $reg = $regs.usb_muxing();
                $body
            }
            Register::Power => {
                let $reg = $regs.usb_pwr();
                $body
            }
            Register::InterruptEnable => {
                let $reg = $regs.inte();
                $body
            }
            $($rest => $fallback),+
        }
    };
}

/// The RP2040 USB controller. Control registers go through the PAC; the
/// endpoint control words and packet buffers live in dual-port RAM and are
/// reached with volatile access.
pub struct Rp2040Usb {
    regs: USBCTRL_REGS,
    _dpram: USBCTRL_DPRAM,
    _clock: UsbClock,
}

impl Rp2040Usb {
    /// Takes the peripherals so nothing else can touch the controller, and
    /// brings the block out of reset. The USB clock must already run at
    /// 48 MHz.
    pub fn new(
        regs: USBCTRL_REGS,
        dpram: USBCTRL_DPRAM,
        clock: UsbClock,
        resets: &mut RESETS,
    ) -> Self {
        resets.reset().modify(|_, w| w.usbctrl().set_bit());
        resets.reset().modify(|_, w| w.usbctrl().clear_bit());
        while resets.reset_done().read().usbctrl().bit_is_clear() {}
        Rp2040Usb {
            regs,
            _dpram: dpram,
            _clock: clock,
        }
    }

    fn packet_memory() -> *mut u8 {
        USBCTRL_DPRAM::ptr() as *mut u8
    }

    fn word(register: Register) -> *mut u32 {
        let (block, offset) = register.location();
        debug_assert_eq!(block, Block::PacketMemory);
        unsafe { Self::packet_memory().add(offset) as *mut u32 }
    }
}

impl UsbController for Rp2040Usb {
    /// Returns the block to its power-on state without a trip through
    /// RESETS, which [`Rp2040Usb::new`] already made.
    fn reset(&mut self) {
        self.regs.main_ctrl().write(|w| unsafe { w.bits(0) });
        self.regs.sie_ctrl().write(|w| unsafe { w.bits(0) });
        self.regs.inte().write(|w| unsafe { w.bits(0) });
        self.regs.addr_endp().write(|w| unsafe { w.bits(0) });
        self.regs.sie_status().write(|w| unsafe { w.bits(u32::MAX) });
        self.regs.buff_status().write(|w| unsafe { w.bits(u32::MAX) });
        let dpram = Self::packet_memory() as *mut u32;
        for word in 0..PACKET_MEMORY_SIZE / 4 {
            unsafe { ptr::write_volatile(dpram.add(word), 0) };
        }
    }

    fn read(&self, register: Register) -> u32 {
        if register == Register::InterruptStatus {
            return self.regs.ints().read().bits();
        }
        writable_register!(self.regs, register, reg => reg.read().bits(),
            _ => unsafe { ptr::read_volatile(Self::word(register)) },
        )
    }

    fn write(&mut self, register: Register, value: u32) {
        writable_register!(self.regs, register, reg => {
            reg.write(|w| unsafe { w.bits(value) });
        },
            Register::InterruptStatus => panic!("INTS is read-only"),
            Register::EndpointControl(..) => unsafe {
                ptr::write_volatile(Self::word(register), value)
            },
            Register::BufferControl(..) => {
                let address = Self::word(register);
                if value & BUF_CTRL_AVAIL != 0 {
                    // AVAIL hands the buffer to the controller, which must
                    // see the rest of the word first.
                    unsafe { ptr::write_volatile(address, value & !BUF_CTRL_AVAIL) };
                    cortex_m::asm::delay(12);
                }
                unsafe { ptr::write_volatile(address, value) };
            },
        )
    }

    fn set_bits(&mut self, register: Register, bits: u32) {
        writable_register!(self.regs, register, reg => {
            reg.modify(|r, w| unsafe { w.bits(r.bits() | bits) });
        },
            _ => {
                let value = self.read(register) | bits;
                self.write(register, value);
            },
        )
    }

    fn read_packet(&self, offset: usize, buffer: &mut [u8]) {
        let base = Self::packet_memory() as *const u8;
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = unsafe { ptr::read_volatile(base.add(offset + i)) };
        }
    }

    fn write_packet(&mut self, offset: usize, data: &[u8]) {
        let base = Self::packet_memory();
        for (i, byte) in data.iter().enumerate() {
            unsafe { ptr::write_volatile(base.add(offset + i), *byte) };
        }
    }
}
