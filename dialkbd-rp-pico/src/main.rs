#![no_std]
#![no_main]

use core::{
    cell::RefCell,
    sync::atomic::{AtomicBool, AtomicUsize, Ordering},
};

use config::CoilPin;
use cortex_m::interrupt::Mutex;
use defmt_rtt as _;
use dialkbd::{
    dial::DialDecoder,
    keyboard::{KeyboardDescriptors, UsbKeyboard},
    usb::DeviceSlot,
};
use motor::Motor;
use panic_probe as _;
use photo_sensor::PhotoSensor;
use rp2040_hal::{
    self as hal, entry,
    pac::{self, interrupt},
    timer::{Alarm, Alarm0},
    Clock, Sio, Timer, Watchdog,
};
use rp2040_usb::Rp2040Usb;
use static_cell::StaticCell;

mod config;
mod motor;
mod photo_sensor;
mod rp2040_usb;

#[link_section = ".boot2"]
#[used]
pub static BOOT2_FIRMWARE: [u8; 256] = rp2040_boot2::BOOT_LOADER_GENERIC_03H;

struct Stepper {
    motor: Motor<CoilPin>,
    alarm: Alarm0,
}

static DESCRIPTORS: StaticCell<KeyboardDescriptors> = StaticCell::new();
static KEYBOARD: DeviceSlot<UsbKeyboard<'static, Rp2040Usb>> = DeviceSlot::new();
static STEPPER: Mutex<RefCell<Option<Stepper>>> = Mutex::new(RefCell::new(None));
static MOTOR_RUNNING: AtomicBool = AtomicBool::new(false);

#[entry]
fn main() -> ! {
    defmt::info!("Launching dial keyboard");

    let mut pac = pac::Peripherals::take().unwrap();
    let sio = Sio::new(pac.SIO);
    let pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );
    // Set up the watchdog driver - needed by the clock setup code
    let mut watchdog = Watchdog::new(pac.WATCHDOG);
    // The default is to generate a 125 MHz system clock and 48 MHz USB clock
    let clocks = hal::clocks::init_clocks_and_plls(
        config::XOSC_CRYSTAL_FREQ,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .ok()
    .unwrap();
    defmt::debug!("system clock {} Hz", clocks.system_clock.freq().to_Hz());

    let (sensor_pins, coil_pins) = config::assign_pins(pins);
    let mut sensor = PhotoSensor::new(sensor_pins);

    let mut timer = Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
    let mut alarm = timer.alarm_0().unwrap();
    alarm.schedule(config::MOTOR_STEP_INTERVAL).unwrap();
    alarm.enable_interrupt();
    cortex_m::interrupt::free(|cs| {
        STEPPER.borrow(cs).replace(Some(Stepper {
            motor: Motor::new(coil_pins),
            alarm,
        }));
    });

    let descriptors = DESCRIPTORS.init(KeyboardDescriptors::new(&config::DEVICE_INFO));
    let controller = Rp2040Usb::new(
        pac.USBCTRL_REGS,
        pac.USBCTRL_DPRAM,
        clocks.usb_clock,
        &mut pac.RESETS,
    );
    let mut keyboard = defmt::unwrap!(UsbKeyboard::new(controller, descriptors));
    keyboard.set_auto_key_release(true);
    KEYBOARD.install(keyboard);

    unsafe {
        pac::NVIC::unmask(pac::Interrupt::USBCTRL_IRQ);
        pac::NVIC::unmask(pac::Interrupt::TIMER_IRQ_0);
    }

    static COUNT: AtomicUsize = AtomicUsize::new(0);
    defmt::timestamp!("{=usize}", {
        // NOTE(no-CAS) `timestamps` runs with interrupts disabled
        let n = COUNT.load(Ordering::Relaxed);
        COUNT.store(n + 1, Ordering::Relaxed);
        n
    });

    let mut dial = DialDecoder::new();
    loop {
        dial.update(sensor.read());
        MOTOR_RUNNING.store(!dial.is_base_position(), Ordering::Relaxed);

        let Some(position) = dial.pop_decided_position() else {
            continue;
        };
        // positions are 1-based
        let key = position
            .checked_sub(1)
            .and_then(|index| config::USAGE_TABLE.get(index as usize))
            .copied()
            .flatten();
        match key {
            Some(key) => {
                defmt::debug!("dial position {}: {}", position, key);
                KEYBOARD.with(|keyboard| keyboard.press_by_usage_id(key.usage_id()));
            }
            None => defmt::debug!("dial position {} has no key", position),
        }
    }
}

#[allow(non_snake_case)]
#[interrupt]
fn USBCTRL_IRQ() {
    KEYBOARD.with(UsbKeyboard::on_interrupt);
}

#[allow(non_snake_case)]
#[interrupt]
fn TIMER_IRQ_0() {
    cortex_m::interrupt::free(|cs| {
        let mut stepper = STEPPER.borrow(cs).borrow_mut();
        let Some(stepper) = stepper.as_mut() else {
            return;
        };
        stepper.alarm.clear_interrupt();
        if stepper.alarm.schedule(config::MOTOR_STEP_INTERVAL).is_err() {
            defmt::warn!("failed to schedule the next motor step");
        }
        stepper
            .motor
            .set_running(MOTOR_RUNNING.load(Ordering::Relaxed));
        stepper.motor.step();
    });
}
