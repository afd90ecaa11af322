use dialkbd::keyboard::{DeviceInfo, Key};
use fugit::MicrosDurationU32;
use rp2040_hal::gpio::{DynPinId, FunctionSioInput, FunctionSioOutput, Pin, Pins, PullDown, PullUp};

pub type SensorPin = Pin<DynPinId, FunctionSioInput, PullUp>;
pub type CoilPin = Pin<DynPinId, FunctionSioOutput, PullDown>;

pub const XOSC_CRYSTAL_FREQ: u32 = 12_000_000;

pub const DEVICE_INFO: DeviceInfo = DeviceInfo {
    manufacturer: "Gboard DIY prototype",
    vendor_id: 0x6666,
    product_id: 0x2025,
    device_version: 0x0101,
    product_name: "Gboard Dial version",
    serial_number: "1 Dial",
};

pub const MOTOR_STEP_INTERVAL: MicrosDurationU32 = MicrosDurationU32::millis(2);

/// GPIO2 to GPIO7 read the 6-bit photo sensor, least significant bit first.
/// GPIO17 to GPIO20 drive the stepper motor phases. GPIO0 and GPIO1 stay free
/// for a debug UART.
pub fn assign_pins(pins: Pins) -> ([SensorPin; 6], [CoilPin; 4]) {
    let sensor = [
        pins.gpio2.into_pull_up_input().into_dyn_pin(),
        pins.gpio3.into_pull_up_input().into_dyn_pin(),
        pins.gpio4.into_pull_up_input().into_dyn_pin(),
        pins.gpio5.into_pull_up_input().into_dyn_pin(),
        pins.gpio6.into_pull_up_input().into_dyn_pin(),
        pins.gpio7.into_pull_up_input().into_dyn_pin(),
    ];
    let coils = [
        pins.gpio17.into_push_pull_output().into_dyn_pin(),
        pins.gpio18.into_push_pull_output().into_dyn_pin(),
        pins.gpio19.into_push_pull_output().into_dyn_pin(),
        pins.gpio20.into_push_pull_output().into_dyn_pin(),
    ];
    (sensor, coils)
}

/// Keys of dial positions 1, 2, ... in the order the dial passes them
/// (JIS layout).
pub const USAGE_TABLE: [Option<Key>; 36] = [
    None, // blank area between the base and the first hole
    Some(Key::LeftSquareBracket_LeftCurlyBracket), // @
    Some(Key::Apostrophe_Quotation),               // :
    Some(Key::International1),                     // _
    Some(Key::P),
    Some(Key::Semicolon_Colon),
    Some(Key::Slash_Question),
    Some(Key::O),
    Some(Key::L),
    Some(Key::Period_GreaterThan),
    Some(Key::I),
    Some(Key::K),
    Some(Key::Comma_LessThan),
    Some(Key::U),
    Some(Key::J),
    Some(Key::M),
    Some(Key::Y),
    Some(Key::H),
    Some(Key::N),
    Some(Key::T),
    Some(Key::G),
    Some(Key::B),
    Some(Key::R),
    Some(Key::F),
    Some(Key::V),
    Some(Key::E),
    Some(Key::D),
    Some(Key::C),
    Some(Key::W),
    Some(Key::S),
    Some(Key::X),
    Some(Key::Q),
    Some(Key::A),
    Some(Key::Z),
    Some(Key::CapsLock),
    Some(Key::Space),
];
