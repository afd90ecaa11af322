use usbd_hid::descriptor::SerializedDescriptor;

use super::DeviceInfo;
use crate::{
    hid::BootKeyboardReport,
    usb::{
        ConfigDescriptor, DeviceDescriptor, EndpointDescriptor, HidDescriptor,
        InterfaceDescriptor, UsbDescriptors, MAX_PACKET_SIZE, REPORT_DESCRIPTOR_TYPE,
    },
};

/// IN endpoint the keyboard reports on.
pub const KEYBOARD_ENDPOINT: u8 = 1;

const INTERFACE_CLASS_HID: u8 = 0x03;
const INTERFACE_SUBCLASS_BOOT: u8 = 0x01;
const INTERFACE_PROTOCOL_KEYBOARD: u8 = 0x01;
const ENDPOINT_INTERRUPT: u8 = 0x03;
const POLL_INTERVAL_MS: u8 = 10;

/// Every descriptor a single-interface boot keyboard serves.
///
/// Build once at startup and keep it alive for as long as the keyboard.
#[derive(Debug, Clone)]
pub struct KeyboardDescriptors {
    device: DeviceDescriptor,
    configuration: ConfigDescriptor,
    interfaces: [InterfaceDescriptor; 1],
    endpoints: [EndpointDescriptor; 2],
    hid: HidDescriptor,
    strings: [&'static str; 3],
}

impl KeyboardDescriptors {
    pub fn new(info: &DeviceInfo) -> Self {
        let report_descriptor = BootKeyboardReport::desc();
        let interfaces = [InterfaceDescriptor {
            bInterfaceNumber: 0,
            bAlternateSetting: 0,
            bNumEndpoints: 2,
            bInterfaceClass: INTERFACE_CLASS_HID,
            bInterfaceSubClass: INTERFACE_SUBCLASS_BOOT,
            bInterfaceProtocol: INTERFACE_PROTOCOL_KEYBOARD,
            iInterface: 0,
        }];
        let endpoints = [
            EndpointDescriptor {
                bEndpointAddress: 0x80 | KEYBOARD_ENDPOINT,
                bmAttributes: ENDPOINT_INTERRUPT,
                wMaxPacketSize: MAX_PACKET_SIZE,
                bInterval: POLL_INTERVAL_MS,
            },
            EndpointDescriptor {
                bEndpointAddress: KEYBOARD_ENDPOINT,
                bmAttributes: ENDPOINT_INTERRUPT,
                wMaxPacketSize: MAX_PACKET_SIZE,
                bInterval: POLL_INTERVAL_MS,
            },
        ];
        let total_length = ConfigDescriptor::LENGTH
            + InterfaceDescriptor::LENGTH * interfaces.len()
            + HidDescriptor::LENGTH
            + EndpointDescriptor::LENGTH * endpoints.len();

        KeyboardDescriptors {
            device: DeviceDescriptor {
                bcdUSB: 0x0110,
                bDeviceClass: 0,
                bDeviceSubClass: 0,
                bDeviceProtocol: 0,
                bMaxPacketSize0: MAX_PACKET_SIZE as u8,
                idVendor: info.vendor_id,
                idProduct: info.product_id,
                bcdDevice: info.device_version,
                iManufacturer: 1,
                iProduct: 2,
                iSerialNumber: 3,
                bNumConfigurations: 1,
            },
            configuration: ConfigDescriptor {
                wTotalLength: total_length as u16,
                bNumInterfaces: interfaces.len() as u8,
                bConfigurationValue: 1,
                iConfiguration: 0,
                bmAttributes: 0xc0,
                bMaxPower: 250, // 500mA
            },
            interfaces,
            endpoints,
            hid: HidDescriptor {
                bcdHID: 0x0110,
                bCountryCode: 0,
                bNumDescriptors: 1,
                bReportDescriptorType: REPORT_DESCRIPTOR_TYPE,
                wDescriptorLength: report_descriptor.len() as u16,
            },
            strings: [info.manufacturer, info.product_name, info.serial_number],
        }
    }

    pub fn usb(&self) -> UsbDescriptors<'_> {
        UsbDescriptors {
            device: &self.device,
            configuration: &self.configuration,
            interfaces: &self.interfaces,
            endpoints: &self.endpoints,
            strings: &self.strings,
        }
    }

    pub fn hid(&self) -> &HidDescriptor {
        &self.hid
    }

    pub fn report_descriptor(&self) -> &'static [u8] {
        BootKeyboardReport::desc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usb::HID_DESCRIPTOR_TYPE;

    #[test]
    fn declared_lengths_match() {
        let descriptors = KeyboardDescriptors::new(&DeviceInfo {
            manufacturer: "Gboard DIY prototype",
            vendor_id: 0x6666,
            product_id: 0x2025,
            device_version: 0x0101,
            product_name: "Gboard Dial version",
            serial_number: "1 Dial",
        });
        let usb = descriptors.usb();
        assert_eq!(usb.configuration.wTotalLength, 41);
        assert_eq!(
            descriptors.hid().wDescriptorLength as usize,
            descriptors.report_descriptor().len()
        );
        let hid = descriptors.hid().to_bytes();
        assert_eq!(&hid[..2], &[9, HID_DESCRIPTOR_TYPE]);
        assert_eq!(hid[6], REPORT_DESCRIPTOR_TYPE);
        assert_eq!(usb.device.idVendor, 0x6666);
        assert_eq!(usb.strings[2], "1 Dial");
        assert_eq!(usb.endpoints[0].bEndpointAddress, 0x81);
        assert_eq!(usb.endpoints[1].bEndpointAddress, 0x01);
    }
}
