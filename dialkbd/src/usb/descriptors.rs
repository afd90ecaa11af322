use heapless::Vec;
use usb_device::{descriptor::descriptor_type, UsbDirection};

use crate::Error;

pub const DESCRIPTOR_BUFFER_SIZE: usize = 256;
pub const HID_DESCRIPTOR_TYPE: u8 = 0x21;
pub const REPORT_DESCRIPTOR_TYPE: u8 = 0x22;

/// Scratch space a descriptor response is assembled in.
pub type DescriptorBuffer = Vec<u8, DESCRIPTOR_BUFFER_SIZE>;

#[allow(non_snake_case)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub bcdUSB: u16,
    pub bDeviceClass: u8,
    pub bDeviceSubClass: u8,
    pub bDeviceProtocol: u8,
    pub bMaxPacketSize0: u8,
    pub idVendor: u16,
    pub idProduct: u16,
    pub bcdDevice: u16,
    pub iManufacturer: u8,
    pub iProduct: u8,
    pub iSerialNumber: u8,
    pub bNumConfigurations: u8,
}

impl DeviceDescriptor {
    pub const LENGTH: usize = 18;

    pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
        let [usb_lo, usb_hi] = self.bcdUSB.to_le_bytes();
        let [vid_lo, vid_hi] = self.idVendor.to_le_bytes();
        let [pid_lo, pid_hi] = self.idProduct.to_le_bytes();
        let [dev_lo, dev_hi] = self.bcdDevice.to_le_bytes();
        [
            Self::LENGTH as u8,
            descriptor_type::DEVICE,
            usb_lo,
            usb_hi,
            self.bDeviceClass,
            self.bDeviceSubClass,
            self.bDeviceProtocol,
            self.bMaxPacketSize0,
            vid_lo,
            vid_hi,
            pid_lo,
            pid_hi,
            dev_lo,
            dev_hi,
            self.iManufacturer,
            self.iProduct,
            self.iSerialNumber,
            self.bNumConfigurations,
        ]
    }
}

#[allow(non_snake_case)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigDescriptor {
    pub wTotalLength: u16,
    pub bNumInterfaces: u8,
    pub bConfigurationValue: u8,
    pub iConfiguration: u8,
    pub bmAttributes: u8,
    /// In units of 2mA.
    pub bMaxPower: u8,
}

impl ConfigDescriptor {
    pub const LENGTH: usize = 9;

    pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
        let [total_lo, total_hi] = self.wTotalLength.to_le_bytes();
        [
            Self::LENGTH as u8,
            descriptor_type::CONFIGURATION,
            total_lo,
            total_hi,
            self.bNumInterfaces,
            self.bConfigurationValue,
            self.iConfiguration,
            self.bmAttributes,
            self.bMaxPower,
        ]
    }
}

#[allow(non_snake_case)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub bInterfaceNumber: u8,
    pub bAlternateSetting: u8,
    pub bNumEndpoints: u8,
    pub bInterfaceClass: u8,
    pub bInterfaceSubClass: u8,
    pub bInterfaceProtocol: u8,
    pub iInterface: u8,
}

impl InterfaceDescriptor {
    pub const LENGTH: usize = 9;

    pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
        [
            Self::LENGTH as u8,
            descriptor_type::INTERFACE,
            self.bInterfaceNumber,
            self.bAlternateSetting,
            self.bNumEndpoints,
            self.bInterfaceClass,
            self.bInterfaceSubClass,
            self.bInterfaceProtocol,
            self.iInterface,
        ]
    }
}

#[allow(non_snake_case)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub bEndpointAddress: u8,
    pub bmAttributes: u8,
    pub wMaxPacketSize: u16,
    pub bInterval: u8,
}

impl EndpointDescriptor {
    pub const LENGTH: usize = 7;

    pub fn number(&self) -> u8 {
        self.bEndpointAddress & 0x0f
    }

    pub fn direction(&self) -> UsbDirection {
        if self.bEndpointAddress & 0x80 == 0 {
            UsbDirection::Out
        } else {
            UsbDirection::In
        }
    }

    /// Transfer type, 0 control through 3 interrupt.
    pub fn transfer_type(&self) -> u8 {
        self.bmAttributes & 0x03
    }

    pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
        let [size_lo, size_hi] = self.wMaxPacketSize.to_le_bytes();
        [
            Self::LENGTH as u8,
            descriptor_type::ENDPOINT,
            self.bEndpointAddress,
            self.bmAttributes,
            size_lo,
            size_hi,
            self.bInterval,
        ]
    }
}

#[allow(non_snake_case)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HidDescriptor {
    pub bcdHID: u16,
    pub bCountryCode: u8,
    pub bNumDescriptors: u8,
    pub bReportDescriptorType: u8,
    pub wDescriptorLength: u16,
}

impl HidDescriptor {
    pub const LENGTH: usize = 9;

    pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
        let [hid_lo, hid_hi] = self.bcdHID.to_le_bytes();
        let [len_lo, len_hi] = self.wDescriptorLength.to_le_bytes();
        [
            Self::LENGTH as u8,
            HID_DESCRIPTOR_TYPE,
            hid_lo,
            hid_hi,
            self.bCountryCode,
            self.bNumDescriptors,
            self.bReportDescriptorType,
            len_lo,
            len_hi,
        ]
    }
}

/// The descriptor tables an engine serves, borrowed for the engine's lifetime.
#[derive(Debug, Clone, Copy)]
pub struct UsbDescriptors<'a> {
    pub device: &'a DeviceDescriptor,
    pub configuration: &'a ConfigDescriptor,
    pub interfaces: &'a [InterfaceDescriptor],
    pub endpoints: &'a [EndpointDescriptor],
    /// String table, index 0 here answers string descriptor index 1.
    pub strings: &'a [&'a str],
}

impl<'a> UsbDescriptors<'a> {
    /// Configuration record, every interface, then every endpoint.
    pub fn write_configuration(&self, buffer: &mut DescriptorBuffer) -> Result<(), Error> {
        extend(buffer, &self.configuration.to_bytes())?;
        for interface in self.interfaces {
            extend(buffer, &interface.to_bytes())?;
        }
        for endpoint in self.endpoints {
            extend(buffer, &endpoint.to_bytes())?;
        }
        Ok(())
    }

    /// String descriptor `index`, with index 0 holding the language ID.
    pub fn write_string(&self, index: u8, buffer: &mut DescriptorBuffer) -> Result<(), Error> {
        if index == 0 {
            let [lang_lo, lang_hi] = u16::from(usb_device::LangID::EN_US).to_le_bytes();
            return extend(buffer, &[4, descriptor_type::STRING, lang_lo, lang_hi]);
        }
        match self.strings.get(index as usize - 1) {
            Some(string) => build_string_descriptor(buffer, string),
            None => extend(buffer, &[2, descriptor_type::STRING]),
        }
    }
}

pub(crate) fn extend(buffer: &mut DescriptorBuffer, bytes: &[u8]) -> Result<(), Error> {
    buffer
        .extend_from_slice(bytes)
        .map_err(|_| Error::BufferOverflow)
}

fn build_string_descriptor(buffer: &mut DescriptorBuffer, string: &str) -> Result<(), Error> {
    let start = buffer.len();
    extend(buffer, &[0, descriptor_type::STRING])?;
    for unit in string.encode_utf16() {
        extend(buffer, &unit.to_le_bytes())?;
    }
    let length = buffer.len() - start;
    if length > u8::MAX as usize {
        return Err(Error::BufferOverflow);
    }
    buffer[start] = length as u8;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(address: u8) -> EndpointDescriptor {
        EndpointDescriptor {
            bEndpointAddress: address,
            bmAttributes: 0x03,
            wMaxPacketSize: 64,
            bInterval: 10,
        }
    }

    const DEVICE: DeviceDescriptor = DeviceDescriptor {
        bcdUSB: 0x0110,
        bDeviceClass: 0,
        bDeviceSubClass: 0,
        bDeviceProtocol: 0,
        bMaxPacketSize0: 64,
        idVendor: 0x6666,
        idProduct: 0x2025,
        bcdDevice: 0x0101,
        iManufacturer: 1,
        iProduct: 2,
        iSerialNumber: 3,
        bNumConfigurations: 1,
    };

    const CONFIG: ConfigDescriptor = ConfigDescriptor {
        wTotalLength: 32,
        bNumInterfaces: 1,
        bConfigurationValue: 1,
        iConfiguration: 0,
        bmAttributes: 0xc0,
        bMaxPower: 250,
    };

    #[test]
    fn device_descriptor_is_little_endian() {
        let bytes = DEVICE.to_bytes();
        assert_eq!(bytes[0], 18);
        assert_eq!(bytes[1], 0x01);
        assert_eq!(&bytes[2..4], &[0x10, 0x01]);
        assert_eq!(&bytes[8..14], &[0x66, 0x66, 0x25, 0x20, 0x01, 0x01]);
        assert_eq!(bytes[17], 1);
    }

    #[test]
    fn endpoint_address_decodes() {
        let ep = endpoint(0x81);
        assert_eq!(ep.number(), 1);
        assert_eq!(ep.direction(), UsbDirection::In);
        assert_eq!(endpoint(0x02).direction(), UsbDirection::Out);
        assert_eq!(ep.to_bytes(), [7, 0x05, 0x81, 0x03, 64, 0, 10]);
    }

    #[test]
    fn configuration_block_is_ordered() {
        let interfaces = [InterfaceDescriptor {
            bInterfaceNumber: 0,
            bAlternateSetting: 0,
            bNumEndpoints: 2,
            bInterfaceClass: 3,
            bInterfaceSubClass: 1,
            bInterfaceProtocol: 1,
            iInterface: 0,
        }];
        let endpoints = [endpoint(0x81), endpoint(0x01)];
        let descriptors = UsbDescriptors {
            device: &DEVICE,
            configuration: &CONFIG,
            interfaces: &interfaces,
            endpoints: &endpoints,
            strings: &[],
        };
        let mut buffer = DescriptorBuffer::new();
        descriptors.write_configuration(&mut buffer).unwrap();
        assert_eq!(buffer.len(), 9 + 9 + 7 * 2);
        assert_eq!(buffer[1], 0x02);
        assert_eq!(buffer[10], 0x04);
        assert_eq!(&buffer[18..21], &[7, 0x05, 0x81]);
        assert_eq!(&buffer[25..28], &[7, 0x05, 0x01]);
    }

    #[test]
    fn strings_are_utf16() {
        let descriptors = UsbDescriptors {
            device: &DEVICE,
            configuration: &CONFIG,
            interfaces: &[],
            endpoints: &[],
            strings: &["Dial", "é"],
        };
        let mut buffer = DescriptorBuffer::new();
        descriptors.write_string(0, &mut buffer).unwrap();
        assert_eq!(buffer.as_slice(), &[0x04, 0x03, 0x09, 0x04]);

        buffer.clear();
        descriptors.write_string(1, &mut buffer).unwrap();
        assert_eq!(
            buffer.as_slice(),
            &[10, 0x03, b'D', 0, b'i', 0, b'a', 0, b'l', 0]
        );

        buffer.clear();
        descriptors.write_string(2, &mut buffer).unwrap();
        assert_eq!(buffer.as_slice(), &[4, 0x03, 0xe9, 0x00]);

        buffer.clear();
        descriptors.write_string(3, &mut buffer).unwrap();
        assert_eq!(buffer.as_slice(), &[2, 0x03]);
    }

    #[test]
    fn oversized_string_overflows() {
        let long = core::str::from_utf8(&[b'x'; 200]).unwrap();
        let strings = [long];
        let descriptors = UsbDescriptors {
            device: &DEVICE,
            configuration: &CONFIG,
            interfaces: &[],
            endpoints: &[],
            strings: &strings,
        };
        let mut buffer = DescriptorBuffer::new();
        assert_eq!(
            descriptors.write_string(1, &mut buffer),
            Err(Error::BufferOverflow)
        );
    }
}
