use usb_device::{control::Request, descriptor::descriptor_type, UsbDirection};

use super::{
    controller::UsbController,
    descriptors::{DescriptorBuffer, UsbDescriptors},
    device_state::DeviceState,
    registers::*,
    request_type::{Direction, Type},
    setup_packet::SetupPacket,
    transport::{SendProgress, Transport},
};
use crate::Error;

/// Hooks a device class plugs into [`UsbDevice`].
///
/// Every method has a default, so a class only overrides what it changes.
/// Hooks that return `bool` report whether they handled the request; an
/// unhandled request falls through to the standard device handling.
pub trait UsbClass<H: UsbController> {
    /// Assembles the configuration block answered for GET_DESCRIPTOR.
    fn fill_configuration(
        &self,
        descriptors: &UsbDescriptors<'_>,
        buffer: &mut DescriptorBuffer,
    ) -> Result<(), Error> {
        descriptors.write_configuration(buffer)
    }

    fn get_descriptor(&mut self, _transport: &mut Transport<'_, H>, _setup: &SetupPacket) -> bool {
        false
    }

    fn handle_setup(&mut self, _transport: &mut Transport<'_, H>, _setup: &SetupPacket) -> bool {
        false
    }

    /// A transfer armed with [`Transport::send`] has fully drained.
    fn on_send_complete(&mut self, _transport: &mut Transport<'_, H>, _endpoint: u8) {}

    /// A transfer armed with [`Transport::receive`] has completed.
    fn on_received(&mut self, _transport: &mut Transport<'_, H>, _endpoint: u8, _data: &[u8]) {}

    fn on_bus_reset(&mut self) {}
}

/// A USB device: the transport plus the class that specializes it.
pub struct UsbDevice<'a, H, C> {
    transport: Transport<'a, H>,
    class: C,
}

impl<'a, H: UsbController, C: UsbClass<H>> UsbDevice<'a, H, C> {
    pub fn new(controller: H, descriptors: UsbDescriptors<'a>, class: C) -> Result<Self, Error> {
        Ok(UsbDevice {
            transport: Transport::new(controller, descriptors)?,
            class,
        })
    }

    pub fn state(&self) -> DeviceState {
        self.transport.state()
    }

    pub fn transport(&self) -> &Transport<'a, H> {
        &self.transport
    }

    pub fn class(&self) -> &C {
        &self.class
    }

    /// Runs `f` with the class and the transport it sends through.
    pub fn with_class<R>(&mut self, f: impl FnOnce(&mut C, &mut Transport<'a, H>) -> R) -> R {
        f(&mut self.class, &mut self.transport)
    }

    /// Services the controller. Call this from the USB interrupt handler.
    pub fn on_interrupt(&mut self) {
        let status = self.transport.interrupt_status();
        if status & INTS_SETUP_REQ != 0 {
            self.transport.clear_sie_status(SIE_STATUS_SETUP_REC);
            self.handle_setup_request();
        }
        if status & INTS_BUFF_STATUS != 0 {
            self.handle_buffer_status();
        }
        if status & INTS_BUS_RESET != 0 {
            self.transport.clear_sie_status(SIE_STATUS_BUS_RESET);
            self.handle_bus_reset();
        }
    }

    fn handle_setup_request(&mut self) {
        let setup = self.transport.read_setup();
        if self.class.handle_setup(&mut self.transport, &setup) {
            return;
        }
        match (setup.request_type(), setup.direction()) {
            (Type::Standard, Direction::HostToDevice) => match setup.bRequest {
                Request::CLEAR_FEATURE => self.transport.acknowledge(),
                Request::SET_ADDRESS => {
                    self.transport.defer_address(setup.value_low());
                    self.transport.acknowledge();
                }
                Request::SET_CONFIGURATION => {
                    self.transport.set_configured(true);
                    #[cfg(feature = "defmt")]
                    defmt::info!("USB configured: {}", setup.value_low());
                    self.transport.acknowledge();
                }
                _ => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("unsupported standard OUT request: {:#x}", setup.bRequest);
                }
            },
            (Type::Standard, Direction::DeviceToHost) => match setup.bRequest {
                Request::GET_DESCRIPTOR => self.get_descriptor(&setup),
                _ => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("unsupported standard IN request: {:#x}", setup.bRequest);
                }
            },
            _ => {
                #[cfg(feature = "defmt")]
                defmt::warn!(
                    "unsupported request: type {:#x}, request {:#x}",
                    setup.bmRequestType.bits(),
                    setup.bRequest
                );
            }
        }
    }

    fn get_descriptor(&mut self, setup: &SetupPacket) {
        if self.class.get_descriptor(&mut self.transport, setup) {
            return;
        }
        let descriptors = *self.transport.descriptors();
        let mut buffer = DescriptorBuffer::new();
        let assembled = match setup.value_high() {
            descriptor_type::DEVICE => {
                super::descriptors::extend(&mut buffer, &descriptors.device.to_bytes())
            }
            descriptor_type::CONFIGURATION => self
                .class
                .fill_configuration(&descriptors, &mut buffer)
                .map(|()| check_total_length(&descriptors, &buffer)),
            descriptor_type::STRING => descriptors.write_string(setup.value_low(), &mut buffer),
            _ => {
                #[cfg(feature = "defmt")]
                defmt::warn!("unsupported descriptor type: {:#x}", setup.value_high());
                return;
            }
        };
        match assembled {
            Ok(()) => self.transport.respond(setup, &buffer),
            Err(_error) => {
                #[cfg(feature = "defmt")]
                defmt::error!("descriptor {:#x}: {}", setup.wValue, _error);
            }
        }
    }

    fn handle_buffer_status(&mut self) {
        let mut status = self.transport.buffer_status();
        while status != 0 {
            let bit = status.trailing_zeros();
            let mask = 1 << bit;
            status &= !mask;
            self.transport.clear_buffer_status(mask);

            let endpoint = (bit / 2) as u8;
            let direction = if bit % 2 == 0 {
                UsbDirection::In
            } else {
                UsbDirection::Out
            };
            if !self.transport.has_pipe(endpoint, direction) {
                #[cfg(feature = "defmt")]
                defmt::warn!("buffer status for unconfigured endpoint {}", endpoint);
                continue;
            }
            match direction {
                UsbDirection::In => {
                    if self.transport.complete_in(endpoint) == SendProgress::Drained {
                        self.class.on_send_complete(&mut self.transport, endpoint);
                    }
                }
                UsbDirection::Out => {
                    if let Some(data) = self.transport.complete_out(endpoint) {
                        self.class
                            .on_received(&mut self.transport, endpoint, &data);
                        if endpoint == 0 {
                            self.transport.acknowledge();
                        }
                    }
                }
            }
        }
    }

    fn handle_bus_reset(&mut self) {
        #[cfg(feature = "defmt")]
        defmt::info!("USB bus reset");
        self.transport.bus_reset();
        self.class.on_bus_reset();
    }
}

/// The host parses the configuration block by `wTotalLength`, so the two
/// must agree.
fn check_total_length(descriptors: &UsbDescriptors<'_>, block: &[u8]) {
    let declared = descriptors.configuration.wTotalLength as usize;
    if block.len() != declared {
        #[cfg(feature = "defmt")]
        defmt::error!(
            "configuration block is {} bytes, wTotalLength is {}",
            block.len(),
            declared
        );
    }
    debug_assert_eq!(block.len(), declared, "configuration block length differs from wTotalLength");
}
