use crate::{
    usb::{
        DescriptorBuffer, Direction, HidDescriptor, Recipient, SetupPacket, Transport, Type,
        UsbClass, UsbController, UsbDescriptors, HID_DESCRIPTOR_TYPE, REPORT_DESCRIPTOR_TYPE,
    },
    Error,
};

const SET_REPORT: u8 = 0x09;
const SET_IDLE: u8 = 0x0a;
const SET_PROTOCOL: u8 = 0x0b;

/// Accepts input reports for transmission.
pub trait ReportSink {
    fn report(&mut self, endpoint: u8, data: &[u8]);
}

/// The report-producing side of a HID device.
pub trait HidReports {
    /// The report last handed to a sink on `endpoint` reached the host.
    fn on_send_complete<S: ReportSink>(&mut self, sink: &mut S, endpoint: u8);

    /// An output report written by the host with SET_REPORT.
    fn on_output_report(&mut self, _data: &[u8]) {}

    fn on_bus_reset(&mut self) {}
}

/// Sends reports through the transport. The only way reports leave the device.
pub struct HidReporter<'t, 'a, H> {
    transport: &'t mut Transport<'a, H>,
}

impl<'t, 'a, H: UsbController> ReportSink for HidReporter<'t, 'a, H> {
    fn report(&mut self, endpoint: u8, data: &[u8]) {
        self.transport.send(endpoint, data);
    }
}

/// HID class on top of the USB transport.
///
/// Serves the HID and report descriptors and answers HID class requests.
/// Idle rates and protocol switching are acknowledged but never honored;
/// the device always speaks the boot protocol.
pub struct HidClass<'a, R> {
    hid_descriptor: &'a HidDescriptor,
    report_descriptor: &'a [u8],
    reports: R,
}

impl<'a, R: HidReports> HidClass<'a, R> {
    pub fn new(hid_descriptor: &'a HidDescriptor, report_descriptor: &'a [u8], reports: R) -> Self {
        HidClass {
            hid_descriptor,
            report_descriptor,
            reports,
        }
    }

    pub fn reports(&self) -> &R {
        &self.reports
    }

    pub fn reports_mut(&mut self) -> &mut R {
        &mut self.reports
    }

    /// Runs `f` with the report producer and a sink bound to `transport`.
    pub fn with_reports<H: UsbController, T>(
        &mut self,
        transport: &mut Transport<'_, H>,
        f: impl FnOnce(&mut R, &mut HidReporter<'_, '_, H>) -> T,
    ) -> T {
        let mut reporter = HidReporter { transport };
        f(&mut self.reports, &mut reporter)
    }
}

impl<'a, H: UsbController, R: HidReports> UsbClass<H> for HidClass<'a, R> {
    fn fill_configuration(
        &self,
        descriptors: &UsbDescriptors<'_>,
        buffer: &mut DescriptorBuffer,
    ) -> Result<(), Error> {
        let mut extend = |bytes: &[u8]| {
            buffer
                .extend_from_slice(bytes)
                .map_err(|_| Error::BufferOverflow)
        };
        extend(&descriptors.configuration.to_bytes())?;
        for interface in descriptors.interfaces {
            extend(&interface.to_bytes())?;
        }
        extend(&self.hid_descriptor.to_bytes())?;
        for endpoint in descriptors.endpoints {
            extend(&endpoint.to_bytes())?;
        }
        Ok(())
    }

    fn get_descriptor(&mut self, transport: &mut Transport<'_, H>, setup: &SetupPacket) -> bool {
        match setup.value_high() {
            REPORT_DESCRIPTOR_TYPE => transport.respond(setup, self.report_descriptor),
            HID_DESCRIPTOR_TYPE => transport.respond(setup, &self.hid_descriptor.to_bytes()),
            _ => return false,
        }
        true
    }

    fn handle_setup(&mut self, transport: &mut Transport<'_, H>, setup: &SetupPacket) -> bool {
        if setup.request_type() != Type::Class || setup.recipient() != Recipient::Interface {
            return false;
        }
        match setup.direction() {
            Direction::HostToDevice => match setup.bRequest {
                SET_REPORT if setup.wLength > 0 => transport.receive(0, setup.wLength as usize),
                SET_REPORT | SET_IDLE => transport.acknowledge(),
                SET_PROTOCOL => {
                    #[cfg(feature = "defmt")]
                    defmt::info!(
                        "SET_PROTOCOL: {}",
                        if setup.value_low() == 0 { "boot" } else { "report" }
                    );
                    transport.acknowledge();
                }
                _ => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("unsupported HID OUT request: {:#x}", setup.bRequest);
                    transport.acknowledge();
                }
            },
            Direction::DeviceToHost => {
                #[cfg(feature = "defmt")]
                defmt::warn!("unsupported HID IN request: {:#x}", setup.bRequest);
                transport.respond(setup, &[]);
            }
        }
        true
    }

    fn on_send_complete(&mut self, transport: &mut Transport<'_, H>, endpoint: u8) {
        let mut reporter = HidReporter { transport };
        self.reports.on_send_complete(&mut reporter, endpoint);
    }

    fn on_received(&mut self, _transport: &mut Transport<'_, H>, endpoint: u8, data: &[u8]) {
        if endpoint == 0 {
            self.reports.on_output_report(data);
        }
    }

    fn on_bus_reset(&mut self) {
        self.reports.on_bus_reset();
    }
}
