use heapless::Vec;
use usb_device::UsbDirection;

use super::{
    controller::{Register, UsbController},
    descriptors::UsbDescriptors,
    device_state::DeviceState,
    packet_memory::{BufferSlot, PacketMemory, SETUP_PACKET_OFFSET},
    registers::*,
    setup_packet::SetupPacket,
};
use crate::Error;

/// Largest single transfer an endpoint stages.
pub const TRANSFER_CAPACITY: usize = 256;
/// Endpoint 0 in both directions plus up to six more endpoint directions.
pub const MAX_PIPES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Toggle {
    Data0,
    Data1,
}

impl Toggle {
    fn pid_bits(self) -> u32 {
        match self {
            Toggle::Data0 => 0,
            Toggle::Data1 => BUF_CTRL_DATA1_PID,
        }
    }

    fn flip(&mut self) {
        *self = match self {
            Toggle::Data0 => Toggle::Data1,
            Toggle::Data1 => Toggle::Data0,
        }
    }
}

/// One direction of one endpoint.
#[derive(Debug)]
struct Pipe {
    number: u8,
    direction: UsbDirection,
    slot: BufferSlot,
    toggle: Toggle,
    buffer: Vec<u8, TRANSFER_CAPACITY>,
    /// IN: bytes of `buffer` already armed.
    cursor: usize,
    /// OUT: total bytes the armed receive accepts.
    expected: usize,
    /// IN: the transfer carries data, so its completion is reported upward.
    data_stage: bool,
    /// IN: a zero-length packet must follow the last full packet.
    terminate: bool,
}

impl Pipe {
    fn new(number: u8, direction: UsbDirection, slot: BufferSlot) -> Self {
        Pipe {
            number,
            direction,
            slot,
            toggle: Toggle::Data0,
            buffer: Vec::new(),
            cursor: 0,
            expected: 0,
            data_stage: false,
            terminate: false,
        }
    }

    fn max_packet_size(&self) -> usize {
        self.slot.size()
    }

    fn reset(&mut self) {
        self.toggle = Toggle::Data0;
        self.buffer.clear();
        self.cursor = 0;
        self.expected = 0;
        self.data_stage = false;
        self.terminate = false;
    }
}

/// What finishing an IN packet led to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SendProgress {
    /// A status stage or an unsolicited packet finished; nothing to report.
    Idle,
    /// The next packet of the transfer is armed.
    Continued,
    /// The whole transfer reached the host.
    Drained,
}

/// Endpoint bookkeeping and packet movement on top of a [`UsbController`].
pub struct Transport<'a, H> {
    controller: H,
    descriptors: UsbDescriptors<'a>,
    pipes: Vec<Pipe, MAX_PIPES>,
    address: u8,
    pending_address: Option<u8>,
    configured: bool,
}

impl<'a, H: UsbController> Transport<'a, H> {
    /// Programs the controller for `descriptors` and connects to the bus.
    pub fn new(mut controller: H, descriptors: UsbDescriptors<'a>) -> Result<Self, Error> {
        let mut pipes = Vec::<Pipe, MAX_PIPES>::new();
        let control = PacketMemory::control_slot(descriptors.device.bMaxPacketSize0 as u16)?;
        for direction in [UsbDirection::Out, UsbDirection::In] {
            pipes
                .push(Pipe::new(0, direction, control))
                .map_err(|_| Error::TooManyEndpoints)?;
        }
        let mut memory = PacketMemory::new();
        for endpoint in descriptors.endpoints {
            let (number, direction) = (endpoint.number(), endpoint.direction());
            if number == 0
                || pipes
                    .iter()
                    .any(|pipe| pipe.number == number && pipe.direction == direction)
            {
                return Err(Error::InvalidEndpoint(endpoint.bEndpointAddress));
            }
            let slot = memory.allocate(endpoint.wMaxPacketSize)?;
            pipes
                .push(Pipe::new(number, direction, slot))
                .map_err(|_| Error::TooManyEndpoints)?;
        }

        controller.reset();
        controller.write(Register::Muxing, USB_MUXING_TO_PHY | USB_MUXING_SOFTCON);
        controller.write(
            Register::Power,
            USB_PWR_VBUS_DETECT | USB_PWR_VBUS_DETECT_OVERRIDE_EN,
        );
        controller.write(Register::MainControl, MAIN_CTRL_CONTROLLER_EN);
        controller.write(Register::SieControl, SIE_CTRL_EP0_INT_1BUF);
        controller.write(
            Register::InterruptEnable,
            INTS_BUFF_STATUS | INTS_BUS_RESET | INTS_SETUP_REQ,
        );
        for (pipe, endpoint) in pipes[2..].iter().zip(descriptors.endpoints) {
            controller.write(
                Register::EndpointControl(pipe.number, pipe.direction),
                EP_CTRL_ENABLE
                    | EP_CTRL_INTERRUPT_PER_BUFFER
                    | (endpoint.transfer_type() as u32) << EP_CTRL_BUFFER_TYPE_LSB
                    | pipe.slot.offset() as u32,
            );
        }
        controller.set_bits(Register::SieControl, SIE_CTRL_PULLUP_EN);

        Ok(Transport {
            controller,
            descriptors,
            pipes,
            address: 0,
            pending_address: None,
            configured: false,
        })
    }

    pub fn state(&self) -> DeviceState {
        if self.configured {
            DeviceState::Configured
        } else if self.address != 0 {
            DeviceState::Addressed
        } else {
            DeviceState::Unaddressed
        }
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn descriptors(&self) -> &UsbDescriptors<'a> {
        &self.descriptors
    }

    pub fn controller(&self) -> &H {
        &self.controller
    }

    #[cfg(test)]
    pub(crate) fn controller_mut(&mut self) -> &mut H {
        &mut self.controller
    }

    /// Arms `data` on an IN endpoint, split into packets as it drains.
    ///
    /// Panics if the endpoint is not configured.
    pub fn send(&mut self, endpoint: u8, data: &[u8]) {
        let index = self.pipe_index(endpoint, UsbDirection::In);
        let pipe = &mut self.pipes[index];
        if endpoint == 0 {
            pipe.toggle = Toggle::Data1;
        }
        let len = data.len().min(TRANSFER_CAPACITY);
        if len < data.len() {
            #[cfg(feature = "defmt")]
            defmt::warn!("EP{} IN: {} bytes truncated to {}", endpoint, data.len(), len);
        }
        pipe.buffer.clear();
        pipe.buffer.extend_from_slice(&data[..len]).ok();
        pipe.cursor = 0;
        pipe.data_stage = len > 0;
        pipe.terminate = false;
        self.arm_in(index);
    }

    /// Answers the data stage of a control IN request.
    ///
    /// At most `wLength` bytes go out, and a zero-length packet closes a
    /// response that is shorter than requested but ends on a packet boundary.
    pub fn respond(&mut self, setup: &SetupPacket, data: &[u8]) {
        let len = data.len().min(setup.wLength as usize);
        self.send(0, &data[..len]);
        let index = self.pipe_index(0, UsbDirection::In);
        let pipe = &mut self.pipes[index];
        pipe.data_stage = true;
        pipe.terminate =
            len < setup.wLength as usize && len > 0 && len % pipe.max_packet_size() == 0;
    }

    /// Zero-length status stage of a control OUT request.
    pub fn acknowledge(&mut self) {
        self.send(0, &[]);
    }

    /// Arms an OUT endpoint to accept up to `len` bytes.
    ///
    /// The transfer ends when `len` bytes arrived or the host sends a short
    /// packet. Panics if the endpoint is not configured.
    pub fn receive(&mut self, endpoint: u8, len: usize) {
        let index = self.pipe_index(endpoint, UsbDirection::Out);
        let pipe = &mut self.pipes[index];
        if endpoint == 0 {
            pipe.toggle = Toggle::Data1;
        }
        pipe.buffer.clear();
        pipe.expected = len.min(TRANSFER_CAPACITY);
        self.arm_out(index);
    }

    fn arm_in(&mut self, index: usize) {
        let pipe = &mut self.pipes[index];
        let chunk = (pipe.buffer.len() - pipe.cursor).min(pipe.max_packet_size());
        let offset = pipe.slot.checked(chunk);
        self.controller
            .write_packet(offset, &pipe.buffer[pipe.cursor..pipe.cursor + chunk]);
        pipe.cursor += chunk;
        let pid = pipe.toggle.pid_bits();
        pipe.toggle.flip();
        self.controller.write(
            Register::BufferControl(pipe.number, UsbDirection::In),
            chunk as u32 | pid | BUF_CTRL_FULL | BUF_CTRL_AVAIL,
        );
    }

    fn arm_out(&mut self, index: usize) {
        let pipe = &self.pipes[index];
        let chunk = (pipe.expected - pipe.buffer.len()).min(pipe.max_packet_size());
        self.controller.write(
            Register::BufferControl(pipe.number, UsbDirection::Out),
            chunk as u32 | pipe.toggle.pid_bits() | BUF_CTRL_AVAIL,
        );
    }

    pub(crate) fn read_setup(&self) -> SetupPacket {
        let mut bytes = [0; SetupPacket::LENGTH];
        self.controller.read_packet(SETUP_PACKET_OFFSET, &mut bytes);
        SetupPacket::parse(&bytes)
    }

    pub(crate) fn interrupt_status(&self) -> u32 {
        self.controller.read(Register::InterruptStatus)
    }

    pub(crate) fn clear_sie_status(&mut self, bits: u32) {
        self.controller.write(Register::SieStatus, bits);
    }

    pub(crate) fn buffer_status(&self) -> u32 {
        self.controller.read(Register::BufferStatus)
    }

    pub(crate) fn clear_buffer_status(&mut self, bits: u32) {
        self.controller.write(Register::BufferStatus, bits);
    }

    pub(crate) fn has_pipe(&self, endpoint: u8, direction: UsbDirection) -> bool {
        self.find_pipe(endpoint, direction).is_some()
    }

    /// The address takes effect once the status stage has completed.
    pub(crate) fn defer_address(&mut self, address: u8) {
        self.pending_address = Some(address & 0x7f);
    }

    pub(crate) fn set_configured(&mut self, configured: bool) {
        self.configured = configured;
    }

    /// Handles a finished IN packet on `endpoint`.
    pub(crate) fn complete_in(&mut self, endpoint: u8) -> SendProgress {
        if endpoint == 0 {
            if let Some(address) = self.pending_address.take() {
                self.controller
                    .write(Register::DeviceAddress, address as u32);
                self.address = address;
                #[cfg(feature = "defmt")]
                defmt::info!("USB address set to {}", address);
                return SendProgress::Idle;
            }
        }
        let index = self.pipe_index(endpoint, UsbDirection::In);
        let pipe = &mut self.pipes[index];
        if pipe.cursor < pipe.buffer.len() || pipe.terminate {
            if pipe.cursor == pipe.buffer.len() {
                pipe.terminate = false;
            }
            self.arm_in(index);
            return SendProgress::Continued;
        }
        if !pipe.data_stage {
            return SendProgress::Idle;
        }
        pipe.data_stage = false;
        if endpoint == 0 {
            self.receive(0, 0);
        }
        SendProgress::Drained
    }

    /// Handles a finished OUT packet on `endpoint`, returning the transfer's
    /// bytes once it is complete.
    pub(crate) fn complete_out(&mut self, endpoint: u8) -> Option<Vec<u8, TRANSFER_CAPACITY>> {
        let index = self.pipe_index(endpoint, UsbDirection::Out);
        let length = (self
            .controller
            .read(Register::BufferControl(endpoint, UsbDirection::Out))
            & BUF_CTRL_LEN_MASK) as usize;
        let pipe = &mut self.pipes[index];
        pipe.toggle.flip();
        if length == 0 || pipe.expected == 0 {
            return None;
        }
        let start = pipe.buffer.len();
        let take = (pipe.expected - start).min(length);
        let offset = pipe.slot.checked(take);
        pipe.buffer.resize(start + take, 0).ok();
        self.controller
            .read_packet(offset, &mut pipe.buffer[start..]);
        if pipe.buffer.len() < pipe.expected && length == pipe.max_packet_size() {
            self.arm_out(index);
            return None;
        }
        pipe.expected = 0;
        Some(core::mem::take(&mut pipe.buffer))
    }

    /// Drops every transfer and returns to address 0.
    pub(crate) fn bus_reset(&mut self) {
        self.address = 0;
        self.pending_address = None;
        self.configured = false;
        self.controller.write(Register::DeviceAddress, 0);
        for pipe in self.pipes.iter_mut() {
            pipe.reset();
            self.controller
                .write(Register::BufferControl(pipe.number, pipe.direction), 0);
        }
    }

    fn find_pipe(&self, endpoint: u8, direction: UsbDirection) -> Option<usize> {
        self.pipes
            .iter()
            .position(|pipe| pipe.number == endpoint && pipe.direction == direction)
    }

    fn pipe_index(&self, endpoint: u8, direction: UsbDirection) -> usize {
        match self.find_pipe(endpoint, direction) {
            Some(index) => index,
            None => panic!("endpoint {} {:?} is not configured", endpoint, direction),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usb::{
        mock::MockController, ConfigDescriptor, DeviceDescriptor, EndpointDescriptor,
    };

    const DEVICE: DeviceDescriptor = DeviceDescriptor {
        bcdUSB: 0x0110,
        bDeviceClass: 0,
        bDeviceSubClass: 0,
        bDeviceProtocol: 0,
        bMaxPacketSize0: 8,
        idVendor: 0x6666,
        idProduct: 0x2025,
        bcdDevice: 0x0101,
        iManufacturer: 0,
        iProduct: 0,
        iSerialNumber: 0,
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

    const ENDPOINTS: [EndpointDescriptor; 2] = [
        EndpointDescriptor {
            bEndpointAddress: 0x81,
            bmAttributes: 0x03,
            wMaxPacketSize: 8,
            bInterval: 10,
        },
        EndpointDescriptor {
            bEndpointAddress: 0x01,
            bmAttributes: 0x03,
            wMaxPacketSize: 8,
            bInterval: 10,
        },
    ];

    fn descriptors(endpoints: &[EndpointDescriptor]) -> UsbDescriptors<'_> {
        UsbDescriptors {
            device: &DEVICE,
            configuration: &CONFIG,
            interfaces: &[],
            endpoints,
            strings: &[],
        }
    }

    fn transport() -> Transport<'static, MockController> {
        Transport::new(MockController::new(), descriptors(&ENDPOINTS)).unwrap()
    }

    #[test]
    fn initialization_programs_endpoints_and_pulls_up() {
        let transport = transport();
        let hw = transport.controller();
        assert_eq!(hw.resets, 1);
        assert_eq!(
            hw.value(Register::EndpointControl(1, UsbDirection::In)),
            EP_CTRL_ENABLE | EP_CTRL_INTERRUPT_PER_BUFFER | 3 << EP_CTRL_BUFFER_TYPE_LSB | 0x180
        );
        assert_eq!(
            hw.value(Register::EndpointControl(1, UsbDirection::Out)),
            EP_CTRL_ENABLE | EP_CTRL_INTERRUPT_PER_BUFFER | 3 << EP_CTRL_BUFFER_TYPE_LSB | 0x1c0
        );
        assert_ne!(hw.value(Register::SieControl) & SIE_CTRL_PULLUP_EN, 0);
        assert_eq!(
            hw.writes.last(),
            Some(&(Register::SieControl, SIE_CTRL_PULLUP_EN))
        );
        assert_eq!(transport.state(), DeviceState::Unaddressed);
    }

    #[test]
    fn rejects_duplicate_and_zero_endpoints() {
        let duplicate = [ENDPOINTS[0], ENDPOINTS[0]];
        assert_eq!(
            Transport::new(MockController::new(), descriptors(&duplicate)).err(),
            Some(Error::InvalidEndpoint(0x81))
        );
        let zero = [EndpointDescriptor {
            bEndpointAddress: 0x80,
            ..ENDPOINTS[0]
        }];
        assert_eq!(
            Transport::new(MockController::new(), descriptors(&zero)).err(),
            Some(Error::InvalidEndpoint(0x80))
        );
    }

    #[test]
    fn send_splits_into_packets_and_toggles() {
        let mut transport = transport();
        let data: [u8; 20] = core::array::from_fn(|i| i as u8);
        transport.send(1, &data);

        let mut received = std::vec::Vec::new();
        let mut pids = std::vec::Vec::new();
        while let Some(packet) = transport.controller.in_packet(1) {
            pids.push(transport.controller.pid(1, UsbDirection::In));
            received.extend_from_slice(&packet);
            transport.controller.complete_in(1);
            if transport.complete_in(1) != SendProgress::Continued {
                break;
            }
        }
        assert_eq!(received, data);
        assert_eq!(pids, [0, BUF_CTRL_DATA1_PID, 0]);
    }

    #[test]
    fn control_send_starts_with_data1_and_arms_status() {
        let mut transport = transport();
        transport.send(0, &[1, 2, 3]);
        assert_eq!(
            transport.controller.pid(0, UsbDirection::In),
            BUF_CTRL_DATA1_PID
        );
        transport.controller.complete_in(0);
        assert_eq!(transport.complete_in(0), SendProgress::Drained);
        assert!(transport.controller.is_out_armed(0));
        assert_eq!(
            transport.controller.pid(0, UsbDirection::Out),
            BUF_CTRL_DATA1_PID
        );
    }

    #[test]
    fn respond_truncates_and_terminates_on_packet_boundary() {
        let mut transport = transport();
        let setup = SetupPacket::parse(&[0x80, 0x06, 0x00, 0x02, 0x00, 0x00, 0xff, 0x00]);
        transport.respond(&setup, &[7; 16]);
        let mut packets = 0;
        while let Some(packet) = transport.controller.in_packet(0) {
            packets += 1;
            transport.controller.complete_in(0);
            if packet.is_empty() {
                assert_eq!(transport.complete_in(0), SendProgress::Drained);
                break;
            }
            assert_eq!(transport.complete_in(0), SendProgress::Continued);
        }
        assert_eq!(packets, 3);

        let short = SetupPacket::parse(&[0x80, 0x06, 0x00, 0x01, 0x00, 0x00, 0x05, 0x00]);
        transport.respond(&short, &[9; 18]);
        assert_eq!(transport.controller.in_packet(0), Some(vec![9; 5]));
    }

    #[test]
    fn zero_length_acknowledgement_is_not_reported() {
        let mut transport = transport();
        transport.acknowledge();
        assert_eq!(transport.controller.in_packet(0), Some(vec![]));
        transport.controller.complete_in(0);
        assert_eq!(transport.complete_in(0), SendProgress::Idle);
    }

    #[test]
    fn address_is_written_after_status_stage() {
        let mut transport = transport();
        transport.defer_address(9);
        transport.acknowledge();
        assert_eq!(transport.controller.value(Register::DeviceAddress), 0);
        assert_eq!(transport.state(), DeviceState::Unaddressed);
        transport.controller.complete_in(0);
        assert_eq!(transport.complete_in(0), SendProgress::Idle);
        assert_eq!(transport.controller.value(Register::DeviceAddress), 9);
        assert_eq!(transport.state(), DeviceState::Addressed);
    }

    #[test]
    fn receive_collects_packets_until_short() {
        let mut transport = transport();
        transport.receive(1, 12);
        assert!(transport.controller.is_out_armed(1));
        transport.controller.complete_out(1, &[1; 8]);
        assert_eq!(transport.complete_out(1), None);
        assert!(transport.controller.is_out_armed(1));
        assert_eq!(
            transport.controller.pid(1, UsbDirection::Out),
            BUF_CTRL_DATA1_PID
        );
        transport.controller.complete_out(1, &[2; 3]);
        let received = transport.complete_out(1).unwrap();
        assert_eq!(received.as_slice(), &[1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2]);
    }

    #[test]
    fn receive_truncates_to_requested_length() {
        let mut transport = transport();
        transport.receive(0, 1);
        transport.controller.complete_out(0, &[5, 6, 7]);
        assert_eq!(transport.complete_out(0).unwrap().as_slice(), &[5]);
    }

    #[test]
    fn bus_reset_restores_initial_toggles() {
        let mut transport = transport();
        transport.send(1, &[1]);
        transport.controller.complete_in(1);
        transport.complete_in(1);
        transport.send(1, &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        transport.defer_address(3);
        transport.set_configured(true);

        transport.bus_reset();
        assert_eq!(transport.state(), DeviceState::Unaddressed);
        assert_eq!(transport.address(), 0);
        assert_eq!(transport.controller.in_packet(1), None);
        assert_eq!(
            transport
                .controller
                .value(Register::BufferControl(1, UsbDirection::In)),
            0
        );

        transport.acknowledge();
        transport.controller.complete_in(0);
        assert_eq!(transport.complete_in(0), SendProgress::Idle);
        assert_eq!(transport.address(), 0);

        transport.send(1, &[4]);
        assert_eq!(transport.controller.pid(1, UsbDirection::In), 0);
    }

    #[test]
    #[should_panic(expected = "not configured")]
    fn unknown_endpoint_is_fatal() {
        transport().send(3, &[0]);
    }
}
