mod controller;
mod descriptors;
mod device_slot;
mod device_state;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
mod packet_memory;
pub mod registers;
mod request_type;
mod setup_packet;
mod transport;
mod usb_device;

pub use controller::{Block, Register, UsbController};
pub use descriptors::{
    ConfigDescriptor, DescriptorBuffer, DeviceDescriptor, EndpointDescriptor, HidDescriptor,
    InterfaceDescriptor, UsbDescriptors, DESCRIPTOR_BUFFER_SIZE, HID_DESCRIPTOR_TYPE,
    REPORT_DESCRIPTOR_TYPE,
};
pub use device_slot::DeviceSlot;
pub use device_state::DeviceState;
pub use packet_memory::{BufferSlot, PacketMemory, MAX_PACKET_SIZE, PACKET_MEMORY_SIZE};
pub use request_type::{BmRequestType, Direction, Recipient, Type};
pub use setup_packet::SetupPacket;
pub use transport::{Transport, MAX_PIPES, TRANSFER_CAPACITY};
pub use usb_device::{UsbClass, UsbDevice};
