/// Identity a keyboard reports to the host.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub manufacturer: &'static str,
    pub vendor_id: u16,
    pub product_id: u16,
    /// BCD, 0x0101 for 1.01.
    pub device_version: u16,
    pub product_name: &'static str,
    pub serial_number: &'static str,
}
