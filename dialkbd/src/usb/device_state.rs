#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceState {
    /// Attached, or just reset, and answering on address 0.
    Unaddressed,
    Addressed,
    Configured,
}
