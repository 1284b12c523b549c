use bitfield_struct::bitfield;

/// Packed configuration-space address.
///
/// Encodes bus / device / function / register offset in the conventional
/// 32-bit configuration-address layout. The config-space backend decides how
/// the packed word reaches the hardware (port pair, message registers, or a
/// memory-mapped window); this type only owns the packing.
#[bitfield(u32)]
#[derive(PartialEq, Eq)]
pub struct ConfigAddress {
    /// Bits 0–7 — Register offset within the function's configuration space.
    ///
    /// Dword-aligned accesses keep the low two bits at 0.
    pub offset: u8,

    /// Bits 8–10 — Function number (0–7).
    #[bits(3)]
    pub function: u8,

    /// Bits 11–15 — Device number (0–31).
    #[bits(5)]
    pub device: u8,

    /// Bits 16–23 — Bus number.
    pub bus: u8,

    /// Bits 24–30 — Reserved (must be 0).
    #[bits(7, default = 0)]
    _reserved_24_30: u8,

    /// Bit 31 — Enable.
    ///
    /// Set when the address is handed to an address/data port pair; backends
    /// that address configuration space differently may ignore it.
    pub enable: bool,
}
