use bitfield_struct::bitfield;

/// Number of lanes in one fixed counter-bank snapshot.
pub const COUNTER_LANES: usize = 9;

/// One counter-bank snapshot: every lane captured in a single read.
pub type CounterSnapshot = [u64; COUNTER_LANES];

/// A 64-bit register value modeled as its two 32-bit halves.
///
/// Register access instructions move the value through a low/high register
/// pair, and operation records carry masks and operands in the same split
/// form, so the halves stay addressable instead of being folded into a bare
/// `u64`. Use [`RegisterValue::into_bits`] when the combined value is wanted.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct RegisterValue {
    /// Bits 0–31 — Low half (the accumulator-register half).
    pub low: u32,

    /// Bits 32–63 — High half (the data-register half).
    pub high: u32,
}

impl RegisterValue {
    /// Assembles a value from its two halves.
    #[inline]
    #[must_use]
    pub const fn from_halves(low: u32, high: u32) -> Self {
        Self::new().with_low(low).with_high(high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn halves_land_in_their_words() {
        let v = RegisterValue::from_halves(0xDEAD_BEEF, 0x0000_00FF);
        assert_eq!(v.into_bits(), 0x0000_00FF_DEAD_BEEF);
        assert_eq!(v.low(), 0xDEAD_BEEF);
        assert_eq!(v.high(), 0x0000_00FF);
    }

    #[test]
    fn round_trips_through_bits() {
        let v = RegisterValue::from_bits(0x0123_4567_89AB_CDEF);
        assert_eq!(v.low(), 0x89AB_CDEF);
        assert_eq!(v.high(), 0x0123_4567);
    }
}
