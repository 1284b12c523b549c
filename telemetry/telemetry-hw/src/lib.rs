//! # Hardware Access Seam
//!
//! Trait boundary between the telemetry engine and the machine it measures.
//!
//! ## Overview
//!
//! The engine never touches hardware directly. Every device family it knows
//! about is reached through one small trait, and a [`Hardware`] implementation
//! bundles one backend per family:
//!
//! - [`RegisterBridge`] — synchronous register access, possibly on another
//!   processor.
//! - [`MmioMapper`] / [`MappedRegion`] — physical windows mapped for the
//!   lifetime of a region handle; dropping the handle unmaps.
//! - [`ConfigSpace`] — configuration-space dword reads and writes.
//! - [`EmbeddedController`] — byte-wide channel reads.
//! - [`CounterBank`] — whole-bank counter snapshots.
//! - [`TimeSource`] — wall-clock microseconds and a raw cycle counter.
//!
//! All fallible accesses report [`AccessError`]; the engine folds those into
//! its own error taxonomy with the call-site context (which phase, which
//! address) attached.
//!
//! ## Backends
//!
//! Two backends ship with the crate, both feature-gated:
//!
//! - `asm` (x86_64 only): local register instructions, a serialized cycle
//!   counter and a fixed-offset direct-map window — the pieces a driver shell
//!   wires into its own [`Hardware`] implementation ([`x86_64`]).
//! - `sim`: a deterministic in-memory machine with fault injection and an
//!   outstanding-mapping counter, used by the engine's tests and the demo
//!   harness ([`sim`]).

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

#[cfg(feature = "sim")]
extern crate alloc;

#[cfg(feature = "sim")]
pub mod sim;

#[cfg(all(feature = "asm", target_arch = "x86_64"))]
pub mod x86_64;

use telemetry_tables::{
    ConfigAddress, CounterSnapshot, CpuIndex, EcChannel, PhysicalAddress, RegisterAddress,
    RegisterValue,
};

/// Why a hardware access could not be performed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// The running platform lacks the capability behind this access path.
    #[error("access path not supported on this platform")]
    Unsupported,
    /// The addressed processor is offline or cannot serve remote calls.
    #[error("processor {0} is unavailable")]
    CpuUnavailable(CpuIndex),
    /// The addressed processor did not answer the remote call in time.
    #[error("remote call to processor {0} timed out")]
    RemoteTimeout(CpuIndex),
    /// The mapper refused to establish a mapping at this address.
    #[error("mapping refused at {0}")]
    MapRefused(PhysicalAddress),
    /// The device faulted or rejected the access.
    #[error("device access faulted")]
    Faulted,
}

/// Synchronous register access, possibly on another processor.
///
/// An implementation executes the access on the processor the caller names
/// and blocks until the access completes. How execution reaches the other
/// processor is implementation-defined; what is fixed is the contract: no
/// unbounded wait, and a typed error when the target cannot serve the call.
/// Whether remote processors are reachable at all is decided when the
/// implementation is constructed, never discovered mid-access.
pub trait RegisterBridge {
    /// Reads `register` on `cpu`.
    ///
    /// # Errors
    /// [`AccessError::CpuUnavailable`] when the processor cannot be reached,
    /// [`AccessError::RemoteTimeout`] when it does not answer in time,
    /// [`AccessError::Faulted`] when the access itself faults.
    fn read(&self, cpu: CpuIndex, register: RegisterAddress)
    -> Result<RegisterValue, AccessError>;

    /// Writes `value` into `register` on `cpu`.
    ///
    /// # Errors
    /// Same failure modes as [`RegisterBridge::read`].
    fn write(
        &self,
        cpu: CpuIndex,
        register: RegisterAddress,
        value: RegisterValue,
    ) -> Result<(), AccessError>;
}

/// A live mapping of a physical window, [`len`](MappedRegion::len) words wide.
///
/// The mapping is torn down exactly once, when the region handle is dropped.
pub trait MappedRegion {
    /// Number of 64-bit words the region covers.
    fn len(&self) -> usize;

    /// Whether the region covers no words.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores one word `index` words past the region base.
    ///
    /// Stores are volatile. `index` must be below the region length;
    /// out-of-range stores are ignored.
    fn write_word(&self, index: usize, value: u64);

    /// Loads `dst.len().min(self.len())` words from the region base into
    /// `dst`. Loads are volatile.
    fn read_into(&self, dst: &mut [u64]);
}

/// Establishes mappings of physical windows.
pub trait MmioMapper {
    /// The handle for one live mapping; unmaps on drop.
    type Region: MappedRegion;

    /// Maps `words` 64-bit words starting at `base`.
    ///
    /// # Errors
    /// [`AccessError::MapRefused`] when the window cannot be mapped.
    fn map(&self, base: PhysicalAddress, words: usize) -> Result<Self::Region, AccessError>;
}

/// Configuration-space dword access at a packed [`ConfigAddress`].
pub trait ConfigSpace {
    /// Reads the dword at `address`.
    ///
    /// # Errors
    /// [`AccessError::Faulted`] when the device rejects the access,
    /// [`AccessError::Unsupported`] when the platform has no config path.
    fn read(&self, address: ConfigAddress) -> Result<u32, AccessError>;

    /// Writes `value` to the dword at `address`.
    ///
    /// # Errors
    /// Same failure modes as [`ConfigSpace::read`].
    fn write(&self, address: ConfigAddress, value: u32) -> Result<(), AccessError>;
}

/// Byte-wide channel reads from the embedded controller.
pub trait EmbeddedController {
    /// Reads one byte from `channel`.
    ///
    /// # Errors
    /// [`AccessError::Faulted`] when the controller reports failure for the
    /// channel.
    fn read_channel(&self, channel: EcChannel) -> Result<u8, AccessError>;
}

/// The fixed counter bank, captured whole.
pub trait CounterBank {
    /// Captures every lane of the bank in one snapshot.
    ///
    /// # Errors
    /// [`AccessError::Faulted`] when the bank cannot be read.
    fn snapshot(&self) -> Result<CounterSnapshot, AccessError>;
}

/// Wall-clock and cycle-counter time, as the phase stamps need them.
pub trait TimeSource {
    /// Wall-clock time in microseconds.
    fn wall_clock_us(&self) -> u64;

    /// Raw processor cycle count.
    fn cycle_count(&self) -> u64;
}

/// One complete hardware backend: every device family the engine touches.
pub trait Hardware {
    type Registers: RegisterBridge;
    type Mmio: MmioMapper;
    type Config: ConfigSpace;
    type Ec: EmbeddedController;
    type Counters: CounterBank;
    type Clock: TimeSource;

    fn registers(&self) -> &Self::Registers;
    fn mmio(&self) -> &Self::Mmio;
    fn config(&self) -> &Self::Config;
    fn ec(&self) -> &Self::Ec;
    fn counters(&self) -> &Self::Counters;
    fn clock(&self) -> &Self::Clock;
}

/// Region handle type of a [`Hardware`] implementation's mapper.
pub type RegionOf<H> = <<H as Hardware>::Mmio as MmioMapper>::Region;
