//! # x86_64 Access Primitives
//!
//! Local register instructions, a serialized cycle-counter read, and a
//! fixed-offset direct-map window. A driver shell combines these into a
//! [`Hardware`](crate::Hardware) backend; cross-processor dispatch and a
//! wall clock must come from the hosting kernel, so no complete backend is
//! assembled here.

use crate::{AccessError, MappedRegion, MmioMapper, RegisterBridge};
use bitfield_struct::bitfield;
use telemetry_tables::{CpuIndex, PhysicalAddress, RegisterAddress, RegisterValue};

/// Reads `register` on the calling processor.
///
/// # Safety
/// - Executes the privileged `rdmsr` instruction; only valid at CPL 0.
/// - `register` must be a valid, readable register index on this processor,
///   otherwise the instruction raises #GP(0).
#[inline]
#[must_use]
pub unsafe fn rdmsr(register: RegisterAddress) -> RegisterValue {
    let lo: u32;
    let hi: u32;
    let ecx = register.as_u32();
    unsafe {
        core::arch::asm!(
        "rdmsr",
        in("ecx") ecx,
        out("eax") lo,
        out("edx") hi,
        options(nomem, nostack, preserves_flags)
        );
    }
    RegisterValue::from_halves(lo, hi)
}

/// Writes `value` into `register` on the calling processor.
///
/// # Safety
/// - Executes the privileged `wrmsr` instruction; only valid at CPL 0.
/// - `register` must be valid and writable, and `value` architecturally
///   legal for it, otherwise the instruction raises #GP(0).
#[inline]
pub unsafe fn wrmsr(register: RegisterAddress, value: RegisterValue) {
    let lo = value.low();
    let hi = value.high();
    let ecx = register.as_u32();
    unsafe {
        core::arch::asm!(
        "wrmsr",
        in("ecx") ecx,
        in("eax") lo,
        in("edx") hi,
        options(nostack, preserves_flags)
        );
    }
}

/// Reads the time-stamp counter, fenced so earlier loads retire first.
#[inline]
#[must_use]
pub fn read_cycle_counter() -> u64 {
    let lo: u32;
    let hi: u32;
    unsafe {
        core::arch::asm!(
        "lfence", // serialize (Intel-recommended)
        "rdtsc",
        out("eax") lo,
        out("edx") hi,
        options(nomem, nostack, preserves_flags)
        );
    }
    (u64::from(hi) << 32) | u64::from(lo)
}

/// The CPUID.01H:EDX flags this module cares about.
#[bitfield(u32)]
struct FeatureEdx {
    /// Bits 0–3 — features below the time-stamp counter flag.
    #[bits(4)]
    _low: u8,
    /// Bit 4 — Time-Stamp Counter (RDTSC) instruction available.
    tsc: bool,
    /// Bit 5 — Model-Specific Registers (RDMSR/WRMSR) supported.
    msr: bool,
    /// Bits 6–31 — features this module does not consume.
    #[bits(26)]
    _rest: u32,
}

/// Execute CPUID with the given leaf and subleaf.
///
/// # Safety
/// Must run at CPL 0 with the CPUID instruction available.
#[inline]
unsafe fn cpuid_edx(leaf: u32, subleaf: u32) -> u32 {
    let edx: u32;
    // rbx is LLVM-reserved, so cpuid's ebx output detours through a scratch
    unsafe {
        core::arch::asm!(
        "mov {scratch:r}, rbx",
        "cpuid",
        "mov rbx, {scratch:r}",
        scratch = out(reg) _,
        inlateout("eax") leaf => _,
        inlateout("ecx") subleaf => _,
        lateout("edx") edx,
        options(nomem, nostack, preserves_flags)
        );
    }
    edx
}

/// Register bridge bound to the calling processor.
///
/// The hosting kernel pins the executing thread to one processor and names
/// that processor's index at construction. Operations naming any other index
/// fail with [`AccessError::CpuUnavailable`] instead of silently touching
/// the wrong register file; remote dispatch, where available, wraps this
/// bridge from the shell side.
pub struct LocalRegisterBridge {
    local: CpuIndex,
}

impl LocalRegisterBridge {
    /// Probes CPUID for register-access support and binds the bridge to
    /// `local`.
    ///
    /// # Errors
    /// [`AccessError::Unsupported`] when the processor does not advertise
    /// the register-access instructions.
    ///
    /// # Safety
    /// The caller guarantees execution stays at CPL 0 and pinned to `local`
    /// for the bridge's lifetime.
    pub unsafe fn new(local: CpuIndex) -> Result<Self, AccessError> {
        let features = FeatureEdx::from_bits(unsafe { cpuid_edx(0x01, 0) });
        if features.msr() && features.tsc() {
            Ok(Self { local })
        } else {
            Err(AccessError::Unsupported)
        }
    }
}

impl RegisterBridge for LocalRegisterBridge {
    fn read(
        &self,
        cpu: CpuIndex,
        register: RegisterAddress,
    ) -> Result<RegisterValue, AccessError> {
        if cpu != self.local {
            return Err(AccessError::CpuUnavailable(cpu));
        }
        Ok(unsafe { rdmsr(register) })
    }

    fn write(
        &self,
        cpu: CpuIndex,
        register: RegisterAddress,
        value: RegisterValue,
    ) -> Result<(), AccessError> {
        if cpu != self.local {
            return Err(AccessError::CpuUnavailable(cpu));
        }
        unsafe { wrmsr(register, value) };
        Ok(())
    }
}

/// Maps physical windows through a fixed physical-to-virtual offset, in the
/// style of a higher-half direct map.
///
/// "Mapping" is pointer arithmetic against the permanent direct map, so
/// dropping a region is a no-op.
pub struct OffsetMmioWindow {
    offset: u64,
}

impl OffsetMmioWindow {
    /// # Safety
    /// Every physical address later mapped must be covered by a permanent,
    /// uncached direct mapping at `physical + offset` for the lifetime of
    /// the window and all regions handed out.
    #[must_use]
    pub const unsafe fn new(offset: u64) -> Self {
        Self { offset }
    }
}

impl MmioMapper for OffsetMmioWindow {
    type Region = OffsetMappedRegion;

    fn map(&self, base: PhysicalAddress, words: usize) -> Result<Self::Region, AccessError> {
        let virt = self
            .offset
            .checked_add(base.as_u64())
            .ok_or(AccessError::MapRefused(base))?;
        let addr = usize::try_from(virt).map_err(|_| AccessError::MapRefused(base))?;
        Ok(OffsetMappedRegion {
            base: core::ptr::with_exposed_provenance_mut(addr),
            words,
        })
    }
}

/// A window handed out by [`OffsetMmioWindow`]; dropping does not unmap
/// because the direct map is permanent.
pub struct OffsetMappedRegion {
    base: *mut u64,
    words: usize,
}

impl MappedRegion for OffsetMappedRegion {
    fn len(&self) -> usize {
        self.words
    }

    fn write_word(&self, index: usize, value: u64) {
        debug_assert!(index < self.words);
        if index < self.words {
            unsafe { self.base.add(index).write_volatile(value) };
        }
    }

    fn read_into(&self, dst: &mut [u64]) {
        let n = dst.len().min(self.words);
        for (i, slot) in dst.iter_mut().take(n).enumerate() {
            *slot = unsafe { self.base.add(i).read_volatile() };
        }
    }
}
