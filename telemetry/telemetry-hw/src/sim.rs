//! # Simulated Hardware
//!
//! An in-memory [`Hardware`] backend for tests and demos. Every seam is a
//! plain map with per-address fault injection, and the mapper counts its
//! live regions so lifecycle tests can assert that a torn-down acquisition
//! released every mapping it took out.

use crate::{
    AccessError, ConfigSpace, CounterBank, EmbeddedController, Hardware, MappedRegion, MmioMapper,
    RegisterBridge, TimeSource,
};
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::rc::Rc;
use core::cell::{Cell, RefCell};
use log::trace;
use telemetry_tables::{
    ConfigAddress, CounterSnapshot, CpuIndex, EcChannel, PhysicalAddress, RegisterAddress,
    RegisterValue,
};

/// Simulated per-processor register files.
///
/// Registers read as zero until written. Faults are injected per processor
/// and register pair; timeouts per processor. Indices at or above the
/// configured processor count are unavailable.
#[derive(Debug)]
pub struct SimRegisters {
    cpus: u32,
    file: RefCell<BTreeMap<(CpuIndex, RegisterAddress), u64>>,
    faulting: RefCell<BTreeSet<(CpuIndex, RegisterAddress)>>,
    timing_out: RefCell<BTreeSet<CpuIndex>>,
}

impl SimRegisters {
    fn new(cpus: u32) -> Self {
        Self {
            cpus,
            file: RefCell::new(BTreeMap::new()),
            faulting: RefCell::new(BTreeSet::new()),
            timing_out: RefCell::new(BTreeSet::new()),
        }
    }

    /// Stores `value` directly, without the bridge's availability gate.
    pub fn set(&self, cpu: CpuIndex, register: RegisterAddress, value: u64) {
        self.file.borrow_mut().insert((cpu, register), value);
    }

    /// Reads the stored value directly, without the availability gate.
    #[must_use]
    pub fn get(&self, cpu: CpuIndex, register: RegisterAddress) -> u64 {
        self.file
            .borrow()
            .get(&(cpu, register))
            .copied()
            .unwrap_or(0)
    }

    /// Makes every access to `register` on `cpu` fault.
    pub fn fail_at(&self, cpu: CpuIndex, register: RegisterAddress) {
        self.faulting.borrow_mut().insert((cpu, register));
    }

    /// Makes every call targeting `cpu` time out.
    pub fn time_out(&self, cpu: CpuIndex) {
        self.timing_out.borrow_mut().insert(cpu);
    }

    fn gate(&self, cpu: CpuIndex, register: RegisterAddress) -> Result<(), AccessError> {
        if cpu.as_u32() >= self.cpus {
            return Err(AccessError::CpuUnavailable(cpu));
        }
        if self.timing_out.borrow().contains(&cpu) {
            return Err(AccessError::RemoteTimeout(cpu));
        }
        if self.faulting.borrow().contains(&(cpu, register)) {
            return Err(AccessError::Faulted);
        }
        Ok(())
    }
}

impl RegisterBridge for SimRegisters {
    fn read(
        &self,
        cpu: CpuIndex,
        register: RegisterAddress,
    ) -> Result<RegisterValue, AccessError> {
        self.gate(cpu, register)?;
        Ok(RegisterValue::from_bits(self.get(cpu, register)))
    }

    fn write(
        &self,
        cpu: CpuIndex,
        register: RegisterAddress,
        value: RegisterValue,
    ) -> Result<(), AccessError> {
        self.gate(cpu, register)?;
        self.set(cpu, register, value.into_bits());
        Ok(())
    }
}

/// Simulated physical memory, one shared word store behind every mapping.
///
/// Regions returned by [`MmioMapper::map`] all read and write the same
/// store, keyed by physical byte address, so data seeded here is visible
/// through any region covering it. The mapper keeps a live-region count;
/// [`outstanding_mappings`](Self::outstanding_mappings) exposes it so tests
/// can prove that every region handed out was dropped again.
#[derive(Debug, Default)]
pub struct SimMmio {
    words: Rc<RefCell<BTreeMap<u64, u64>>>,
    refused: RefCell<BTreeSet<u64>>,
    live: Rc<Cell<usize>>,
}

impl SimMmio {
    /// Seeds consecutive words starting at `base`.
    pub fn seed_words(&self, base: PhysicalAddress, words: &[u64]) {
        let mut store = self.words.borrow_mut();
        for (i, word) in words.iter().enumerate() {
            store.insert(base.as_u64() + 8 * i as u64, *word);
        }
    }

    /// Reads the word stored at `address`, zero if never written.
    #[must_use]
    pub fn word(&self, address: PhysicalAddress) -> u64 {
        self.words
            .borrow()
            .get(&address.as_u64())
            .copied()
            .unwrap_or(0)
    }

    /// Makes every mapping attempt at `base` fail.
    pub fn refuse(&self, base: PhysicalAddress) {
        self.refused.borrow_mut().insert(base.as_u64());
    }

    /// Number of regions handed out and not yet dropped.
    #[must_use]
    pub fn outstanding_mappings(&self) -> usize {
        self.live.get()
    }
}

impl MmioMapper for SimMmio {
    type Region = SimRegion;

    fn map(&self, base: PhysicalAddress, words: usize) -> Result<Self::Region, AccessError> {
        if self.refused.borrow().contains(&base.as_u64()) {
            return Err(AccessError::MapRefused(base));
        }
        self.live.set(self.live.get() + 1);
        trace!("sim: mapped {words} words at {base}");
        Ok(SimRegion {
            store: Rc::clone(&self.words),
            live: Rc::clone(&self.live),
            base: base.as_u64(),
            words,
        })
    }
}

/// A live window into [`SimMmio`]'s word store.
#[derive(Debug)]
pub struct SimRegion {
    store: Rc<RefCell<BTreeMap<u64, u64>>>,
    live: Rc<Cell<usize>>,
    base: u64,
    words: usize,
}

impl MappedRegion for SimRegion {
    fn len(&self) -> usize {
        self.words
    }

    fn write_word(&self, index: usize, value: u64) {
        if index < self.words {
            self.store
                .borrow_mut()
                .insert(self.base + 8 * index as u64, value);
        }
    }

    fn read_into(&self, dst: &mut [u64]) {
        let store = self.store.borrow();
        for (i, slot) in dst.iter_mut().take(self.words).enumerate() {
            *slot = store.get(&(self.base + 8 * i as u64)).copied().unwrap_or(0);
        }
    }
}

impl Drop for SimRegion {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
        let words = self.words;
        let base = self.base;
        trace!("sim: unmapped {words} words at 0x{base:016X}");
    }
}

/// Simulated configuration space, keyed by the packed address dword.
#[derive(Debug, Default)]
pub struct SimConfig {
    registers: RefCell<BTreeMap<u32, u32>>,
    faulting: RefCell<BTreeSet<u32>>,
}

impl SimConfig {
    /// Stores `value` at `address` directly.
    pub fn set(&self, address: ConfigAddress, value: u32) {
        self.registers.borrow_mut().insert(address.into_bits(), value);
    }

    /// Reads the value stored at `address` directly, zero if never written.
    #[must_use]
    pub fn get(&self, address: ConfigAddress) -> u32 {
        self.registers
            .borrow()
            .get(&address.into_bits())
            .copied()
            .unwrap_or(0)
    }

    /// Makes every access to `address` fault.
    pub fn fail_at(&self, address: ConfigAddress) {
        self.faulting.borrow_mut().insert(address.into_bits());
    }
}

impl ConfigSpace for SimConfig {
    fn read(&self, address: ConfigAddress) -> Result<u32, AccessError> {
        if self.faulting.borrow().contains(&address.into_bits()) {
            return Err(AccessError::Faulted);
        }
        Ok(self.get(address))
    }

    fn write(&self, address: ConfigAddress, value: u32) -> Result<(), AccessError> {
        if self.faulting.borrow().contains(&address.into_bits()) {
            return Err(AccessError::Faulted);
        }
        self.set(address, value);
        Ok(())
    }
}

/// Simulated embedded controller with a byte per channel.
#[derive(Debug, Default)]
pub struct SimEc {
    channels: RefCell<BTreeMap<EcChannel, u8>>,
    faulting: RefCell<BTreeSet<EcChannel>>,
}

impl SimEc {
    /// Stores `value` behind `channel`.
    pub fn set_channel(&self, channel: EcChannel, value: u8) {
        self.channels.borrow_mut().insert(channel, value);
    }

    /// Makes every read of `channel` fault.
    pub fn fail_channel(&self, channel: EcChannel) {
        self.faulting.borrow_mut().insert(channel);
    }
}

impl EmbeddedController for SimEc {
    fn read_channel(&self, channel: EcChannel) -> Result<u8, AccessError> {
        if self.faulting.borrow().contains(&channel) {
            return Err(AccessError::Faulted);
        }
        Ok(self.channels.borrow().get(&channel).copied().unwrap_or(0))
    }
}

/// Simulated counter bank.
#[derive(Debug, Default)]
pub struct SimCounters {
    lanes: RefCell<CounterSnapshot>,
    faulting: Cell<bool>,
}

impl SimCounters {
    /// Replaces the lane values the next snapshot will observe.
    pub fn set_lanes(&self, lanes: CounterSnapshot) {
        *self.lanes.borrow_mut() = lanes;
    }

    /// Adds `delta` to every lane, as a counting device would between polls.
    pub fn advance(&self, delta: u64) {
        let mut lanes = self.lanes.borrow_mut();
        for lane in &mut *lanes {
            *lane += delta;
        }
    }

    /// Makes every snapshot fault from now on.
    pub fn fail(&self) {
        self.faulting.set(true);
    }
}

impl CounterBank for SimCounters {
    fn snapshot(&self) -> Result<CounterSnapshot, AccessError> {
        if self.faulting.get() {
            return Err(AccessError::Faulted);
        }
        Ok(*self.lanes.borrow())
    }
}

/// Simulated clock; every read advances it, so consecutive stamps are
/// strictly increasing without any test bookkeeping.
#[derive(Debug, Default)]
pub struct SimClock {
    us: Cell<u64>,
    cycles: Cell<u64>,
}

impl SimClock {
    /// Jumps the clock forward.
    pub fn advance(&self, us: u64, cycles: u64) {
        self.us.set(self.us.get() + us);
        self.cycles.set(self.cycles.get() + cycles);
    }
}

impl TimeSource for SimClock {
    fn wall_clock_us(&self) -> u64 {
        let now = self.us.get();
        self.us.set(now + 1);
        now
    }

    fn cycle_count(&self) -> u64 {
        let now = self.cycles.get();
        self.cycles.set(now + 1000);
        now
    }
}

/// The assembled simulated backend.
///
/// Components are public so tests can seed state and inject faults without
/// going through the access traits.
#[derive(Debug)]
pub struct SimHardware {
    pub registers: SimRegisters,
    pub mmio: SimMmio,
    pub config: SimConfig,
    pub ec: SimEc,
    pub counters: SimCounters,
    pub clock: SimClock,
}

impl SimHardware {
    /// Builds a backend with `cpus` available processor indices.
    #[must_use]
    pub fn new(cpus: u32) -> Self {
        Self {
            registers: SimRegisters::new(cpus),
            mmio: SimMmio::default(),
            config: SimConfig::default(),
            ec: SimEc::default(),
            counters: SimCounters::default(),
            clock: SimClock::default(),
        }
    }
}

impl Hardware for SimHardware {
    type Registers = SimRegisters;
    type Mmio = SimMmio;
    type Config = SimConfig;
    type Ec = SimEc;
    type Counters = SimCounters;
    type Clock = SimClock;

    fn registers(&self) -> &Self::Registers {
        &self.registers
    }

    fn mmio(&self) -> &Self::Mmio {
        &self.mmio
    }

    fn config(&self) -> &Self::Config {
        &self.config
    }

    fn ec(&self) -> &Self::Ec {
        &self.ec
    }

    fn counters(&self) -> &Self::Counters {
        &self.counters
    }

    fn clock(&self) -> &Self::Clock {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_round_trip_through_the_bridge() {
        let regs = SimRegisters::new(2);
        let cpu = CpuIndex::new(1);
        let reg = RegisterAddress::new(0xE7);

        regs.write(cpu, reg, RegisterValue::from_bits(0xDEAD_BEEF))
            .unwrap();
        assert_eq!(regs.read(cpu, reg).unwrap().into_bits(), 0xDEAD_BEEF);
        assert_eq!(regs.read(cpu, RegisterAddress::new(0x10)).unwrap().into_bits(), 0);
    }

    #[test]
    fn register_faults_are_per_address() {
        let regs = SimRegisters::new(4);
        let cpu = CpuIndex::new(0);
        regs.fail_at(cpu, RegisterAddress::new(0x1A0));

        assert_eq!(
            regs.read(cpu, RegisterAddress::new(0x1A0)),
            Err(AccessError::Faulted)
        );
        assert!(regs.read(cpu, RegisterAddress::new(0x1A1)).is_ok());

        let offline = CpuIndex::new(4);
        assert_eq!(
            regs.read(offline, RegisterAddress::new(0x10)),
            Err(AccessError::CpuUnavailable(offline))
        );

        regs.time_out(CpuIndex::new(2));
        assert_eq!(
            regs.read(CpuIndex::new(2), RegisterAddress::new(0x10)),
            Err(AccessError::RemoteTimeout(CpuIndex::new(2)))
        );
    }

    #[test]
    fn mapper_counts_live_regions() {
        let mmio = SimMmio::default();
        assert_eq!(mmio.outstanding_mappings(), 0);

        let a = mmio.map(PhysicalAddress::new(0x1000), 4).unwrap();
        let b = mmio.map(PhysicalAddress::new(0x2000), 1).unwrap();
        assert_eq!(mmio.outstanding_mappings(), 2);

        drop(a);
        assert_eq!(mmio.outstanding_mappings(), 1);
        drop(b);
        assert_eq!(mmio.outstanding_mappings(), 0);
    }

    #[test]
    fn refused_base_does_not_leak_a_region() {
        let mmio = SimMmio::default();
        let base = PhysicalAddress::new(0xFED0_0000);
        mmio.refuse(base);

        assert_eq!(mmio.map(base, 2).err(), Some(AccessError::MapRefused(base)));
        assert_eq!(mmio.outstanding_mappings(), 0);
    }

    #[test]
    fn region_words_land_in_the_shared_store() {
        let mmio = SimMmio::default();
        let base = PhysicalAddress::new(0x3000);
        mmio.seed_words(base, &[11, 22, 33]);

        let region = mmio.map(base, 3).unwrap();
        let mut out = [0u64; 3];
        region.read_into(&mut out);
        assert_eq!(out, [11, 22, 33]);

        region.write_word(1, 77);
        region.write_word(9, 1234);
        assert_eq!(mmio.word(base + 8), 77);
        assert_eq!(mmio.word(base + 72), 0);
    }

    #[test]
    fn config_space_round_trips_and_faults() {
        let cfg = SimConfig::default();
        let addr = ConfigAddress::new()
            .with_enable(true)
            .with_bus(0)
            .with_device(2)
            .with_function(0)
            .with_offset(0x10);

        cfg.write(addr, 0xFEDC_BA98).unwrap();
        assert_eq!(cfg.read(addr).unwrap(), 0xFEDC_BA98);

        cfg.fail_at(addr);
        assert_eq!(cfg.read(addr), Err(AccessError::Faulted));
    }

    #[test]
    fn counters_snapshot_and_advance() {
        let counters = SimCounters::default();
        counters.set_lanes([1, 2, 3, 4, 5, 6, 7, 8, 9]);
        counters.advance(10);
        assert_eq!(counters.snapshot().unwrap(), [11, 12, 13, 14, 15, 16, 17, 18, 19]);

        counters.fail();
        assert_eq!(counters.snapshot(), Err(AccessError::Faulted));
    }

    #[test]
    fn clock_stamps_strictly_increase() {
        let clock = SimClock::default();
        let a = clock.wall_clock_us();
        let b = clock.wall_clock_us();
        assert!(b > a);

        let c = clock.cycle_count();
        let d = clock.cycle_count();
        assert!(d > c);

        clock.advance(500, 1_000_000);
        assert!(clock.wall_clock_us() >= 500);
    }
}
