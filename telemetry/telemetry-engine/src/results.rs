//! Owned result storage for one session.

use crate::layout::Layout;
use alloc::boxed::Box;
use alloc::vec;
use telemetry_tables::{CounterSnapshot, OpClass, PerPhase, Phase};

/// Zero-initialized result arrays, phase-major, one array per family.
///
/// A family's array is absent exactly where the layout sized it at zero
/// elements, so the store never carries an allocation nothing will write.
/// Timestamp arrays are always present; they are empty only for a
/// zero-record sampling phase.
#[derive(Debug)]
pub(crate) struct ResultStore {
    pub registers: PerPhase<Option<Box<[u64]>>>,
    pub mapped: PerPhase<Option<Box<[u64]>>>,
    pub config: PerPhase<Option<Box<[u32]>>>,
    pub channels: PerPhase<Option<Box<[u8]>>>,
    pub counters: PerPhase<Option<Box<[CounterSnapshot]>>>,
    pub wall_us: PerPhase<Box<[u64]>>,
    pub cycles: PerPhase<Box<[u64]>>,
}

impl ResultStore {
    /// Allocates every array the layout sized nonzero.
    pub fn for_layout(layout: &Layout) -> Self {
        Self {
            registers: family(layout, OpClass::Register),
            mapped: family(layout, OpClass::Mapped),
            config: family(layout, OpClass::Config),
            channels: family(layout, OpClass::Channel),
            counters: family(layout, OpClass::Counter),
            wall_us: stamp_slots(layout),
            cycles: stamp_slots(layout),
        }
    }

    pub fn register_slots(&self, phase: Phase) -> &[u64] {
        self.registers.get(phase).as_deref().unwrap_or(&[])
    }

    pub fn register_slots_mut(&mut self, phase: Phase) -> &mut [u64] {
        self.registers.get_mut(phase).as_deref_mut().unwrap_or(&mut [])
    }

    pub fn mapped_slots(&self, phase: Phase) -> &[u64] {
        self.mapped.get(phase).as_deref().unwrap_or(&[])
    }

    pub fn mapped_slots_mut(&mut self, phase: Phase) -> &mut [u64] {
        self.mapped.get_mut(phase).as_deref_mut().unwrap_or(&mut [])
    }

    pub fn config_slots(&self, phase: Phase) -> &[u32] {
        self.config.get(phase).as_deref().unwrap_or(&[])
    }

    pub fn config_slots_mut(&mut self, phase: Phase) -> &mut [u32] {
        self.config.get_mut(phase).as_deref_mut().unwrap_or(&mut [])
    }

    pub fn channel_slots(&self, phase: Phase) -> &[u8] {
        self.channels.get(phase).as_deref().unwrap_or(&[])
    }

    pub fn channel_slots_mut(&mut self, phase: Phase) -> &mut [u8] {
        self.channels.get_mut(phase).as_deref_mut().unwrap_or(&mut [])
    }

    pub fn counter_slots(&self, phase: Phase) -> &[CounterSnapshot] {
        self.counters.get(phase).as_deref().unwrap_or(&[])
    }

    pub fn counter_slots_mut(&mut self, phase: Phase) -> &mut [CounterSnapshot] {
        self.counters.get_mut(phase).as_deref_mut().unwrap_or(&mut [])
    }

    pub fn wall_stamps(&self, phase: Phase) -> &[u64] {
        self.wall_us.get(phase)
    }

    pub fn cycle_stamps(&self, phase: Phase) -> &[u64] {
        self.cycles.get(phase)
    }

    /// Records one timestamp pair; out-of-range indices store nothing.
    pub fn stamp(&mut self, phase: Phase, index: usize, wall: u64, cycle: u64) {
        if let Some(slot) = self.wall_us.get_mut(phase).get_mut(index) {
            *slot = wall;
        }
        if let Some(slot) = self.cycles.get_mut(phase).get_mut(index) {
            *slot = cycle;
        }
    }
}

fn family<T: Clone + Default>(layout: &Layout, class: OpClass) -> PerPhase<Option<Box<[T]>>> {
    PerPhase::from_fn(|phase| {
        let elements = layout.results.get(phase).get(class).elements;
        (elements > 0).then(|| vec![T::default(); elements].into_boxed_slice())
    })
}

fn stamp_slots(layout: &Layout) -> PerPhase<Box<[u64]>> {
    PerPhase::from_fn(|phase| vec![0u64; *layout.timestamp_pairs.get(phase)].into_boxed_slice())
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_tables::{
        CpuIndex, PhaseOps, RegisterAddress, RegisterOp, RegisterOpKind, RegisterValue, ScanTable,
    };

    fn store_for(regs: &[RegisterOp], records: u32) -> ResultStore {
        let table = ScanTable {
            phases: PerPhase::new(
                PhaseOps {
                    registers: regs,
                    ..PhaseOps::empty()
                },
                PhaseOps {
                    registers: regs,
                    ..PhaseOps::empty()
                },
                PhaseOps::empty(),
            ),
            records,
        };
        ResultStore::for_layout(&Layout::for_table(&table).unwrap())
    }

    fn read_op() -> RegisterOp {
        RegisterOp {
            cpu: CpuIndex::new(0),
            register: RegisterAddress::new(0x10),
            value: RegisterValue::new(),
            kind: RegisterOpKind::Read,
        }
    }

    #[test]
    fn zero_sized_families_stay_absent() {
        let regs = [read_op()];
        let store = store_for(&regs, 2);

        assert!(store.registers.setup.is_some());
        assert!(store.registers.teardown.is_none());
        assert!(store.mapped.setup.is_none());
        assert!(store.config.sampling.is_none());
        assert!(store.register_slots(Phase::Teardown).is_empty());
    }

    #[test]
    fn sampling_arrays_hold_one_slot_per_record() {
        let regs = [read_op(), read_op()];
        let store = store_for(&regs, 3);

        assert_eq!(store.register_slots(Phase::Setup).len(), 2);
        assert_eq!(store.register_slots(Phase::Sampling).len(), 6);
        assert_eq!(store.wall_stamps(Phase::Sampling).len(), 3);
        assert_eq!(store.wall_stamps(Phase::Setup).len(), 1);
    }

    #[test]
    fn stamps_land_at_their_record_index() {
        let regs = [read_op()];
        let mut store = store_for(&regs, 3);

        store.stamp(Phase::Sampling, 1, 500, 9000);
        assert_eq!(store.wall_stamps(Phase::Sampling), &[0, 500, 0]);
        assert_eq!(store.cycle_stamps(Phase::Sampling), &[0, 9000, 0]);

        store.stamp(Phase::Sampling, 7, 1, 1);
        assert_eq!(store.wall_stamps(Phase::Sampling), &[0, 500, 0]);
    }
}
