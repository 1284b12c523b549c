//! Bulk result export into caller-provided buffers.

use crate::error::EngineError;
use crate::results::ResultStore;
use telemetry_tables::{CounterSnapshot, OpClass, PerPhase, Phase};

/// Names one destination slot of a [`TransferBuffer`], for error reports.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SlotId {
    /// The result array of one phase and family.
    Results(Phase, OpClass),
    /// The wall-clock stamp array of one phase.
    WallClock(Phase),
    /// The cycle-counter stamp array of one phase.
    CycleCount(Phase),
}

/// Caller-provided destinations mirroring the result store's shape.
///
/// A destination is mandatory exactly where the session's layout sized the
/// matching source nonzero, and must hold exactly as many elements; empty
/// sources are skipped without looking at their slot. Each slot is
/// validated immediately before its own copy, never up front, so a failure
/// report names the first slot that was actually unusable.
#[derive(Debug, Default)]
pub struct TransferBuffer<'a> {
    pub registers: PerPhase<Option<&'a mut [u64]>>,
    pub mapped: PerPhase<Option<&'a mut [u64]>>,
    pub config: PerPhase<Option<&'a mut [u32]>>,
    pub channels: PerPhase<Option<&'a mut [u8]>>,
    pub counters: PerPhase<Option<&'a mut [CounterSnapshot]>>,
    pub wall_us: PerPhase<Option<&'a mut [u64]>>,
    pub cycles: PerPhase<Option<&'a mut [u64]>>,
}

pub(crate) fn export(
    results: &ResultStore,
    dst: &mut TransferBuffer<'_>,
) -> Result<(), EngineError> {
    for phase in Phase::ALL {
        copy_into(
            results.register_slots(phase),
            dst.registers.get_mut(phase).as_deref_mut(),
            SlotId::Results(phase, OpClass::Register),
        )?;
        copy_into(
            results.mapped_slots(phase),
            dst.mapped.get_mut(phase).as_deref_mut(),
            SlotId::Results(phase, OpClass::Mapped),
        )?;
        copy_into(
            results.config_slots(phase),
            dst.config.get_mut(phase).as_deref_mut(),
            SlotId::Results(phase, OpClass::Config),
        )?;
        copy_into(
            results.channel_slots(phase),
            dst.channels.get_mut(phase).as_deref_mut(),
            SlotId::Results(phase, OpClass::Channel),
        )?;
        copy_into(
            results.counter_slots(phase),
            dst.counters.get_mut(phase).as_deref_mut(),
            SlotId::Results(phase, OpClass::Counter),
        )?;
        copy_into(
            results.wall_stamps(phase),
            dst.wall_us.get_mut(phase).as_deref_mut(),
            SlotId::WallClock(phase),
        )?;
        copy_into(
            results.cycle_stamps(phase),
            dst.cycles.get_mut(phase).as_deref_mut(),
            SlotId::CycleCount(phase),
        )?;
    }
    Ok(())
}

fn copy_into<T: Copy>(
    source: &[T],
    dst: Option<&mut [T]>,
    slot: SlotId,
) -> Result<(), EngineError> {
    if source.is_empty() {
        return Ok(());
    }
    let Some(dst) = dst else {
        return Err(EngineError::DestinationMissing(slot));
    };
    if dst.len() != source.len() {
        return Err(EngineError::DestinationSize {
            slot,
            expected: source.len(),
            found: dst.len(),
        });
    }
    dst.copy_from_slice(source);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Layout;
    use telemetry_tables::{
        CpuIndex, PhaseOps, RegisterAddress, RegisterOp, RegisterOpKind, RegisterValue, ScanTable,
    };

    fn seeded_store() -> ResultStore {
        let regs = [
            RegisterOp {
                cpu: CpuIndex::new(0),
                register: RegisterAddress::new(0x10),
                value: RegisterValue::new(),
                kind: RegisterOpKind::Read,
            };
            2
        ];
        let table = ScanTable {
            phases: PerPhase::new(
                PhaseOps {
                    registers: &regs,
                    ..PhaseOps::empty()
                },
                PhaseOps::empty(),
                PhaseOps::empty(),
            ),
            records: 0,
        };
        let mut store = ResultStore::for_layout(&Layout::for_table(&table).unwrap());
        store.register_slots_mut(Phase::Setup).copy_from_slice(&[7, 9]);
        store.stamp(Phase::Setup, 0, 123, 456);
        store
    }

    #[test]
    fn copies_populated_slots_and_skips_empty_families() {
        let store = seeded_store();
        let mut setup_regs = [0u64; 2];
        let mut stamps = ([0u64; 1], [0u64; 1], [0u64; 1], [0u64; 1]);
        let mut dst = TransferBuffer {
            registers: PerPhase::new(Some(setup_regs.as_mut_slice()), None, None),
            wall_us: PerPhase::new(Some(stamps.0.as_mut_slice()), None, Some(stamps.1.as_mut_slice())),
            cycles: PerPhase::new(Some(stamps.2.as_mut_slice()), None, Some(stamps.3.as_mut_slice())),
            ..TransferBuffer::default()
        };

        export(&store, &mut dst).unwrap();
        assert_eq!(setup_regs, [7, 9]);
        assert_eq!(stamps.0, [123]);
        assert_eq!(stamps.2, [456]);
    }

    #[test]
    fn missing_destination_is_reported_by_slot() {
        let store = seeded_store();
        let mut dst = TransferBuffer::default();

        let error = export(&store, &mut dst).unwrap_err();
        assert_eq!(
            error,
            EngineError::DestinationMissing(SlotId::Results(Phase::Setup, OpClass::Register))
        );
    }

    #[test]
    fn short_destination_is_reported_with_both_lengths() {
        let store = seeded_store();
        let mut setup_regs = [0u64; 1];
        let mut dst = TransferBuffer {
            registers: PerPhase::new(Some(setup_regs.as_mut_slice()), None, None),
            ..TransferBuffer::default()
        };

        let error = export(&store, &mut dst).unwrap_err();
        assert_eq!(
            error,
            EngineError::DestinationSize {
                slot: SlotId::Results(Phase::Setup, OpClass::Register),
                expected: 2,
                found: 1,
            }
        );
    }
}
