//! The engine's owned copy of a scan description, with its mapped windows
//! bound.
//!
//! Bookmarking copies every caller array into storage the engine owns, so
//! the caller's borrow ends when the session begins, and binds a live
//! region for each mapped-memory window. The bindings sit in arrays
//! parallel to the mapped description arrays: entry `i` of a phase's
//! bindings belongs to entry `i` of that phase's mapped operations.

use crate::error::EngineError;
use alloc::boxed::Box;
use alloc::vec::Vec;
use core::mem;
use log::trace;
use telemetry_hw::MmioMapper;
use telemetry_tables::{
    ConfigOp, CounterOp, EcOp, MappedOp, PerPhase, Phase, PhysicalAddress, RegisterOp, ScanTable,
};

/// One phase's operation arrays, copied out of the caller's table.
///
/// A zero-count family is an empty array and owns no storage.
#[derive(Debug, Default)]
pub(crate) struct PhaseDescription {
    pub registers: Box<[RegisterOp]>,
    pub mapped: Box<[MappedOp]>,
    pub config: Box<[ConfigOp]>,
    pub channels: Box<[EcOp]>,
    pub counters: Box<[CounterOp]>,
}

/// The rebound description: every family of every phase, engine-owned.
#[derive(Debug, Default)]
pub(crate) struct Description {
    pub phases: PerPhase<PhaseDescription>,
}

impl Description {
    fn rebind(table: &ScanTable<'_>) -> Self {
        Self {
            phases: PerPhase::from_fn(|phase| {
                let ops = table.phases.get(phase);
                PhaseDescription {
                    registers: ops.registers.into(),
                    mapped: ops.mapped.into(),
                    config: ops.config.into(),
                    channels: ops.channels.into(),
                    counters: ops.counters.into(),
                }
            }),
        }
    }
}

/// Live mappings of one mapped-memory operation.
#[derive(Debug)]
pub(crate) struct MappedBinding<R> {
    pub control: Option<R>,
    pub data: Option<R>,
}

/// A bookmarked session program.
///
/// Field order is the release order: bindings drop before the description
/// they were bound against.
#[derive(Debug)]
pub(crate) struct Program<R> {
    pub bindings: PerPhase<Box<[MappedBinding<R>]>>,
    pub description: Description,
}

impl<R> Program<R> {
    /// Copies the caller's arrays and binds every mapped window: one word
    /// for each control address, the window's word count for each data
    /// address.
    ///
    /// # Errors
    /// [`EngineError::Mapping`] when the mapper refuses a window. Every
    /// window bound before the failure is released again, newest first,
    /// before the error surfaces.
    pub fn bookmark<M>(mapper: &M, table: &ScanTable<'_>) -> Result<Self, EngineError>
    where
        M: MmioMapper<Region = R>,
    {
        let description = Description::rebind(table);

        let mut bound = PerPhase::<Vec<MappedBinding<R>>>::default();
        for phase in Phase::ALL {
            for op in &*description.phases.get(phase).mapped {
                match bind_one(mapper, op) {
                    Ok(binding) => bound.get_mut(phase).push(binding),
                    Err(error) => {
                        unwind(&mut bound);
                        return Err(error);
                    }
                }
            }
        }

        let bindings =
            PerPhase::from_fn(|phase| mem::take(bound.get_mut(phase)).into_boxed_slice());
        Ok(Self {
            bindings,
            description,
        })
    }
}

fn bind_one<M: MmioMapper>(
    mapper: &M,
    op: &MappedOp,
) -> Result<MappedBinding<M::Region>, EngineError> {
    let control = match op.control {
        Some(ctrl) => Some(map_window(mapper, ctrl.address, 1)?),
        None => None,
    };
    let data = match op.data {
        Some(window) => Some(map_window(mapper, window.address, window.word_count())?),
        None => None,
    };
    Ok(MappedBinding { control, data })
}

fn map_window<M: MmioMapper>(
    mapper: &M,
    address: PhysicalAddress,
    words: usize,
) -> Result<M::Region, EngineError> {
    mapper
        .map(address, words)
        .map_err(|source| EngineError::Mapping { address, source })
}

/// Releases every binding taken so far, newest phase and entry first.
fn unwind<R>(bound: &mut PerPhase<Vec<MappedBinding<R>>>) {
    for phase in Phase::ALL.into_iter().rev() {
        let stack = bound.get_mut(phase);
        while let Some(binding) = stack.pop() {
            drop(binding);
        }
    }
    trace!("bookmarking unwound");
}

#[cfg(test)]
mod tests {
    use super::*;
    use telemetry_hw::sim::SimMmio;
    use telemetry_tables::{
        ControlWrite, CpuIndex, DataWindow, PhaseOps, RegisterAddress, RegisterOpKind,
        RegisterValue,
    };

    fn window_op(control: u64, data: u64, words: u32) -> MappedOp {
        MappedOp {
            control: Some(ControlWrite {
                address: PhysicalAddress::new(control),
                value: 0xA5,
            }),
            data: Some(DataWindow {
                address: PhysicalAddress::new(data),
                words,
            }),
        }
    }

    #[test]
    fn rebinding_preserves_record_order() {
        let regs: Vec<RegisterOp> = (0..4)
            .map(|i| RegisterOp {
                cpu: CpuIndex::new(i),
                register: RegisterAddress::new(0x100 + i),
                value: RegisterValue::from_bits(u64::from(i)),
                kind: RegisterOpKind::Read,
            })
            .collect();
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

        let description = Description::rebind(&table);
        assert_eq!(&*description.phases.setup.registers, regs.as_slice());
        assert!(description.phases.sampling.registers.is_empty());
    }

    #[test]
    fn bookmark_binds_control_and_data_windows() {
        let mmio = SimMmio::default();
        let ops = [window_op(0x1000, 0x2000, 4)];
        let table = ScanTable {
            phases: PerPhase::new(
                PhaseOps {
                    mapped: &ops,
                    ..PhaseOps::empty()
                },
                PhaseOps::empty(),
                PhaseOps::empty(),
            ),
            records: 0,
        };

        let program = Program::bookmark(&mmio, &table).unwrap();
        assert_eq!(mmio.outstanding_mappings(), 2);
        assert_eq!(program.bindings.setup.len(), 1);
        assert!(program.bindings.setup[0].control.is_some());

        drop(program);
        assert_eq!(mmio.outstanding_mappings(), 0);
    }

    #[test]
    fn refused_window_rolls_back_every_binding() {
        let mmio = SimMmio::default();
        mmio.refuse(PhysicalAddress::new(0x4000));
        let ops = [window_op(0x1000, 0x2000, 4), window_op(0x3000, 0x4000, 2)];
        let table = ScanTable {
            phases: PerPhase::new(
                PhaseOps {
                    mapped: &ops,
                    ..PhaseOps::empty()
                },
                PhaseOps::empty(),
                PhaseOps::empty(),
            ),
            records: 0,
        };

        let error = Program::bookmark(&mmio, &table).unwrap_err();
        assert!(matches!(
            error,
            EngineError::Mapping { address, .. } if address == PhysicalAddress::new(0x4000)
        ));
        assert_eq!(mmio.outstanding_mappings(), 0);
    }
}
