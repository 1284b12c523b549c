//! Buffer sizing for one session.
//!
//! Every size is derived from the caller's table before anything is
//! allocated: per-(phase, family) element counts and byte sizes for the
//! description store and the result store, plus running byte offsets in the
//! canonical walk order. All arithmetic is checked; a table whose buffers
//! would not fit a single allocation is rejected up front.

use telemetry_tables::{
    ConfigOp, CounterOp, CounterSnapshot, EcOp, MappedOp, OpClass, PerClass, PerPhase, Phase,
    PhaseOps, RegisterOp, ScanTable,
};

/// Size of one phase/family sub-region.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct Extent {
    /// Number of typed elements in the sub-region.
    pub elements: usize,
    /// Sub-region size in bytes.
    pub bytes: usize,
}

/// Why sizing failed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    /// A sub-region or total size exceeds the addressable range.
    #[error("buffer size arithmetic overflowed")]
    Overflow,
}

/// Complete byte layout of one session's two stores.
///
/// Offsets walk the phases in session order and the families in
/// [`OpClass::ORDER`] within each phase; consecutive sub-regions are
/// adjacent, so the offset table doubles as a proof that sub-regions never
/// overlap. Timestamp arrays sit outside the family walk and only
/// contribute to [`result_bytes`](Self::result_bytes).
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Layout {
    /// Description-store extents per phase and family.
    pub description: PerPhase<PerClass<Extent>>,
    /// Result-store extents per phase and family.
    pub results: PerPhase<PerClass<Extent>>,
    /// Running byte offset of each description sub-region.
    pub description_offsets: PerPhase<PerClass<usize>>,
    /// Running byte offset of each result sub-region.
    pub result_offsets: PerPhase<PerClass<usize>>,
    /// Timestamp pairs per phase: 1 for setup and teardown, one per record
    /// for sampling.
    pub timestamp_pairs: PerPhase<usize>,
    /// Total description-store size.
    pub description_bytes: usize,
    /// Total result-store size, timestamp arrays included.
    pub result_bytes: usize,
    /// Sampling record count the session was sized for.
    pub records: u32,
}

impl Layout {
    /// Sizes both stores for `table`.
    ///
    /// # Errors
    /// [`LayoutError::Overflow`] when any sub-region or total size does not
    /// fit the addressable range.
    pub fn for_table(table: &ScanTable<'_>) -> Result<Self, LayoutError> {
        let records = usize::try_from(table.records).map_err(|_| LayoutError::Overflow)?;

        let mut description = PerPhase::<PerClass<Extent>>::default();
        let mut results = PerPhase::<PerClass<Extent>>::default();
        for phase in Phase::ALL {
            let ops = table.phases.get(phase);
            let repeat = if phase == Phase::Sampling { records } else { 1 };
            for class in OpClass::ORDER {
                *description.get_mut(phase).get_mut(class) =
                    extent(ops.count(class), record_bytes(class))?;
                let per_run = result_elements_per_run(ops, class)?;
                let elements = per_run.checked_mul(repeat).ok_or(LayoutError::Overflow)?;
                *results.get_mut(phase).get_mut(class) =
                    extent(elements, result_element_bytes(class))?;
            }
        }

        let (description_offsets, description_bytes) = running_offsets(&description)?;
        let (result_offsets, family_bytes) = running_offsets(&results)?;

        let timestamp_pairs = PerPhase::new(1, records, 1);
        let pair_total = records.checked_add(2).ok_or(LayoutError::Overflow)?;
        let stamp_bytes = pair_total
            .checked_mul(2 * size_of::<u64>())
            .ok_or(LayoutError::Overflow)?;
        let result_bytes = family_bytes
            .checked_add(stamp_bytes)
            .ok_or(LayoutError::Overflow)?;

        Ok(Self {
            description,
            results,
            description_offsets,
            result_offsets,
            timestamp_pairs,
            description_bytes,
            result_bytes,
            records: table.records,
        })
    }
}

fn extent(elements: usize, element_bytes: usize) -> Result<Extent, LayoutError> {
    let bytes = elements
        .checked_mul(element_bytes)
        .ok_or(LayoutError::Overflow)?;
    Ok(Extent { elements, bytes })
}

/// Size of one description record of `class`.
const fn record_bytes(class: OpClass) -> usize {
    match class {
        OpClass::Register => size_of::<RegisterOp>(),
        OpClass::Mapped => size_of::<MappedOp>(),
        OpClass::Config => size_of::<ConfigOp>(),
        OpClass::Channel => size_of::<EcOp>(),
        OpClass::Counter => size_of::<CounterOp>(),
    }
}

/// Size of one result element of `class`.
const fn result_element_bytes(class: OpClass) -> usize {
    match class {
        OpClass::Register | OpClass::Mapped => size_of::<u64>(),
        OpClass::Config => size_of::<u32>(),
        OpClass::Channel => size_of::<u8>(),
        OpClass::Counter => size_of::<CounterSnapshot>(),
    }
}

/// Result elements one execution of the phase produces for `class`.
///
/// Every operation owns one slot, except the mapped family where a slot is
/// one captured word and an operation owns as many as its data window
/// holds.
fn result_elements_per_run(ops: &PhaseOps<'_>, class: OpClass) -> Result<usize, LayoutError> {
    match class {
        OpClass::Mapped => {
            let mut total = 0usize;
            for op in ops.mapped {
                total = total
                    .checked_add(op.data_words())
                    .ok_or(LayoutError::Overflow)?;
            }
            Ok(total)
        }
        OpClass::Register | OpClass::Config | OpClass::Channel | OpClass::Counter => {
            Ok(ops.count(class))
        }
    }
}

fn running_offsets(
    extents: &PerPhase<PerClass<Extent>>,
) -> Result<(PerPhase<PerClass<usize>>, usize), LayoutError> {
    let mut offsets = PerPhase::<PerClass<usize>>::default();
    let mut total = 0usize;
    for phase in Phase::ALL {
        for class in OpClass::ORDER {
            *offsets.get_mut(phase).get_mut(class) = total;
            total = total
                .checked_add(extents.get(phase).get(class).bytes)
                .ok_or(LayoutError::Overflow)?;
        }
    }
    Ok((offsets, total))
}
