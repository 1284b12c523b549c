use crate::layout::LayoutError;
use crate::transfer::SlotId;
use telemetry_hw::AccessError;
use telemetry_tables::{Phase, PhysicalAddress};

/// Why an engine call failed.
///
/// Every variant except [`SessionActive`](Self::SessionActive) and
/// [`SamplingOutOfRange`](Self::SamplingOutOfRange) is terminal for the
/// session that produced it: the engine tears the session down before the
/// error surfaces, and later calls on the same handle report
/// [`SessionDefunct`](Self::SessionDefunct).
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Another session is live; at most one can exist at a time.
    #[error("a session is already active")]
    SessionActive,
    /// The session behind this handle was already torn down.
    #[error("no live session behind this handle")]
    SessionDefunct,
    /// Sizing the session's buffers failed.
    #[error("buffer sizing failed: {0}")]
    Layout(LayoutError),
    /// A mapped window could not be established during bookmarking.
    #[error("could not map window at {address}: {source}")]
    Mapping {
        address: PhysicalAddress,
        source: AccessError,
    },
    /// A hardware operation failed while a phase was executing.
    #[error("operation failed in the {phase:?} phase: {source}")]
    Operation { phase: Phase, source: AccessError },
    /// A sampling record index at or beyond the session's record count.
    #[error("sampling record {index} out of range for {records} records")]
    SamplingOutOfRange { index: u32, records: u32 },
    /// A result transfer found no destination for a populated slot.
    #[error("missing destination for {0:?}")]
    DestinationMissing(SlotId),
    /// A result transfer found a destination of the wrong length.
    #[error("destination for {slot:?} holds {found} elements, need {expected}")]
    DestinationSize {
        slot: SlotId,
        expected: usize,
        found: usize,
    },
    /// An immediate operation outside any session failed.
    #[error("immediate access failed: {0}")]
    Access(AccessError),
}

impl From<LayoutError> for EngineError {
    fn from(value: LayoutError) -> Self {
        Self::Layout(value)
    }
}

impl From<AccessError> for EngineError {
    fn from(value: AccessError) -> Self {
        Self::Access(value)
    }
}
