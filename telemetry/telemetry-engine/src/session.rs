//! Session lifecycle: the single-session guard and the phase-driving
//! handle.
//!
//! The engine owns the hardware backend and admits at most one live
//! session. A session is the only path to phase execution and result
//! transfer; any failure inside it releases everything it owns and re-arms
//! the guard before the error surfaces, so a failed session can never
//! strand a mapping or block the next one.

use crate::error::EngineError;
use crate::executor;
use crate::layout::Layout;
use crate::program::Program;
use crate::results::ResultStore;
use crate::transfer::{self, TransferBuffer};
use core::sync::atomic::{AtomicBool, Ordering};
use log::{debug, warn};
use telemetry_hw::{Hardware, RegionOf};
use telemetry_tables::{Phase, ScanTable};

/// Owns the hardware backend and serializes sessions over it.
pub struct Engine<H: Hardware> {
    hw: H,
    in_use: AtomicBool,
}

impl<H: Hardware> Engine<H> {
    #[must_use]
    pub const fn new(hw: H) -> Self {
        Self {
            hw,
            in_use: AtomicBool::new(false),
        }
    }

    /// The backend, for immediate operations outside any session.
    #[must_use]
    pub const fn hardware(&self) -> &H {
        &self.hw
    }

    /// Sizes, allocates, and bookmarks a session for `table`.
    ///
    /// # Errors
    /// [`EngineError::SessionActive`] while another session is live,
    /// [`EngineError::Layout`] when a buffer size overflows,
    /// [`EngineError::Mapping`] when a mapped window cannot be established.
    /// Failures re-arm the guard and leave nothing allocated.
    pub fn begin(&self, table: &ScanTable<'_>) -> Result<Session<'_, H>, EngineError> {
        if self.in_use.swap(true, Ordering::Acquire) {
            return Err(EngineError::SessionActive);
        }
        match self.prepare(table) {
            Ok(active) => Ok(Session {
                engine: self,
                active: Some(active),
            }),
            Err(error) => {
                self.in_use.store(false, Ordering::Release);
                Err(error)
            }
        }
    }

    fn prepare(&self, table: &ScanTable<'_>) -> Result<Active<H>, EngineError> {
        let layout = Layout::for_table(table)?;
        debug!(
            "session sized: {} description bytes, {} result bytes, {} records",
            layout.description_bytes, layout.result_bytes, layout.records
        );
        let program = Program::bookmark(self.hw.mmio(), table)?;
        let results = ResultStore::for_layout(&layout);
        Ok(Active {
            program,
            results,
            layout,
        })
    }
}

/// Live state of one session. Field order is the release order: the
/// program (bindings, then description) goes before the results.
struct Active<H: Hardware> {
    program: Program<RegionOf<H>>,
    results: ResultStore,
    layout: Layout,
}

/// Handle to the one live session.
///
/// Phases are caller-driven: [`run_setup`](Self::run_setup) and
/// [`run_teardown`](Self::run_teardown) once each,
/// [`run_sampling`](Self::run_sampling) once per record. Dropping the
/// handle releases everything [`release`](Self::release) would.
pub struct Session<'engine, H: Hardware> {
    engine: &'engine Engine<H>,
    active: Option<Active<H>>,
}

impl<H: Hardware> Session<'_, H> {
    /// The layout this session's buffers were sized with.
    ///
    /// # Errors
    /// [`EngineError::SessionDefunct`] after a failure tore the session
    /// down.
    pub fn layout(&self) -> Result<&Layout, EngineError> {
        self.active
            .as_ref()
            .map(|active| &active.layout)
            .ok_or(EngineError::SessionDefunct)
    }

    /// Runs the setup phase once.
    ///
    /// # Errors
    /// [`EngineError::SessionDefunct`] on a dead handle;
    /// [`EngineError::Operation`] when any operation fails, after the
    /// session has been torn down.
    pub fn run_setup(&mut self) -> Result<(), EngineError> {
        self.run(Phase::Setup, 0)
    }

    /// Runs one sampling record.
    ///
    /// # Errors
    /// [`EngineError::SamplingOutOfRange`] for `record` at or beyond the
    /// session's record count, leaving the session intact; otherwise as
    /// [`run_setup`](Self::run_setup).
    #[allow(clippy::cast_possible_truncation)]
    pub fn run_sampling(&mut self, record: u32) -> Result<(), EngineError> {
        let records = self.layout()?.records;
        if record >= records {
            return Err(EngineError::SamplingOutOfRange {
                index: record,
                records,
            });
        }
        self.run(Phase::Sampling, record as usize)
    }

    /// Runs the teardown phase once.
    ///
    /// # Errors
    /// As [`run_setup`](Self::run_setup).
    pub fn run_teardown(&mut self) -> Result<(), EngineError> {
        self.run(Phase::Teardown, 0)
    }

    /// Copies every populated result array and timestamp array into
    /// `destination`, validating each slot immediately before its copy.
    ///
    /// # Errors
    /// [`EngineError::SessionDefunct`] on a dead handle;
    /// [`EngineError::DestinationMissing`] and
    /// [`EngineError::DestinationSize`] on an unusable slot, after the
    /// session has been torn down. A failed transfer leaves `destination`
    /// partially written; none of it may be interpreted.
    pub fn transfer(&mut self, destination: &mut TransferBuffer<'_>) -> Result<(), EngineError> {
        let outcome = match self.active.as_ref() {
            Some(active) => transfer::export(&active.results, destination),
            None => return Err(EngineError::SessionDefunct),
        };
        match outcome {
            Ok(()) => Ok(()),
            Err(error) => {
                warn!("result transfer failed: {error}; tearing the session down");
                self.dismantle();
                Err(error)
            }
        }
    }

    /// Releases everything this session owns and re-arms the engine.
    ///
    /// Consuming the handle makes a second release unrepresentable; the
    /// drop path performs the same teardown for handles that go out of
    /// scope.
    pub fn release(mut self) {
        self.dismantle();
    }

    fn run(&mut self, phase: Phase, record: usize) -> Result<(), EngineError> {
        let hw = self.engine.hardware();
        let Some(active) = self.active.as_mut() else {
            return Err(EngineError::SessionDefunct);
        };
        match executor::run_phase(hw, &active.program, &mut active.results, phase, record) {
            Ok(()) => Ok(()),
            Err(source) => {
                warn!("operation failed in {phase:?}: {source}; tearing the session down");
                self.dismantle();
                Err(EngineError::Operation { phase, source })
            }
        }
    }

    /// Drops the mappings, then the description store, then the result
    /// store, then re-arms the guard. Safe to call more than once.
    fn dismantle(&mut self) {
        if let Some(active) = self.active.take() {
            drop(active);
            self.engine.in_use.store(false, Ordering::Release);
        }
    }
}

impl<H: Hardware> Drop for Session<'_, H> {
    fn drop(&mut self) {
        self.dismantle();
    }
}
