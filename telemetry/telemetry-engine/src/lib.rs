//! # Telemetry Acquisition Engine
//!
//! A table-driven acquisition engine. A caller describes what to measure
//! as per-phase arrays of operation records (a [`ScanTable`]); the engine
//! sizes typed storage for the description and its results, copies the
//! description into storage it owns, binds a mapped window for every
//! physical address the description names, and then executes the three
//! phases of a measurement session on the caller's cadence: setup once,
//! sampling once per record, teardown once. Every phase entry is stamped
//! with a wall-clock and cycle-counter pair, and the accumulated results
//! are exported in bulk into caller-provided buffers.
//!
//! Sessions are strictly serialized: [`Engine::begin`] admits one at a
//! time, and every failure path releases the session's mappings and
//! buffers before the error surfaces, so a failed session never blocks or
//! poisons the next one. [`Session::release`] (or dropping the handle)
//! does the same teardown deterministically.
//!
//! Hardware is reached exclusively through the access traits of
//! `telemetry-hw`, so the engine runs unchanged against real backends and
//! against the simulated one used by the tests.
//!
//! [`ScanTable`]: telemetry_tables::ScanTable

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

mod error;
mod executor;
mod immediate;
mod layout;
mod program;
mod results;
mod session;
mod transfer;

pub use error::EngineError;
pub use immediate::{config_read, config_write, mapped_read, register_op};
pub use layout::{Extent, Layout, LayoutError};
pub use session::{Engine, Session};
pub use transfer::{SlotId, TransferBuffer};

/// Version string reported to callers probing the engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
