//! # Scan-Table Data Model
//!
//! Strongly typed building blocks for describing a telemetry scan: which
//! hardware locations to touch, how, and during which phase of a measurement
//! session.
//!
//! ## Overview
//!
//! A scan is described declaratively. The caller assembles a [`ScanTable`]
//! holding, for each [`Phase`], slices of operation records — one record kind
//! per device family:
//!
//! - [`RegisterOp`] — a per-processor register access ([`RegisterOpKind`]
//!   selects read, write, set-bits or clear-bits).
//! - [`MappedOp`] — an optional control-word write plus an optional
//!   physically-addressed data window to capture.
//! - [`ConfigOp`] — a configuration-space read at a packed
//!   [`ConfigAddress`].
//! - [`EcOp`] — a one-byte embedded-controller channel read.
//! - [`CounterOp`] — a snapshot of the fixed counter bank
//!   ([`COUNTER_LANES`] lanes per snapshot).
//!
//! The address newtypes ([`CpuIndex`], [`RegisterAddress`],
//! [`PhysicalAddress`], [`EcChannel`]) exist to keep the different hardware
//! namespaces from mixing silently; all are zero-cost wrappers.
//!
//! This crate holds data only. Sizing, buffer ownership and execution live in
//! the engine crate; hardware access lives behind the seam traits of the
//! hardware crate.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

mod address;
mod config_address;
mod ops;
mod phase;
mod table;
mod value;

pub use address::{CpuIndex, EcChannel, PhysicalAddress, RegisterAddress};
pub use config_address::ConfigAddress;
pub use ops::{
    ConfigOp, ControlWrite, CounterOp, CounterOpKind, DataWindow, EcOp, MappedOp, RegisterOp,
    RegisterOpKind,
};
pub use phase::{PerPhase, Phase};
pub use table::{OpClass, PerClass, PhaseOps, ScanTable};
pub use value::{COUNTER_LANES, CounterSnapshot, RegisterValue};
