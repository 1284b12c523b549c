//! Immediate operations outside any session.
//!
//! One-shot accesses for callers that want a single register, window, or
//! configuration word without the cost of a session. Each call resolves
//! whatever it needs, performs the access, and releases everything before
//! returning.

use crate::error::EngineError;
use crate::executor;
use alloc::vec;
use alloc::vec::Vec;
use telemetry_hw::{ConfigSpace, MappedRegion, MmioMapper, RegisterBridge};
use telemetry_tables::{ConfigAddress, ControlWrite, DataWindow, RegisterOp, RegisterValue};

/// Executes one register operation; the read kind returns the value, the
/// writing kinds return `None`.
///
/// # Errors
/// [`EngineError::Access`] when the bridge reports a failure.
pub fn register_op<B: RegisterBridge>(
    bridge: &B,
    op: &RegisterOp,
) -> Result<Option<RegisterValue>, EngineError> {
    Ok(executor::apply_register(bridge, op)?)
}

/// Stores `control`, then captures `window`, through mappings that exist
/// only for the duration of the call. The control mapping is released
/// before the data window is mapped.
///
/// # Errors
/// [`EngineError::Mapping`] when either window cannot be mapped.
pub fn mapped_read<M: MmioMapper>(
    mapper: &M,
    control: ControlWrite,
    window: DataWindow,
) -> Result<Vec<u64>, EngineError> {
    let ctrl = mapper
        .map(control.address, 1)
        .map_err(|source| EngineError::Mapping {
            address: control.address,
            source,
        })?;
    ctrl.write_word(0, control.value);
    drop(ctrl);

    let data = mapper
        .map(window.address, window.word_count())
        .map_err(|source| EngineError::Mapping {
            address: window.address,
            source,
        })?;
    let mut out = vec![0u64; window.word_count()];
    data.read_into(&mut out);
    Ok(out)
}

/// Reads one configuration-space register.
///
/// # Errors
/// [`EngineError::Access`] when the access faults.
pub fn config_read<C: ConfigSpace>(space: &C, address: ConfigAddress) -> Result<u32, EngineError> {
    Ok(space.read(address)?)
}

/// Writes one configuration-space register.
///
/// # Errors
/// [`EngineError::Access`] when the access faults.
pub fn config_write<C: ConfigSpace>(
    space: &C,
    address: ConfigAddress,
    value: u32,
) -> Result<(), EngineError> {
    Ok(space.write(address, value)?)
}
