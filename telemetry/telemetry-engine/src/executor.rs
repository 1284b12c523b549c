//! Phase execution over the hardware seams.
//!
//! One call runs one phase entry: the timestamp pair is recorded first,
//! then every operation of the phase executes in canonical family order.
//! The first operation failure stops the walk; the caller owns the
//! consequences (for a session, full teardown).

use crate::program::{MappedBinding, Program};
use crate::results::ResultStore;
use log::trace;
use telemetry_hw::{
    AccessError, ConfigSpace, CounterBank, EmbeddedController, Hardware, MappedRegion,
    RegionOf, RegisterBridge, TimeSource,
};
use telemetry_tables::{
    ConfigOp, CounterOp, CounterOpKind, CounterSnapshot, EcOp, MappedOp, Phase, RegisterOp,
    RegisterOpKind, RegisterValue,
};

/// Runs one entry of `phase` against the hardware.
///
/// `record` selects the timestamp pair and the result stride; it is the
/// sampling record index, and 0 for setup and teardown.
pub(crate) fn run_phase<H: Hardware>(
    hw: &H,
    program: &Program<RegionOf<H>>,
    results: &mut ResultStore,
    phase: Phase,
    record: usize,
) -> Result<(), AccessError> {
    trace!("running {phase:?}, record {record}");
    let wall = hw.clock().wall_clock_us();
    let cycle = hw.clock().cycle_count();
    results.stamp(phase, record, wall, cycle);

    let ops = program.description.phases.get(phase);
    run_registers(
        hw.registers(),
        &ops.registers,
        results.register_slots_mut(phase),
        record,
    )?;
    run_mapped(
        &ops.mapped,
        program.bindings.get(phase),
        results.mapped_slots_mut(phase),
        record,
    );
    run_config(
        hw.config(),
        &ops.config,
        results.config_slots_mut(phase),
        record,
    )?;
    run_channels(
        hw.ec(),
        &ops.channels,
        results.channel_slots_mut(phase),
        record,
    )?;
    run_counters(
        hw.counters(),
        &ops.counters,
        results.counter_slots_mut(phase),
        record,
    )?;
    Ok(())
}

/// Executes one register operation; the read kind yields its value, the
/// others yield nothing.
pub(crate) fn apply_register<B: RegisterBridge>(
    bridge: &B,
    op: &RegisterOp,
) -> Result<Option<RegisterValue>, AccessError> {
    match op.kind {
        RegisterOpKind::Read => Ok(Some(bridge.read(op.cpu, op.register)?)),
        RegisterOpKind::Write => {
            bridge.write(op.cpu, op.register, op.value)?;
            Ok(None)
        }
        RegisterOpKind::SetBits => {
            let current = bridge.read(op.cpu, op.register)?.into_bits();
            bridge.write(
                op.cpu,
                op.register,
                RegisterValue::from_bits(current | op.value.into_bits()),
            )?;
            Ok(None)
        }
        RegisterOpKind::ClearBits => {
            let current = bridge.read(op.cpu, op.register)?.into_bits();
            bridge.write(
                op.cpu,
                op.register,
                RegisterValue::from_bits(current & !op.value.into_bits()),
            )?;
            Ok(None)
        }
    }
}

fn run_registers<B: RegisterBridge>(
    bridge: &B,
    ops: &[RegisterOp],
    slots: &mut [u64],
    record: usize,
) -> Result<(), AccessError> {
    let base = record * ops.len();
    for (i, op) in ops.iter().enumerate() {
        if let Some(value) = apply_register(bridge, op)? {
            if let Some(slot) = slots.get_mut(base + i) {
                *slot = value.into_bits();
            }
        }
    }
    Ok(())
}

/// Mapped operations cannot fail once their windows are bound: the control
/// word is stored, then the data window's current contents are captured.
fn run_mapped<R: MappedRegion>(
    ops: &[MappedOp],
    bindings: &[MappedBinding<R>],
    slots: &mut [u64],
    record: usize,
) {
    let per_record: usize = ops.iter().map(MappedOp::data_words).sum();
    let mut cursor = record * per_record;
    for (op, binding) in ops.iter().zip(bindings) {
        if let Some(ctrl) = op.control {
            if let Some(region) = binding.control.as_ref() {
                region.write_word(0, ctrl.value);
            }
        }
        if let Some(region) = binding.data.as_ref() {
            let words = op.data_words();
            if let Some(out) = slots.get_mut(cursor..cursor + words) {
                region.read_into(out);
            }
            cursor += words;
        }
    }
}

fn run_config<C: ConfigSpace>(
    space: &C,
    ops: &[ConfigOp],
    slots: &mut [u32],
    record: usize,
) -> Result<(), AccessError> {
    let base = record * ops.len();
    for (i, op) in ops.iter().enumerate() {
        let word = space.read(op.address)?;
        if let Some(slot) = slots.get_mut(base + i) {
            *slot = word;
        }
    }
    Ok(())
}

fn run_channels<E: EmbeddedController>(
    ec: &E,
    ops: &[EcOp],
    slots: &mut [u8],
    record: usize,
) -> Result<(), AccessError> {
    let base = record * ops.len();
    for (i, op) in ops.iter().enumerate() {
        let byte = ec.read_channel(op.channel)?;
        if let Some(slot) = slots.get_mut(base + i) {
            *slot = byte;
        }
    }
    Ok(())
}

fn run_counters<C: CounterBank>(
    bank: &C,
    ops: &[CounterOp],
    slots: &mut [CounterSnapshot],
    record: usize,
) -> Result<(), AccessError> {
    let base = record * ops.len();
    for (i, op) in ops.iter().enumerate() {
        match op.kind {
            CounterOpKind::Read => {
                let snapshot = bank.snapshot()?;
                if let Some(slot) = slots.get_mut(base + i) {
                    *slot = snapshot;
                }
            }
        }
    }
    Ok(())
}
