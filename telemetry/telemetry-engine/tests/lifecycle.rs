use telemetry_engine::{Engine, EngineError, TransferBuffer};
use telemetry_hw::AccessError;
use telemetry_hw::sim::SimHardware;
use telemetry_tables::{
    ControlWrite, CpuIndex, DataWindow, MappedOp, PerPhase, Phase, PhaseOps, PhysicalAddress,
    RegisterAddress, RegisterOp, RegisterOpKind, RegisterValue, ScanTable,
};

fn read_op(cpu: u32, register: u32) -> RegisterOp {
    RegisterOp {
        cpu: CpuIndex::new(cpu),
        register: RegisterAddress::new(register),
        value: RegisterValue::new(),
        kind: RegisterOpKind::Read,
    }
}

fn window_op(control: u64, data: u64, words: u32) -> MappedOp {
    MappedOp {
        control: Some(ControlWrite {
            address: PhysicalAddress::new(control),
            value: 0x1,
        }),
        data: Some(DataWindow {
            address: PhysicalAddress::new(data),
            words,
        }),
    }
}

fn setup_only<'a>(regs: &'a [RegisterOp], mapped: &'a [MappedOp]) -> ScanTable<'a> {
    ScanTable {
        phases: PerPhase::new(
            PhaseOps {
                registers: regs,
                mapped,
                ..PhaseOps::empty()
            },
            PhaseOps::empty(),
            PhaseOps::empty(),
        ),
        records: 0,
    }
}

#[test]
fn only_one_session_at_a_time() {
    let engine = Engine::new(SimHardware::new(1));
    let regs = [read_op(0, 0x10)];
    let table = setup_only(&regs, &[]);

    let session = engine.begin(&table).unwrap();
    assert_eq!(engine.begin(&table).err(), Some(EngineError::SessionActive));

    // releasing re-arms the guard
    session.release();
    let again = engine.begin(&table).unwrap();
    again.release();
}

#[test]
fn release_reclaims_every_mapping() {
    let engine = Engine::new(SimHardware::new(1));
    let mapped = [window_op(0x1000, 0x2000, 4)];
    let table = setup_only(&[], &mapped);

    let session = engine.begin(&table).unwrap();
    assert_eq!(engine.hardware().mmio.outstanding_mappings(), 2);

    session.release();
    assert_eq!(engine.hardware().mmio.outstanding_mappings(), 0);
}

#[test]
fn dropping_the_handle_also_releases() {
    let engine = Engine::new(SimHardware::new(1));
    let mapped = [window_op(0x1000, 0x2000, 4)];
    let table = setup_only(&[], &mapped);

    {
        let _session = engine.begin(&table).unwrap();
        assert_eq!(engine.hardware().mmio.outstanding_mappings(), 2);
    }
    assert_eq!(engine.hardware().mmio.outstanding_mappings(), 0);

    // the guard is re-armed as well
    engine.begin(&table).unwrap().release();
}

#[test]
fn refused_mapping_fails_begin_and_rolls_back() {
    let engine = Engine::new(SimHardware::new(1));
    engine.hardware().mmio.refuse(PhysicalAddress::new(0x4000));
    let mapped = [window_op(0x1000, 0x2000, 2), window_op(0x3000, 0x4000, 2)];
    let table = setup_only(&[], &mapped);

    let error = engine.begin(&table).err().unwrap();
    assert!(matches!(error, EngineError::Mapping { address, .. }
        if address == PhysicalAddress::new(0x4000)));
    assert_eq!(engine.hardware().mmio.outstanding_mappings(), 0);

    // the failed attempt left the engine armed for the next table
    let mapped = [window_op(0x1000, 0x2000, 2)];
    let table = setup_only(&[], &mapped);
    engine.begin(&table).unwrap().release();
}

#[test]
fn oversized_table_is_rejected_up_front() {
    let engine = Engine::new(SimHardware::new(1));
    let mapped = [MappedOp {
        control: None,
        data: Some(DataWindow {
            address: PhysicalAddress::new(0x2000),
            words: u32::MAX,
        }),
    }];
    let table = ScanTable {
        phases: PerPhase::new(
            PhaseOps::empty(),
            PhaseOps {
                mapped: &mapped,
                ..PhaseOps::empty()
            },
            PhaseOps::empty(),
        ),
        records: u32::MAX,
    };

    assert!(matches!(
        engine.begin(&table).err(),
        Some(EngineError::Layout(_))
    ));
    assert_eq!(engine.hardware().mmio.outstanding_mappings(), 0);

    let regs = [read_op(0, 0x10)];
    engine.begin(&setup_only(&regs, &[])).unwrap().release();
}

#[test]
fn failed_operation_tears_down_and_blocks_transfer() {
    let engine = Engine::new(SimHardware::new(1));
    let regs = [read_op(9, 0x10)];
    let mapped = [window_op(0x1000, 0x2000, 2)];
    let table = setup_only(&regs, &mapped);

    let mut session = engine.begin(&table).unwrap();
    assert_eq!(engine.hardware().mmio.outstanding_mappings(), 2);

    assert_eq!(
        session.run_setup(),
        Err(EngineError::Operation {
            phase: Phase::Setup,
            source: AccessError::CpuUnavailable(CpuIndex::new(9)),
        })
    );

    // the session is gone: mappings reclaimed, results unreachable
    assert_eq!(engine.hardware().mmio.outstanding_mappings(), 0);
    let mut dst = TransferBuffer::default();
    assert_eq!(session.transfer(&mut dst), Err(EngineError::SessionDefunct));
    assert_eq!(session.run_teardown(), Err(EngineError::SessionDefunct));

    // and the guard is already re-armed
    let regs = [read_op(0, 0x10)];
    engine.begin(&setup_only(&regs, &[])).unwrap().release();
}

#[test]
fn failed_transfer_tears_down() {
    let engine = Engine::new(SimHardware::new(1));
    let regs = [read_op(0, 0x10)];
    let table = setup_only(&regs, &[]);

    let mut session = engine.begin(&table).unwrap();
    session.run_setup().unwrap();

    // no destination for the populated setup register array
    let mut dst = TransferBuffer::default();
    assert!(matches!(
        session.transfer(&mut dst),
        Err(EngineError::DestinationMissing(_))
    ));
    assert_eq!(session.transfer(&mut dst), Err(EngineError::SessionDefunct));

    engine.begin(&table).unwrap().release();
}

#[test]
fn out_of_range_sampling_index_leaves_the_session_intact() {
    let engine = Engine::new(SimHardware::new(1));
    let regs = [read_op(0, 0x10)];
    let table = ScanTable {
        phases: PerPhase::new(
            PhaseOps::empty(),
            PhaseOps {
                registers: &regs,
                ..PhaseOps::empty()
            },
            PhaseOps::empty(),
        ),
        records: 2,
    };

    let mut session = engine.begin(&table).unwrap();
    assert_eq!(
        session.run_sampling(2),
        Err(EngineError::SamplingOutOfRange {
            index: 2,
            records: 2,
        })
    );

    // the rejection did not defunct the handle
    session.run_sampling(0).unwrap();
    session.run_sampling(1).unwrap();
    session.release();
}

#[test]
fn remote_timeout_is_an_operation_failure() {
    let engine = Engine::new(SimHardware::new(2));
    engine.hardware().registers.time_out(CpuIndex::new(1));
    let regs = [read_op(1, 0x10)];
    let table = setup_only(&regs, &[]);

    let mut session = engine.begin(&table).unwrap();
    assert_eq!(
        session.run_setup(),
        Err(EngineError::Operation {
            phase: Phase::Setup,
            source: AccessError::RemoteTimeout(CpuIndex::new(1)),
        })
    );
}
