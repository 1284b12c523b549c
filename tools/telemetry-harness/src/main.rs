use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use telemetry_engine::{Engine, TransferBuffer};
use telemetry_hw::sim::SimHardware;
use telemetry_tables::{
    COUNTER_LANES, ConfigAddress, ConfigOp, ControlWrite, CounterOp, CounterOpKind, CpuIndex,
    DataWindow, EcChannel, EcOp, MappedOp, PerPhase, PhaseOps, PhysicalAddress, RegisterAddress,
    RegisterOp, RegisterOpKind, RegisterValue, ScanTable,
};

struct StderrLogger {
    max_level: LevelFilter,
}

impl StderrLogger {
    const fn new(max_level: LevelFilter) -> Self {
        Self { max_level }
    }

    #[allow(static_mut_refs)]
    fn init(self) -> Result<(), SetLoggerError> {
        // set_logger wants &'static dyn Log, so the logger lives in a static
        static mut LOGGER: Option<StderrLogger> = None;

        unsafe {
            LOGGER = Some(self);
            log::set_logger(LOGGER.as_ref().unwrap() as &'static dyn Log)?;
        }
        log::set_max_level(LevelFilter::Trace);
        Ok(())
    }
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        eprintln!("[{}] {}: {}", record.level(), record.target(), record.args());
    }

    fn flush(&self) {}
}

const CPU0: CpuIndex = CpuIndex::new(0);
const CPU1: CpuIndex = CpuIndex::new(1);
const IDENT_REG: RegisterAddress = RegisterAddress::new(0x10);
const SAMPLE_REG: RegisterAddress = RegisterAddress::new(0x20);
const CONTROL_BASE: PhysicalAddress = PhysicalAddress::new(0xFED1_5000);
const WINDOW_BASE: PhysicalAddress = PhysicalAddress::new(0xFED1_5010);
const PROBE: ConfigAddress = ConfigAddress::new()
    .with_device(2)
    .with_offset(0x30)
    .with_enable(true);
const THERMAL_CHANNEL: EcChannel = EcChannel::new(0x40);
const RECORDS: u32 = 4;

static SETUP_REGISTERS: [RegisterOp; 2] = [
    RegisterOp {
        cpu: CPU0,
        register: IDENT_REG,
        value: RegisterValue::new(),
        kind: RegisterOpKind::Read,
    },
    RegisterOp {
        cpu: CPU1,
        register: IDENT_REG,
        value: RegisterValue::new(),
        kind: RegisterOpKind::Read,
    },
];
static SETUP_MAPPED: [MappedOp; 1] = [MappedOp {
    control: Some(ControlWrite {
        address: CONTROL_BASE,
        value: 0x1,
    }),
    data: Some(DataWindow {
        address: WINDOW_BASE,
        words: 4,
    }),
}];
static SETUP_CONFIG: [ConfigOp; 1] = [ConfigOp { address: PROBE }];
static SETUP_CHANNELS: [EcOp; 1] = [EcOp {
    channel: THERMAL_CHANNEL,
}];
static SAMPLING_REGISTERS: [RegisterOp; 1] = [RegisterOp {
    cpu: CPU0,
    register: SAMPLE_REG,
    value: RegisterValue::new(),
    kind: RegisterOpKind::Read,
}];
static SAMPLING_COUNTERS: [CounterOp; 1] = [CounterOp {
    kind: CounterOpKind::Read,
}];
static TEARDOWN_REGISTERS: [RegisterOp; 1] = [RegisterOp {
    cpu: CPU0,
    register: IDENT_REG,
    value: RegisterValue::from_bits(0x1),
    kind: RegisterOpKind::ClearBits,
}];

fn scan_table() -> ScanTable<'static> {
    ScanTable {
        phases: PerPhase::new(
            PhaseOps {
                registers: &SETUP_REGISTERS,
                mapped: &SETUP_MAPPED,
                config: &SETUP_CONFIG,
                channels: &SETUP_CHANNELS,
                counters: &[],
            },
            PhaseOps {
                registers: &SAMPLING_REGISTERS,
                counters: &SAMPLING_COUNTERS,
                ..PhaseOps::empty()
            },
            PhaseOps {
                registers: &TEARDOWN_REGISTERS,
                ..PhaseOps::empty()
            },
        ),
        records: RECORDS,
    }
}

fn seed(hw: &SimHardware) {
    hw.registers.set(CPU0, IDENT_REG, 0x8086);
    hw.registers.set(CPU1, IDENT_REG, 0x8087);
    hw.registers.set(CPU0, SAMPLE_REG, 1_000);
    hw.mmio.seed_words(WINDOW_BASE, &[0xAA, 0xBB, 0xCC, 0xDD]);
    hw.config.set(PROBE, 0x1234_5678);
    hw.ec.set_channel(THERMAL_CHANNEL, 40);
    hw.counters.set_lanes([0; COUNTER_LANES]);
    hw.clock.advance(1_000, 2_600_000);
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    StderrLogger::new(LevelFilter::Debug).init().expect("logger");
    println!("telemetry-harness (engine {})", telemetry_engine::VERSION);

    let engine = Engine::new(SimHardware::new(2));
    let hw = engine.hardware();
    seed(hw);

    let table = scan_table();
    let mut session = engine.begin(&table)?;
    let (records, extents, pairs) = {
        let layout = session.layout()?;
        log::info!(
            "scan sized: {} description bytes, {} result bytes, {} records",
            layout.description_bytes,
            layout.result_bytes,
            layout.records
        );
        (layout.records, layout.results, layout.timestamp_pairs)
    };

    session.run_setup()?;
    for record in 0..records {
        // nudge the simulated sources so every record shows movement
        hw.registers
            .set(CPU0, SAMPLE_REG, 1_000 + u64::from(record) * 10);
        hw.counters.advance(250);
        session.run_sampling(record)?;
    }
    session.run_teardown()?;

    // destinations sized straight from the layout
    let mut reg_setup = vec![0u64; extents.setup.register.elements];
    let mut reg_sampling = vec![0u64; extents.sampling.register.elements];
    let mut reg_teardown = vec![0u64; extents.teardown.register.elements];
    let mut mapped_setup = vec![0u64; extents.setup.mapped.elements];
    let mut config_setup = vec![0u32; extents.setup.config.elements];
    let mut ec_setup = vec![0u8; extents.setup.channel.elements];
    let mut counters_sampling = vec![[0u64; COUNTER_LANES]; extents.sampling.counter.elements];
    let mut wall = (
        vec![0u64; pairs.setup],
        vec![0u64; pairs.sampling],
        vec![0u64; pairs.teardown],
    );
    let mut cycles = (
        vec![0u64; pairs.setup],
        vec![0u64; pairs.sampling],
        vec![0u64; pairs.teardown],
    );
    let mut dst = TransferBuffer {
        registers: PerPhase::new(
            Some(reg_setup.as_mut_slice()),
            Some(reg_sampling.as_mut_slice()),
            Some(reg_teardown.as_mut_slice()),
        ),
        mapped: PerPhase::new(Some(mapped_setup.as_mut_slice()), None, None),
        config: PerPhase::new(Some(config_setup.as_mut_slice()), None, None),
        channels: PerPhase::new(Some(ec_setup.as_mut_slice()), None, None),
        counters: PerPhase::new(None, Some(counters_sampling.as_mut_slice()), None),
        wall_us: PerPhase::new(
            Some(wall.0.as_mut_slice()),
            Some(wall.1.as_mut_slice()),
            Some(wall.2.as_mut_slice()),
        ),
        cycles: PerPhase::new(
            Some(cycles.0.as_mut_slice()),
            Some(cycles.1.as_mut_slice()),
            Some(cycles.2.as_mut_slice()),
        ),
    };
    session.transfer(&mut dst)?;
    session.release();

    println!("setup registers:  {reg_setup:#x?}");
    println!("mapped window:    {mapped_setup:#x?}");
    println!("config word:      {config_setup:#x?}");
    println!("ec channel:       {ec_setup:?}");
    println!("teardown slots:   {reg_teardown:?}");
    println!("sampling regs:    {reg_sampling:?}");
    for (record, lanes) in counters_sampling.iter().enumerate() {
        println!("counters[{record}]:      {lanes:?}");
    }
    println!("sampling wall us: {:?}", wall.1);
    println!("sampling cycles:  {:?}", cycles.1);

    Ok(())
}
