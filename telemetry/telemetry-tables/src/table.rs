use crate::{ConfigOp, CounterOp, EcOp, MappedOp, PerPhase, RegisterOp};

/// The five operation families a scan can contain.
///
/// Buffers and result stores walk the families in [`OpClass::ORDER`]; that
/// order is part of the engine's layout contract and never changes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum OpClass {
    Register,
    Mapped,
    Config,
    Channel,
    Counter,
}

impl OpClass {
    /// Canonical walk order: registers, mapped memory, configuration space,
    /// embedded channels, counter bank.
    pub const ORDER: [Self; 5] = [
        Self::Register,
        Self::Mapped,
        Self::Config,
        Self::Channel,
        Self::Counter,
    ];
}

/// One `T` per [`OpClass`].
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PerClass<T> {
    pub register: T,
    pub mapped: T,
    pub config: T,
    pub channel: T,
    pub counter: T,
}

impl<T> PerClass<T> {
    /// Builds the set by calling `f` once per class, in canonical order.
    pub fn from_fn(mut f: impl FnMut(OpClass) -> T) -> Self {
        Self {
            register: f(OpClass::Register),
            mapped: f(OpClass::Mapped),
            config: f(OpClass::Config),
            channel: f(OpClass::Channel),
            counter: f(OpClass::Counter),
        }
    }

    pub const fn get(&self, class: OpClass) -> &T {
        match class {
            OpClass::Register => &self.register,
            OpClass::Mapped => &self.mapped,
            OpClass::Config => &self.config,
            OpClass::Channel => &self.channel,
            OpClass::Counter => &self.counter,
        }
    }

    pub const fn get_mut(&mut self, class: OpClass) -> &mut T {
        match class {
            OpClass::Register => &mut self.register,
            OpClass::Mapped => &mut self.mapped,
            OpClass::Config => &mut self.config,
            OpClass::Channel => &mut self.channel,
            OpClass::Counter => &mut self.counter,
        }
    }
}

/// The operations one phase executes, borrowed from the caller.
///
/// Slices may be empty; an empty slice means "this family does nothing in
/// this phase" and costs no buffer space.
#[derive(Copy, Clone, Debug, Default)]
pub struct PhaseOps<'a> {
    pub registers: &'a [RegisterOp],
    pub mapped: &'a [MappedOp],
    pub config: &'a [ConfigOp],
    pub channels: &'a [EcOp],
    pub counters: &'a [CounterOp],
}

impl PhaseOps<'_> {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            registers: &[],
            mapped: &[],
            config: &[],
            channels: &[],
            counters: &[],
        }
    }

    /// Number of operation records of `class` in this phase.
    #[must_use]
    pub const fn count(&self, class: OpClass) -> usize {
        match class {
            OpClass::Register => self.registers.len(),
            OpClass::Mapped => self.mapped.len(),
            OpClass::Config => self.config.len(),
            OpClass::Channel => self.channels.len(),
            OpClass::Counter => self.counters.len(),
        }
    }
}

/// A complete scan description: per-phase operations plus the number of
/// sampling records.
///
/// The table borrows the caller's operation arrays; the engine copies them
/// into buffers it owns when a session begins, so the borrow ends there.
#[derive(Copy, Clone, Debug)]
pub struct ScanTable<'a> {
    pub phases: PerPhase<PhaseOps<'a>>,
    pub records: u32,
}

impl ScanTable<'_> {
    /// A table with no operations anywhere and no sampling records.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            phases: PerPhase::new(PhaseOps::empty(), PhaseOps::empty(), PhaseOps::empty()),
            records: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CpuIndex, Phase, RegisterAddress, RegisterOpKind, RegisterValue};

    #[test]
    fn empty_table_counts_zero_everywhere() {
        let table = ScanTable::empty();
        for phase in Phase::ALL {
            for class in OpClass::ORDER {
                assert_eq!(table.phases.get(phase).count(class), 0);
            }
        }
    }

    #[test]
    fn counts_follow_the_slices() {
        let regs = [RegisterOp {
            cpu: CpuIndex::new(0),
            register: RegisterAddress::new(0x10),
            value: RegisterValue::new(),
            kind: RegisterOpKind::Read,
        }];
        let setup = PhaseOps {
            registers: &regs,
            ..PhaseOps::empty()
        };
        let table = ScanTable {
            phases: PerPhase::new(setup, PhaseOps::empty(), PhaseOps::empty()),
            records: 2,
        };
        assert_eq!(table.phases.setup.count(OpClass::Register), 1);
        assert_eq!(table.phases.sampling.count(OpClass::Register), 0);
    }
}
