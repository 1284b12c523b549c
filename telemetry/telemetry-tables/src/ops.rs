use crate::{ConfigAddress, CpuIndex, EcChannel, PhysicalAddress, RegisterAddress, RegisterValue};

/// What a [`RegisterOp`] does with its register.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum RegisterOpKind {
    /// Read the register; the value lands in the operation's result slot.
    Read,
    /// Write the operation's value to the register.
    Write,
    /// Read-modify-write: OR the operation's value into the register.
    SetBits,
    /// Read-modify-write: clear the bits of the operation's value.
    ClearBits,
}

/// One register access against one processor.
///
/// `value` is the operand for `Write` and the mask for `SetBits`/`ClearBits`;
/// it is ignored for `Read`. Only `Read` populates the operation's result
/// slot — the other kinds leave it zeroed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RegisterOp {
    pub cpu: CpuIndex,
    pub register: RegisterAddress,
    pub value: RegisterValue,
    pub kind: RegisterOpKind,
}

/// The control half of a mapped-memory operation: one word stored to a
/// mapped physical address before the data window is captured.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ControlWrite {
    pub address: PhysicalAddress,
    pub value: u64,
}

/// The data half of a mapped-memory operation: `words` consecutive 64-bit
/// words captured from a mapped physical window.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DataWindow {
    pub address: PhysicalAddress,
    pub words: u32,
}

impl DataWindow {
    /// Window length in words.
    #[inline]
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn word_count(self) -> usize {
        self.words as usize
    }
}

/// One mapped-memory operation.
///
/// Either half may be absent: an absent half gets no mapping and is never
/// accessed. An operation with an absent data window contributes no result
/// words.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct MappedOp {
    pub control: Option<ControlWrite>,
    pub data: Option<DataWindow>,
}

impl MappedOp {
    /// Result words this operation produces per execution.
    #[inline]
    #[must_use]
    pub const fn data_words(&self) -> usize {
        match self.data {
            Some(window) => window.word_count(),
            None => 0,
        }
    }
}

/// One configuration-space read.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ConfigOp {
    pub address: ConfigAddress,
}

/// One embedded-controller channel read; yields a single byte.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct EcOp {
    pub channel: EcChannel,
}

/// What a [`CounterOp`] does with the counter bank.
///
/// The bank is read-only from the scan's point of view, so a snapshot is the
/// only kind there is.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum CounterOpKind {
    /// Capture all lanes of the bank at once.
    Read,
}

/// One counter-bank snapshot operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CounterOp {
    pub kind: CounterOpKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_data_window_has_no_words() {
        let op = MappedOp {
            control: Some(ControlWrite {
                address: PhysicalAddress::new(0xFF10_8000),
                value: 0x11,
            }),
            data: None,
        };
        assert_eq!(op.data_words(), 0);
    }

    #[test]
    fn data_words_follow_the_window() {
        let op = MappedOp {
            control: None,
            data: Some(DataWindow {
                address: PhysicalAddress::new(0xFF10_9000),
                words: 6,
            }),
        };
        assert_eq!(op.data_words(), 6);
    }
}
