use thiserror::Error;

/// Fault classes used for diagnostics aggregation and policy decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum FaultClass {
    /// Decoder found no table entry for an opcode.
    Decode,
    /// Data-space, flash or EEPROM access outside its window.
    Memory,
    /// Stack push/pop outside SRAM.
    Stack,
    /// Execution requested without a loaded program.
    Program,
}

impl FaultClass {
    /// Number of distinct fault classes.
    pub const COUNT: usize = 4;

    /// Stable index used by the diagnostics counters.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Decode => 0,
            Self::Memory => 1,
            Self::Stack => 2,
            Self::Program => 3,
        }
    }
}

/// Stable fault taxonomy for the simulator core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u8)]
pub enum FaultCode {
    /// No instruction table entry matches the fetched opcode.
    #[error("unhandled opcode")]
    UnhandledOpcode = 0x01,
    /// Data-space access outside `[0, DATA_SIZE)`.
    #[error("data address out of range")]
    DataAddressOutOfRange = 0x02,
    /// Program-memory access outside the flash array.
    #[error("flash address out of range")]
    FlashAddressOutOfRange = 0x03,
    /// EEPROM access outside the EEPROM array.
    #[error("eeprom address out of range")]
    EepromAddressOutOfRange = 0x04,
    /// Stack pointer left the SRAM window during a push or pop.
    #[error("stack pointer out of range")]
    StackOutOfRange = 0x05,
    /// Execution was requested before a program was loaded.
    #[error("no program loaded")]
    NoProgramLoaded = 0x06,
}

impl FaultCode {
    /// Converts a fault code to its stable byte value.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Converts a stable byte value back into a fault code.
    #[must_use]
    pub const fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(Self::UnhandledOpcode),
            0x02 => Some(Self::DataAddressOutOfRange),
            0x03 => Some(Self::FlashAddressOutOfRange),
            0x04 => Some(Self::EepromAddressOutOfRange),
            0x05 => Some(Self::StackOutOfRange),
            0x06 => Some(Self::NoProgramLoaded),
            _ => None,
        }
    }

    /// Returns the diagnostics fault class for this fault code.
    #[must_use]
    pub const fn class(self) -> FaultClass {
        match self {
            Self::UnhandledOpcode => FaultClass::Decode,
            Self::DataAddressOutOfRange
            | Self::FlashAddressOutOfRange
            | Self::EepromAddressOutOfRange => FaultClass::Memory,
            Self::StackOutOfRange => FaultClass::Stack,
            Self::NoProgramLoaded => FaultClass::Program,
        }
    }

    /// Range faults may be answered with a neutral value and execution
    /// continued; the others always stop the current run.
    #[must_use]
    pub const fn is_recoverable(self) -> bool {
        matches!(
            self,
            Self::DataAddressOutOfRange
                | Self::FlashAddressOutOfRange
                | Self::EepromAddressOutOfRange
                | Self::StackOutOfRange
        )
    }
}

/// A fault together with the context it was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[error("{code} at pc {pc:#06x} (operand {operand:#06x})")]
pub struct Fault {
    /// Canonical fault code.
    pub code: FaultCode,
    /// Word address of the instruction that raised the fault.
    pub pc: u16,
    /// Offending address or opcode word.
    pub operand: u32,
}

impl Fault {
    /// Creates a fault record.
    #[must_use]
    pub const fn new(code: FaultCode, pc: u16, operand: u32) -> Self {
        Self { code, pc, operand }
    }
}
