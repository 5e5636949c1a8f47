//! Cycle-accurate ATmega32u4 core: flash, data space with memory-mapped
//! peripherals, instruction decode and execution, and an event-horizon
//! scheduler with sleep and interrupt dispatch.

/// Memory model primitives, the fixed region map and the data space.
pub mod memory;
pub use memory::{
    decode_memory_region, validate_data_access, validate_eeprom_access, validate_flash_access,
    validate_stack_access, DataSpace, Flash, LastSet, MemoryRegion, RegionDescriptor, DATA_SIZE,
    EEPROM_SIZE, EXT_IO_END, EXT_IO_START, FIXED_MEMORY_REGIONS, FLASH_SIZE, FLASH_WORDS, IO_END,
    IO_OFFSET, IO_START, PC_MASK, REGISTERS_END, REGISTERS_START, SRAM_END, SRAM_START,
};

/// Host-readable diagnostics counters.
pub mod diag;
pub use diag::Diagnostics;

/// Public host-facing configuration, run outcomes and hook traits.
pub mod api;
pub use api::{
    CallFrame, CallKind, CallStackObserver, CoreConfig, DebugAction, DebugHook, ErrorPolicy,
    ExecuteFlags, IoListener, NoHooks, Port, ProfileSink, RunOutcome, StopReason,
    DEFAULT_PLL_LOCK_CYCLES,
};

/// Architectural CPU state model primitives.
pub mod state;
pub use state::{
    CpuState, RunState, StatusFlags, SREG_C, SREG_H, SREG_I, SREG_N, SREG_S, SREG_T, SREG_V,
    SREG_Z, VECTOR_COUNT,
};

/// Mask/pattern opcode table and operand layouts.
pub mod encoding;
pub use encoding::{OpcodeKind, OperandFormat, OPCODE_TABLE};

/// Instruction decode with operand extraction.
pub mod decoder;
pub use decoder::{DecodedInstruction, Decoder, Operands};

/// Fault taxonomy with stable codes.
pub mod fault;
pub use fault::{Fault, FaultClass, FaultCode};

/// Instruction cycle-cost table and lookup helpers.
pub mod timing;
pub use timing::{cycle_cost, CycleCostKind, CYCLE_COST_TABLE};

/// Timers, EEPROM, ADC, PLL, SPI and GPIO side effects.
pub mod peripherals;

/// Instruction execution.
pub mod execute;
pub use execute::{execute_instruction, Effect};

/// Machine aggregate and scheduler.
pub mod machine;
pub use machine::Machine;

/// Binary state snapshots.
pub mod snapshot;
pub use snapshot::{fnv1a, SnapshotError, SnapshotVersion, SNAPSHOT_MAGIC};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
