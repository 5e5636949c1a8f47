//! Architectural CPU state model primitives.

/// Scheduler-owned program counter, cycle counter and interrupt bookkeeping.
pub mod cpu;
/// Decomposed `SREG` flag cache.
pub mod flags;
/// Running/sleeping/halted state machine.
pub mod run_state;

pub use cpu::{CpuState, VECTOR_COUNT};
pub use flags::{
    StatusFlags, SREG_C, SREG_H, SREG_I, SREG_N, SREG_S, SREG_T, SREG_V, SREG_Z,
};
pub use run_state::RunState;
