use crate::RunState;

/// Number of interrupt vectors in the ATmega32u4 vector table, reset included.
pub const VECTOR_COUNT: u8 = 43;

/// Scheduler-owned CPU state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CpuState {
    /// Program counter as a word address.
    pub pc: u16,
    /// Total elapsed cycles since power-on; never decreases.
    pub cycles: u64,
    /// Cycle bound of the current `execute` burst.
    pub target_cycles: u64,
    /// Host-raised interrupt requests, one bit per vector.
    pub pending: u64,
    /// Set between interrupt entry and the matching `RETI`.
    pub inside_interrupt: bool,
    /// Forces the current batch to end at the next instruction boundary.
    pub break_out: bool,
    /// Running, sleeping or halted.
    pub run_state: RunState,
}

impl CpuState {
    /// Returns `true` while the core is in idle sleep.
    #[must_use]
    pub const fn is_sleeping(&self) -> bool {
        matches!(self.run_state, RunState::Sleeping)
    }

    /// Returns `true` once a fault has been latched.
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        matches!(self.run_state, RunState::Halted(_))
    }

    /// Marks `vector` as pending. Out-of-table vectors are ignored.
    pub const fn raise(&mut self, vector: u8) -> bool {
        if vector == 0 || vector >= VECTOR_COUNT {
            return false;
        }
        self.pending |= 1 << vector;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::{CpuState, VECTOR_COUNT};
    use crate::{FaultCode, RunState};

    #[test]
    fn power_on_state_is_running_at_zero() {
        let cpu = CpuState::default();
        assert_eq!(cpu.pc, 0);
        assert_eq!(cpu.cycles, 0);
        assert!(!cpu.is_sleeping());
        assert!(!cpu.is_halted());
    }

    #[test]
    fn raise_accepts_only_real_vectors() {
        let mut cpu = CpuState::default();
        assert!(!cpu.raise(0));
        assert!(!cpu.raise(VECTOR_COUNT));
        assert!(cpu.raise(1));
        assert!(cpu.raise(VECTOR_COUNT - 1));
        assert_eq!(cpu.pending, (1 << 1) | (1 << 42));
    }

    #[test]
    fn halted_state_is_reported() {
        let cpu = CpuState {
            run_state: RunState::Halted(FaultCode::UnhandledOpcode),
            ..CpuState::default()
        };
        assert!(cpu.is_halted());
    }
}
