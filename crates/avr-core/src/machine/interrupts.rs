//! Interrupt arbitration and vector dispatch.

use tracing::debug;

use super::Machine;
use crate::timing::{cycle_cost, CycleCostKind};
use crate::{peripherals, CallKind, Fault, RunState};

impl Machine {
    /// Host-raised requests merged with peripheral flags that are enabled.
    #[must_use]
    pub fn pending_interrupts(&self) -> u64 {
        self.cpu.pending | peripherals::pending_sources(&self.data)
    }

    /// Dispatches the lowest pending vector when `I` is set. Returns `true`
    /// when an interrupt was taken.
    pub(crate) fn service_interrupts(&mut self) -> Result<bool, Fault> {
        if !self.data.flags.i {
            return Ok(false);
        }
        let pending = self.pending_interrupts();
        if pending == 0 {
            return Ok(false);
        }
        #[allow(clippy::cast_possible_truncation)]
        let vector = pending.trailing_zeros() as u8;
        self.cpu.pending &= !(1 << vector);
        peripherals::acknowledge(&mut self.data, vector);

        let return_pc = self.cpu.pc;
        let target = u16::from(vector) * 2;
        self.push_return(return_pc, target, CallKind::Interrupt)?;
        self.data.flags.i = false;
        self.cpu.inside_interrupt = true;
        self.cpu.pc = target;
        self.cpu.cycles += u64::from(cycle_cost(CycleCostKind::InterruptEntry));
        if self.cpu.is_sleeping() {
            self.cpu.run_state = RunState::Running;
            self.cpu.cycles += u64::from(cycle_cost(CycleCostKind::SleepWake));
            debug!(vector, "woken from sleep");
        }
        self.diag.interrupt_count += 1;
        debug!(vector, return_pc, cycles = self.cpu.cycles, "interrupt dispatched");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use crate::memory::io::{SP_RESET, TIFR0, TIMSK0, TOV0};
    use crate::peripherals::TIMER0_OVF_VECTOR;
    use crate::{Machine, RunState};

    #[test]
    fn nothing_is_taken_with_interrupts_disabled() {
        let mut machine = Machine::default();
        machine.raise_interrupt(3);
        assert_eq!(machine.service_interrupts(), Ok(false));
        assert_eq!(machine.cpu().pending, 1 << 3);
    }

    #[test]
    fn lowest_vector_wins_and_entry_is_charged() {
        let mut machine = Machine::default();
        machine.set_pc(0x0123);
        machine.data_mut().flags_mut().i = true;
        machine.raise_interrupt(30);
        machine.raise_interrupt(7);
        assert_eq!(machine.service_interrupts(), Ok(true));
        assert_eq!(machine.pc(), 14);
        assert_eq!(machine.cycles(), 5);
        assert!(!machine.data().flags().i);
        assert!(machine.cpu().inside_interrupt);
        assert_eq!(machine.cpu().pending, 1 << 30);
        assert_eq!(machine.data().sp(), SP_RESET - 2);
        assert_eq!(machine.data().peek(SP_RESET), Some(0x23));
        assert_eq!(machine.data().peek(SP_RESET - 1), Some(0x01));
    }

    #[test]
    fn timer_flag_is_acknowledged_on_entry() {
        let mut machine = Machine::default();
        machine.data_mut().flags_mut().i = true;
        machine.data_mut().set_raw(TIMSK0, TOV0);
        machine.data_mut().set_raw(TIFR0, TOV0);
        assert_eq!(machine.service_interrupts(), Ok(true));
        assert_eq!(machine.pc(), u16::from(TIMER0_OVF_VECTOR) * 2);
        assert_eq!(machine.data().peek(TIFR0), Some(0));
    }

    #[test]
    fn waking_costs_extra() {
        let mut machine = Machine::default();
        machine.data_mut().flags_mut().i = true;
        machine.cpu.run_state = RunState::Sleeping;
        machine.raise_interrupt(1);
        assert_eq!(machine.service_interrupts(), Ok(true));
        assert_eq!(machine.cycles(), 10);
        assert_eq!(machine.run_state(), RunState::Running);
    }
}
