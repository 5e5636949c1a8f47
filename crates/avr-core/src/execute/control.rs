//! Jumps, calls, returns, branches, skips and the MCU control instructions.

use tracing::debug;

use super::Effect;
use crate::decoder::Operands;
use crate::encoding::Pointer;
use crate::memory::io::{SE, SMCR, SM_MASK};
use crate::timing::CycleCostKind;
use crate::{CallKind, Fault, Machine, RunState, PC_MASK};

/// Enters idle sleep when `SE` is set and `SM` selects idle; any other sleep
/// mode is not modeled and `SLEEP` falls through.
pub fn sleep(machine: &mut Machine) -> Effect {
    let smcr = machine.data.raw(SMCR);
    if smcr & SE != 0 && smcr & SM_MASK == 0 {
        machine.cpu.run_state = RunState::Sleeping;
        machine.cpu.break_out = true;
        debug!(pc = machine.cpu.pc, cycles = machine.cpu.cycles, "entering idle sleep");
    }
    Effect::next(CycleCostKind::Control)
}

/// `BREAK` stops a debug run after the instruction; otherwise it is a `NOP`.
pub fn brk(machine: &mut Machine) -> Effect {
    if machine.exec_flags.debug {
        machine.stop_requested = true;
        machine.cpu.break_out = true;
    }
    Effect::next(CycleCostKind::Control)
}

fn absolute_target(machine: &mut Machine, ops: &Operands) -> Result<u16, Fault> {
    let low = machine.fetch_operand_word()?;
    let target = (u32::from(ops.address_high) << 16) | u32::from(low);
    Ok(target as u16 & PC_MASK)
}

pub fn jmp(machine: &mut Machine, ops: &Operands) -> Result<Effect, Fault> {
    let target = absolute_target(machine, ops)?;
    Ok(Effect::absolute(CycleCostKind::AbsoluteJump, machine.cpu.pc, target))
}

pub fn ijmp(machine: &Machine) -> Effect {
    let target = machine.data.pointer(Pointer::Z);
    Effect::absolute(CycleCostKind::IndirectJump, machine.cpu.pc, target)
}

pub fn rcall(machine: &mut Machine, ops: &Operands) -> Result<Effect, Fault> {
    let pc = machine.cpu.pc;
    let effect = Effect::jump(CycleCostKind::RelativeCall, 1 + i32::from(ops.offset));
    machine.push_return(pc.wrapping_add(1) & PC_MASK, effect.next_pc(pc), CallKind::Call)?;
    Ok(effect)
}

pub fn call(machine: &mut Machine, ops: &Operands) -> Result<Effect, Fault> {
    let pc = machine.cpu.pc;
    let target = absolute_target(machine, ops)?;
    machine.push_return(pc.wrapping_add(2) & PC_MASK, target, CallKind::Call)?;
    Ok(Effect::absolute(CycleCostKind::AbsoluteCall, pc, target))
}

pub fn icall(machine: &mut Machine) -> Result<Effect, Fault> {
    let pc = machine.cpu.pc;
    let target = machine.data.pointer(Pointer::Z) & PC_MASK;
    machine.push_return(pc.wrapping_add(1) & PC_MASK, target, CallKind::Call)?;
    Ok(Effect::absolute(CycleCostKind::IndirectCall, pc, target))
}

pub fn ret(machine: &mut Machine) -> Result<Effect, Fault> {
    let target = machine.pop_return()?;
    Ok(Effect::absolute(CycleCostKind::Return, machine.cpu.pc, target))
}

/// `RET` that also re-enables interrupts and leaves the handler. A pending
/// interrupt may be taken right after it, so the batch ends here.
pub fn reti(machine: &mut Machine) -> Result<Effect, Fault> {
    let target = machine.pop_return()?;
    machine.data.flags.i = true;
    machine.cpu.inside_interrupt = false;
    machine.cpu.break_out = true;
    Ok(Effect::absolute(CycleCostKind::InterruptReturn, machine.cpu.pc, target))
}

/// `BRBS` when `when_set`, `BRBC` otherwise.
pub fn branch(machine: &Machine, ops: &Operands, when_set: bool) -> Effect {
    if machine.data.flags.bit(ops.b) == when_set {
        Effect::jump(CycleCostKind::BranchTaken, 1 + i32::from(ops.offset))
    } else {
        Effect::next(CycleCostKind::BranchNotTaken)
    }
}

/// Skips the next instruction, one or two words long, when `taken`.
pub fn skip_if(machine: &Machine, taken: bool) -> Effect {
    if !taken {
        Effect::next(CycleCostKind::SkipNotTaken)
    } else if machine.next_is_two_word() {
        Effect::jump(CycleCostKind::SkipTwoWord, 3)
    } else {
        Effect::jump(CycleCostKind::SkipOneWord, 2)
    }
}

#[cfg(test)]
mod tests {
    use super::{branch, brk, call, icall, ijmp, rcall, ret, reti, skip_if, sleep};
    use crate::api::ExecuteFlags;
    use crate::decoder::Operands;
    use crate::encoding::Pointer;
    use crate::memory::io::{SE, SMCR, SP_RESET};
    use crate::{Machine, RunState};

    fn offset(offset: i16) -> Operands {
        Operands {
            offset,
            ..Operands::default()
        }
    }

    #[test]
    fn rcall_and_ret_round_trip() {
        let mut machine = Machine::default();
        machine.cpu.pc = 0x0010;
        let effect = rcall(&mut machine, &offset(0x20)).unwrap();
        assert_eq!(effect.cycles, 3);
        assert_eq!(effect.next_pc(0x0010), 0x0031);
        assert_eq!(machine.data.sp(), SP_RESET - 2);

        machine.cpu.pc = 0x0031;
        let effect = ret(&mut machine).unwrap();
        assert_eq!(effect.cycles, 4);
        assert_eq!(effect.next_pc(0x0031), 0x0011);
        assert_eq!(machine.data.sp(), SP_RESET);
    }

    #[test]
    fn call_returns_past_the_operand_word() {
        let mut machine = Machine::default();
        // CALL 0x0123
        machine.load_flash(&[0x0E, 0x94, 0x23, 0x01]);
        let ops = Operands::default();
        let effect = call(&mut machine, &ops).unwrap();
        assert_eq!(effect.next_pc(0), 0x0123);
        assert_eq!(effect.cycles, 4);
        assert_eq!(machine.data.peek(SP_RESET), Some(0x02));
        assert_eq!(machine.data.peek(SP_RESET - 1), Some(0x00));
    }

    #[test]
    fn indirect_forms_use_z() {
        let mut machine = Machine::default();
        machine.data.set_pointer(Pointer::Z, 0x0400);
        assert_eq!(ijmp(&machine).next_pc(0), 0x0400);
        let effect = icall(&mut machine).unwrap();
        assert_eq!(effect.next_pc(0), 0x0400);
        assert_eq!(machine.data.peek(SP_RESET), Some(0x01));
    }

    #[test]
    fn reti_enables_interrupts_and_ends_the_batch() {
        let mut machine = Machine::default();
        machine.data.push_return_address(0x0042, 0, crate::CallKind::Interrupt).unwrap();
        machine.cpu.inside_interrupt = true;
        let effect = reti(&mut machine).unwrap();
        assert_eq!(effect.next_pc(0), 0x0042);
        assert!(machine.data.flags.i);
        assert!(!machine.cpu.inside_interrupt);
        assert!(machine.cpu.break_out);
    }

    #[test]
    fn branches_cost_one_more_cycle_when_taken() {
        let mut machine = Machine::default();
        machine.data.flags.z = true;
        let breq = Operands {
            b: 1,
            offset: -3,
            ..Operands::default()
        };
        let taken = branch(&machine, &breq, true);
        assert_eq!((taken.cycles, taken.pc_delta), (2, -2));
        let not_taken = branch(&machine, &breq, false);
        assert_eq!((not_taken.cycles, not_taken.pc_delta), (1, 1));
    }

    #[test]
    fn skips_measure_the_next_instruction() {
        let mut machine = Machine::default();
        // NOP, NOP, LDS R16, 0x0100
        machine.load_flash(&[0x00, 0x00, 0x00, 0x00, 0x00, 0x91, 0x00, 0x01]);
        assert_eq!(skip_if(&machine, false).cycles, 1);
        let one_word = skip_if(&machine, true);
        assert_eq!((one_word.cycles, one_word.pc_delta), (2, 2));
        machine.cpu.pc = 1;
        let two_words = skip_if(&machine, true);
        assert_eq!((two_words.cycles, two_words.pc_delta), (3, 3));
    }

    #[test]
    fn sleep_needs_enable_and_idle_mode() {
        let mut machine = Machine::default();
        sleep(&mut machine);
        assert_eq!(machine.run_state(), RunState::Running);
        machine.data.set_raw(SMCR, SE | 0x04);
        sleep(&mut machine);
        assert_eq!(machine.run_state(), RunState::Running);
        machine.data.set_raw(SMCR, SE);
        sleep(&mut machine);
        assert_eq!(machine.run_state(), RunState::Sleeping);
    }

    #[test]
    fn break_only_stops_debug_runs() {
        let mut machine = Machine::default();
        brk(&mut machine);
        assert!(!machine.stop_requested);
        machine.exec_flags = ExecuteFlags {
            debug: true,
            analytics: false,
        };
        brk(&mut machine);
        assert!(machine.stop_requested);
    }
}
