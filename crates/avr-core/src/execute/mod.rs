//! Instruction execution.
//!
//! Each handler reads its operands through the machine, writes results back
//! through the data-space accessors, updates exactly the status flags its
//! opcode defines, and reports an [`Effect`]: the cycles consumed and how far
//! to move the program counter. The scheduler applies the effect, so a
//! faulting handler leaves `PC` on the faulting instruction.

#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]

mod alu;
mod bits;
mod control;
mod flags;
mod transfer;

use alu::Rhs;

use crate::decoder::DecodedInstruction;
use crate::encoding::OpcodeKind;
use crate::timing::{cycle_cost, CycleCostKind};
use crate::{Fault, Machine, PC_MASK};

/// Outcome of one executed instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Effect {
    /// Cycles consumed, 1 to 5.
    pub cycles: u8,
    /// Signed word offset applied to `PC`, modulo the flash size.
    pub pc_delta: i32,
}

impl Effect {
    /// Falls through to the next one-word instruction.
    #[must_use]
    pub const fn next(kind: CycleCostKind) -> Self {
        Self::jump(kind, 1)
    }

    /// Falls through past a two-word instruction.
    #[must_use]
    pub const fn next_two_words(kind: CycleCostKind) -> Self {
        Self::jump(kind, 2)
    }

    /// Moves `PC` by `pc_delta` words.
    #[must_use]
    pub const fn jump(kind: CycleCostKind, pc_delta: i32) -> Self {
        Self {
            cycles: cycle_cost(kind),
            pc_delta,
        }
    }

    /// Moves `PC` from `pc` to the absolute word address `target`.
    #[must_use]
    pub fn absolute(kind: CycleCostKind, pc: u16, target: u16) -> Self {
        Self::jump(kind, i32::from(target) - i32::from(pc))
    }

    /// Program counter after applying this effect at `pc`.
    #[must_use]
    pub fn next_pc(self, pc: u16) -> u16 {
        (i32::from(pc) + self.pc_delta) as u16 & PC_MASK
    }
}

/// Executes one decoded instruction at the machine's current `PC`.
///
/// # Errors
///
/// Returns the fault raised by a memory access when the error policy does
/// not absorb it.
pub fn execute_instruction(
    machine: &mut Machine,
    instruction: &DecodedInstruction,
) -> Result<Effect, Fault> {
    let ops = &instruction.operands;
    let effect = match instruction.kind {
        OpcodeKind::Nop | OpcodeKind::Wdr | OpcodeKind::Spm => Effect::next(CycleCostKind::Control),
        OpcodeKind::Sleep => control::sleep(machine),
        OpcodeKind::Break => control::brk(machine),

        OpcodeKind::Add => alu::add(machine, ops, false),
        OpcodeKind::Adc => alu::add(machine, ops, true),
        OpcodeKind::Sub => alu::sub(machine, ops, Rhs::Register, false, true),
        OpcodeKind::Sbc => alu::sub(machine, ops, Rhs::Register, true, true),
        OpcodeKind::Subi => alu::sub(machine, ops, Rhs::Immediate, false, true),
        OpcodeKind::Sbci => alu::sub(machine, ops, Rhs::Immediate, true, true),
        OpcodeKind::Cp => alu::sub(machine, ops, Rhs::Register, false, false),
        OpcodeKind::Cpc => alu::sub(machine, ops, Rhs::Register, true, false),
        OpcodeKind::Cpi => alu::sub(machine, ops, Rhs::Immediate, false, false),
        OpcodeKind::And => alu::logic(machine, ops, Rhs::Register, |a, b| a & b),
        OpcodeKind::Andi => alu::logic(machine, ops, Rhs::Immediate, |a, b| a & b),
        OpcodeKind::Or => alu::logic(machine, ops, Rhs::Register, |a, b| a | b),
        OpcodeKind::Ori => alu::logic(machine, ops, Rhs::Immediate, |a, b| a | b),
        OpcodeKind::Eor => alu::logic(machine, ops, Rhs::Register, |a, b| a ^ b),
        OpcodeKind::Com => alu::com(machine, ops.d),
        OpcodeKind::Neg => alu::neg(machine, ops.d),
        OpcodeKind::Inc => alu::inc(machine, ops.d),
        OpcodeKind::Dec => alu::dec(machine, ops.d),
        OpcodeKind::Swap => alu::swap(machine, ops.d),
        OpcodeKind::Asr => alu::asr(machine, ops.d),
        OpcodeKind::Lsr => alu::lsr(machine, ops.d),
        OpcodeKind::Ror => alu::ror(machine, ops.d),
        OpcodeKind::Adiw => alu::adiw(machine, ops),
        OpcodeKind::Sbiw => alu::sbiw(machine, ops),
        OpcodeKind::Mul => alu::mul(machine, ops),
        OpcodeKind::Muls => alu::muls(machine, ops),
        OpcodeKind::Mulsu => alu::mulsu(machine, ops),
        OpcodeKind::Fmul => alu::fmul(machine, ops),
        OpcodeKind::Fmuls => alu::fmuls(machine, ops),
        OpcodeKind::Fmulsu => alu::fmulsu(machine, ops),

        OpcodeKind::Mov => transfer::mov(machine, ops),
        OpcodeKind::Movw => transfer::movw(machine, ops),
        OpcodeKind::Ldi => transfer::ldi(machine, ops),
        OpcodeKind::Ld(pointer, mode) => transfer::ld(machine, ops, pointer, mode)?,
        OpcodeKind::St(pointer, mode) => transfer::st(machine, ops, pointer, mode)?,
        OpcodeKind::Ldd(pointer) => transfer::ldd(machine, ops, pointer)?,
        OpcodeKind::Std(pointer) => transfer::std(machine, ops, pointer)?,
        OpcodeKind::Lds => transfer::lds(machine, ops)?,
        OpcodeKind::Sts => transfer::sts(machine, ops)?,
        OpcodeKind::Lpm(form) => transfer::lpm(machine, ops, form, false)?,
        OpcodeKind::Elpm(form) => transfer::lpm(machine, ops, form, true)?,
        OpcodeKind::Push => transfer::push(machine, ops)?,
        OpcodeKind::Pop => transfer::pop(machine, ops)?,
        OpcodeKind::In => transfer::input(machine, ops)?,
        OpcodeKind::Out => transfer::output(machine, ops)?,

        OpcodeKind::Rjmp => Effect::jump(CycleCostKind::RelativeJump, 1 + i32::from(ops.offset)),
        OpcodeKind::Jmp => control::jmp(machine, ops)?,
        OpcodeKind::Ijmp | OpcodeKind::Eijmp => control::ijmp(machine),
        OpcodeKind::Rcall => control::rcall(machine, ops)?,
        OpcodeKind::Call => control::call(machine, ops)?,
        OpcodeKind::Icall | OpcodeKind::Eicall => control::icall(machine)?,
        OpcodeKind::Ret => control::ret(machine)?,
        OpcodeKind::Reti => control::reti(machine)?,
        OpcodeKind::Brbs => control::branch(machine, ops, true),
        OpcodeKind::Brbc => control::branch(machine, ops, false),
        OpcodeKind::Cpse => {
            let equal = machine.data.reg(ops.d) == machine.data.reg(ops.r);
            control::skip_if(machine, equal)
        }

        OpcodeKind::Bset => bits::bset(machine, ops, true),
        OpcodeKind::Bclr => bits::bset(machine, ops, false),
        OpcodeKind::Bst => bits::bst(machine, ops),
        OpcodeKind::Bld => bits::bld(machine, ops),
        OpcodeKind::Sbi => bits::sbi(machine, ops, true)?,
        OpcodeKind::Cbi => bits::sbi(machine, ops, false)?,
        OpcodeKind::Sbrc => bits::sbrs(machine, ops, false),
        OpcodeKind::Sbrs => bits::sbrs(machine, ops, true),
        OpcodeKind::Sbic => bits::sbis(machine, ops, false)?,
        OpcodeKind::Sbis => bits::sbis(machine, ops, true)?,
    };
    Ok(effect)
}
