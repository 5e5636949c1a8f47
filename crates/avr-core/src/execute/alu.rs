//! Arithmetic, logic, shift and multiply handlers. None of them touch memory
//! beyond the register file, so none of them can fault.

use super::{flags, Effect};
use crate::decoder::Operands;
use crate::timing::CycleCostKind;
use crate::Machine;

/// Where the right-hand operand of a two-operand instruction comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rhs {
    /// Register `Rr`.
    Register,
    /// Immediate `K`.
    Immediate,
}

fn rhs(machine: &Machine, ops: &Operands, source: Rhs) -> u8 {
    match source {
        Rhs::Register => machine.data.reg(ops.r),
        Rhs::Immediate => ops.k,
    }
}

pub fn add(machine: &mut Machine, ops: &Operands, with_carry: bool) -> Effect {
    let rd = machine.data.reg(ops.d);
    let rr = machine.data.reg(ops.r);
    let carry = u8::from(with_carry && machine.data.flags.c);
    let result = rd.wrapping_add(rr).wrapping_add(carry);
    flags::add(&mut machine.data.flags, rd, rr, result);
    machine.data.set_reg(ops.d, result);
    Effect::next(CycleCostKind::Alu)
}

/// `SUB`, `SBC`, `SUBI`, `SBCI` and, with `store` off, the compares.
pub fn sub(
    machine: &mut Machine,
    ops: &Operands,
    source: Rhs,
    with_carry: bool,
    store: bool,
) -> Effect {
    let rd = machine.data.reg(ops.d);
    let rr = rhs(machine, ops, source);
    let carry = u8::from(with_carry && machine.data.flags.c);
    let result = rd.wrapping_sub(rr).wrapping_sub(carry);
    flags::sub(&mut machine.data.flags, rd, rr, result, with_carry);
    if store {
        machine.data.set_reg(ops.d, result);
    }
    Effect::next(CycleCostKind::Alu)
}

pub fn logic(machine: &mut Machine, ops: &Operands, source: Rhs, op: fn(u8, u8) -> u8) -> Effect {
    let result = op(machine.data.reg(ops.d), rhs(machine, ops, source));
    flags::logic(&mut machine.data.flags, result);
    machine.data.set_reg(ops.d, result);
    Effect::next(CycleCostKind::Alu)
}

pub fn com(machine: &mut Machine, d: u8) -> Effect {
    let result = !machine.data.reg(d);
    flags::logic(&mut machine.data.flags, result);
    machine.data.flags.c = true;
    machine.data.set_reg(d, result);
    Effect::next(CycleCostKind::Alu)
}

/// Two's complement: flags as for `0 - Rd`.
pub fn neg(machine: &mut Machine, d: u8) -> Effect {
    let rd = machine.data.reg(d);
    let result = rd.wrapping_neg();
    flags::sub(&mut machine.data.flags, 0, rd, result, false);
    machine.data.set_reg(d, result);
    Effect::next(CycleCostKind::Alu)
}

pub fn inc(machine: &mut Machine, d: u8) -> Effect {
    let result = machine.data.reg(d).wrapping_add(1);
    step_flags(machine, result, result == 0x80);
    machine.data.set_reg(d, result);
    Effect::next(CycleCostKind::Alu)
}

pub fn dec(machine: &mut Machine, d: u8) -> Effect {
    let result = machine.data.reg(d).wrapping_sub(1);
    step_flags(machine, result, result == 0x7F);
    machine.data.set_reg(d, result);
    Effect::next(CycleCostKind::Alu)
}

// INC/DEC leave C and H alone.
const fn step_flags(machine: &mut Machine, result: u8, overflow: bool) {
    let flags = &mut machine.data.flags;
    flags.v = overflow;
    flags.n = result & 0x80 != 0;
    flags.z = result == 0;
    flags.s = flags.n ^ flags.v;
}

pub fn swap(machine: &mut Machine, d: u8) -> Effect {
    let value = machine.data.reg(d);
    machine.data.set_reg(d, value.rotate_left(4));
    Effect::next(CycleCostKind::Move)
}

pub fn asr(machine: &mut Machine, d: u8) -> Effect {
    let rd = machine.data.reg(d);
    let result = (rd >> 1) | (rd & 0x80);
    flags::shift(&mut machine.data.flags, result, rd & 1 != 0);
    machine.data.set_reg(d, result);
    Effect::next(CycleCostKind::Alu)
}

pub fn lsr(machine: &mut Machine, d: u8) -> Effect {
    let rd = machine.data.reg(d);
    let result = rd >> 1;
    flags::shift(&mut machine.data.flags, result, rd & 1 != 0);
    machine.data.set_reg(d, result);
    Effect::next(CycleCostKind::Alu)
}

pub fn ror(machine: &mut Machine, d: u8) -> Effect {
    let rd = machine.data.reg(d);
    let result = (rd >> 1) | (u8::from(machine.data.flags.c) << 7);
    flags::shift(&mut machine.data.flags, result, rd & 1 != 0);
    machine.data.set_reg(d, result);
    Effect::next(CycleCostKind::Alu)
}

pub fn adiw(machine: &mut Machine, ops: &Operands) -> Effect {
    let rd = machine.data.reg_pair(ops.d);
    let result = rd.wrapping_add(u16::from(ops.k));
    flags::add_word(&mut machine.data.flags, rd, result);
    machine.data.set_reg_pair(ops.d, result);
    Effect::next(CycleCostKind::Word16)
}

pub fn sbiw(machine: &mut Machine, ops: &Operands) -> Effect {
    let rd = machine.data.reg_pair(ops.d);
    let result = rd.wrapping_sub(u16::from(ops.k));
    flags::sub_word(&mut machine.data.flags, rd, result);
    machine.data.set_reg_pair(ops.d, result);
    Effect::next(CycleCostKind::Word16)
}

fn store_product(machine: &mut Machine, product: u16, fractional: bool) -> Effect {
    let stored = if fractional { product << 1 } else { product };
    flags::multiply(&mut machine.data.flags, product, stored);
    machine.data.set_reg_pair(0, stored);
    Effect::next(CycleCostKind::Multiply)
}

fn signed(value: u8) -> i16 {
    i16::from(value as i8)
}

pub fn mul(machine: &mut Machine, ops: &Operands) -> Effect {
    let product = u16::from(machine.data.reg(ops.d)) * u16::from(machine.data.reg(ops.r));
    store_product(machine, product, false)
}

pub fn muls(machine: &mut Machine, ops: &Operands) -> Effect {
    let product = signed(machine.data.reg(ops.d)) * signed(machine.data.reg(ops.r));
    store_product(machine, product as u16, false)
}

pub fn mulsu(machine: &mut Machine, ops: &Operands) -> Effect {
    let product = signed(machine.data.reg(ops.d)) * i16::from(machine.data.reg(ops.r));
    store_product(machine, product as u16, false)
}

pub fn fmul(machine: &mut Machine, ops: &Operands) -> Effect {
    let product = u16::from(machine.data.reg(ops.d)) * u16::from(machine.data.reg(ops.r));
    store_product(machine, product, true)
}

pub fn fmuls(machine: &mut Machine, ops: &Operands) -> Effect {
    let product = signed(machine.data.reg(ops.d)) * signed(machine.data.reg(ops.r));
    store_product(machine, product as u16, true)
}

pub fn fmulsu(machine: &mut Machine, ops: &Operands) -> Effect {
    let product = signed(machine.data.reg(ops.d)) * i16::from(machine.data.reg(ops.r));
    store_product(machine, product as u16, true)
}
