//! Register moves, data-space loads and stores, program-memory loads, stack
//! and I/O transfers.

use super::Effect;
use crate::decoder::Operands;
use crate::encoding::{Pointer, PointerMode, ProgramLoad};
use crate::memory::io::RAMPZ;
use crate::timing::CycleCostKind;
use crate::{Fault, Machine, IO_START};

pub fn mov(machine: &mut Machine, ops: &Operands) -> Effect {
    let value = machine.data.reg(ops.r);
    machine.data.set_reg(ops.d, value);
    Effect::next(CycleCostKind::Move)
}

pub fn movw(machine: &mut Machine, ops: &Operands) -> Effect {
    let value = machine.data.reg_pair(ops.r);
    machine.data.set_reg_pair(ops.d, value);
    Effect::next(CycleCostKind::Move)
}

pub fn ldi(machine: &mut Machine, ops: &Operands) -> Effect {
    machine.data.set_reg(ops.d, ops.k);
    Effect::next(CycleCostKind::Move)
}

/// Effective address for a pointer access, applying pre-decrement.
fn address(machine: &mut Machine, pointer: Pointer, mode: PointerMode) -> u16 {
    let mut addr = machine.data.pointer(pointer);
    if mode == PointerMode::PreDecrement {
        addr = addr.wrapping_sub(1);
        machine.data.set_pointer(pointer, addr);
    }
    addr
}

fn post_increment(machine: &mut Machine, pointer: Pointer, mode: PointerMode, addr: u16) {
    if mode == PointerMode::PostIncrement {
        machine.data.set_pointer(pointer, addr.wrapping_add(1));
    }
}

pub fn ld(
    machine: &mut Machine,
    ops: &Operands,
    pointer: Pointer,
    mode: PointerMode,
) -> Result<Effect, Fault> {
    let addr = address(machine, pointer, mode);
    let value = machine.read_data(addr)?;
    machine.data.set_reg(ops.d, value);
    post_increment(machine, pointer, mode, addr);
    Ok(Effect::next(CycleCostKind::Load))
}

pub fn st(
    machine: &mut Machine,
    ops: &Operands,
    pointer: Pointer,
    mode: PointerMode,
) -> Result<Effect, Fault> {
    let value = machine.data.reg(ops.d);
    let addr = address(machine, pointer, mode);
    machine.write_data(addr, value)?;
    post_increment(machine, pointer, mode, addr);
    Ok(Effect::next(CycleCostKind::Store))
}

pub fn ldd(machine: &mut Machine, ops: &Operands, pointer: Pointer) -> Result<Effect, Fault> {
    let addr = machine.data.pointer(pointer).wrapping_add(u16::from(ops.q));
    let value = machine.read_data(addr)?;
    machine.data.set_reg(ops.d, value);
    Ok(Effect::next(CycleCostKind::Load))
}

// Store forms carry the source register in the `d` field.
pub fn std(machine: &mut Machine, ops: &Operands, pointer: Pointer) -> Result<Effect, Fault> {
    let addr = machine.data.pointer(pointer).wrapping_add(u16::from(ops.q));
    machine.write_data(addr, machine.data.reg(ops.d))?;
    Ok(Effect::next(CycleCostKind::Store))
}

pub fn lds(machine: &mut Machine, ops: &Operands) -> Result<Effect, Fault> {
    let addr = machine.fetch_operand_word()?;
    let value = machine.read_data(addr)?;
    machine.data.set_reg(ops.d, value);
    Ok(Effect::next_two_words(CycleCostKind::Load))
}

pub fn sts(machine: &mut Machine, ops: &Operands) -> Result<Effect, Fault> {
    let addr = machine.fetch_operand_word()?;
    machine.write_data(addr, machine.data.reg(ops.d))?;
    Ok(Effect::next_two_words(CycleCostKind::Store))
}

/// `LPM` and, with `extended`, `ELPM` through `RAMPZ:Z`.
pub fn lpm(
    machine: &mut Machine,
    ops: &Operands,
    form: ProgramLoad,
    extended: bool,
) -> Result<Effect, Fault> {
    let z = u32::from(machine.data.pointer(Pointer::Z));
    let addr = if extended {
        (u32::from(machine.data.raw(RAMPZ)) << 16) | z
    } else {
        z
    };
    let value = machine.read_program_byte(addr)?;
    let target = if form == ProgramLoad::Implied { 0 } else { ops.d };
    machine.data.set_reg(target, value);
    if form == ProgramLoad::PostIncrement {
        let next = addr.wrapping_add(1);
        machine.data.set_pointer(Pointer::Z, next as u16);
        if extended {
            machine.data.set_raw(RAMPZ, (next >> 16) as u8);
        }
    }
    Ok(Effect::next(CycleCostKind::ProgramLoad))
}

pub fn push(machine: &mut Machine, ops: &Operands) -> Result<Effect, Fault> {
    machine.push_byte(machine.data.reg(ops.d))?;
    Ok(Effect::next(CycleCostKind::Push))
}

pub fn pop(machine: &mut Machine, ops: &Operands) -> Result<Effect, Fault> {
    let value = machine.pop_byte()?;
    machine.data.set_reg(ops.d, value);
    Ok(Effect::next(CycleCostKind::Pop))
}

pub fn input(machine: &mut Machine, ops: &Operands) -> Result<Effect, Fault> {
    let value = machine.read_data(IO_START + u16::from(ops.a))?;
    machine.data.set_reg(ops.d, value);
    Ok(Effect::next(CycleCostKind::IoTransfer))
}

pub fn output(machine: &mut Machine, ops: &Operands) -> Result<Effect, Fault> {
    machine.write_data(IO_START + u16::from(ops.a), machine.data.reg(ops.d))?;
    Ok(Effect::next(CycleCostKind::IoTransfer))
}
