//! Bit and flag instructions: SREG set/clear, T-flag transfer, I/O bit
//! set/clear and skip-if-bit.

use super::{control, Effect};
use crate::api::Port;
use crate::decoder::Operands;
use crate::memory::io::{TIFR0, TIFR3, TIFR4};
use crate::timing::CycleCostKind;
use crate::{Fault, Machine, IO_START};

const I_BIT: u8 = 7;

/// `BSET`/`BCLR` (`SEC` … `CLI`). Setting `I` ends the batch so a pending
/// interrupt is taken right after the instruction.
pub fn bset(machine: &mut Machine, ops: &Operands, value: bool) -> Effect {
    machine.data.flags.set_bit(ops.b, value);
    if value && ops.b == I_BIT {
        machine.cpu.break_out = true;
    }
    Effect::next(CycleCostKind::Alu)
}

pub fn bst(machine: &mut Machine, ops: &Operands) -> Effect {
    machine.data.flags.t = machine.data.reg(ops.d) & (1 << ops.b) != 0;
    Effect::next(CycleCostKind::Move)
}

pub fn bld(machine: &mut Machine, ops: &Operands) -> Effect {
    let mask = 1 << ops.b;
    let value = machine.data.reg(ops.d);
    let value = if machine.data.flags.t { value | mask } else { value & !mask };
    machine.data.set_reg(ops.d, value);
    Effect::next(CycleCostKind::Move)
}

/// Registers where a written one acts on that bit alone (toggle or
/// clear-flag). `SBI`/`CBI` write only the addressed bit to these.
fn single_bit_target(addr: u16) -> bool {
    matches!(addr, TIFR0 | TIFR3 | TIFR4) || Port::from_pin_address(addr).is_some()
}

/// `SBI` when `set`, `CBI` otherwise.
pub fn sbi(machine: &mut Machine, ops: &Operands, set: bool) -> Result<Effect, Fault> {
    let addr = IO_START + u16::from(ops.a);
    let mask = 1 << ops.b;
    let value = if single_bit_target(addr) {
        if set { mask } else { 0 }
    } else {
        let old = machine.read_data(addr)?;
        if set { old | mask } else { old & !mask }
    };
    machine.write_data(addr, value)?;
    Ok(Effect::next(CycleCostKind::IoBit))
}

/// `SBRS` when `when_set`, `SBRC` otherwise.
pub fn sbrs(machine: &Machine, ops: &Operands, when_set: bool) -> Effect {
    let set = machine.data.reg(ops.d) & (1 << ops.b) != 0;
    control::skip_if(machine, set == when_set)
}

/// `SBIS` when `when_set`, `SBIC` otherwise.
pub fn sbis(machine: &mut Machine, ops: &Operands, when_set: bool) -> Result<Effect, Fault> {
    let value = machine.read_data(IO_START + u16::from(ops.a))?;
    let set = value & (1 << ops.b) != 0;
    Ok(control::skip_if(machine, set == when_set))
}
