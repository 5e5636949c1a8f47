//! Memory-mapped peripheral hooks: refresh-before-read and react-after-write.

/// ADC conversion timing and PLL lock.
pub mod analog;
/// EEPROM programming through `EECR`.
pub mod eeprom;
/// GPIO port registers.
pub mod ports;
/// SPI data register.
pub mod spi;
/// Lazy timer0/timer3/timer4 model.
pub mod timers;

pub use timers::{Counter, Timer4HighBytes, PRESCALER_TABLE};

use crate::api::Port;
use crate::memory::io::{
    ADCH, ADCL, ADCSRA, ADIE, ADIF, EECR, OCF3A, OCF4A, OCR3AH, OCR3AL, OCR4A, OCR4C, PLLCSR,
    SPDR, SPH, SPL, SREG, TC4H, TCCR0A, TCCR0B, TCCR3A, TCCR3B, TCCR4A, TCCR4B, TCNT0, TCNT3H,
    TCNT3L, TCNT4, TIFR0, TIFR3, TIFR4, TIMSK0, TIMSK3, TIMSK4, TOV0, TOV3, TOV4,
};
use crate::{DataSpace, FaultCode, StatusFlags};

/// `TIMER0_OVF` vector number.
pub const TIMER0_OVF_VECTOR: u8 = 23;
/// `ADC` conversion-complete vector number.
pub const ADC_VECTOR: u8 = 29;
/// `TIMER3_COMPA` vector number.
pub const TIMER3_COMPA_VECTOR: u8 = 32;
/// `TIMER3_OVF` vector number.
pub const TIMER3_OVF_VECTOR: u8 = 35;
/// `TIMER4_COMPA` vector number.
pub const TIMER4_COMPA_VECTOR: u8 = 38;
/// `TIMER4_OVF` vector number.
pub const TIMER4_OVF_VECTOR: u8 = 41;

/// A peripheral interrupt source: a flag bit gated by an enable bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InterruptSource {
    /// Vector taken when the source fires.
    pub vector: u8,
    /// Register holding the flag.
    pub flag_register: u16,
    /// Flag bit mask.
    pub flag_bit: u8,
    /// Register holding the enable bit.
    pub enable_register: u16,
    /// Enable bit mask.
    pub enable_bit: u8,
}

const fn source(vector: u8, flag: (u16, u8), enable: (u16, u8)) -> InterruptSource {
    InterruptSource {
        vector,
        flag_register: flag.0,
        flag_bit: flag.1,
        enable_register: enable.0,
        enable_bit: enable.1,
    }
}

/// Hardware interrupt sources modeled by the core, in vector order.
pub const INTERRUPT_SOURCES: [InterruptSource; 6] = [
    source(TIMER0_OVF_VECTOR, (TIFR0, TOV0), (TIMSK0, TOV0)),
    source(ADC_VECTOR, (ADCSRA, ADIF), (ADCSRA, ADIE)),
    source(TIMER3_COMPA_VECTOR, (TIFR3, OCF3A), (TIMSK3, OCF3A)),
    source(TIMER3_OVF_VECTOR, (TIFR3, TOV3), (TIMSK3, TOV3)),
    source(TIMER4_COMPA_VECTOR, (TIFR4, OCF4A), (TIMSK4, OCF4A)),
    source(TIMER4_OVF_VECTOR, (TIFR4, TOV4), (TIMSK4, TOV4)),
];

/// Registers whose stored byte depends on time or on state kept elsewhere.
pub const HOOKED_REGISTERS: &[u16] = &[
    0x23, 0x26, 0x29, 0x2C, 0x2F, TIFR0, TIFR3, TIFR4, EECR, TCNT0, PLLCSR, SREG, ADCL, ADCH,
    ADCSRA, TCNT3L, TCNT3H, TCNT4,
];

/// Writes to these registers can move the next timer or ADC event.
const fn is_clocked(addr: u16) -> bool {
    matches!(
        addr,
        TIFR0
            | TIFR3
            | TIFR4
            | TCCR0A
            | TCCR0B
            | TCNT0
            | TIMSK0
            | TIMSK3
            | TIMSK4
            | ADCSRA
            | TCCR3A
            | TCCR3B
            | TCNT3L
            | TCNT3H
            | OCR3AL
            | OCR3AH
            | TCNT4
            | TCCR4A
            | TCCR4B
            | OCR4A
            | OCR4C
    )
}

/// Brings a hooked register's stored byte up to date at `now`.
pub fn refresh(space: &mut DataSpace, addr: u16, now: u64) {
    match addr {
        EECR => eeprom::refresh(space, now),
        PLLCSR => analog::refresh_pll(space, now),
        TCNT0 | TIFR0 => timers::catch_up_timer0(space, now),
        TCNT3L | TCNT3H | TIFR3 => timers::catch_up_timer3(space, now),
        TCNT4 | TIFR4 => timers::catch_up_timer4(space, now),
        SREG => space.set_raw(SREG, space.flags.to_byte()),
        ADCSRA | ADCL | ADCH => analog::refresh_adc(space, now),
        _ => {
            if let Some(port) = Port::from_pin_address(addr) {
                ports::refresh_pin(space, port);
            }
        }
    }
}

/// Reads an I/O register.
pub fn read_io(space: &mut DataSpace, addr: u16, now: u64) -> u8 {
    refresh(space, addr, now);
    let value = space.raw(addr);
    match addr {
        TCNT4 => space.set_raw(TC4H, space.timer4_high.tcnt),
        SPDR => spi::after_spdr_read(space),
        _ => {}
    }
    value
}

/// Writes an I/O register and runs its reaction.
///
/// # Errors
///
/// Propagates [`FaultCode::EepromAddressOutOfRange`] from `EECR` operations.
pub fn write_io(space: &mut DataSpace, addr: u16, value: u8, now: u64) -> Result<(), FaultCode> {
    if is_clocked(addr) {
        catch_up(space, now);
        space.horizon_stale = true;
    }
    match addr {
        SREG => write_sreg(space, value, now),
        TIFR0 | TIFR3 | TIFR4 => {
            let old = space.raw(addr);
            space.set_raw(addr, old & !value);
        }
        TCNT0 => {
            let old = space.raw(TCNT0);
            space.set_raw(TCNT0, value);
            if value < old {
                space.set_raw_bits(TIFR0, TOV0);
            }
        }
        TCNT4 | OCR4A | OCR4C => {
            space.set_raw(addr, value);
            timers::latch_timer4_high(space, addr);
        }
        EECR => eeprom::write_eecr(space, value, now)?,
        PLLCSR => analog::write_pllcsr(space, value, now),
        ADCSRA => analog::write_adcsra(space, value, now),
        SPDR => spi::write_spdr(space, value),
        SPL | SPH => {
            space.set_raw(addr, value);
            space.notify_stack_pointer_write();
        }
        _ => {
            if let Some(port) = Port::from_port_address(addr) {
                ports::write_port(space, port, value);
            } else if let Some(port) = Port::from_pin_address(addr) {
                ports::toggle_port(space, port, value);
            } else {
                space.set_raw(addr, value);
            }
        }
    }
    Ok(())
}

fn write_sreg(space: &mut DataSpace, value: u8, now: u64) {
    let was_enabled = space.flags.i;
    space.flags = StatusFlags::from_byte(value);
    space.set_raw(SREG, value);
    if !was_enabled && space.flags.i {
        catch_up(space, now);
        if pending_sources(space) != 0 {
            space.horizon_stale = true;
        }
    }
}

/// Brings every timer and the ADC up to `now`.
pub fn catch_up(space: &mut DataSpace, now: u64) {
    timers::catch_up_timers(space, now);
    analog::refresh_adc(space, now);
}

/// Refreshes every hooked register.
pub fn sync_all(space: &mut DataSpace, now: u64) {
    catch_up(space, now);
    for &addr in HOOKED_REGISTERS {
        refresh(space, addr, now);
    }
}

/// Cycles until the next armed interrupt source fires (`u64::MAX` if none).
pub fn cycles_to_next_event(space: &mut DataSpace, now: u64) -> u64 {
    catch_up(space, now);
    timers::cycles_to_next_timer_event(space, now).min(analog::cycles_to_adc_event(space, now))
}

/// Bitmask of vectors whose flag and enable bits are both set.
#[must_use]
pub fn pending_sources(space: &DataSpace) -> u64 {
    INTERRUPT_SOURCES
        .iter()
        .filter(|source| {
            space.raw(source.flag_register) & source.flag_bit != 0
                && space.raw(source.enable_register) & source.enable_bit != 0
        })
        .fold(0, |mask, source| mask | (1 << source.vector))
}

/// Clears the hardware flag of the source behind `vector`, as interrupt
/// entry does.
pub fn acknowledge(space: &mut DataSpace, vector: u8) {
    if let Some(source) = INTERRUPT_SOURCES.iter().find(|source| source.vector == vector) {
        space.clear_raw_bits(source.flag_register, source.flag_bit);
    }
}
