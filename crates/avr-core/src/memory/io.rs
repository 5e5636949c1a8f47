//! Data-space addresses and bit positions of the hooked I/O registers.

#![allow(missing_docs)]

pub const PINB: u16 = 0x23;
pub const DDRB: u16 = 0x24;
pub const PORTB: u16 = 0x25;
pub const PINC: u16 = 0x26;
pub const DDRC: u16 = 0x27;
pub const PORTC: u16 = 0x28;
pub const PIND: u16 = 0x29;
pub const DDRD: u16 = 0x2A;
pub const PORTD: u16 = 0x2B;
pub const PINE: u16 = 0x2C;
pub const DDRE: u16 = 0x2D;
pub const PORTE: u16 = 0x2E;
pub const PINF: u16 = 0x2F;
pub const DDRF: u16 = 0x30;
pub const PORTF: u16 = 0x31;

pub const TIFR0: u16 = 0x35;
pub const TIFR3: u16 = 0x38;
pub const TIFR4: u16 = 0x39;

pub const EECR: u16 = 0x3F;
pub const EEDR: u16 = 0x40;
pub const EEARL: u16 = 0x41;
pub const EEARH: u16 = 0x42;

pub const TCCR0A: u16 = 0x44;
pub const TCCR0B: u16 = 0x45;
pub const TCNT0: u16 = 0x46;

pub const PLLCSR: u16 = 0x49;

pub const SPCR: u16 = 0x4C;
pub const SPSR: u16 = 0x4D;
pub const SPDR: u16 = 0x4E;

pub const SMCR: u16 = 0x53;
pub const RAMPZ: u16 = 0x5B;
pub const SPL: u16 = 0x5D;
pub const SPH: u16 = 0x5E;
pub const SREG: u16 = 0x5F;

pub const TIMSK0: u16 = 0x6E;
pub const TIMSK3: u16 = 0x71;
pub const TIMSK4: u16 = 0x72;

pub const ADCL: u16 = 0x78;
pub const ADCH: u16 = 0x79;
pub const ADCSRA: u16 = 0x7A;

pub const TCCR3A: u16 = 0x90;
pub const TCCR3B: u16 = 0x91;
pub const TCNT3L: u16 = 0x94;
pub const TCNT3H: u16 = 0x95;
pub const OCR3AL: u16 = 0x98;
pub const OCR3AH: u16 = 0x99;

pub const TCNT4: u16 = 0xBE;
pub const TC4H: u16 = 0xBF;
pub const TCCR4A: u16 = 0xC0;
pub const TCCR4B: u16 = 0xC1;
pub const OCR4A: u16 = 0xCF;
pub const OCR4C: u16 = 0xD1;

// TIFR0 / TIMSK0
pub const TOV0: u8 = 1 << 0;
// TIFR3 / TIMSK3
pub const TOV3: u8 = 1 << 0;
pub const OCF3A: u8 = 1 << 1;
// TIFR4 / TIMSK4
pub const TOV4: u8 = 1 << 2;
pub const OCF4A: u8 = 1 << 6;

// TCCR3B
pub const WGM32: u8 = 1 << 3;
// TCCR4A
pub const PWM4A: u8 = 1 << 1;
pub const COM4A_SHIFT: u8 = 6;

// EECR
pub const EERE: u8 = 1 << 0;
pub const EEPE: u8 = 1 << 1;
pub const EEMPE: u8 = 1 << 2;
pub const EEPM_SHIFT: u8 = 4;

// PLLCSR
pub const PLOCK: u8 = 1 << 0;
pub const PLLE: u8 = 1 << 1;

// SPSR
pub const SPIF: u8 = 1 << 7;

// SMCR
pub const SE: u8 = 1 << 0;
pub const SM_MASK: u8 = 0b0000_1110;

// ADCSRA
pub const ADPS_MASK: u8 = 0b0000_0111;
pub const ADIE: u8 = 1 << 3;
pub const ADIF: u8 = 1 << 4;
pub const ADSC: u8 = 1 << 6;
pub const ADEN: u8 = 1 << 7;

/// Power-on value of `SP` (`RAMEND`).
pub const SP_RESET: u16 = crate::SRAM_END;
