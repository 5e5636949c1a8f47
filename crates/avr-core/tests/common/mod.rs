//! Shared helpers for the integration suites: a tiny assembler for the
//! handful of instructions the test programs use.

#![allow(dead_code)]

use avr_core::Machine;

/// Builds a machine with `words` loaded at word address 0.
pub fn machine_with(words: &[u16]) -> Machine {
    let mut machine = Machine::default();
    machine.load_flash(&image(words));
    machine
}

/// Little-endian flash image of `words`.
pub fn image(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|word| word.to_le_bytes()).collect()
}

/// Places `words` at word address `at` in a zero-filled (NOP) program.
pub fn place(program: &mut Vec<u16>, at: usize, words: &[u16]) {
    if program.len() < at + words.len() {
        program.resize(at + words.len(), 0);
    }
    program[at..at + words.len()].copy_from_slice(words);
}

const fn two_registers(base: u16, d: u8, r: u8) -> u16 {
    let (d, r) = (d as u16, r as u16);
    base | ((r & 0x10) << 5) | (d << 4) | (r & 0x0F)
}

pub const fn add(d: u8, r: u8) -> u16 {
    two_registers(0x0C00, d, r)
}

pub const fn sub(d: u8, r: u8) -> u16 {
    two_registers(0x1800, d, r)
}

pub const fn cp(d: u8, r: u8) -> u16 {
    two_registers(0x1400, d, r)
}

pub const fn cpc(d: u8, r: u8) -> u16 {
    two_registers(0x0400, d, r)
}

pub const fn ldi(d: u8, k: u8) -> u16 {
    let (d, k) = (d as u16, k as u16);
    0xE000 | ((k & 0xF0) << 4) | ((d - 16) << 4) | (k & 0x0F)
}

/// `OUT` to a data-space address in the I/O window.
pub const fn out(addr: u16, r: u8) -> u16 {
    let a = addr - 0x20;
    0xB800 | ((a & 0x30) << 5) | ((r as u16) << 4) | (a & 0x0F)
}

/// `IN` from a data-space address in the I/O window.
pub const fn input(d: u8, addr: u16) -> u16 {
    let a = addr - 0x20;
    0xB000 | ((a & 0x30) << 5) | ((d as u16) << 4) | (a & 0x0F)
}

pub const fn sts(addr: u16, r: u8) -> [u16; 2] {
    [0x9200 | ((r as u16) << 4), addr]
}

pub const fn lds(d: u8, addr: u16) -> [u16; 2] {
    [0x9000 | ((d as u16) << 4), addr]
}

pub const fn push(r: u8) -> u16 {
    0x920F | ((r as u16) << 4)
}

pub const fn pop(d: u8) -> u16 {
    0x900F | ((d as u16) << 4)
}

pub const fn inc(d: u8) -> u16 {
    0x9403 | ((d as u16) << 4)
}

pub const fn dec(d: u8) -> u16 {
    0x940A | ((d as u16) << 4)
}

/// `BRNE` with a signed word `offset` relative to the next instruction.
pub const fn brne(offset: i8) -> u16 {
    0xF401 | (((offset as u16) & 0x7F) << 3)
}

/// `RJMP` from word address `from` to `to`.
pub const fn rjmp(from: u16, to: u16) -> u16 {
    0xC000 | (to.wrapping_sub(from).wrapping_sub(1) & 0x0FFF)
}

/// `RCALL` from word address `from` to `to`.
pub const fn rcall(from: u16, to: u16) -> u16 {
    0xD000 | (to.wrapping_sub(from).wrapping_sub(1) & 0x0FFF)
}

pub const RET: u16 = 0x9508;
pub const RETI: u16 = 0x9518;
pub const SEI: u16 = 0x9478;
pub const SLEEP: u16 = 0x9588;
pub const NOP: u16 = 0x0000;
