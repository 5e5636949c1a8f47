//! `SREG` update rules shared by the arithmetic and logic handlers.

use crate::StatusFlags;

const fn bit(value: u8, n: u8) -> bool {
    value & (1 << n) != 0
}

/// `ADD`/`ADC` flags for `rd + rr (+ carry) = r`.
pub const fn add(flags: &mut StatusFlags, rd: u8, rr: u8, r: u8) {
    let (rd3, rr3, r3) = (bit(rd, 3), bit(rr, 3), bit(r, 3));
    let (rd7, rr7, r7) = (bit(rd, 7), bit(rr, 7), bit(r, 7));
    flags.h = (rd3 && rr3) || (rr3 && !r3) || (!r3 && rd3);
    flags.v = (rd7 && rr7 && !r7) || (!rd7 && !rr7 && r7);
    flags.c = (rd7 && rr7) || (rr7 && !r7) || (!r7 && rd7);
    flags.n = r7;
    flags.z = r == 0;
    flags.s = flags.n ^ flags.v;
}

/// `SUB`-family flags for `rd - rr (- carry) = r`.
///
/// With `chain_z` set (`SBC`, `SBCI`, `CPC`) a zero result keeps the previous
/// `Z` instead of setting it, so multi-byte compares end with `Z` only when
/// every byte was equal.
pub const fn sub(flags: &mut StatusFlags, rd: u8, rr: u8, r: u8, chain_z: bool) {
    let (rd3, rr3, r3) = (bit(rd, 3), bit(rr, 3), bit(r, 3));
    let (rd7, rr7, r7) = (bit(rd, 7), bit(rr, 7), bit(r, 7));
    flags.h = (!rd3 && rr3) || (rr3 && r3) || (r3 && !rd3);
    flags.v = (rd7 && !rr7 && !r7) || (!rd7 && rr7 && r7);
    flags.c = (!rd7 && rr7) || (rr7 && r7) || (r7 && !rd7);
    flags.n = r7;
    flags.z = if chain_z { r == 0 && flags.z } else { r == 0 };
    flags.s = flags.n ^ flags.v;
}

/// `AND`/`OR`/`EOR` flags: `V` cleared, `C` and `H` untouched.
pub const fn logic(flags: &mut StatusFlags, r: u8) {
    flags.v = false;
    flags.n = bit(r, 7);
    flags.z = r == 0;
    flags.s = flags.n;
}

/// `LSR`/`ASR`/`ROR` flags, where `carry_out` is the bit shifted out.
pub const fn shift(flags: &mut StatusFlags, r: u8, carry_out: bool) {
    flags.c = carry_out;
    flags.n = bit(r, 7);
    flags.z = r == 0;
    flags.v = flags.n ^ flags.c;
    flags.s = flags.n ^ flags.v;
}

/// `ADIW` flags for `rd + k = r` on 16-bit values.
pub const fn add_word(flags: &mut StatusFlags, rd: u16, r: u16) {
    let rdh7 = rd & 0x8000 != 0;
    let r15 = r & 0x8000 != 0;
    flags.v = !rdh7 && r15;
    flags.c = !r15 && rdh7;
    flags.n = r15;
    flags.z = r == 0;
    flags.s = flags.n ^ flags.v;
}

/// `SBIW` flags for `rd - k = r` on 16-bit values.
pub const fn sub_word(flags: &mut StatusFlags, rd: u16, r: u16) {
    let rdh7 = rd & 0x8000 != 0;
    let r15 = r & 0x8000 != 0;
    flags.v = rdh7 && !r15;
    flags.c = r15 && !rdh7;
    flags.n = r15;
    flags.z = r == 0;
    flags.s = flags.n ^ flags.v;
}

/// Multiply-family flags: `C` is bit 15 of the raw product, `Z` reflects
/// the stored (possibly shifted) result.
pub const fn multiply(flags: &mut StatusFlags, product: u16, stored: u16) {
    flags.c = product & 0x8000 != 0;
    flags.z = stored == 0;
}
