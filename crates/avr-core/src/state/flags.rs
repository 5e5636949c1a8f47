/// `SREG` bit for carry.
pub const SREG_C: u8 = 1 << 0;
/// `SREG` bit for zero.
pub const SREG_Z: u8 = 1 << 1;
/// `SREG` bit for negative.
pub const SREG_N: u8 = 1 << 2;
/// `SREG` bit for two's complement overflow.
pub const SREG_V: u8 = 1 << 3;
/// `SREG` bit for sign (`N ^ V`).
pub const SREG_S: u8 = 1 << 4;
/// `SREG` bit for half carry.
pub const SREG_H: u8 = 1 << 5;
/// `SREG` bit for the bit-copy storage flag.
pub const SREG_T: u8 = 1 << 6;
/// `SREG` bit for the global interrupt enable.
pub const SREG_I: u8 = 1 << 7;

/// Decomposed status register.
///
/// This is the canonical copy of `SREG`; the byte in the data space is a
/// projection rebuilt from it whenever `SREG` is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(clippy::struct_excessive_bools)]
pub struct StatusFlags {
    /// Carry.
    pub c: bool,
    /// Zero.
    pub z: bool,
    /// Negative.
    pub n: bool,
    /// Overflow.
    pub v: bool,
    /// Sign.
    pub s: bool,
    /// Half carry.
    pub h: bool,
    /// Bit-copy storage.
    pub t: bool,
    /// Global interrupt enable.
    pub i: bool,
}

impl StatusFlags {
    /// Packs the flags into an `SREG` byte.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        (self.c as u8)
            | (self.z as u8) << 1
            | (self.n as u8) << 2
            | (self.v as u8) << 3
            | (self.s as u8) << 4
            | (self.h as u8) << 5
            | (self.t as u8) << 6
            | (self.i as u8) << 7
    }

    /// Unpacks an `SREG` byte.
    #[must_use]
    pub const fn from_byte(value: u8) -> Self {
        Self {
            c: value & SREG_C != 0,
            z: value & SREG_Z != 0,
            n: value & SREG_N != 0,
            v: value & SREG_V != 0,
            s: value & SREG_S != 0,
            h: value & SREG_H != 0,
            t: value & SREG_T != 0,
            i: value & SREG_I != 0,
        }
    }

    /// Reads flag `bit` (0 = C … 7 = I), as `BRBS`/`BRBC` do.
    #[must_use]
    pub const fn bit(self, bit: u8) -> bool {
        self.to_byte() & (1 << (bit & 7)) != 0
    }

    /// Writes flag `bit` (0 = C … 7 = I), as `BSET`/`BCLR` do.
    pub const fn set_bit(&mut self, bit: u8, value: bool) {
        let mask = 1 << (bit & 7);
        let byte = if value {
            self.to_byte() | mask
        } else {
            self.to_byte() & !mask
        };
        *self = Self::from_byte(byte);
    }
}
