//! Instruction decoder for the AVR instruction set.
//!
//! Decoding selects the unique table row for a word and extracts its operand
//! fields. Second program words (`LDS`, `STS`, `JMP`, `CALL`) are fetched by
//! the executor, not here.

use crate::encoding::{self, OpcodeKind, OperandFormat};
use crate::FaultCode;

/// Operand fields extracted from an opcode word.
///
/// Fields a format does not use are left at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Operands {
    /// Destination (or only) register number.
    pub d: u8,
    /// Source register number.
    pub r: u8,
    /// 6- or 8-bit immediate.
    pub k: u8,
    /// `LDD`/`STD` displacement.
    pub q: u8,
    /// I/O address for `IN`/`OUT`/`SBI`/`CBI`/`SBIC`/`SBIS`.
    pub a: u8,
    /// Bit number (register bit or `SREG` bit).
    pub b: u8,
    /// Signed word offset for relative jumps and branches.
    pub offset: i16,
    /// High bits 21..16 of a `JMP`/`CALL` target.
    pub address_high: u8,
}

/// A decoded instruction ready for dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstruction {
    /// Raw opcode word.
    pub word: u16,
    /// Index of the matching row in [`encoding::OPCODE_TABLE`].
    pub index: u8,
    /// Behavior selected by the row.
    pub kind: OpcodeKind,
    /// Extracted operand fields.
    pub operands: Operands,
    /// Mnemonic of the matching row.
    pub name: &'static str,
}

/// Stateless decoder over the static instruction table.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder;

impl Decoder {
    /// Decodes one opcode word.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::UnhandledOpcode`] when no table row matches.
    pub fn decode(word: u16) -> Result<DecodedInstruction, FaultCode> {
        let (index, row) = encoding::lookup(word).ok_or(FaultCode::UnhandledOpcode)?;
        Ok(DecodedInstruction {
            word,
            index: u8::try_from(index).map_err(|_| FaultCode::UnhandledOpcode)?,
            kind: row.kind,
            operands: extract_operands(word, row.operands),
            name: row.name,
        })
    }

    /// Returns `true` when `word` is followed by an operand word.
    #[must_use]
    pub const fn is_two_word(word: u16) -> bool {
        encoding::is_two_word(word)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
const fn extract_operands(word: u16, format: OperandFormat) -> Operands {
    let mut ops = Operands {
        d: 0,
        r: 0,
        k: 0,
        q: 0,
        a: 0,
        b: 0,
        offset: 0,
        address_high: 0,
    };
    let rd5 = ((word >> 4) & 0x1F) as u8;
    match format {
        OperandFormat::None => {}
        OperandFormat::Rd5Rr5 => {
            ops.d = rd5;
            ops.r = (((word >> 5) & 0x10) | (word & 0x0F)) as u8;
        }
        OperandFormat::Rd5 => ops.d = rd5,
        OperandFormat::Rd4K8 => {
            ops.d = 16 + ((word >> 4) & 0x0F) as u8;
            ops.k = (((word >> 4) & 0xF0) | (word & 0x0F)) as u8;
        }
        OperandFormat::RdPairRrPair => {
            ops.d = (((word >> 4) & 0x0F) * 2) as u8;
            ops.r = ((word & 0x0F) * 2) as u8;
        }
        OperandFormat::Rd4Rr4 => {
            ops.d = 16 + ((word >> 4) & 0x0F) as u8;
            ops.r = 16 + (word & 0x0F) as u8;
        }
        OperandFormat::Rd3Rr3 => {
            ops.d = 16 + ((word >> 4) & 0x07) as u8;
            ops.r = 16 + (word & 0x07) as u8;
        }
        OperandFormat::Rd5Q6 => {
            ops.d = rd5;
            ops.q = (((word >> 8) & 0x20) | ((word >> 7) & 0x18) | (word & 0x07)) as u8;
        }
        OperandFormat::Rd5Address16 => ops.d = rd5,
        OperandFormat::Address22 => {
            ops.address_high = (((word >> 3) & 0x3E) | (word & 0x01)) as u8;
        }
        OperandFormat::Relative12 => {
            // Sign-extend the 12-bit field.
            ops.offset = ((word << 4) as i16) >> 4;
        }
        OperandFormat::Relative7Bit => {
            ops.offset = ((word << 6) as i16) >> 9;
            ops.b = (word & 0x07) as u8;
        }
        OperandFormat::SregBit => ops.b = ((word >> 4) & 0x07) as u8,
        OperandFormat::RdPairK6 => {
            ops.d = 24 + (((word >> 4) & 0x03) * 2) as u8;
            ops.k = (((word >> 2) & 0x30) | (word & 0x0F)) as u8;
        }
        OperandFormat::IoBit => {
            ops.a = ((word >> 3) & 0x1F) as u8;
            ops.b = (word & 0x07) as u8;
        }
        OperandFormat::Rd5Io6 => {
            ops.d = rd5;
            ops.a = (((word >> 5) & 0x30) | (word & 0x0F)) as u8;
        }
        OperandFormat::Rd5Bit => {
            ops.d = rd5;
            ops.b = (word & 0x07) as u8;
        }
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::Decoder;
    use crate::encoding::{OpcodeKind, Pointer, PointerMode, ProgramLoad};
    use crate::FaultCode;

    #[test]
    fn decodes_add_register_fields() {
        // ADD R16, R17
        let decoded = Decoder::decode(0x0F01).unwrap();
        assert_eq!(decoded.kind, OpcodeKind::Add);
        assert_eq!(decoded.operands.d, 16);
        assert_eq!(decoded.operands.r, 17);
        assert_eq!(decoded.name, "ADD");
    }

    #[test]
    fn decodes_ldi_immediate() {
        // LDI R16, 0xA5
        let decoded = Decoder::decode(0xEA05).unwrap();
        assert_eq!(decoded.kind, OpcodeKind::Ldi);
        assert_eq!(decoded.operands.d, 16);
        assert_eq!(decoded.operands.k, 0xA5);
    }

    #[test]
    fn decodes_relative_offsets_with_sign() {
        // RJMP .-2 (loop on itself)
        assert_eq!(Decoder::decode(0xCFFF).unwrap().operands.offset, -1);
        assert_eq!(Decoder::decode(0xC7FF).unwrap().operands.offset, 2047);
        assert_eq!(Decoder::decode(0xC800).unwrap().operands.offset, -2048);
        // BRNE .-4 => BRBC 1, -2
        let decoded = Decoder::decode(0xF7F1).unwrap();
        assert_eq!(decoded.kind, OpcodeKind::Brbc);
        assert_eq!(decoded.operands.offset, -2);
        assert_eq!(decoded.operands.b, 1);
        // BREQ .+126 => BRBS 1, 63
        assert_eq!(Decoder::decode(0xF1F9).unwrap().operands.offset, 63);
    }

    #[test]
    fn decodes_displacement_and_pointer_forms() {
        // LDD R24, Y+63
        let decoded = Decoder::decode(0xAD8F).unwrap();
        assert_eq!(decoded.kind, OpcodeKind::Ldd(Pointer::Y));
        assert_eq!(decoded.operands.d, 24);
        assert_eq!(decoded.operands.q, 63);
        // ST -X, R5
        let decoded = Decoder::decode(0x925E).unwrap();
        assert_eq!(
            decoded.kind,
            OpcodeKind::St(Pointer::X, PointerMode::PreDecrement)
        );
        assert_eq!(decoded.operands.d, 5);
        // LPM R0, Z (implied)
        assert_eq!(
            Decoder::decode(0x95C8).unwrap().kind,
            OpcodeKind::Lpm(ProgramLoad::Implied)
        );
    }

    #[test]
    fn decodes_io_and_word_immediates() {
        // OUT 0x3F, R0  (SREG)
        let decoded = Decoder::decode(0xBE0F).unwrap();
        assert_eq!(decoded.kind, OpcodeKind::Out);
        assert_eq!(decoded.operands.a, 0x3F);
        assert_eq!(decoded.operands.d, 0);
        // SBI 0x05, 7
        let decoded = Decoder::decode(0x9A2F).unwrap();
        assert_eq!(decoded.kind, OpcodeKind::Sbi);
        assert_eq!(decoded.operands.a, 0x05);
        assert_eq!(decoded.operands.b, 7);
        // ADIW R30, 63
        let decoded = Decoder::decode(0x96FF).unwrap();
        assert_eq!(decoded.operands.d, 30);
        assert_eq!(decoded.operands.k, 63);
    }

    #[test]
    fn decodes_multiply_register_ranges() {
        // MOVW R30, R24
        let decoded = Decoder::decode(0x01FC).unwrap();
        assert_eq!((decoded.operands.d, decoded.operands.r), (30, 24));
        // MULS R31, R16
        let decoded = Decoder::decode(0x02F0).unwrap();
        assert_eq!((decoded.operands.d, decoded.operands.r), (31, 16));
        // FMULSU R23, R23
        let decoded = Decoder::decode(0x03FF).unwrap();
        assert_eq!(decoded.kind, OpcodeKind::Fmulsu);
        assert_eq!((decoded.operands.d, decoded.operands.r), (23, 23));
    }

    #[test]
    fn decodes_call_high_address_bits() {
        let decoded = Decoder::decode(0x95FF).unwrap();
        assert_eq!(decoded.kind, OpcodeKind::Call);
        assert_eq!(decoded.operands.address_high, 0x3F);
        assert!(Decoder::is_two_word(0x95FF));
    }

    #[test]
    fn named_flag_rows_carry_their_sreg_bit() {
        let sei = Decoder::decode(0x9478).unwrap();
        assert_eq!((sei.kind, sei.operands.b, sei.name), (OpcodeKind::Bset, 7, "SEI"));
        let clc = Decoder::decode(0x9488).unwrap();
        assert_eq!((clc.kind, clc.operands.b, clc.name), (OpcodeKind::Bclr, 0, "CLC"));
    }

    #[test]
    fn reserved_words_are_unhandled() {
        // 0x95F8 is `SPM Z+`, which only XMEGA cores implement.
        for word in [0x0001, 0x00FF, 0x9003, 0x9204, 0x9404, 0x95F8, 0xFFF8] {
            assert_eq!(Decoder::decode(word), Err(FaultCode::UnhandledOpcode));
        }
    }
}
