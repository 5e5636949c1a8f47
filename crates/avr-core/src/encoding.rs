/// Pointer register used by indirect loads and stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Pointer {
    X,
    Y,
    Z,
}

impl Pointer {
    /// Data-space address of the pointer's low byte (`R26`, `R28`, `R30`).
    #[must_use]
    pub const fn low_register(self) -> u8 {
        match self {
            Self::X => 26,
            Self::Y => 28,
            Self::Z => 30,
        }
    }
}

/// Pointer adjustment applied by an indirect access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerMode {
    /// Pointer is left unchanged.
    Plain,
    /// Pointer is incremented after the access.
    PostIncrement,
    /// Pointer is decremented before the access.
    PreDecrement,
}

/// Destination and pointer behavior of `LPM`/`ELPM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramLoad {
    /// Implied `R0` destination, `Z` unchanged.
    Implied,
    /// Explicit `Rd` destination, `Z` unchanged.
    Register,
    /// Explicit `Rd` destination, `Z` post-incremented.
    PostIncrement,
}

/// Closed set of instruction behaviors dispatched by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum OpcodeKind {
    Nop,
    Movw,
    Muls,
    Mulsu,
    Fmul,
    Fmuls,
    Fmulsu,
    Cpc,
    Sbc,
    Add,
    Cpse,
    Cp,
    Sub,
    Adc,
    And,
    Eor,
    Or,
    Mov,
    Cpi,
    Sbci,
    Subi,
    Ori,
    Andi,
    Ldd(Pointer),
    Std(Pointer),
    Lds,
    Sts,
    Ld(Pointer, PointerMode),
    St(Pointer, PointerMode),
    Lpm(ProgramLoad),
    Elpm(ProgramLoad),
    Push,
    Pop,
    Com,
    Neg,
    Swap,
    Inc,
    Asr,
    Lsr,
    Ror,
    Dec,
    Jmp,
    Call,
    Bset,
    Bclr,
    Ret,
    Reti,
    Sleep,
    Break,
    Wdr,
    Spm,
    Ijmp,
    Eijmp,
    Icall,
    Eicall,
    Adiw,
    Sbiw,
    Cbi,
    Sbic,
    Sbi,
    Sbis,
    Mul,
    In,
    Out,
    Rjmp,
    Rcall,
    Ldi,
    Brbs,
    Brbc,
    Bld,
    Bst,
    Sbrc,
    Sbrs,
}

/// Bit layout of an opcode's operand fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandFormat {
    /// No operands.
    None,
    /// `Rd` in bits 8..4, `Rr` in bits 9 and 3..0.
    Rd5Rr5,
    /// `Rd` in bits 8..4.
    Rd5,
    /// `R16..R31` in bits 7..4, 8-bit immediate in bits 11..8 and 3..0.
    Rd4K8,
    /// Register pairs in bits 7..4 and 3..0 (`MOVW`).
    RdPairRrPair,
    /// `R16..R31` in bits 7..4 and 3..0 (`MULS`).
    Rd4Rr4,
    /// `R16..R23` in bits 6..4 and 2..0 (`MULSU`, `FMUL*`).
    Rd3Rr3,
    /// `Rd` plus a 6-bit displacement split over bits 13, 11..10 and 2..0.
    Rd5Q6,
    /// `Rd` plus a 16-bit data address in the second word.
    Rd5Address16,
    /// 22-bit program address from bits 8..4, 0 and the second word.
    Address22,
    /// Signed 12-bit word offset.
    Relative12,
    /// Signed 7-bit word offset in bits 9..3, `SREG` bit in 2..0.
    Relative7Bit,
    /// `SREG` bit in bits 6..4.
    SregBit,
    /// `R24/R26/R28/R30` in bits 5..4, 6-bit immediate in bits 7..6 and 3..0.
    RdPairK6,
    /// I/O address in bits 7..3, bit number in 2..0.
    IoBit,
    /// `Rd` in bits 8..4, I/O address in bits 10..9 and 3..0.
    Rd5Io6,
    /// `Rd` in bits 8..4, bit number in 2..0.
    Rd5Bit,
}

/// One masked-pattern row of the instruction table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OpcodeEntry {
    /// Bits that must match `pattern`.
    pub mask: u16,
    /// Fixed opcode bits.
    pub pattern: u16,
    /// Behavior dispatched by the executor.
    pub kind: OpcodeKind,
    /// Operand field layout.
    pub operands: OperandFormat,
    /// Mnemonic for hosts and diagnostics.
    pub name: &'static str,
}

impl OpcodeEntry {
    /// Returns `true` when `word` selects this entry.
    #[must_use]
    pub const fn matches(&self, word: u16) -> bool {
        word & self.mask == self.pattern
    }
}

const fn entry(
    mask: u16,
    pattern: u16,
    kind: OpcodeKind,
    operands: OperandFormat,
    name: &'static str,
) -> OpcodeEntry {
    OpcodeEntry {
        mask,
        pattern,
        kind,
        operands,
        name,
    }
}

use OpcodeKind as K;
use OperandFormat as F;
use Pointer::{X, Y, Z};
use PointerMode::{Plain, PostIncrement, PreDecrement};

/// Single source-of-truth instruction table, ordered by opcode value.
///
/// No 16-bit word matches more than one row, so the first hit is the answer.
pub const OPCODE_TABLE: &[OpcodeEntry] = &[
    entry(0xFFFF, 0x0000, K::Nop, F::None, "NOP"),
    entry(0xFF00, 0x0100, K::Movw, F::RdPairRrPair, "MOVW"),
    entry(0xFF00, 0x0200, K::Muls, F::Rd4Rr4, "MULS"),
    entry(0xFF88, 0x0300, K::Mulsu, F::Rd3Rr3, "MULSU"),
    entry(0xFF88, 0x0308, K::Fmul, F::Rd3Rr3, "FMUL"),
    entry(0xFF88, 0x0380, K::Fmuls, F::Rd3Rr3, "FMULS"),
    entry(0xFF88, 0x0388, K::Fmulsu, F::Rd3Rr3, "FMULSU"),
    entry(0xFC00, 0x0400, K::Cpc, F::Rd5Rr5, "CPC"),
    entry(0xFC00, 0x0800, K::Sbc, F::Rd5Rr5, "SBC"),
    entry(0xFC00, 0x0C00, K::Add, F::Rd5Rr5, "ADD"),
    entry(0xFC00, 0x1000, K::Cpse, F::Rd5Rr5, "CPSE"),
    entry(0xFC00, 0x1400, K::Cp, F::Rd5Rr5, "CP"),
    entry(0xFC00, 0x1800, K::Sub, F::Rd5Rr5, "SUB"),
    entry(0xFC00, 0x1C00, K::Adc, F::Rd5Rr5, "ADC"),
    entry(0xFC00, 0x2000, K::And, F::Rd5Rr5, "AND"),
    entry(0xFC00, 0x2400, K::Eor, F::Rd5Rr5, "EOR"),
    entry(0xFC00, 0x2800, K::Or, F::Rd5Rr5, "OR"),
    entry(0xFC00, 0x2C00, K::Mov, F::Rd5Rr5, "MOV"),
    entry(0xF000, 0x3000, K::Cpi, F::Rd4K8, "CPI"),
    entry(0xF000, 0x4000, K::Sbci, F::Rd4K8, "SBCI"),
    entry(0xF000, 0x5000, K::Subi, F::Rd4K8, "SUBI"),
    entry(0xF000, 0x6000, K::Ori, F::Rd4K8, "ORI"),
    entry(0xF000, 0x7000, K::Andi, F::Rd4K8, "ANDI"),
    entry(0xD208, 0x8000, K::Ldd(Z), F::Rd5Q6, "LDD Z"),
    entry(0xD208, 0x8008, K::Ldd(Y), F::Rd5Q6, "LDD Y"),
    entry(0xD208, 0x8200, K::Std(Z), F::Rd5Q6, "STD Z"),
    entry(0xD208, 0x8208, K::Std(Y), F::Rd5Q6, "STD Y"),
    entry(0xFE0F, 0x9000, K::Lds, F::Rd5Address16, "LDS"),
    entry(0xFE0F, 0x9001, K::Ld(Z, PostIncrement), F::Rd5, "LD Z+"),
    entry(0xFE0F, 0x9002, K::Ld(Z, PreDecrement), F::Rd5, "LD -Z"),
    entry(0xFE0F, 0x9004, K::Lpm(ProgramLoad::Register), F::Rd5, "LPM Z"),
    entry(0xFE0F, 0x9005, K::Lpm(ProgramLoad::PostIncrement), F::Rd5, "LPM Z+"),
    entry(0xFE0F, 0x9006, K::Elpm(ProgramLoad::Register), F::Rd5, "ELPM Z"),
    entry(0xFE0F, 0x9007, K::Elpm(ProgramLoad::PostIncrement), F::Rd5, "ELPM Z+"),
    entry(0xFE0F, 0x9009, K::Ld(Y, PostIncrement), F::Rd5, "LD Y+"),
    entry(0xFE0F, 0x900A, K::Ld(Y, PreDecrement), F::Rd5, "LD -Y"),
    entry(0xFE0F, 0x900C, K::Ld(X, Plain), F::Rd5, "LD X"),
    entry(0xFE0F, 0x900D, K::Ld(X, PostIncrement), F::Rd5, "LD X+"),
    entry(0xFE0F, 0x900E, K::Ld(X, PreDecrement), F::Rd5, "LD -X"),
    entry(0xFE0F, 0x900F, K::Pop, F::Rd5, "POP"),
    entry(0xFE0F, 0x9200, K::Sts, F::Rd5Address16, "STS"),
    entry(0xFE0F, 0x9201, K::St(Z, PostIncrement), F::Rd5, "ST Z+"),
    entry(0xFE0F, 0x9202, K::St(Z, PreDecrement), F::Rd5, "ST -Z"),
    entry(0xFE0F, 0x9209, K::St(Y, PostIncrement), F::Rd5, "ST Y+"),
    entry(0xFE0F, 0x920A, K::St(Y, PreDecrement), F::Rd5, "ST -Y"),
    entry(0xFE0F, 0x920C, K::St(X, Plain), F::Rd5, "ST X"),
    entry(0xFE0F, 0x920D, K::St(X, PostIncrement), F::Rd5, "ST X+"),
    entry(0xFE0F, 0x920E, K::St(X, PreDecrement), F::Rd5, "ST -X"),
    entry(0xFE0F, 0x920F, K::Push, F::Rd5, "PUSH"),
    entry(0xFE0F, 0x9400, K::Com, F::Rd5, "COM"),
    entry(0xFE0F, 0x9401, K::Neg, F::Rd5, "NEG"),
    entry(0xFE0F, 0x9402, K::Swap, F::Rd5, "SWAP"),
    entry(0xFE0F, 0x9403, K::Inc, F::Rd5, "INC"),
    entry(0xFE0F, 0x9405, K::Asr, F::Rd5, "ASR"),
    entry(0xFE0F, 0x9406, K::Lsr, F::Rd5, "LSR"),
    entry(0xFE0F, 0x9407, K::Ror, F::Rd5, "ROR"),
    entry(0xFE0F, 0x940A, K::Dec, F::Rd5, "DEC"),
    entry(0xFFFF, 0x9408, K::Bset, F::SregBit, "SEC"),
    entry(0xFFFF, 0x9418, K::Bset, F::SregBit, "SEZ"),
    entry(0xFFFF, 0x9428, K::Bset, F::SregBit, "SEN"),
    entry(0xFFFF, 0x9438, K::Bset, F::SregBit, "SEV"),
    entry(0xFFFF, 0x9448, K::Bset, F::SregBit, "SES"),
    entry(0xFFFF, 0x9458, K::Bset, F::SregBit, "SEH"),
    entry(0xFFFF, 0x9468, K::Bset, F::SregBit, "SET"),
    entry(0xFFFF, 0x9478, K::Bset, F::SregBit, "SEI"),
    entry(0xFFFF, 0x9488, K::Bclr, F::SregBit, "CLC"),
    entry(0xFFFF, 0x9498, K::Bclr, F::SregBit, "CLZ"),
    entry(0xFFFF, 0x94A8, K::Bclr, F::SregBit, "CLN"),
    entry(0xFFFF, 0x94B8, K::Bclr, F::SregBit, "CLV"),
    entry(0xFFFF, 0x94C8, K::Bclr, F::SregBit, "CLS"),
    entry(0xFFFF, 0x94D8, K::Bclr, F::SregBit, "CLH"),
    entry(0xFFFF, 0x94E8, K::Bclr, F::SregBit, "CLT"),
    entry(0xFFFF, 0x94F8, K::Bclr, F::SregBit, "CLI"),
    entry(0xFFFF, 0x9409, K::Ijmp, F::None, "IJMP"),
    entry(0xFFFF, 0x9419, K::Eijmp, F::None, "EIJMP"),
    entry(0xFE0E, 0x940C, K::Jmp, F::Address22, "JMP"),
    entry(0xFE0E, 0x940E, K::Call, F::Address22, "CALL"),
    entry(0xFFFF, 0x9508, K::Ret, F::None, "RET"),
    entry(0xFFFF, 0x9509, K::Icall, F::None, "ICALL"),
    entry(0xFFFF, 0x9518, K::Reti, F::None, "RETI"),
    entry(0xFFFF, 0x9519, K::Eicall, F::None, "EICALL"),
    entry(0xFFFF, 0x9588, K::Sleep, F::None, "SLEEP"),
    entry(0xFFFF, 0x9598, K::Break, F::None, "BREAK"),
    entry(0xFFFF, 0x95A8, K::Wdr, F::None, "WDR"),
    entry(0xFFFF, 0x95C8, K::Lpm(ProgramLoad::Implied), F::None, "LPM"),
    entry(0xFFFF, 0x95D8, K::Elpm(ProgramLoad::Implied), F::None, "ELPM"),
    entry(0xFFFF, 0x95E8, K::Spm, F::None, "SPM"),
    entry(0xFF00, 0x9600, K::Adiw, F::RdPairK6, "ADIW"),
    entry(0xFF00, 0x9700, K::Sbiw, F::RdPairK6, "SBIW"),
    entry(0xFF00, 0x9800, K::Cbi, F::IoBit, "CBI"),
    entry(0xFF00, 0x9900, K::Sbic, F::IoBit, "SBIC"),
    entry(0xFF00, 0x9A00, K::Sbi, F::IoBit, "SBI"),
    entry(0xFF00, 0x9B00, K::Sbis, F::IoBit, "SBIS"),
    entry(0xFC00, 0x9C00, K::Mul, F::Rd5Rr5, "MUL"),
    entry(0xF800, 0xB000, K::In, F::Rd5Io6, "IN"),
    entry(0xF800, 0xB800, K::Out, F::Rd5Io6, "OUT"),
    entry(0xF000, 0xC000, K::Rjmp, F::Relative12, "RJMP"),
    entry(0xF000, 0xD000, K::Rcall, F::Relative12, "RCALL"),
    entry(0xF000, 0xE000, K::Ldi, F::Rd4K8, "LDI"),
    entry(0xFC00, 0xF000, K::Brbs, F::Relative7Bit, "BRBS"),
    entry(0xFC00, 0xF400, K::Brbc, F::Relative7Bit, "BRBC"),
    entry(0xFE08, 0xF800, K::Bld, F::Rd5Bit, "BLD"),
    entry(0xFE08, 0xFA00, K::Bst, F::Rd5Bit, "BST"),
    entry(0xFE08, 0xFC00, K::Sbrc, F::Rd5Bit, "SBRC"),
    entry(0xFE08, 0xFE00, K::Sbrs, F::Rd5Bit, "SBRS"),
];

/// Opcode bits that form the coarse start-index key (15..13 and 9).
pub const START_KEY_MASK: u16 = 0xE200;

/// Number of distinct start-index keys.
pub const START_KEY_COUNT: usize = 16;

/// Maps an opcode word to its start-index key.
#[must_use]
pub const fn start_key(word: u16) -> usize {
    (((word >> 13) << 1) | ((word >> 9) & 1)) as usize
}

const fn key_bits(key: usize) -> u16 {
    (((key >> 1) as u16) << 13) | (((key & 1) as u16) << 9)
}

/// First table row that can match any word with a given key.
///
/// Rows before this index disagree with the key on a bit they fix, so a scan
/// may start here without changing its result.
pub const START_INDEX: [u8; START_KEY_COUNT] = build_start_index();

const fn build_start_index() -> [u8; START_KEY_COUNT] {
    let mut out = [0u8; START_KEY_COUNT];
    let mut key = 0;
    while key < START_KEY_COUNT {
        let bits = key_bits(key);
        let mut index = 0;
        while index < OPCODE_TABLE.len() {
            let row = &OPCODE_TABLE[index];
            let fixed = row.mask & START_KEY_MASK;
            if row.pattern & fixed == bits & fixed {
                break;
            }
            index += 1;
        }
        out[key] = index as u8;
        key += 1;
    }
    out
}

const _: () = assert!(OPCODE_TABLE.len() < u8::MAX as usize);

/// Returns the table row for `word`, if any.
#[must_use]
pub fn lookup(word: u16) -> Option<(usize, &'static OpcodeEntry)> {
    let start = START_INDEX[start_key(word)] as usize;
    OPCODE_TABLE[start..]
        .iter()
        .enumerate()
        .find(|(_, row)| row.matches(word))
        .map(|(offset, row)| (start + offset, row))
}

/// Returns `true` for opcodes that carry a second program word
/// (`LDS`, `STS`, `JMP`, `CALL`).
#[must_use]
pub const fn is_two_word(word: u16) -> bool {
    word & 0xFC0F == 0x9000 || word & 0xFE0E == 0x940C
}
