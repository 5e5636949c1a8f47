/// Instruction and dispatch forms that have fixed cycle costs on the ATmega32u4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CycleCostKind {
    /// Register-to-register arithmetic, logic, compare and flag instructions.
    Alu,
    /// `MOV`, `MOVW`, `LDI`, `SWAP`, `BLD`, `BST`.
    Move,
    /// `ADIW` / `SBIW`.
    Word16,
    /// `MUL`, `MULS`, `MULSU`, `FMUL*`.
    Multiply,
    /// Data-space load (`LD`, `LDD`, `LDS`).
    Load,
    /// Data-space store (`ST`, `STD`, `STS`).
    Store,
    /// Stack push.
    Push,
    /// Stack pop.
    Pop,
    /// Program-memory load (`LPM`, `ELPM`).
    ProgramLoad,
    /// `IN` / `OUT`.
    IoTransfer,
    /// `SBI` / `CBI`.
    IoBit,
    /// Conditional branch when predicate is false.
    BranchNotTaken,
    /// Conditional branch when predicate is true.
    BranchTaken,
    /// Skip instruction whose condition is false.
    SkipNotTaken,
    /// Skip over a one-word instruction.
    SkipOneWord,
    /// Skip over a two-word instruction.
    SkipTwoWord,
    /// `RJMP`.
    RelativeJump,
    /// `IJMP` / `EIJMP`.
    IndirectJump,
    /// `JMP`.
    AbsoluteJump,
    /// `RCALL`.
    RelativeCall,
    /// `ICALL` / `EICALL`.
    IndirectCall,
    /// `CALL`.
    AbsoluteCall,
    /// `RET`.
    Return,
    /// `RETI`.
    InterruptReturn,
    /// `NOP`, `SLEEP`, `WDR`, `BREAK`, `SPM`.
    Control,
    /// Hardware interrupt entry sequence.
    InterruptEntry,
    /// Extra response time when an interrupt wakes a sleeping core.
    SleepWake,
}

/// Single source-of-truth cycle-cost table, ordered by [`CycleCostKind`]
/// discriminant.
pub const CYCLE_COST_TABLE: &[(CycleCostKind, u8)] = &[
    (CycleCostKind::Alu, 1),
    (CycleCostKind::Move, 1),
    (CycleCostKind::Word16, 2),
    (CycleCostKind::Multiply, 2),
    (CycleCostKind::Load, 2),
    (CycleCostKind::Store, 2),
    (CycleCostKind::Push, 2),
    (CycleCostKind::Pop, 2),
    (CycleCostKind::ProgramLoad, 3),
    (CycleCostKind::IoTransfer, 1),
    (CycleCostKind::IoBit, 2),
    (CycleCostKind::BranchNotTaken, 1),
    (CycleCostKind::BranchTaken, 2),
    (CycleCostKind::SkipNotTaken, 1),
    (CycleCostKind::SkipOneWord, 2),
    (CycleCostKind::SkipTwoWord, 3),
    (CycleCostKind::RelativeJump, 2),
    (CycleCostKind::IndirectJump, 2),
    (CycleCostKind::AbsoluteJump, 3),
    (CycleCostKind::RelativeCall, 3),
    (CycleCostKind::IndirectCall, 3),
    (CycleCostKind::AbsoluteCall, 4),
    (CycleCostKind::Return, 4),
    (CycleCostKind::InterruptReturn, 4),
    (CycleCostKind::Control, 1),
    (CycleCostKind::InterruptEntry, 5),
    (CycleCostKind::SleepWake, 5),
];

/// Looks up the cycle cost for a cycle-cost kind.
#[must_use]
pub const fn cycle_cost(kind: CycleCostKind) -> u8 {
    CYCLE_COST_TABLE[kind as usize].1
}
