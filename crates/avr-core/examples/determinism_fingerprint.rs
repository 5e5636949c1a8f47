//! Deterministic run fingerprint used for cross-host comparison.

use avr_core::{fnv1a, ExecuteFlags, Machine, StopReason};
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;
use tracing as _;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;

/// Timer0 overflow interrupt at clk/1 bumping R21 while the main loop
/// accumulates R22 into R23.
const PROGRAM: &[(usize, &[u16])] = &[
    (0, &[0xC03F]),
    (46, &[0xC021]),
    (64, &[0xE001, 0xBD05, 0x9300, 0x006E, 0x9478, 0x9563, 0x0F76, 0xCFFD]),
    (80, &[0x9553, 0x9518]),
];

fn flash_image() -> Vec<u8> {
    let mut words = vec![0u16; 82];
    for (at, chunk) in PROGRAM {
        words[*at..*at + chunk.len()].copy_from_slice(chunk);
    }
    words.iter().flat_map(|word| word.to_le_bytes()).collect()
}

fn fingerprint() -> String {
    let mut machine = Machine::default();
    machine.load_flash(&flash_image());

    let mut hash = FNV_OFFSET;
    for budget in [1_000, 7, 25_000, 333] {
        let outcome = machine
            .execute(budget, ExecuteFlags::default())
            .expect("scripted run should not fault");
        let stop = match outcome.stop {
            StopReason::BudgetExhausted => 0x10,
            StopReason::DebugBreak => 0x11,
            StopReason::Halted(code) => 0x20 | code.as_u8(),
        };
        hash = fnv1a(hash, &[stop]);
        hash = fnv1a(hash, &outcome.cycles.to_le_bytes());
        hash = fnv1a(hash, &outcome.instructions.to_le_bytes());
    }

    let diagnostics = *machine.diagnostics();
    hash = fnv1a(hash, &diagnostics.instruction_count.to_le_bytes());
    hash = fnv1a(hash, &diagnostics.interrupt_count.to_le_bytes());
    hash = fnv1a(hash, &machine.snapshot(false));

    format!("{hash:016x}")
}

fn main() {
    println!("{}", fingerprint());
}
