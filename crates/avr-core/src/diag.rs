//! Host-readable diagnostics counters.

use crate::{Fault, FaultClass};

/// Saturating counters and the most recent fault, readable by hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Diagnostics {
    /// The last fault raised, if any.
    pub last_fault: Option<Fault>,
    /// Cycle counter when the last fault was raised.
    pub last_fault_cycle: u64,
    /// Per-class fault counters indexed by [`FaultClass::index`].
    pub fault_counts: [u32; FaultClass::COUNT],
    /// Instructions retired since reset.
    pub instruction_count: u64,
    /// Interrupts dispatched since reset.
    pub interrupt_count: u64,
}

impl Diagnostics {
    /// Creates zeroed diagnostics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a fault occurrence.
    pub const fn record_fault(&mut self, fault: Fault, cycle: u64) {
        self.last_fault = Some(fault);
        self.last_fault_cycle = cycle;
        let slot = &mut self.fault_counts[fault.code.class().index()];
        *slot = slot.saturating_add(1);
    }

    /// Fault count for one class.
    #[must_use]
    pub const fn fault_count(&self, class: FaultClass) -> u32 {
        self.fault_counts[class.index()]
    }

    /// Resets every counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
