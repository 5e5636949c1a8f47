//! Public host-facing API contracts for embedding the simulator core.

use crate::FaultCode;

/// Default PLL lock time in CPU cycles (100 µs at 16 MHz).
pub const DEFAULT_PLL_LOCK_CYCLES: u64 = 1600;

/// What the core does when an access or decode fault is raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ErrorPolicy {
    /// Log range faults and answer them with a neutral value; the instruction
    /// completes. Unhandled opcodes still halt.
    #[default]
    LogAndContinue,
    /// Latch the fault and refuse to run until reset.
    Halt,
    /// Return the fault from `execute` without latching it.
    Propagate,
}

/// Top-level configuration for a core instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct CoreConfig {
    /// Fault handling policy.
    pub error_policy: ErrorPolicy,
    /// When `false`, out-of-range accesses take the neutral path silently.
    pub range_checks: bool,
    /// Cycles between enabling the PLL and `PLOCK` reading as set.
    pub pll_lock_cycles: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            error_policy: ErrorPolicy::LogAndContinue,
            range_checks: true,
            pll_lock_cycles: DEFAULT_PLL_LOCK_CYCLES,
        }
    }
}

/// Per-call switches for `execute`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ExecuteFlags {
    /// Consult the debug hook before every instruction and deliver
    /// call-stack notifications.
    pub debug: bool,
    /// Report every executed instruction to the profile sink.
    pub analytics: bool,
}

/// Why an `execute` call returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopReason {
    /// The cycle budget was consumed.
    BudgetExhausted,
    /// The debug hook (or a `BREAK` under debug) requested a stop.
    DebugBreak,
    /// A fault is latched.
    Halted(FaultCode),
}

/// Result of one `execute` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    /// Cycles that elapsed during the call.
    pub cycles: u64,
    /// Instructions retired during the call.
    pub instructions: u64,
    /// Why the call returned.
    pub stop: StopReason,
}

/// The five GPIO ports of the ATmega32u4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[allow(missing_docs)]
pub enum Port {
    B,
    C,
    D,
    E,
    F,
}

/// Device-side callbacks invoked synchronously from inside register writes.
///
/// Implementations get no handle to the scheduler.
pub trait IoListener {
    /// A `PORTx` register was written (or toggled through `PINx` or a timer
    /// output compare).
    fn on_pin_change(&mut self, port: Port, old: u8, new: u8) {
        let _ = (port, old, new);
    }

    /// Shifts `out` through the attached SPI device and returns the byte
    /// shifted back, or `None` when nothing is attached.
    fn spi_transfer(&mut self, out: u8) -> Option<u8> {
        let _ = out;
        None
    }
}

/// Debugger decision returned before each instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DebugAction {
    /// Execute the instruction.
    #[default]
    Continue,
    /// Return from `execute` without executing it.
    Break,
}

/// Debugger callback consulted once per fetched instruction while the debug
/// flag is set.
pub trait DebugHook {
    /// Called with the instruction about to execute.
    fn before_instruction(&mut self, pc: u16, word: u16, cycles: u64) -> DebugAction;
}

/// Analytics sink fed once per executed instruction while the analytics flag
/// is set.
pub trait ProfileSink {
    /// Records one executed instruction by table index and address.
    fn sample(&mut self, opcode_index: u8, pc: u16);
}

/// How a return address reached the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// `CALL`, `RCALL`, `ICALL`, `EICALL`.
    Call,
    /// Hardware interrupt entry.
    Interrupt,
}

/// One return address pushed on the simulated stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallFrame {
    /// Where execution resumes on return.
    pub return_pc: u16,
    /// Word address being entered.
    pub target_pc: u16,
    /// Stack pointer after the push.
    pub sp: u16,
    /// Call or interrupt.
    pub kind: CallKind,
}

/// Observer of call-stack activity, delivered by the data space while the
/// debug flag is set.
pub trait CallStackObserver {
    /// A return address was pushed.
    fn on_push(&mut self, frame: CallFrame);

    /// A return address was popped by `RET`/`RETI`.
    fn on_pop(&mut self, return_pc: u16, sp: u16);

    /// Firmware wrote `SPL` or `SPH` directly.
    fn on_stack_pointer_write(&mut self, sp: u16) {
        let _ = sp;
    }
}

/// Listener that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl IoListener for NoHooks {}
