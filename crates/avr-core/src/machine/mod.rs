//! The owning machine aggregate: CPU state, flash, data space and hooks.

mod interrupts;
mod scheduler;

use std::fmt;

use tracing::{debug, warn};

use crate::api::{CallStackObserver, DebugHook, ExecuteFlags, IoListener, ProfileSink};
use crate::memory::io::SREG;
use crate::{
    CallKind, CoreConfig, CpuState, DataSpace, Diagnostics, ErrorPolicy, Fault, FaultCode, Flash,
    RunState, PC_MASK,
};

/// One simulated ATmega32u4.
///
/// Every instance owns all of its state; two machines share nothing.
pub struct Machine {
    pub(crate) cpu: CpuState,
    pub(crate) data: DataSpace,
    pub(crate) flash: Flash,
    pub(crate) config: CoreConfig,
    pub(crate) diag: Diagnostics,
    pub(crate) exec_flags: ExecuteFlags,
    pub(crate) stop_requested: bool,
    debug_hook: Option<Box<dyn DebugHook>>,
    profiler: Option<Box<dyn ProfileSink>>,
}

impl fmt::Debug for Machine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Machine")
            .field("cpu", &self.cpu)
            .field("data", &self.data)
            .field("config", &self.config)
            .field("diag", &self.diag)
            .finish_non_exhaustive()
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new(CoreConfig::default())
    }
}

impl Machine {
    /// Creates a powered-on machine with empty flash.
    #[must_use]
    pub fn new(config: CoreConfig) -> Self {
        Self {
            cpu: CpuState::default(),
            data: DataSpace::new(config.pll_lock_cycles),
            flash: Flash::new(),
            config,
            diag: Diagnostics::new(),
            exec_flags: ExecuteFlags::default(),
            stop_requested: false,
            debug_hook: None,
            profiler: None,
        }
    }

    /// Loads a program image, truncated or zero-padded to the flash size.
    /// Returns the number of bytes kept.
    pub fn load_flash(&mut self, image: &[u8]) -> usize {
        let kept = self.flash.load(image);
        debug!(bytes = kept, "flash loaded");
        kept
    }

    /// Restores power-on state. Flash, EEPROM and attached hooks survive;
    /// the flags of the last run and any pending stop request do not.
    pub fn reset(&mut self) {
        self.cpu = CpuState::default();
        self.data.reset();
        self.diag.reset();
        self.exec_flags = ExecuteFlags::default();
        self.stop_requested = false;
        debug!("machine reset");
    }

    /// CPU state.
    #[must_use]
    pub const fn cpu(&self) -> &CpuState {
        &self.cpu
    }

    /// Data space.
    #[must_use]
    pub const fn data(&self) -> &DataSpace {
        &self.data
    }

    /// Mutable data space, for host pokes and input injection.
    pub const fn data_mut(&mut self) -> &mut DataSpace {
        &mut self.data
    }

    /// Program memory.
    #[must_use]
    pub const fn flash(&self) -> &Flash {
        &self.flash
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Replaces the error policy and range-check setting.
    pub const fn set_config(&mut self, config: CoreConfig) {
        self.config = config;
        self.data.pll_lock_cycles = config.pll_lock_cycles;
    }

    /// Diagnostics counters.
    #[must_use]
    pub const fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    /// Program counter (word address).
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.cpu.pc
    }

    /// Moves the program counter, masked to the flash size.
    pub const fn set_pc(&mut self, pc: u16) {
        self.cpu.pc = pc & PC_MASK;
    }

    /// Total elapsed cycles.
    #[must_use]
    pub const fn cycles(&self) -> u64 {
        self.cpu.cycles
    }

    /// Running, sleeping or halted.
    #[must_use]
    pub const fn run_state(&self) -> RunState {
        self.cpu.run_state
    }

    /// Marks an interrupt vector as pending, for sources the core does not
    /// model itself. Returns `false` for vector 0 and out-of-table vectors.
    pub fn raise_interrupt(&mut self, vector: u8) -> bool {
        let accepted = self.cpu.raise(vector);
        if accepted {
            debug!(vector, "interrupt raised by host");
        }
        accepted
    }

    /// Attaches the pin-change and SPI listener.
    pub fn set_io_listener(&mut self, listener: Box<dyn IoListener>) {
        self.data.set_io_listener(listener);
    }

    /// Attaches or detaches the call-stack observer, notified while the debug
    /// flag is set.
    pub fn set_call_stack_observer(&mut self, observer: Option<Box<dyn CallStackObserver>>) {
        self.data.set_call_stack_observer(observer);
    }

    /// Attaches or detaches the per-instruction debugger hook.
    pub fn set_debug_hook(&mut self, hook: Option<Box<dyn DebugHook>>) {
        self.debug_hook = hook;
    }

    /// Attaches or detaches the per-instruction profiling sink.
    pub fn set_profile_sink(&mut self, sink: Option<Box<dyn ProfileSink>>) {
        self.profiler = sink;
    }

    /// Applies the error policy to a fallible access.
    ///
    /// Recoverable faults yield `neutral` when range checks are off or the
    /// policy is [`ErrorPolicy::LogAndContinue`]; everything else becomes a
    /// [`Fault`] for the scheduler.
    pub(crate) fn resolve<T>(
        &mut self,
        result: Result<T, FaultCode>,
        operand: u32,
        neutral: T,
    ) -> Result<T, Fault> {
        let code = match result {
            Ok(value) => return Ok(value),
            Err(code) => code,
        };
        if code.is_recoverable() && !self.config.range_checks {
            return Ok(neutral);
        }
        let fault = Fault::new(code, self.cpu.pc, operand);
        if code.is_recoverable() && self.config.error_policy == ErrorPolicy::LogAndContinue {
            self.diag.record_fault(fault, self.cpu.cycles);
            warn!(%code, pc = fault.pc, operand, "access fault ignored");
            return Ok(neutral);
        }
        Err(fault)
    }

    /// Reads a data-space byte at the current cycle.
    pub(crate) fn read_data(&mut self, addr: u16) -> Result<u8, Fault> {
        let result = self.data.read_byte(addr, self.cpu.cycles);
        self.resolve(result, u32::from(addr), 0)
    }

    /// Writes a data-space byte at the current cycle. Writes that move the
    /// next event end the current batch.
    pub(crate) fn write_data(&mut self, addr: u16, value: u8) -> Result<(), Fault> {
        let result = self.data.write_byte(addr, value, self.cpu.cycles);
        let unmasked = addr == SREG && self.data.flags().i && self.pending_interrupts() != 0;
        if self.data.take_horizon_stale() || unmasked {
            self.cpu.break_out = true;
        }
        self.resolve(result, u32::from(addr), ())
    }

    /// Reads a program-memory byte for `LPM`/`ELPM`.
    pub(crate) fn read_program_byte(&mut self, addr: u32) -> Result<u8, Fault> {
        let result = self.flash.read_byte(addr);
        self.resolve(result, addr, 0)
    }

    /// Fetches the operand word following the current instruction.
    pub(crate) fn fetch_operand_word(&mut self) -> Result<u16, Fault> {
        let addr = self.cpu.pc.wrapping_add(1) & PC_MASK;
        let result = self.flash.read_word(addr);
        self.resolve(result, u32::from(addr), 0)
    }

    /// Returns `true` when the instruction after the current one occupies two
    /// words.
    pub(crate) fn next_is_two_word(&self) -> bool {
        let addr = self.cpu.pc.wrapping_add(1) & PC_MASK;
        self.flash
            .read_word(addr)
            .is_ok_and(crate::Decoder::is_two_word)
    }

    pub(crate) fn push_byte(&mut self, value: u8) -> Result<(), Fault> {
        let result = self.data.push_byte(value);
        let sp = self.data.sp();
        self.resolve(result, u32::from(sp), ())
    }

    pub(crate) fn pop_byte(&mut self) -> Result<u8, Fault> {
        let result = self.data.pop_byte();
        let sp = self.data.sp();
        self.resolve(result, u32::from(sp), 0)
    }

    pub(crate) fn push_return(
        &mut self,
        return_pc: u16,
        target_pc: u16,
        kind: CallKind,
    ) -> Result<(), Fault> {
        let result = self.data.push_return_address(return_pc, target_pc, kind);
        let sp = self.data.sp();
        self.resolve(result, u32::from(sp), ())
    }

    pub(crate) fn pop_return(&mut self) -> Result<u16, Fault> {
        let result = self.data.pop_return_address();
        let sp = self.data.sp();
        self.resolve(result, u32::from(sp), 0)
    }
}

#[cfg(test)]
mod tests {
    use super::Machine;
    use crate::memory::io::SP_RESET;
    use crate::{CoreConfig, ErrorPolicy, ExecuteFlags, FaultCode, RunState};

    #[test]
    fn new_machine_is_at_reset_vector() {
        let machine = Machine::default();
        assert_eq!(machine.pc(), 0);
        assert_eq!(machine.cycles(), 0);
        assert_eq!(machine.data().sp(), SP_RESET);
        assert_eq!(machine.run_state(), RunState::Running);
        assert!(!machine.flash().has_program());
    }

    #[test]
    fn log_and_continue_yields_neutral_values() {
        let mut machine = Machine::default();
        assert_eq!(machine.read_data(0x0B00), Ok(0));
        assert_eq!(machine.write_data(0xFFFF, 1), Ok(()));
        assert_eq!(machine.diagnostics().fault_counts.iter().sum::<u32>(), 2);
        assert_eq!(
            machine.diagnostics().last_fault.map(|fault| fault.operand),
            Some(0xFFFF)
        );
    }

    #[test]
    fn halt_policy_surfaces_the_fault() {
        let mut machine = Machine::new(CoreConfig {
            error_policy: ErrorPolicy::Halt,
            ..CoreConfig::default()
        });
        let fault = machine.read_data(0x0B00).unwrap_err();
        assert_eq!(fault.code, FaultCode::DataAddressOutOfRange);
        assert_eq!(fault.operand, 0x0B00);
    }

    #[test]
    fn disabled_range_checks_are_silent() {
        let mut machine = Machine::new(CoreConfig {
            error_policy: ErrorPolicy::Propagate,
            range_checks: false,
            ..CoreConfig::default()
        });
        assert_eq!(machine.read_data(0x0B00), Ok(0));
        assert_eq!(machine.diagnostics().last_fault, None);
    }

    #[test]
    fn raise_interrupt_rejects_reset_vector() {
        let mut machine = Machine::default();
        assert!(!machine.raise_interrupt(0));
        assert!(machine.raise_interrupt(5));
        assert_eq!(machine.cpu().pending, 1 << 5);
    }

    #[test]
    fn reset_after_debug_break_starts_clean() {
        let mut machine = Machine::default();
        machine.exec_flags = ExecuteFlags {
            debug: true,
            analytics: true,
        };
        machine.data.call_tracking = true;
        machine.stop_requested = true;
        machine.cpu.break_out = true;
        machine.reset();
        assert_eq!(machine.exec_flags, ExecuteFlags::default());
        assert!(!machine.data.call_tracking);
        assert!(!machine.stop_requested);
        assert!(!machine.cpu.break_out);
    }

    #[test]
    fn set_pc_masks_to_flash() {
        let mut machine = Machine::default();
        machine.set_pc(0xFFFF);
        assert_eq!(machine.pc(), 0x3FFF);
    }
}
