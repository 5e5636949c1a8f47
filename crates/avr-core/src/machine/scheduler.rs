//! Event-horizon scheduler.
//!
//! Instructions run in batches bounded by the next timer or ADC event, so
//! lazily computed peripheral state only needs to be caught up and checked
//! for interrupts at batch ends. Writes that move the next event set
//! `break_out`, ending the batch early. `step_one` catches up and checks
//! after every instruction and is the reference the batched path must
//! match.

use tracing::{debug, error};

use super::Machine;
use crate::api::{DebugAction, ExecuteFlags, RunOutcome, StopReason};
use crate::{execute, Decoder, ErrorPolicy, Fault, FaultCode, RunState};

impl Machine {
    /// Runs for at least `cycle_budget` cycles.
    ///
    /// The budget may be overshot by one instruction plus an interrupt
    /// entry. Returns early when a debug break is requested or a fault halts
    /// the core.
    ///
    /// # Errors
    ///
    /// Under [`ErrorPolicy::Propagate`], returns the first fault raised.
    pub fn execute(&mut self, cycle_budget: u64, flags: ExecuteFlags) -> Result<RunOutcome, Fault> {
        let start = (self.cpu.cycles, self.diag.instruction_count);
        if let Some(stop) = self.begin_run(flags)? {
            return Ok(self.outcome(start, stop));
        }
        self.cpu.target_cycles = self.cpu.cycles.saturating_add(cycle_budget);
        let stop = loop {
            if self.cpu.cycles >= self.cpu.target_cycles {
                break StopReason::BudgetExhausted;
            }
            let remaining = self.cpu.target_cycles - self.cpu.cycles;
            let horizon = self.next_event().min(remaining);
            if self.cpu.is_sleeping() {
                self.cpu.cycles += horizon;
            } else if let Some(stop) = self.run_batch(self.cpu.cycles + horizon)? {
                break stop;
            }
            if let Some(stop) = self.settle()? {
                break stop;
            }
        };
        Ok(self.outcome(start, stop))
    }

    /// Executes exactly one instruction (or one idle cycle while asleep),
    /// then catches up peripherals and services interrupts.
    ///
    /// # Errors
    ///
    /// Under [`ErrorPolicy::Propagate`], returns the fault raised.
    pub fn step_one(&mut self, flags: ExecuteFlags) -> Result<RunOutcome, Fault> {
        let start = (self.cpu.cycles, self.diag.instruction_count);
        if let Some(stop) = self.begin_run(flags)? {
            return Ok(self.outcome(start, stop));
        }
        self.cpu.target_cycles = self.cpu.cycles + 1;
        if self.cpu.is_sleeping() {
            self.cpu.cycles += 1;
        } else if let Some(stop) = self.step_instruction()? {
            return Ok(self.outcome(start, stop));
        }
        let stop = self.settle()?.unwrap_or(StopReason::BudgetExhausted);
        Ok(self.outcome(start, stop))
    }

    fn begin_run(&mut self, flags: ExecuteFlags) -> Result<Option<StopReason>, Fault> {
        if let RunState::Halted(code) = self.cpu.run_state {
            return Ok(Some(StopReason::Halted(code)));
        }
        if !self.flash.has_program() {
            let fault = Fault::new(FaultCode::NoProgramLoaded, self.cpu.pc, 0);
            self.diag.record_fault(fault, self.cpu.cycles);
            error!(%fault, "execute called before a program was loaded");
            if self.config.error_policy == ErrorPolicy::Propagate {
                return Err(fault);
            }
            return Ok(Some(StopReason::Halted(fault.code)));
        }
        self.exec_flags = flags;
        self.data.call_tracking = flags.debug;
        self.stop_requested = false;
        Ok(None)
    }

    /// Cycles until something could make an interrupt pending.
    fn next_event(&mut self) -> u64 {
        if self.cpu.pending != 0 && self.data.flags.i {
            return 1;
        }
        self.data.cycles_to_next_timer_event(self.cpu.cycles)
    }

    /// Runs instructions until `horizon` is reached or a write ends the
    /// batch. At least one instruction always runs.
    fn run_batch(&mut self, horizon: u64) -> Result<Option<StopReason>, Fault> {
        self.cpu.break_out = false;
        loop {
            if let Some(stop) = self.step_instruction()? {
                return Ok(Some(stop));
            }
            if self.cpu.break_out || self.cpu.cycles >= horizon {
                return Ok(None);
            }
        }
    }

    fn step_instruction(&mut self) -> Result<Option<StopReason>, Fault> {
        let pc = self.cpu.pc;
        let fetched = self.flash.read_word(pc);
        let word = self.resolve(fetched, u32::from(pc), 0)?;
        if self.exec_flags.debug {
            if let Some(hook) = self.debug_hook.as_mut() {
                if hook.before_instruction(pc, word, self.cpu.cycles) == DebugAction::Break {
                    debug!(pc, "debug hook requested a break");
                    return Ok(Some(StopReason::DebugBreak));
                }
            }
        }
        let instruction = match Decoder::decode(word) {
            Ok(instruction) => instruction,
            Err(code) => return self.fail(Fault::new(code, pc, u32::from(word))).map(Some),
        };
        let effect = match execute::execute_instruction(self, &instruction) {
            Ok(effect) => effect,
            Err(fault) => return self.fail(fault).map(Some),
        };
        self.cpu.pc = effect.next_pc(pc);
        self.cpu.cycles += u64::from(effect.cycles);
        self.diag.instruction_count += 1;
        if self.exec_flags.analytics {
            if let Some(sink) = self.profiler.as_mut() {
                sink.sample(instruction.index, pc);
            }
        }
        if self.stop_requested {
            self.stop_requested = false;
            return Ok(Some(StopReason::DebugBreak));
        }
        Ok(None)
    }

    /// Catches every peripheral up to now and dispatches at most one
    /// interrupt.
    fn settle(&mut self) -> Result<Option<StopReason>, Fault> {
        self.data.catch_up(self.cpu.cycles);
        if let Err(fault) = self.service_interrupts() {
            return self.fail(fault).map(Some);
        }
        Ok(None)
    }

    /// Applies the error policy to a fault that stops the instruction.
    fn fail(&mut self, fault: Fault) -> Result<StopReason, Fault> {
        self.diag.record_fault(fault, self.cpu.cycles);
        error!(%fault, "core fault");
        if self.config.error_policy == ErrorPolicy::Propagate {
            return Err(fault);
        }
        self.cpu.run_state = RunState::Halted(fault.code);
        Ok(StopReason::Halted(fault.code))
    }

    const fn outcome(&self, start: (u64, u64), stop: StopReason) -> RunOutcome {
        RunOutcome {
            cycles: self.cpu.cycles - start.0,
            instructions: self.diag.instruction_count - start.1,
            stop,
        }
    }
}
