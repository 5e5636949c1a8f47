//! Unified data space with memory-mapped I/O side effects.

use std::fmt;

use crate::api::{CallFrame, CallKind, CallStackObserver, IoListener, NoHooks, Port};
use crate::encoding::Pointer;
use crate::memory::access::{validate_data_access, validate_stack_access};
use crate::memory::io::{OCR4C, SPH, SPL, SP_RESET, SREG};
use crate::peripherals::{self, Timer4HighBytes};
use crate::{
    FaultCode, StatusFlags, DATA_SIZE, DEFAULT_PLL_LOCK_CYCLES, EEPROM_SIZE, EXT_IO_END,
    IO_START,
};

/// Cycle timestamps of the last peripheral synchronization points.
///
/// Each field is written only by the peripheral that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct LastSet {
    /// When `EEMPE` was last set.
    pub eempe: u64,
    /// When `PLLE` was last enabled.
    pub pll: u64,
    /// When the current ADC conversion started.
    pub adc: u64,
    /// Timer0 catch-up baseline.
    pub timer0: u64,
    /// Timer3 catch-up baseline.
    pub timer3: u64,
    /// Timer4 catch-up baseline.
    pub timer4: u64,
}

/// Registers, I/O, extended I/O, SRAM and EEPROM of one device.
pub struct DataSpace {
    pub(crate) data: Box<[u8]>,
    pub(crate) eeprom: Box<[u8]>,
    pub(crate) flags: StatusFlags,
    pub(crate) last: LastSet,
    pub(crate) timer4_high: Timer4HighBytes,
    pub(crate) analog_input: u16,
    pub(crate) pin_inputs: [u8; 5],
    pub(crate) pll_lock_cycles: u64,
    pub(crate) horizon_stale: bool,
    pub(crate) call_tracking: bool,
    pub(crate) listener: Box<dyn IoListener>,
    pub(crate) call_stack: Option<Box<dyn CallStackObserver>>,
}

impl fmt::Debug for DataSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSpace")
            .field("flags", &self.flags)
            .field("sp", &self.sp())
            .field("last", &self.last)
            .field("timer4_high", &self.timer4_high)
            .field("analog_input", &self.analog_input)
            .finish_non_exhaustive()
    }
}

impl Default for DataSpace {
    fn default() -> Self {
        Self::new(DEFAULT_PLL_LOCK_CYCLES)
    }
}

impl DataSpace {
    /// Creates a power-on data space with an erased EEPROM.
    #[must_use]
    pub fn new(pll_lock_cycles: u64) -> Self {
        let mut space = Self {
            data: vec![0; DATA_SIZE].into_boxed_slice(),
            eeprom: vec![0xFF; EEPROM_SIZE].into_boxed_slice(),
            flags: StatusFlags::default(),
            last: LastSet::default(),
            timer4_high: Timer4HighBytes::default(),
            analog_input: 0,
            pin_inputs: [0; 5],
            pll_lock_cycles,
            horizon_stale: false,
            call_tracking: false,
            listener: Box::new(NoHooks),
            call_stack: None,
        };
        space.seed_power_on_registers();
        space
    }

    /// Restores power-on register and I/O contents.
    ///
    /// EEPROM, host inputs and attached listeners survive a reset.
    pub fn reset(&mut self) {
        self.data.fill(0);
        self.flags = StatusFlags::default();
        self.last = LastSet::default();
        self.timer4_high = Timer4HighBytes::default();
        self.horizon_stale = false;
        self.call_tracking = false;
        self.seed_power_on_registers();
    }

    /// Registers whose power-on value is not zero. `OCR4C` is timer4's TOP.
    fn seed_power_on_registers(&mut self) {
        self.set_sp(SP_RESET);
        self.data[usize::from(OCR4C)] = 0xFF;
    }

    /// Reads a byte, refreshing hooked I/O registers first.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::DataAddressOutOfRange`] above `RAMEND`.
    pub fn read_byte(&mut self, addr: u16, now: u64) -> Result<u8, FaultCode> {
        let index = validate_data_access(addr)?;
        if (IO_START..=EXT_IO_END).contains(&addr) {
            return Ok(peripherals::read_io(self, addr, now));
        }
        Ok(self.data[index])
    }

    /// Writes a byte and runs the register's write reaction.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::DataAddressOutOfRange`] above `RAMEND`, or
    /// [`FaultCode::EepromAddressOutOfRange`] when an EEPROM operation is
    /// triggered with `EEAR` past the end of the EEPROM.
    pub fn write_byte(&mut self, addr: u16, value: u8, now: u64) -> Result<(), FaultCode> {
        let index = validate_data_access(addr)?;
        if (IO_START..=EXT_IO_END).contains(&addr) {
            return peripherals::write_io(self, addr, value, now);
        }
        self.data[index] = value;
        Ok(())
    }

    /// Reads a byte without side effects; `SREG` is projected from the flag
    /// cache.
    #[must_use]
    pub fn peek(&self, addr: u16) -> Option<u8> {
        if addr == SREG {
            return Some(self.flags.to_byte());
        }
        self.data.get(usize::from(addr)).copied()
    }

    /// Reads general-purpose register `n` (`n & 31`).
    #[must_use]
    pub fn reg(&self, n: u8) -> u8 {
        self.data[usize::from(n & 0x1F)]
    }

    /// Writes general-purpose register `n` (`n & 31`).
    pub fn set_reg(&mut self, n: u8, value: u8) {
        self.data[usize::from(n & 0x1F)] = value;
    }

    /// Reads the little-endian register pair starting at `n`.
    #[must_use]
    pub fn reg_pair(&self, n: u8) -> u16 {
        u16::from_le_bytes([self.reg(n), self.reg(n.wrapping_add(1))])
    }

    /// Writes the little-endian register pair starting at `n`.
    pub fn set_reg_pair(&mut self, n: u8, value: u16) {
        let [low, high] = value.to_le_bytes();
        self.set_reg(n, low);
        self.set_reg(n.wrapping_add(1), high);
    }

    /// Reads the `X`, `Y` or `Z` pointer.
    #[must_use]
    pub fn pointer(&self, pointer: Pointer) -> u16 {
        self.reg_pair(pointer.low_register())
    }

    /// Writes the `X`, `Y` or `Z` pointer.
    pub fn set_pointer(&mut self, pointer: Pointer, value: u16) {
        self.set_reg_pair(pointer.low_register(), value);
    }

    /// Current stack pointer.
    #[must_use]
    pub fn sp(&self) -> u16 {
        u16::from_le_bytes([self.data[usize::from(SPL)], self.data[usize::from(SPH)]])
    }

    /// Sets the stack pointer without notifying observers.
    pub fn set_sp(&mut self, sp: u16) {
        let [low, high] = sp.to_le_bytes();
        self.data[usize::from(SPL)] = low;
        self.data[usize::from(SPH)] = high;
    }

    /// Canonical status flags.
    #[must_use]
    pub const fn flags(&self) -> StatusFlags {
        self.flags
    }

    /// Mutable access to the canonical status flags.
    pub const fn flags_mut(&mut self) -> &mut StatusFlags {
        &mut self.flags
    }

    /// EEPROM contents.
    #[must_use]
    pub fn eeprom(&self) -> &[u8] {
        &self.eeprom
    }

    /// Replaces EEPROM contents, padding with the erased value `0xFF`.
    pub fn load_eeprom(&mut self, image: &[u8]) {
        let kept = image.len().min(EEPROM_SIZE);
        self.eeprom[..kept].copy_from_slice(&image[..kept]);
        self.eeprom[kept..].fill(0xFF);
    }

    /// Peripheral synchronization timestamps.
    #[must_use]
    pub const fn last_set(&self) -> &LastSet {
        &self.last
    }

    /// 10-bit value the ADC reports at the end of each conversion.
    #[must_use]
    pub const fn analog_input(&self) -> u16 {
        self.analog_input
    }

    /// Sets the value the ADC reports at the end of each conversion.
    pub const fn set_analog_input(&mut self, value: u16) {
        self.analog_input = value & 0x03FF;
    }

    /// Sets the externally driven levels seen on `port`'s input pins.
    pub const fn set_pin_inputs(&mut self, port: Port, value: u8) {
        self.pin_inputs[port as usize] = value;
    }

    /// Attaches the pin-change and SPI listener.
    pub fn set_io_listener(&mut self, listener: Box<dyn IoListener>) {
        self.listener = listener;
    }

    /// Attaches or detaches the call-stack observer.
    pub fn set_call_stack_observer(&mut self, observer: Option<Box<dyn CallStackObserver>>) {
        self.call_stack = observer;
    }

    /// Refreshes every hooked register at `now`, as a full resync does
    /// before a snapshot.
    pub fn sync_all(&mut self, now: u64) {
        peripherals::sync_all(self, now);
    }

    /// Cycles from `now` until the next enabled timer or ADC interrupt source
    /// fires; at least 1, or `u64::MAX` when none is armed.
    pub fn cycles_to_next_timer_event(&mut self, now: u64) -> u64 {
        peripherals::cycles_to_next_event(self, now)
    }

    /// Brings every timer and the ADC up to `now`.
    pub fn catch_up(&mut self, now: u64) {
        peripherals::catch_up(self, now);
    }

    /// Returns and clears the "horizon invalidated" marker set by writes that
    /// change when the next event happens.
    pub const fn take_horizon_stale(&mut self) -> bool {
        let stale = self.horizon_stale;
        self.horizon_stale = false;
        stale
    }

    /// Pushes one byte: `data[SP] = value`, then `SP -= 1`.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::StackOutOfRange`] when `SP` is outside SRAM; the
    /// write is dropped but `SP` still moves.
    pub fn push_byte(&mut self, value: u8) -> Result<(), FaultCode> {
        let sp = self.sp();
        self.set_sp(sp.wrapping_sub(1));
        let index = validate_stack_access(sp)?;
        self.data[index] = value;
        Ok(())
    }

    /// Pops one byte: `SP += 1`, then reads `data[SP]`.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::StackOutOfRange`] when the new `SP` is outside
    /// SRAM; `SP` still moves.
    pub fn pop_byte(&mut self) -> Result<u8, FaultCode> {
        let sp = self.sp().wrapping_add(1);
        self.set_sp(sp);
        let index = validate_stack_access(sp)?;
        Ok(self.data[index])
    }

    /// Pushes a return address, low byte first so the high byte ends up at
    /// the lower address, and notifies the call-stack observer.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::StackOutOfRange`] if either byte lands outside
    /// SRAM. Both bytes are attempted.
    pub fn push_return_address(
        &mut self,
        return_pc: u16,
        target_pc: u16,
        kind: CallKind,
    ) -> Result<(), FaultCode> {
        let [low, high] = return_pc.to_le_bytes();
        let first = self.push_byte(low);
        let second = self.push_byte(high);
        if self.call_tracking {
            let sp = self.sp();
            if let Some(observer) = self.call_stack.as_mut() {
                observer.on_push(CallFrame {
                    return_pc,
                    target_pc,
                    sp,
                    kind,
                });
            }
        }
        first.and(second)
    }

    /// Pops a return address pushed by [`DataSpace::push_return_address`].
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::StackOutOfRange`] if either byte lies outside
    /// SRAM. Both bytes are attempted.
    pub fn pop_return_address(&mut self) -> Result<u16, FaultCode> {
        let high = self.pop_byte();
        let low = self.pop_byte();
        let return_pc = u16::from_le_bytes([low.unwrap_or(0), high.unwrap_or(0)]);
        if self.call_tracking {
            let sp = self.sp();
            if let Some(observer) = self.call_stack.as_mut() {
                observer.on_pop(return_pc, sp);
            }
        }
        high.and(low).map(|_| return_pc)
    }

    pub(crate) fn raw(&self, addr: u16) -> u8 {
        self.data[usize::from(addr)]
    }

    pub(crate) fn set_raw(&mut self, addr: u16, value: u8) {
        self.data[usize::from(addr)] = value;
    }

    pub(crate) fn set_raw_bits(&mut self, addr: u16, bits: u8) {
        self.data[usize::from(addr)] |= bits;
    }

    pub(crate) fn clear_raw_bits(&mut self, addr: u16, bits: u8) {
        self.data[usize::from(addr)] &= !bits;
    }

    pub(crate) fn notify_stack_pointer_write(&mut self) {
        if self.call_tracking {
            let sp = self.sp();
            if let Some(observer) = self.call_stack.as_mut() {
                observer.on_stack_pointer_write(sp);
            }
        }
    }
}
