//! Lazily caught-up timer0 (8-bit), timer3 (16-bit) and timer4 (10-bit).
//!
//! Prescalers are free-running from cycle 0, so a timer clocked by `div`
//! advances `now / div - last / div` ticks between two synchronizations no
//! matter how often it is caught up in between.

#![allow(clippy::cast_possible_truncation)]

use tracing::trace;

use crate::api::Port;
use crate::memory::io::{
    COM4A_SHIFT, DDRC, OCF3A, OCF4A, OCR3AH, OCR3AL, OCR4A, OCR4C, PORTC, PWM4A, TCCR0B, TCCR3B,
    TCCR4A, TCCR4B, TCNT0, TCNT3H, TCNT3L, TCNT4, TIFR0, TIFR3, TIFR4, TIMSK0, TIMSK3, TIMSK4,
    TOV0, TOV3, TOV4, WGM32,
};
use crate::DataSpace;

/// Clock dividers selected by `CSn[2:0]` of timer0 and timer3; external clock
/// sources (6, 7) count as stopped.
pub const PRESCALER_TABLE: [u64; 8] = [0, 1, 8, 64, 256, 1024, 0, 0];

/// Latched high bits of timer4's 10-bit registers, written through `TC4H`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Timer4HighBytes {
    /// Bits 9..8 of `TCNT4`.
    pub tcnt: u8,
    /// Bits 9..8 of `OCR4A`.
    pub ocr4a: u8,
    /// Bits 9..8 of `OCR4C`.
    pub ocr4c: u8,
}

/// Timer0/timer3 divider for a `TCCRnB` value.
#[must_use]
pub const fn prescaler(tccrb: u8) -> u64 {
    PRESCALER_TABLE[(tccrb & 0x07) as usize]
}

/// Timer4 divider for a `TCCR4B` value: `CS4[3:0]` selects `2^(cs-1)`.
#[must_use]
pub const fn timer4_prescaler(tccr4b: u8) -> u64 {
    match tccr4b & 0x0F {
        0 => 0,
        cs => 1 << (cs - 1),
    }
}

/// Ticks of a `div` clock between `last` and `now`.
#[must_use]
pub const fn elapsed_ticks(last: u64, now: u64, div: u64) -> u64 {
    if div == 0 {
        return 0;
    }
    (now / div).saturating_sub(last / div)
}

/// Cycles from `now` until the `ticks`-th tick of a `div` clock.
#[must_use]
pub const fn cycles_until_tick(now: u64, div: u64, ticks: u64) -> u64 {
    ((now / div) + ticks) * div - now
}

/// Up-counter that clears after `top` and, when above `top`, wraps at `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Counter {
    /// Current count.
    pub value: u32,
    /// Last value before clearing to zero.
    pub top: u32,
    /// Register width limit.
    pub max: u32,
}

impl Counter {
    /// Ticks until the counter next steps onto `target`, or `None` if it
    /// never does.
    #[must_use]
    pub const fn ticks_until(self, target: u32) -> Option<u64> {
        let Self { value, top, max } = self;
        if target > max {
            return None;
        }
        if value <= top {
            if target > top {
                None
            } else if target > value {
                Some((target - value) as u64)
            } else {
                Some((top - value) as u64 + 1 + target as u64)
            }
        } else if target > value {
            Some((target - value) as u64)
        } else if target <= top {
            Some((max - value) as u64 + 1 + target as u64)
        } else {
            None
        }
    }

    /// How many times the counter steps onto `target` within `ticks`.
    #[must_use]
    pub const fn landings(self, target: u32, ticks: u64) -> u64 {
        match self.ticks_until(target) {
            Some(first) if ticks >= first => {
                if target <= self.top {
                    1 + (ticks - first) / (self.top as u64 + 1)
                } else {
                    1
                }
            }
            _ => 0,
        }
    }

    /// Ticks until the counter wraps from `max` to zero, or `None` if it
    /// clears at `top` first forever.
    #[must_use]
    pub const fn ticks_until_wrap(self) -> Option<u64> {
        if self.top == self.max {
            self.ticks_until(0)
        } else if self.value > self.top {
            Some((self.max - self.value) as u64 + 1)
        } else {
            None
        }
    }

    /// Whether the counter wraps from `max` within `ticks`.
    #[must_use]
    pub const fn wraps_within(self, ticks: u64) -> bool {
        match self.ticks_until_wrap() {
            Some(first) => ticks >= first,
            None => false,
        }
    }

    /// Counter value after `ticks`.
    #[must_use]
    pub const fn advanced(self, ticks: u64) -> u32 {
        if self.value <= self.top {
            ((self.value as u64 + ticks) % (self.top as u64 + 1)) as u32
        } else {
            let to_wrap = (self.max - self.value) as u64 + 1;
            if ticks < to_wrap {
                self.value + ticks as u32
            } else {
                ((ticks - to_wrap) % (self.top as u64 + 1)) as u32
            }
        }
    }
}

fn timer0_counter(space: &DataSpace) -> Counter {
    Counter {
        value: u32::from(space.raw(TCNT0)),
        top: 0xFF,
        max: 0xFF,
    }
}

fn timer3_counter(space: &DataSpace) -> Counter {
    let value = u32::from(u16::from_le_bytes([space.raw(TCNT3L), space.raw(TCNT3H)]));
    let top = if space.raw(TCCR3B) & WGM32 != 0 {
        timer3_compare(space)
    } else {
        0xFFFF
    };
    Counter {
        value,
        top,
        max: 0xFFFF,
    }
}

fn timer3_compare(space: &DataSpace) -> u32 {
    u32::from(u16::from_le_bytes([space.raw(OCR3AL), space.raw(OCR3AH)]))
}

fn timer4_counter(space: &DataSpace) -> Counter {
    Counter {
        value: u32::from(u16::from_le_bytes([space.raw(TCNT4), space.timer4_high.tcnt & 0x03])),
        top: u32::from(u16::from_le_bytes([space.raw(OCR4C), space.timer4_high.ocr4c & 0x03])),
        max: 0x03FF,
    }
}

fn timer4_compare(space: &DataSpace) -> u32 {
    u32::from(u16::from_le_bytes([space.raw(OCR4A), space.timer4_high.ocr4a & 0x03]))
}

/// Brings timer0 up to `now`.
pub fn catch_up_timer0(space: &mut DataSpace, now: u64) {
    let ticks = elapsed_ticks(space.last.timer0, now, prescaler(space.raw(TCCR0B)));
    space.last.timer0 = now;
    if ticks == 0 {
        return;
    }
    let counter = timer0_counter(space);
    if counter.wraps_within(ticks) {
        space.set_raw_bits(TIFR0, TOV0);
        trace!(now, "timer0 overflow");
    }
    space.set_raw(TCNT0, counter.advanced(ticks) as u8);
}

/// Brings timer3 up to `now`.
pub fn catch_up_timer3(space: &mut DataSpace, now: u64) {
    let ticks = elapsed_ticks(space.last.timer3, now, prescaler(space.raw(TCCR3B)));
    space.last.timer3 = now;
    if ticks == 0 {
        return;
    }
    let counter = timer3_counter(space);
    if counter.landings(timer3_compare(space), ticks) > 0 {
        space.set_raw_bits(TIFR3, OCF3A);
        trace!(now, "timer3 compare match A");
    }
    if counter.wraps_within(ticks) {
        space.set_raw_bits(TIFR3, TOV3);
        trace!(now, "timer3 overflow");
    }
    let [low, high] = (counter.advanced(ticks) as u16).to_le_bytes();
    space.set_raw(TCNT3L, low);
    space.set_raw(TCNT3H, high);
}

/// Brings timer4 up to `now`, toggling the OC4A pins on compare matches.
pub fn catch_up_timer4(space: &mut DataSpace, now: u64) {
    let ticks = elapsed_ticks(space.last.timer4, now, timer4_prescaler(space.raw(TCCR4B)));
    space.last.timer4 = now;
    if ticks == 0 {
        return;
    }
    let counter = timer4_counter(space);
    let matches = counter.landings(timer4_compare(space), ticks);
    if matches > 0 {
        space.set_raw_bits(TIFR4, OCF4A);
        trace!(now, matches, "timer4 compare match A");
    }
    if counter.landings(0, ticks) > 0 {
        space.set_raw_bits(TIFR4, TOV4);
        trace!(now, "timer4 overflow");
    }
    let [low, high] = (counter.advanced(ticks) as u16).to_le_bytes();
    space.set_raw(TCNT4, low);
    space.timer4_high.tcnt = high & 0x03;

    if matches % 2 == 1 {
        toggle_oc4a(space);
    }
}

fn toggle_oc4a(space: &mut DataSpace) {
    let tccr4a = space.raw(TCCR4A);
    if (tccr4a >> COM4A_SHIFT) & 0x03 != 0b01 {
        return;
    }
    let ddrc = space.raw(DDRC);
    let mut toggle = 0;
    if ddrc & 0x80 != 0 {
        toggle |= 0x80;
    }
    if ddrc & 0x40 != 0 && tccr4a & PWM4A != 0 {
        toggle |= 0x40;
    }
    if toggle == 0 {
        return;
    }
    let old = space.raw(PORTC);
    let new = old ^ toggle;
    space.set_raw(PORTC, new);
    space.listener.on_pin_change(Port::C, old, new);
}

/// Catches up all three timers.
pub fn catch_up_timers(space: &mut DataSpace, now: u64) {
    catch_up_timer0(space, now);
    catch_up_timer3(space, now);
    catch_up_timer4(space, now);
}

fn armed(space: &DataSpace, flags: u16, mask: u16, bit: u8) -> bool {
    space.raw(mask) & bit != 0 && space.raw(flags) & bit == 0
}

fn to_cycles(now: u64, div: u64, ticks: Option<u64>) -> u64 {
    match ticks {
        Some(ticks) if div != 0 => cycles_until_tick(now, div, ticks),
        _ => u64::MAX,
    }
}

/// Cycles until the next armed timer interrupt source fires.
///
/// Timers must already be caught up to `now`.
#[must_use]
pub fn cycles_to_next_timer_event(space: &DataSpace, now: u64) -> u64 {
    let mut next = u64::MAX;

    if armed(space, TIFR0, TIMSK0, TOV0) {
        let div = prescaler(space.raw(TCCR0B));
        next = next.min(to_cycles(now, div, timer0_counter(space).ticks_until_wrap()));
    }

    let div3 = prescaler(space.raw(TCCR3B));
    let counter3 = timer3_counter(space);
    if armed(space, TIFR3, TIMSK3, OCF3A) {
        next = next.min(to_cycles(now, div3, counter3.ticks_until(timer3_compare(space))));
    }
    if armed(space, TIFR3, TIMSK3, TOV3) {
        next = next.min(to_cycles(now, div3, counter3.ticks_until_wrap()));
    }

    let div4 = timer4_prescaler(space.raw(TCCR4B));
    let counter4 = timer4_counter(space);
    if armed(space, TIFR4, TIMSK4, OCF4A) {
        next = next.min(to_cycles(now, div4, counter4.ticks_until(timer4_compare(space))));
    }
    if armed(space, TIFR4, TIMSK4, TOV4) {
        next = next.min(to_cycles(now, div4, counter4.ticks_until(0)));
    }

    next
}

/// Latches `TC4H` into the high bits of a 10-bit timer4 register on write.
pub fn latch_timer4_high(space: &mut DataSpace, addr: u16) {
    let high = space.raw(crate::memory::io::TC4H) & 0x03;
    match addr {
        TCNT4 => space.timer4_high.tcnt = high,
        OCR4A => space.timer4_high.ocr4a = high,
        OCR4C => space.timer4_high.ocr4c = high,
        _ => {}
    }
}
