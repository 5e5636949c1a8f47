//! ADC conversion timing and PLL lock.

use tracing::trace;

use crate::memory::io::{ADCH, ADCL, ADCSRA, ADEN, ADIE, ADIF, ADPS_MASK, ADSC, PLLCSR, PLLE, PLOCK};
use crate::DataSpace;

/// ADC clock dividers selected by `ADPS[2:0]`.
pub const ADC_PRESCALERS: [u64; 8] = [2, 2, 4, 8, 16, 32, 64, 128];

/// ADC clocks per conversion.
pub const ADC_CLOCKS_PER_CONVERSION: u64 = 13;

/// CPU cycles one conversion takes at the prescaler selected in `adcsra`.
#[must_use]
pub const fn conversion_cycles(adcsra: u8) -> u64 {
    ADC_CLOCKS_PER_CONVERSION * ADC_PRESCALERS[(adcsra & ADPS_MASK) as usize]
}

/// Completes a running conversion once its time has passed.
pub fn refresh_adc(space: &mut DataSpace, now: u64) {
    let adcsra = space.raw(ADCSRA);
    if adcsra & ADSC == 0 {
        return;
    }
    if now.saturating_sub(space.last.adc) >= conversion_cycles(adcsra) {
        let [low, high] = space.analog_input.to_le_bytes();
        space.set_raw(ADCL, low);
        space.set_raw(ADCH, high);
        space.set_raw(ADCSRA, (adcsra & !ADSC) | ADIF);
        trace!(now, value = space.analog_input, "adc conversion complete");
    }
}

/// Stores an `ADCSRA` write: `ADIF` is write-one-to-clear and a rising
/// `ADSC` starts a conversion when the ADC is enabled.
pub fn write_adcsra(space: &mut DataSpace, value: u8, now: u64) {
    refresh_adc(space, now);
    let old = space.raw(ADCSRA);
    let mut stored = (value & !ADIF) | (old & ADIF & !value);
    if stored & ADEN == 0 {
        stored &= !ADSC;
    } else if old & ADSC != 0 {
        stored |= ADSC;
    } else if value & ADSC != 0 {
        space.last.adc = now;
    }
    space.set_raw(ADCSRA, stored);
}

/// Cycles until a running, interrupt-enabled conversion completes.
#[must_use]
pub fn cycles_to_adc_event(space: &DataSpace, now: u64) -> u64 {
    let adcsra = space.raw(ADCSRA);
    if adcsra & ADSC == 0 || adcsra & ADIE == 0 || adcsra & ADIF != 0 {
        return u64::MAX;
    }
    let done = space.last.adc + conversion_cycles(adcsra);
    done.saturating_sub(now).max(1)
}

/// Sets `PLOCK` once the lock time has elapsed after enabling the PLL.
pub fn refresh_pll(space: &mut DataSpace, now: u64) {
    let pllcsr = space.raw(PLLCSR);
    if pllcsr & PLLE != 0
        && pllcsr & PLOCK == 0
        && now.saturating_sub(space.last.pll) >= space.pll_lock_cycles
    {
        space.set_raw_bits(PLLCSR, PLOCK);
        trace!(now, "pll locked");
    }
}

/// Stores a `PLLCSR` write; `PLOCK` is read-only.
pub fn write_pllcsr(space: &mut DataSpace, value: u8, now: u64) {
    refresh_pll(space, now);
    let old = space.raw(PLLCSR);
    let mut stored = (value & !PLOCK) | (old & PLOCK);
    if value & PLLE == 0 {
        stored &= !PLOCK;
    } else if old & PLLE == 0 {
        stored &= !PLOCK;
        space.last.pll = now;
    }
    space.set_raw(PLLCSR, stored);
}
