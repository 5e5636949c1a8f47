//! EEPROM control register (`EECR`) with the `EEMPE` write-enable window.

use tracing::trace;

use crate::memory::access::validate_eeprom_access;
use crate::memory::io::{EEARH, EEARL, EECR, EEDR, EEMPE, EEPE, EEPM_SHIFT, EERE};
use crate::{DataSpace, FaultCode};

/// Cycles after setting `EEMPE` during which `EEPE` starts a write.
pub const EEMPE_WINDOW_CYCLES: u64 = 4;

fn address(space: &DataSpace) -> u16 {
    u16::from_le_bytes([space.raw(EEARL), space.raw(EEARH)])
}

/// Clears `EEMPE` once its window has expired.
pub fn refresh(space: &mut DataSpace, now: u64) {
    if space.raw(EECR) & EEMPE != 0
        && now.saturating_sub(space.last.eempe) >= EEMPE_WINDOW_CYCLES
    {
        space.clear_raw_bits(EECR, EEMPE);
    }
}

/// Stores an `EECR` write and performs the requested read, erase or write.
///
/// # Errors
///
/// Returns [`FaultCode::EepromAddressOutOfRange`] when a read or write is
/// triggered with `EEAR` past the end of the EEPROM.
pub fn write_eecr(space: &mut DataSpace, value: u8, now: u64) -> Result<(), FaultCode> {
    refresh(space, now);
    let old = space.raw(EECR);
    let master_enabled = old & EEMPE != 0;
    space.set_raw(EECR, value);

    if value & EEMPE != 0 && !master_enabled {
        space.last.eempe = now;
    }

    // Strobes complete (or abort) within the write, even when EEAR faults.
    if value & EERE != 0 {
        space.clear_raw_bits(EECR, EERE);
    }
    if value & EEPE != 0 {
        space.clear_raw_bits(EECR, EEPE | EEMPE);
    }

    if value & EERE != 0 {
        let index = validate_eeprom_access(address(space))?;
        space.set_raw(EEDR, space.eeprom[index]);
    }

    if value & EEPE != 0 && master_enabled && value & EEMPE != 0 {
        let index = validate_eeprom_access(address(space))?;
        let data = space.raw(EEDR);
        let cell = &mut space.eeprom[index];
        match (value >> EEPM_SHIFT) & 0x03 {
            0b00 => *cell = data,
            0b01 => *cell = 0xFF,
            0b10 => *cell &= data,
            _ => {}
        }
        trace!(index, data, "eeprom programmed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{write_eecr, EEMPE_WINDOW_CYCLES};
    use crate::memory::io::{EEARH, EEARL, EECR, EEDR, EEMPE, EEPE, EERE};
    use crate::{DataSpace, FaultCode};

    fn primed(addr: u16, data: u8) -> DataSpace {
        let mut space = DataSpace::default();
        let [low, high] = addr.to_le_bytes();
        space.set_raw(EEARL, low);
        space.set_raw(EEARH, high);
        space.set_raw(EEDR, data);
        space
    }

    #[test]
    fn master_enable_then_enable_programs_the_cell() {
        let mut space = primed(0x10, 0x42);
        write_eecr(&mut space, EEMPE, 100).unwrap();
        write_eecr(&mut space, EEMPE | EEPE, 102).unwrap();
        assert_eq!(space.eeprom()[0x10], 0x42);
        assert_eq!(space.raw(EECR) & (EEPE | EEMPE), 0);
    }

    #[test]
    fn enable_without_master_enable_is_ignored() {
        let mut space = primed(0x10, 0x42);
        write_eecr(&mut space, EEPE, 0).unwrap();
        assert_eq!(space.eeprom()[0x10], 0xFF);
    }

    #[test]
    fn master_enable_expires_after_window() {
        let mut space = primed(0x10, 0x42);
        write_eecr(&mut space, EEMPE, 100).unwrap();
        write_eecr(&mut space, EEMPE | EEPE, 100 + EEMPE_WINDOW_CYCLES).unwrap();
        assert_eq!(space.eeprom()[0x10], 0xFF);
    }

    #[test]
    fn erase_only_and_write_only_modes() {
        let mut space = primed(3, 0x0F);
        space.eeprom[3] = 0x3C;
        write_eecr(&mut space, EEMPE | (0b10 << 4), 0).unwrap();
        write_eecr(&mut space, EEMPE | EEPE | (0b10 << 4), 1).unwrap();
        assert_eq!(space.eeprom()[3], 0x0C);
        write_eecr(&mut space, EEMPE | (0b01 << 4), 2).unwrap();
        write_eecr(&mut space, EEMPE | EEPE | (0b01 << 4), 3).unwrap();
        assert_eq!(space.eeprom()[3], 0xFF);
    }

    #[test]
    fn read_enable_loads_eedr() {
        let mut space = primed(7, 0);
        space.eeprom[7] = 0x99;
        write_eecr(&mut space, EERE, 0).unwrap();
        assert_eq!(space.raw(EEDR), 0x99);
        assert_eq!(space.raw(EECR) & EERE, 0);
    }

    #[test]
    fn out_of_range_address_faults() {
        let mut space = primed(0x0400, 0);
        assert_eq!(
            write_eecr(&mut space, EERE, 0),
            Err(FaultCode::EepromAddressOutOfRange)
        );
    }

    #[test]
    fn faulting_strobes_do_not_stay_latched() {
        let mut space = primed(0x0400, 0x42);
        assert_eq!(
            write_eecr(&mut space, EERE, 0),
            Err(FaultCode::EepromAddressOutOfRange)
        );
        assert_eq!(space.raw(EECR) & EERE, 0);

        write_eecr(&mut space, EEMPE, 10).unwrap();
        assert_eq!(
            write_eecr(&mut space, EEMPE | EEPE, 11),
            Err(FaultCode::EepromAddressOutOfRange)
        );
        assert_eq!(space.raw(EECR) & (EERE | EEPE | EEMPE), 0);
    }
}
