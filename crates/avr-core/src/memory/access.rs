//! Range checks for every address space the core touches.

use crate::{FaultCode, DATA_SIZE, EEPROM_SIZE, FLASH_SIZE, SRAM_END, SRAM_START};

/// Validates a data-space byte address and returns it as an index.
///
/// # Errors
///
/// Returns [`FaultCode::DataAddressOutOfRange`] when `addr` is above `RAMEND`.
pub const fn validate_data_access(addr: u16) -> Result<usize, FaultCode> {
    if (addr as usize) < DATA_SIZE {
        Ok(addr as usize)
    } else {
        Err(FaultCode::DataAddressOutOfRange)
    }
}

/// Validates a program-memory byte address and returns it as an index.
///
/// # Errors
///
/// Returns [`FaultCode::FlashAddressOutOfRange`] when `addr` is past the end
/// of flash.
pub const fn validate_flash_access(addr: u32) -> Result<usize, FaultCode> {
    if (addr as usize) < FLASH_SIZE {
        Ok(addr as usize)
    } else {
        Err(FaultCode::FlashAddressOutOfRange)
    }
}

/// Validates an EEPROM byte address and returns it as an index.
///
/// # Errors
///
/// Returns [`FaultCode::EepromAddressOutOfRange`] when `addr` is past the end
/// of the EEPROM.
pub const fn validate_eeprom_access(addr: u16) -> Result<usize, FaultCode> {
    if (addr as usize) < EEPROM_SIZE {
        Ok(addr as usize)
    } else {
        Err(FaultCode::EepromAddressOutOfRange)
    }
}

/// Validates that a stack access at `sp` lands in SRAM.
///
/// # Errors
///
/// Returns [`FaultCode::StackOutOfRange`] when `sp` is outside
/// `SRAM_START..=RAMEND`.
pub const fn validate_stack_access(sp: u16) -> Result<usize, FaultCode> {
    if sp >= SRAM_START && sp <= SRAM_END {
        Ok(sp as usize)
    } else {
        Err(FaultCode::StackOutOfRange)
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        validate_data_access, validate_eeprom_access, validate_flash_access,
        validate_stack_access, FaultCode, DATA_SIZE, EEPROM_SIZE, FLASH_SIZE, SRAM_END,
        SRAM_START,
    };

    #[test]
    fn data_access_accepts_whole_data_space() {
        assert_eq!(validate_data_access(0), Ok(0));
        assert_eq!(validate_data_access(SRAM_END), Ok(DATA_SIZE - 1));
        assert_eq!(
            validate_data_access(SRAM_END + 1),
            Err(FaultCode::DataAddressOutOfRange)
        );
    }

    #[test]
    fn flash_access_stops_at_32k() {
        assert!(validate_flash_access(0).is_ok());
        assert!(validate_flash_access(u32::try_from(FLASH_SIZE - 1).unwrap()).is_ok());
        assert_eq!(
            validate_flash_access(u32::try_from(FLASH_SIZE).unwrap()),
            Err(FaultCode::FlashAddressOutOfRange)
        );
    }

    #[test]
    fn eeprom_access_stops_at_1k() {
        assert!(validate_eeprom_access(0x03FF).is_ok());
        assert_eq!(
            validate_eeprom_access(u16::try_from(EEPROM_SIZE).unwrap()),
            Err(FaultCode::EepromAddressOutOfRange)
        );
    }

    #[test]
    fn stack_must_live_in_sram() {
        assert!(validate_stack_access(SRAM_START).is_ok());
        assert!(validate_stack_access(SRAM_END).is_ok());
        assert_eq!(
            validate_stack_access(SRAM_START - 1),
            Err(FaultCode::StackOutOfRange)
        );
        assert_eq!(
            validate_stack_access(SRAM_END + 1),
            Err(FaultCode::StackOutOfRange)
        );
    }
}
