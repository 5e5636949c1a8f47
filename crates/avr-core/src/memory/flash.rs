//! Read-only program memory.

use crate::memory::access::validate_flash_access;
use crate::{FaultCode, FLASH_SIZE, FLASH_WORDS};

/// Mask applied to every program-counter update; the 14-bit PC wraps.
pub const PC_MASK: u16 = (FLASH_WORDS - 1) as u16;

/// 32 KiB program flash, loaded once and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    bytes: Box<[u8]>,
    has_program: bool,
}

impl Default for Flash {
    fn default() -> Self {
        Self {
            bytes: vec![0; FLASH_SIZE].into_boxed_slice(),
            has_program: false,
        }
    }
}

impl Flash {
    /// Creates an empty flash array with no program.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a raw image, truncating or zero-padding it to the flash size.
    ///
    /// Returns the number of image bytes that were kept.
    pub fn load(&mut self, image: &[u8]) -> usize {
        let kept = image.len().min(FLASH_SIZE);
        self.bytes[..kept].copy_from_slice(&image[..kept]);
        self.bytes[kept..].fill(0);
        self.has_program = true;
        kept
    }

    /// Returns `true` once a program image has been loaded.
    #[must_use]
    pub const fn has_program(&self) -> bool {
        self.has_program
    }

    /// Reads the little-endian program word at a word address.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::FlashAddressOutOfRange`] for word addresses past
    /// the end of flash.
    pub fn read_word(&self, word_addr: u16) -> Result<u16, FaultCode> {
        let index = validate_flash_access(u32::from(word_addr) * 2)?;
        Ok(u16::from_le_bytes([self.bytes[index], self.bytes[index + 1]]))
    }

    /// Reads one byte of program memory, as `LPM`/`ELPM` do.
    ///
    /// # Errors
    ///
    /// Returns [`FaultCode::FlashAddressOutOfRange`] for byte addresses past
    /// the end of flash.
    pub fn read_byte(&self, byte_addr: u32) -> Result<u8, FaultCode> {
        let index = validate_flash_access(byte_addr)?;
        Ok(self.bytes[index])
    }

    /// Raw view of the whole flash array.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

#[cfg(test)]
mod tests {
    use super::{Flash, PC_MASK};
    use crate::{FaultCode, FLASH_SIZE};

    #[test]
    fn empty_flash_has_no_program() {
        let flash = Flash::new();
        assert!(!flash.has_program());
        assert_eq!(flash.as_bytes().len(), FLASH_SIZE);
    }

    #[test]
    fn words_are_little_endian() {
        let mut flash = Flash::new();
        flash.load(&[0x05, 0xE0, 0x13, 0xE0]);
        assert!(flash.has_program());
        assert_eq!(flash.read_word(0), Ok(0xE005));
        assert_eq!(flash.read_word(1), Ok(0xE013));
        assert_eq!(flash.read_byte(1), Ok(0xE0));
    }

    #[test]
    fn oversized_images_are_truncated() {
        let mut flash = Flash::new();
        let image = vec![0xAA; FLASH_SIZE + 100];
        assert_eq!(flash.load(&image), FLASH_SIZE);
        assert_eq!(flash.read_word(PC_MASK), Ok(0xAAAA));
    }

    #[test]
    fn reload_zero_pads_previous_contents() {
        let mut flash = Flash::new();
        flash.load(&[0xFF; 16]);
        flash.load(&[0x11, 0x22]);
        assert_eq!(flash.read_word(0), Ok(0x2211));
        assert_eq!(flash.read_word(1), Ok(0x0000));
    }

    #[test]
    fn reads_past_the_end_fault() {
        let flash = Flash::new();
        assert_eq!(
            flash.read_word(PC_MASK + 1),
            Err(FaultCode::FlashAddressOutOfRange)
        );
        assert_eq!(
            flash.read_byte(0x8000),
            Err(FaultCode::FlashAddressOutOfRange)
        );
    }
}
