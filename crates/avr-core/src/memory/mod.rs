//! Memory model primitives and fixed address-space policies.

/// Range checks for data, flash, EEPROM and stack accesses.
pub mod access;
/// Unified data space with I/O side effects and the stack.
pub mod data_space;
/// Read-only program flash.
pub mod flash;
/// Hooked I/O register addresses and bit positions.
pub mod io;
/// Fixed memory-region map and address decoder.
pub mod map;

pub use access::{
    validate_data_access, validate_eeprom_access, validate_flash_access, validate_stack_access,
};
pub use data_space::{DataSpace, LastSet};
pub use flash::{Flash, PC_MASK};
pub use map::{
    decode_memory_region, MemoryRegion, RegionDescriptor, DATA_SIZE, EEPROM_SIZE, EXT_IO_END,
    EXT_IO_START, FIXED_MEMORY_REGIONS, FLASH_SIZE, FLASH_WORDS, IO_END, IO_OFFSET, IO_START,
    REGISTERS_END, REGISTERS_START, SRAM_END, SRAM_START,
};
