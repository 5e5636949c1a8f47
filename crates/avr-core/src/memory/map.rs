//! Fixed ATmega32u4 data-space region map and decoding helpers.

/// Inclusive start address of the general-purpose register file.
pub const REGISTERS_START: u16 = 0x0000;
/// Inclusive end address of the general-purpose register file.
pub const REGISTERS_END: u16 = 0x001F;
/// Inclusive start address of the 64 I/O registers.
pub const IO_START: u16 = 0x0020;
/// Inclusive end address of the 64 I/O registers.
pub const IO_END: u16 = 0x005F;
/// Inclusive start address of the extended I/O registers.
pub const EXT_IO_START: u16 = 0x0060;
/// Inclusive end address of the extended I/O registers.
pub const EXT_IO_END: u16 = 0x00FF;
/// Inclusive start address of internal SRAM.
pub const SRAM_START: u16 = 0x0100;
/// Inclusive end address of internal SRAM (`RAMEND`).
pub const SRAM_END: u16 = 0x0AFF;

/// Size in bytes of the unified data space.
pub const DATA_SIZE: usize = SRAM_END as usize + 1;
/// Size in bytes of program flash.
pub const FLASH_SIZE: usize = 0x8000;
/// Size in 16-bit words of program flash.
pub const FLASH_WORDS: usize = FLASH_SIZE / 2;
/// Size in bytes of the EEPROM.
pub const EEPROM_SIZE: usize = 0x0400;
/// Offset between an `IN`/`OUT` I/O address and its data-space address.
pub const IO_OFFSET: u16 = IO_START;

/// Canonical fixed-region descriptor for the data-space map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionDescriptor {
    /// Region classification.
    pub region: MemoryRegion,
    /// Inclusive start address.
    pub start: u16,
    /// Inclusive end address.
    pub end: u16,
}

/// Region classification for data-space addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryRegion {
    /// R0–R31 (`0x0000..=0x001F`).
    Registers,
    /// I/O space reachable by `IN`/`OUT` (`0x0020..=0x005F`).
    Io,
    /// Extended I/O reachable only by loads/stores (`0x0060..=0x00FF`).
    ExtendedIo,
    /// Internal SRAM and stack (`0x0100..=0x0AFF`).
    Sram,
    /// Anything above `RAMEND`.
    Unmapped,
}

impl MemoryRegion {
    /// Returns the inclusive bounds for this region.
    #[must_use]
    pub const fn bounds(self) -> (u16, u16) {
        match self {
            Self::Registers => (REGISTERS_START, REGISTERS_END),
            Self::Io => (IO_START, IO_END),
            Self::ExtendedIo => (EXT_IO_START, EXT_IO_END),
            Self::Sram => (SRAM_START, SRAM_END),
            Self::Unmapped => (SRAM_END + 1, u16::MAX),
        }
    }

    /// Returns `true` when `addr` belongs to this region.
    #[must_use]
    pub const fn contains(self, addr: u16) -> bool {
        let (start, end) = self.bounds();
        addr >= start && addr <= end
    }

    /// Returns `true` for the two register windows that carry side effects.
    #[must_use]
    pub const fn is_memory_mapped_io(self) -> bool {
        matches!(self, Self::Io | Self::ExtendedIo)
    }

    /// Returns the canonical descriptor for this region.
    #[must_use]
    pub const fn descriptor(self) -> RegionDescriptor {
        let (start, end) = self.bounds();
        RegionDescriptor {
            region: self,
            start,
            end,
        }
    }
}

/// Canonical region layout in ascending address order.
pub const FIXED_MEMORY_REGIONS: [RegionDescriptor; 5] = [
    MemoryRegion::Registers.descriptor(),
    MemoryRegion::Io.descriptor(),
    MemoryRegion::ExtendedIo.descriptor(),
    MemoryRegion::Sram.descriptor(),
    MemoryRegion::Unmapped.descriptor(),
];

const _: () = assert_fixed_region_layout();

const fn assert_fixed_region_layout() {
    assert!(
        FIXED_MEMORY_REGIONS[0].start == 0,
        "register file must start the data space"
    );
    assert!(
        FIXED_MEMORY_REGIONS[4].end == u16::MAX,
        "regions must cover the 16-bit address space"
    );

    let mut index = 0;
    while index < FIXED_MEMORY_REGIONS.len() {
        let descriptor = FIXED_MEMORY_REGIONS[index];
        assert!(
            descriptor.start <= descriptor.end,
            "region start cannot be greater than end"
        );

        if index > 0 {
            let previous = FIXED_MEMORY_REGIONS[index - 1];
            assert!(
                previous.end.wrapping_add(1) == descriptor.start,
                "fixed regions must be contiguous"
            );
        }

        index += 1;
    }

    assert!(
        DATA_SIZE == 32 + 64 + 160 + 2560,
        "data space is registers + io + extended io + sram"
    );
}

/// Decodes a data-space address into its region.
#[must_use]
pub const fn decode_memory_region(addr: u16) -> MemoryRegion {
    match addr {
        REGISTERS_START..=REGISTERS_END => MemoryRegion::Registers,
        IO_START..=IO_END => MemoryRegion::Io,
        EXT_IO_START..=EXT_IO_END => MemoryRegion::ExtendedIo,
        SRAM_START..=SRAM_END => MemoryRegion::Sram,
        _ => MemoryRegion::Unmapped,
    }
}
