//! Deterministic binary snapshots of a machine.
//!
//! Layout (little-endian): magic `AVRS`, version `u16`, a header flag byte,
//! CPU state, status flags, peripheral timestamps and latches, then the raw
//! data space and EEPROM. When the checksum flag is set an FNV-1a hash of
//! everything before it trails the payload. Flash is host-owned and is not
//! part of a snapshot; neither are the transient scheduler fields
//! (`target_cycles`, `break_out`).

use thiserror::Error;

use crate::peripherals::Timer4HighBytes;
use crate::{LastSet, Machine, RunState, StatusFlags, DATA_SIZE, EEPROM_SIZE, PC_MASK};

/// Leading bytes of every snapshot.
pub const SNAPSHOT_MAGIC: [u8; 4] = *b"AVRS";

const HEADER_CHECKSUM: u8 = 0x01;
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01B3;

/// Snapshot schema version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[repr(u16)]
pub enum SnapshotVersion {
    /// Initial layout.
    V1 = 1,
}

impl SnapshotVersion {
    /// Converts a wire value to a known snapshot version.
    #[must_use]
    pub const fn from_u16(version: u16) -> Option<Self> {
        match version {
            1 => Some(Self::V1),
            _ => None,
        }
    }
}

/// Reasons a snapshot cannot be restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// The buffer does not start with [`SNAPSHOT_MAGIC`].
    #[error("not a machine snapshot")]
    BadMagic,
    /// The schema version is not understood by this build.
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u16),
    /// The buffer ends before the layout does.
    #[error("snapshot truncated at byte {0}")]
    Truncated(usize),
    /// Bytes remain after the layout and optional checksum.
    #[error("{0} trailing bytes after snapshot")]
    TrailingBytes(usize),
    /// The stored checksum does not match the payload.
    #[error("snapshot checksum mismatch: stored {stored:#018x}, computed {computed:#018x}")]
    ChecksumMismatch {
        /// Checksum read from the trailer.
        stored: u64,
        /// Checksum computed over the payload.
        computed: u64,
    },
    /// The program counter lies outside flash.
    #[error("program counter {0:#06x} outside flash")]
    InvalidProgramCounter(u16),
    /// The run-state tag or its fault code is unknown.
    #[error("invalid run state tag {tag} (code {code})")]
    InvalidRunState {
        /// Run-state tag byte.
        tag: u8,
        /// Fault code byte for halted states.
        code: u8,
    },
}

/// FNV-1a over `bytes`, continuing from `hash`.
#[must_use]
pub fn fnv1a(mut hash: u64, bytes: &[u8]) -> u64 {
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], SnapshotError> {
        let end = self.offset + len;
        let slice = self
            .bytes
            .get(self.offset..end)
            .ok_or(SnapshotError::Truncated(self.bytes.len()))?;
        self.offset = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], SnapshotError> {
        let mut out = [0; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, SnapshotError> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16, SnapshotError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, SnapshotError> {
        Ok(u64::from_le_bytes(self.array()?))
    }
}

/// Fully parsed snapshot, applied only after every field validated.
struct Decoded<'a> {
    pc: u16,
    cycles: u64,
    pending: u64,
    inside_interrupt: bool,
    run_state: RunState,
    flags: StatusFlags,
    last: LastSet,
    timer4_high: Timer4HighBytes,
    analog_input: u16,
    pin_inputs: [u8; 5],
    data: &'a [u8],
    eeprom: &'a [u8],
}

fn decode(bytes: &[u8]) -> Result<Decoded<'_>, SnapshotError> {
    let mut reader = Reader::new(bytes);
    if reader.array::<4>()? != SNAPSHOT_MAGIC {
        return Err(SnapshotError::BadMagic);
    }
    let version = reader.u16()?;
    if SnapshotVersion::from_u16(version).is_none() {
        return Err(SnapshotError::UnsupportedVersion(version));
    }
    let header = reader.u8()?;

    let pc = reader.u16()?;
    if pc & !PC_MASK != 0 {
        return Err(SnapshotError::InvalidProgramCounter(pc));
    }
    let cycles = reader.u64()?;
    let pending = reader.u64()?;
    let inside_interrupt = reader.u8()? != 0;
    let tag = reader.u8()?;
    let code = reader.u8()?;
    let run_state =
        RunState::from_tag(tag, code).ok_or(SnapshotError::InvalidRunState { tag, code })?;
    let flags = StatusFlags::from_byte(reader.u8()?);
    let last = LastSet {
        eempe: reader.u64()?,
        pll: reader.u64()?,
        adc: reader.u64()?,
        timer0: reader.u64()?,
        timer3: reader.u64()?,
        timer4: reader.u64()?,
    };
    let timer4_high = Timer4HighBytes {
        tcnt: reader.u8()?,
        ocr4a: reader.u8()?,
        ocr4c: reader.u8()?,
    };
    let analog_input = reader.u16()?;
    let pin_inputs = reader.array()?;
    let data = reader.take(DATA_SIZE)?;
    let eeprom = reader.take(EEPROM_SIZE)?;

    if header & HEADER_CHECKSUM != 0 {
        let computed = fnv1a(FNV_OFFSET, &bytes[..reader.offset]);
        let stored = reader.u64()?;
        if stored != computed {
            return Err(SnapshotError::ChecksumMismatch { stored, computed });
        }
    }
    let rest = bytes.len() - reader.offset;
    if rest != 0 {
        return Err(SnapshotError::TrailingBytes(rest));
    }

    Ok(Decoded {
        pc,
        cycles,
        pending,
        inside_interrupt,
        run_state,
        flags,
        last,
        timer4_high,
        analog_input,
        pin_inputs,
        data,
        eeprom,
    })
}

impl Machine {
    /// Serializes the machine. Peripherals are brought up to date first, so
    /// two machines that agree on observable state produce identical bytes.
    pub fn snapshot(&mut self, with_checksum: bool) -> Vec<u8> {
        self.data.sync_all(self.cpu.cycles);

        let space = &self.data;
        let (tag, code) = self.cpu.run_state.to_tag();
        let mut out = Vec::with_capacity(96 + space.data.len() + space.eeprom.len());
        out.extend_from_slice(&SNAPSHOT_MAGIC);
        out.extend_from_slice(&(SnapshotVersion::V1 as u16).to_le_bytes());
        out.push(if with_checksum { HEADER_CHECKSUM } else { 0 });

        out.extend_from_slice(&self.cpu.pc.to_le_bytes());
        out.extend_from_slice(&self.cpu.cycles.to_le_bytes());
        out.extend_from_slice(&self.cpu.pending.to_le_bytes());
        out.push(u8::from(self.cpu.inside_interrupt));
        out.extend_from_slice(&[tag, code]);
        out.push(space.flags.to_byte());
        for stamp in [
            space.last.eempe,
            space.last.pll,
            space.last.adc,
            space.last.timer0,
            space.last.timer3,
            space.last.timer4,
        ] {
            out.extend_from_slice(&stamp.to_le_bytes());
        }
        out.extend_from_slice(&[
            space.timer4_high.tcnt,
            space.timer4_high.ocr4a,
            space.timer4_high.ocr4c,
        ]);
        out.extend_from_slice(&space.analog_input.to_le_bytes());
        out.extend_from_slice(&space.pin_inputs);
        out.extend_from_slice(&space.data);
        out.extend_from_slice(&space.eeprom);

        if with_checksum {
            let hash = fnv1a(FNV_OFFSET, &out);
            out.extend_from_slice(&hash.to_le_bytes());
        }
        out
    }

    /// Restores state written by [`Machine::snapshot`]. Flash, configuration
    /// and installed hooks are kept. On error the machine is unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError`] when the bytes are not a complete snapshot
    /// of a supported version or the checksum does not match.
    pub fn restore(&mut self, bytes: &[u8]) -> Result<(), SnapshotError> {
        let decoded = decode(bytes)?;

        self.cpu.pc = decoded.pc;
        self.cpu.cycles = decoded.cycles;
        self.cpu.target_cycles = decoded.cycles;
        self.cpu.pending = decoded.pending;
        self.cpu.inside_interrupt = decoded.inside_interrupt;
        self.cpu.break_out = false;
        self.cpu.run_state = decoded.run_state;

        let space = &mut self.data;
        space.flags = decoded.flags;
        space.last = decoded.last;
        space.timer4_high = decoded.timer4_high;
        space.analog_input = decoded.analog_input;
        space.pin_inputs = decoded.pin_inputs;
        space.data.copy_from_slice(decoded.data);
        space.eeprom.copy_from_slice(decoded.eeprom);
        space.horizon_stale = false;
        Ok(())
    }
}
