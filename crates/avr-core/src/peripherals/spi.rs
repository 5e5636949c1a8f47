use tracing::trace;

use crate::memory::io::{SPDR, SPIF, SPSR};
use crate::DataSpace;

/// Shifts a written byte through the attached device. Without a device the
/// data register reads back zero. `SPIF` is set either way.
pub fn write_spdr(space: &mut DataSpace, value: u8) {
    let response = space.listener.spi_transfer(value).unwrap_or(0);
    space.set_raw(SPDR, response);
    space.set_raw_bits(SPSR, SPIF);
    trace!(out = value, response, "spi transfer");
}

/// Reading the data register acknowledges the transfer.
pub fn after_spdr_read(space: &mut DataSpace) {
    space.clear_raw_bits(SPSR, SPIF);
}
