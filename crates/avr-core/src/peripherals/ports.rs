//! GPIO ports B–F: `PORTx` writes notify the listener, `PINx` writes toggle
//! `PORTx`, and `PINx` reads merge outputs with host-driven inputs.

use crate::api::Port;
use crate::DataSpace;

impl Port {
    /// Every port in address order.
    pub const ALL: [Self; 5] = [Self::B, Self::C, Self::D, Self::E, Self::F];

    /// Data-space address of `PINx`.
    #[must_use]
    pub const fn pin_address(self) -> u16 {
        0x23 + 3 * self as u16
    }

    /// Data-space address of `DDRx`.
    #[must_use]
    pub const fn ddr_address(self) -> u16 {
        self.pin_address() + 1
    }

    /// Data-space address of `PORTx`.
    #[must_use]
    pub const fn port_address(self) -> u16 {
        self.pin_address() + 2
    }

    /// Port whose `PINx` lives at `addr`.
    #[must_use]
    pub const fn from_pin_address(addr: u16) -> Option<Self> {
        match addr {
            0x23 => Some(Self::B),
            0x26 => Some(Self::C),
            0x29 => Some(Self::D),
            0x2C => Some(Self::E),
            0x2F => Some(Self::F),
            _ => None,
        }
    }

    /// Port whose `PORTx` lives at `addr`.
    #[must_use]
    pub const fn from_port_address(addr: u16) -> Option<Self> {
        match addr {
            0x25 => Some(Self::B),
            0x28 => Some(Self::C),
            0x2B => Some(Self::D),
            0x2E => Some(Self::E),
            0x31 => Some(Self::F),
            _ => None,
        }
    }
}

/// Recomputes `PINx`: output pins read their `PORTx` level, input pins read
/// the host-driven level.
pub fn refresh_pin(space: &mut DataSpace, port: Port) {
    let ddr = space.raw(port.ddr_address());
    let level = space.raw(port.port_address());
    let inputs = space.pin_inputs[port as usize];
    space.set_raw(port.pin_address(), (level & ddr) | (inputs & !ddr));
}

/// Stores a `PORTx` write and reports it.
pub fn write_port(space: &mut DataSpace, port: Port, value: u8) {
    let old = space.raw(port.port_address());
    space.set_raw(port.port_address(), value);
    space.listener.on_pin_change(port, old, value);
}

/// A `PINx` write toggles the `PORTx` bits that are set in `value`.
pub fn toggle_port(space: &mut DataSpace, port: Port, value: u8) {
    let old = space.raw(port.port_address());
    write_port(space, port, old ^ value);
}
