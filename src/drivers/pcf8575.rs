//! PCF8575 16-bit quasi-bidirectional I/O expander.
//!
//! The chip has no registers: a 2-byte write sets all 16 pin latches
//! (P07..P00 first, then P17..P10) and a 2-byte read returns the pin levels
//! in the same order.  A pin latched high is a weak pull-up and can be
//! read as an input.
//!
//! One [`Pcf8575Bus`] drives every chip on one I2C bus; the address is
//! chosen per transaction.

use embedded_hal::i2c::{Error as _, ErrorKind, I2c};

use crate::error::BusError;

pub struct Pcf8575Bus<I2C> {
    i2c: I2C,
}

impl<I2C: I2c> Pcf8575Bus<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Address-only write; `true` if a chip acknowledged.
    pub fn probe(&mut self, address: u8) -> bool {
        self.i2c.write(address, &[]).is_ok()
    }

    pub fn read(&mut self, address: u8) -> Result<u16, BusError> {
        let mut buf = [0u8; 2];
        self.i2c.read(address, &mut buf).map_err(bus_error)?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn write(&mut self, address: u8, word: u16) -> Result<(), BusError> {
        self.i2c.write(address, &word.to_le_bytes()).map_err(bus_error)
    }
}

fn bus_error<E: embedded_hal::i2c::Error>(e: E) -> BusError {
    match e.kind() {
        ErrorKind::NoAcknowledge(_) => BusError::Nack,
        _ => BusError::Other,
    }
}
