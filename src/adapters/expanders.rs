//! I2C expander adapter.
//!
//! Implements [`ExpanderPort`] over two independent I2C buses, one per
//! direction.  Generic over `embedded_hal::i2c::I2c`, so the same adapter
//! runs on the ESP-IDF I2C driver and on a mock bus in tests.

use embedded_hal::i2c::I2c;

use crate::app::ports::ExpanderPort;
use crate::drivers::pcf8575::Pcf8575Bus;
use crate::error::BusError;
use crate::io::registry::Bus;

pub struct I2cExpanders<O, I> {
    output: Pcf8575Bus<O>,
    input: Pcf8575Bus<I>,
}

impl<O: I2c, I: I2c> I2cExpanders<O, I> {
    pub fn new(output_i2c: O, input_i2c: I) -> Self {
        Self {
            output: Pcf8575Bus::new(output_i2c),
            input: Pcf8575Bus::new(input_i2c),
        }
    }
}

impl<O: I2c, I: I2c> ExpanderPort for I2cExpanders<O, I> {
    fn probe(&mut self, bus: Bus, address: u8) -> bool {
        match bus {
            Bus::Output => self.output.probe(address),
            Bus::Input => self.input.probe(address),
        }
    }

    fn read_word(&mut self, bus: Bus, address: u8) -> Result<u16, BusError> {
        match bus {
            Bus::Output => self.output.read(address),
            Bus::Input => self.input.read(address),
        }
    }

    fn write_word(&mut self, bus: Bus, address: u8, word: u16) -> Result<(), BusError> {
        match bus {
            Bus::Output => self.output.write(address, word),
            Bus::Input => self.input.write(address, word),
        }
    }
}
