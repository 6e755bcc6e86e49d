//! GPIO / peripheral pin assignments for the 128-channel relay board.
//!
//! Single source of truth: the binary references this module rather than
//! hard-coding pin numbers.  The two I2C buses are electrically separate:
//! bus 0 carries the relay (output) expanders, bus 1 the contact (input)
//! expanders.

// ---------------------------------------------------------------------------
// I²C bus 0: output expanders
// ---------------------------------------------------------------------------

pub const OUTPUT_I2C_SDA_GPIO: i32 = 4;
pub const OUTPUT_I2C_SCL_GPIO: i32 = 5;

// ---------------------------------------------------------------------------
// I²C bus 1: input expanders
// ---------------------------------------------------------------------------

pub const INPUT_I2C_SDA_GPIO: i32 = 15;
pub const INPUT_I2C_SCL_GPIO: i32 = 13;

/// Both buses run standard-mode; the PCF8575 tops out at 400 kHz and the
/// backplane traces are long.
pub const I2C_FREQ_HZ: u32 = 100_000;
