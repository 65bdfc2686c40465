//! LM75-compatible temperature sensor.
//!
//! Reference: NXP LM75B datasheet (Rev. 6.1), §7.4 register list.
//! The G1 reference board wires an LM75 clone at 0x49 next to the panel FPC.

use embedded_hal::i2c::I2c;

/// 7-bit I2C address used by the G1 reference board (A2..A0 = 0b001).
pub const LM75_DEFAULT_ADDR: u8 = 0x49;
/// Temperature register (read-only, 2 bytes, MSB first).
pub const REG_TEMP: u8 = 0x00;
/// Configuration register (1 byte).
pub const REG_CONF: u8 = 0x01;
/// CONF bit 0: shutdown. Conversions stop, I2C stays alive.
pub const CONF_SHUTDOWN: u8 = 1 << 0;

/// Source of an ambient temperature reading.
///
/// `attach` / `detach` bracket the period the driver holds the sensor, so
/// sensors with a low-power mode can sleep while the panel is off.
pub trait TemperatureSensor {
    /// Sensor error type
    type Error: core::fmt::Debug;

    /// Prepare the device for readings.
    fn attach(&mut self) -> Result<(), Self::Error>;

    /// Current temperature in whole degrees Celsius.
    fn get_temperature(&mut self) -> Result<i16, Self::Error>;

    /// Put the device back to rest.
    fn detach(&mut self) -> Result<(), Self::Error>;
}

/// Decode the raw temperature register into whole degrees Celsius.
///
/// The register is a left-aligned two's-complement value with 1/256 °C
/// resolution in the upper byte; the arithmetic shift floors toward
/// negative infinity (-0.5 °C reads as -1).
#[inline]
#[must_use]
pub const fn decode_temperature(raw: [u8; 2]) -> i16 {
    i16::from_be_bytes(raw) >> 8
}

/// LM75 driver over a blocking I2C bus.
pub struct Lm75<I2C> {
    i2c: I2C,
    addr: u8,
}

impl<I2C: I2c> Lm75<I2C> {
    /// Sensor at [`LM75_DEFAULT_ADDR`].
    pub fn new(i2c: I2C) -> Self {
        Self::with_address(i2c, LM75_DEFAULT_ADDR)
    }

    /// Sensor at a custom address.
    pub fn with_address(i2c: I2C, addr: u8) -> Self {
        Self { i2c, addr }
    }

    /// Configured 7-bit address.
    pub fn address(&self) -> u8 {
        self.addr
    }

    /// Give back the bus.
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2c> TemperatureSensor for Lm75<I2C> {
    type Error = I2C::Error;

    fn attach(&mut self) -> Result<(), Self::Error> {
        self.i2c.write(self.addr, &[REG_CONF, 0x00])
    }

    fn get_temperature(&mut self) -> Result<i16, Self::Error> {
        let mut raw = [0u8; 2];
        self.i2c.write_read(self.addr, &[REG_TEMP], &mut raw)?;
        Ok(decode_temperature(raw))
    }

    fn detach(&mut self) -> Result<(), Self::Error> {
        self.i2c.write(self.addr, &[REG_CONF, CONF_SHUTDOWN])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lm75_addr_is_0x49() {
        assert_eq!(LM75_DEFAULT_ADDR, 0x49);
    }

    #[test]
    fn decodes_positive_readings() {
        assert_eq!(decode_temperature([0x19, 0x00]), 25);
        assert_eq!(decode_temperature([0x19, 0x80]), 25); // 25.5 floors
        assert_eq!(decode_temperature([0x7D, 0x00]), 125);
    }

    #[test]
    fn decodes_negative_readings() {
        assert_eq!(decode_temperature([0xE7, 0x00]), -25);
        assert_eq!(decode_temperature([0xFF, 0x80]), -1); // -0.5 floors
        assert_eq!(decode_temperature([0xC9, 0x00]), -55);
    }

    #[test]
    fn zero_is_zero() {
        assert_eq!(decode_temperature([0x00, 0x00]), 0);
    }
}
