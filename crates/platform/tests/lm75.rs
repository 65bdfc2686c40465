//! LM75 sensor integration tests against a mocked I2C bus.
//!
//! Run with: cargo test -p epd-platform --test lm75

use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
use epd_platform::thermal::{CONF_SHUTDOWN, REG_CONF, REG_TEMP};
use epd_platform::{Lm75, TemperatureSensor, LM75_DEFAULT_ADDR};

/// attach → read → detach drives the configuration and temperature
/// registers at the default address.
#[test]
fn attach_read_detach_cycle() {
    let i2c = I2cMock::new(&[
        I2cTransaction::write(LM75_DEFAULT_ADDR, vec![REG_CONF, 0x00]),
        I2cTransaction::write_read(LM75_DEFAULT_ADDR, vec![REG_TEMP], vec![0x16, 0x80]),
        I2cTransaction::write(LM75_DEFAULT_ADDR, vec![REG_CONF, CONF_SHUTDOWN]),
    ]);

    let mut sensor = Lm75::new(i2c);
    sensor.attach().unwrap();
    assert_eq!(sensor.get_temperature().unwrap(), 22);
    sensor.detach().unwrap();

    sensor.release().done();
}

/// Sub-zero readings come back signed.
#[test]
fn reads_below_freezing() {
    let i2c = I2cMock::new(&[I2cTransaction::write_read(
        0x48,
        vec![REG_TEMP],
        vec![0xF6, 0x00],
    )]);

    let mut sensor = Lm75::with_address(i2c, 0x48);
    assert_eq!(sensor.address(), 0x48);
    assert_eq!(sensor.get_temperature().unwrap(), -10);

    sensor.release().done();
}
