//! Full-stack test: panel → controller → SPI transport with a manually
//! driven CS line, LM75 over I2C, all backed by embedded-hal-mock.
//!
//! Checks the exact bytes and CS edges a real bus would see for a full
//! bring-up / refresh / power-down cycle, and that an empty or aborted
//! stream never leaves CS asserted for the next register write.
//!
//! Run with: cargo test -p epd-g1 --test hardware_stack

#![allow(clippy::unwrap_used)]

use embedded_hal_mock::eh1::delay::NoopDelay;
use embedded_hal_mock::eh1::digital::{
    Mock as PinMock, State as PinState, Transaction as PinTransaction,
};
use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
use embedded_hal_mock::eh1::spi::{Mock as SpiMock, Transaction as SpiTransaction};
use epd_g1::{BusyPolicy, Controller, DriverError, Panel, PanelConfig, PanelSize, PanelState};
use epd_platform::mocks::{EventLog, FakeClock};
use epd_platform::thermal::{CONF_SHUTDOWN, REG_CONF, REG_TEMP};
use epd_platform::{Lm75, SpiTransport, LM75_DEFAULT_ADDR};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// SPI traffic of one register write.
fn reg(index: u8, payload: &[u8]) -> Vec<SpiTransaction<u8>> {
    vec![
        SpiTransaction::write_vec(vec![0x70]),
        SpiTransaction::write_vec(vec![index]),
        SpiTransaction::flush(),
        SpiTransaction::write_vec(vec![0x72]),
        SpiTransaction::write_vec(payload.to_vec()),
        SpiTransaction::flush(),
    ]
}

/// CS edges of one register write: two selection windows.
fn reg_cs() -> Vec<PinTransaction> {
    vec![
        PinTransaction::set(PinState::Low),
        PinTransaction::set(PinState::High),
        PinTransaction::set(PinState::Low),
        PinTransaction::set(PinState::High),
    ]
}

/// Expected SPI and CS traffic, built up in bus order.
#[derive(Default)]
struct Wire {
    spi: Vec<SpiTransaction<u8>>,
    cs: Vec<PinTransaction>,
}

impl Wire {
    fn write(&mut self, index: u8, payload: &[u8]) {
        self.spi.extend(reg(index, payload));
        self.cs.extend(reg_cs());
    }

    /// Data-register header; CS is left asserted.
    fn stream_header(&mut self) {
        self.spi.extend([
            SpiTransaction::write_vec(vec![0x70]),
            SpiTransaction::write_vec(vec![0x0a]),
            SpiTransaction::flush(),
            SpiTransaction::write_vec(vec![0x72]),
            SpiTransaction::flush(),
        ]);
        self.cs.extend([
            PinTransaction::set(PinState::Low),
            PinTransaction::set(PinState::High),
            PinTransaction::set(PinState::Low),
        ]);
    }

    /// One streamed byte inside the held selection.
    fn stream_byte(&mut self, byte: u8) {
        self.spi.extend([SpiTransaction::write_vec(vec![byte]), SpiTransaction::flush()]);
    }

    /// Zero-length transfer closing a held selection.
    fn close(&mut self) {
        self.spi.push(SpiTransaction::flush());
        self.cs.push(PinTransaction::set(PinState::High));
    }

    fn bring_up_2in(&mut self) {
        for (index, payload) in [
            (0x01, &[0x00, 0x00, 0x00, 0x00, 0x01, 0xff, 0xe0, 0x00][..]),
            (0x04, &[0x03][..]),
            (0x07, &[0x9d][..]),
            (0x05, &[0x01][..]),
            (0x05, &[0x03][..]),
            (0x05, &[0x0f][..]),
            (0x09, &[0xd0, 0x00][..]),
            (0x02, &[0x2f][..]),
        ] {
            self.write(index, payload);
        }
    }

    fn power_down(&mut self) {
        for (index, payload) in [
            (0x02, 0x24),
            (0x05, 0x0e),
            (0x05, 0x02),
            (0x05, 0x00),
            (0x07, 0x0d),
        ] {
            self.write(index, &[payload]);
        }
    }
}

/// LM75 traffic for one attach, one 22.5 °C read and the detach.
fn lm75_one_read() -> Vec<I2cTransaction> {
    vec![
        I2cTransaction::write(LM75_DEFAULT_ADDR, vec![REG_CONF, 0x00]),
        I2cTransaction::write_read(LM75_DEFAULT_ADDR, vec![REG_TEMP], vec![0x16, 0x80]),
        I2cTransaction::write(LM75_DEFAULT_ADDR, vec![REG_CONF, CONF_SHUTDOWN]),
    ]
}

type WirePanel = Panel<
    SpiTransport<SpiMock<u8>, PinMock>,
    PinMock,
    PinMock,
    FakeClock,
    Lm75<I2cMock>,
    NoopDelay,
>;

/// Mocks kept aside so every script can be checked after the panel is gone.
struct Scripts {
    spi: SpiMock<u8>,
    cs: PinMock,
    busy: PinMock,
    discharge: PinMock,
    i2c: I2cMock,
}

impl Scripts {
    fn done(mut self) {
        self.spi.done();
        self.cs.done();
        self.busy.done();
        self.discharge.done();
        self.i2c.done();
    }
}

fn wire_panel(
    config: PanelConfig,
    wire: &Wire,
    busy: &[PinTransaction],
    log: &EventLog,
) -> (WirePanel, Scripts) {
    let spi = SpiMock::new(&wire.spi);
    let cs = PinMock::new(&wire.cs);
    let busy = PinMock::new(busy);
    let discharge = PinMock::new(&[
        PinTransaction::set(PinState::High),
        PinTransaction::set(PinState::Low),
    ]);
    let i2c = I2cMock::new(&lm75_one_read());
    let scripts = Scripts {
        spi: spi.clone(),
        cs: cs.clone(),
        busy: busy.clone(),
        discharge: discharge.clone(),
        i2c: i2c.clone(),
    };
    let panel = Panel::new(
        config,
        SpiTransport::new(spi, cs),
        busy,
        discharge,
        FakeClock::new(log),
        Lm75::new(i2c),
        NoopDelay::new(),
    );
    (panel, scripts)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn stream_holds_cs_until_last_byte() {
    let spi = SpiMock::new(&[
        SpiTransaction::write_vec(vec![0x70]),
        SpiTransaction::write_vec(vec![0x0a]),
        SpiTransaction::flush(),
        SpiTransaction::write_vec(vec![0x72]),
        SpiTransaction::flush(),
        SpiTransaction::write_vec(vec![0xAA]),
        SpiTransaction::flush(),
        SpiTransaction::write_vec(vec![0xBB]),
        SpiTransaction::flush(),
    ]);
    let cs = PinMock::new(&[
        PinTransaction::set(PinState::Low),
        PinTransaction::set(PinState::High),
        PinTransaction::set(PinState::Low),
        // held across both data bytes
        PinTransaction::set(PinState::High),
    ]);
    let busy = PinMock::new(&[
        PinTransaction::get(PinState::High),
        PinTransaction::get(PinState::Low),
        PinTransaction::get(PinState::Low),
    ]);
    let (mut spi_done, mut cs_done, mut busy_done) = (spi.clone(), cs.clone(), busy.clone());

    let mut controller = Controller::new(SpiTransport::new(spi, cs));
    let mut busy = busy;
    controller
        .write_stream(
            &[0xAA, 0xBB],
            &mut busy,
            &mut NoopDelay::new(),
            BusyPolicy::default(),
        )
        .unwrap();

    spi_done.done();
    cs_done.done();
    busy_done.done();
}

#[test]
fn full_cycle_on_the_wire() {
    let mut wire = Wire::default();
    wire.bring_up_2in();
    // refresh(&[0x5A])
    wire.write(0x03, &[0x01]);
    wire.stream_header();
    wire.stream_byte(0x5A);
    wire.cs.push(PinTransaction::set(PinState::High));
    wire.write(0x03, &[0x00]);
    wire.power_down();

    let log = EventLog::new();
    let (mut panel, scripts) = wire_panel(
        PanelConfig::builder(PanelSize::Inch2).build().unwrap(),
        &wire,
        &[PinTransaction::get(PinState::Low)],
        &log,
    );

    panel.bring_up().unwrap();
    panel.refresh(&[0x5A]).unwrap();
    panel.power_down().unwrap();
    assert_eq!(panel.state(), PanelState::Off);

    let released = panel.release();
    assert!(!released.bus.is_selected());
    drop(released);
    scripts.done();
}

#[test]
fn empty_frame_refresh_deselects_before_latch_off() {
    let mut wire = Wire::default();
    wire.bring_up_2in();
    wire.write(0x03, &[0x01]);
    wire.stream_header();
    wire.close();
    // Latch-off opens its own selection.
    wire.write(0x03, &[0x00]);
    wire.power_down();

    let log = EventLog::new();
    let (mut panel, scripts) = wire_panel(
        PanelConfig::builder(PanelSize::Inch2).build().unwrap(),
        &wire,
        &[],
        &log,
    );

    panel.bring_up().unwrap();
    panel.refresh(&[]).unwrap();
    panel.power_down().unwrap();

    let released = panel.release();
    assert!(!released.bus.is_selected());
    drop(released);
    scripts.done();
}

#[test]
fn busy_timeout_deselects_before_latch_off() {
    let mut wire = Wire::default();
    wire.bring_up_2in();
    wire.write(0x03, &[0x01]);
    wire.stream_header();
    wire.stream_byte(0x11);
    // 0x22 is never sent; the held selection is closed instead.
    wire.close();
    wire.write(0x03, &[0x00]);
    wire.power_down();

    let config = PanelConfig::builder(PanelSize::Inch2)
        .busy_policy(BusyPolicy {
            max_polls: 2,
            poll_interval_us: 1,
        })
        .build()
        .unwrap();
    let log = EventLog::new();
    let (mut panel, scripts) = wire_panel(
        config,
        &wire,
        &[
            PinTransaction::get(PinState::High),
            PinTransaction::get(PinState::High),
        ],
        &log,
    );

    panel.bring_up().unwrap();
    assert_eq!(panel.refresh(&[0x11, 0x22]), Err(DriverError::Timeout));
    assert_eq!(panel.state(), PanelState::Ready);
    panel.power_down().unwrap();

    let released = panel.release();
    assert!(!released.bus.is_selected());
    drop(released);
    scripts.done();
}
