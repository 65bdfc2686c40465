//! Recording mocks for testing
//!
//! Every fake writes into one shared [`EventLog`], so a test can assert the
//! relative order of bus messages, line changes, clock and sensor calls and
//! delays across all collaborators of a driver instance.

#![cfg(any(test, feature = "std"))]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, InputPin, OutputPin, PinState};
use embedded_hal::spi::ErrorKind;

use crate::bus::{BusTransport, Transfer};
use crate::clock::PwmClock;
use crate::gpio::GpioProvider;
use crate::thermal::TemperatureSensor;

/// One sub-transfer as seen by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTransfer {
    /// Bytes sent
    pub bytes: Vec<u8>,
    /// `cs_change` flag
    pub cs_change: bool,
}

impl From<&Transfer<'_>> for RecordedTransfer {
    fn from(t: &Transfer<'_>) -> Self {
        Self {
            bytes: t.bytes.to_vec(),
            cs_change: t.cs_change,
        }
    }
}

/// Everything the fakes observe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A bus message (truncated at the failing transfer, if any)
    Message(Vec<RecordedTransfer>),
    /// Busy line sampled
    BusyPoll {
        /// Level read (true = busy)
        busy: bool,
    },
    /// Output line driven
    Line {
        /// Line number
        line: u32,
        /// Level driven
        high: bool,
    },
    /// Clock configured
    ClockConfigured {
        /// Period (ns)
        period_ns: u32,
        /// High time (ns)
        duty_ns: u32,
    },
    /// Clock output started
    ClockEnabled,
    /// Clock output stopped
    ClockDisabled,
    /// Sensor attached
    SensorAttached,
    /// Sensor read
    SensorRead(i16),
    /// Sensor detached
    SensorDetached,
    /// Blocking delay
    Delay {
        /// Duration (ns)
        ns: u64,
    },
}

/// Shared, append-only event log.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<Event>>>);

impl EventLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&self, event: Event) {
        self.0.borrow_mut().push(event);
    }

    /// Snapshot of all events.
    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }

    /// Drop everything recorded so far.
    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    /// Bus messages only, in order.
    pub fn messages(&self) -> Vec<Vec<RecordedTransfer>> {
        self.0
            .borrow()
            .iter()
            .filter_map(|e| match e {
                Event::Message(m) => Some(m.clone()),
                _ => None,
            })
            .collect()
    }

    /// Four-transfer register writes decoded as `(register index, payload)`.
    ///
    /// Messages of any other shape are skipped.
    pub fn register_writes(&self) -> Vec<(u8, Vec<u8>)> {
        self.messages()
            .iter()
            .filter(|m| m.len() == 4)
            .filter_map(|m| {
                let index = m.get(1)?.bytes.first().copied()?;
                let payload = m.get(3)?.bytes.clone();
                Some((index, payload))
            })
            .collect()
    }

    /// Number of busy-line samples.
    pub fn busy_polls(&self) -> usize {
        self.0
            .borrow()
            .iter()
            .filter(|e| matches!(e, Event::BusyPoll { .. }))
            .count()
    }
}

/// Error produced by every fake on injected failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeFault;

impl digital::Error for FakeFault {
    fn kind(&self) -> digital::ErrorKind {
        digital::ErrorKind::Other
    }
}

// ── Bus ───────────────────────────────────────────────────────────────────────

/// [`BusTransport`] that records every message and can fail one sub-transfer.
pub struct RecordingTransport {
    log: EventLog,
    issued: usize,
    fail_at: Option<usize>,
}

impl RecordingTransport {
    /// Transport that never fails.
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            issued: 0,
            fail_at: None,
        }
    }

    /// Fail the sub-transfer with zero-based global index `n` (counted
    /// across all messages). Only that one transfer fails.
    #[must_use]
    pub fn failing_at(mut self, n: usize) -> Self {
        self.fail_at = Some(n);
        self
    }

    /// Sub-transfers attempted so far, including a failed one.
    pub fn issued(&self) -> usize {
        self.issued
    }
}

impl BusTransport for RecordingTransport {
    type Error = ErrorKind;

    fn transfer(&mut self, message: &[Transfer<'_>]) -> Result<(), Self::Error> {
        let mut recorded = Vec::with_capacity(message.len());
        let mut outcome = Ok(());
        for transfer in message {
            let index = self.issued;
            self.issued = self.issued.saturating_add(1);
            if self.fail_at == Some(index) {
                outcome = Err(ErrorKind::Other);
                break;
            }
            recorded.push(RecordedTransfer::from(transfer));
        }
        self.log.push(Event::Message(recorded));
        outcome
    }
}

// ── Clock ─────────────────────────────────────────────────────────────────────

/// [`PwmClock`] that records calls.
pub struct FakeClock {
    log: EventLog,
    fail_configure: bool,
    fail_enable: bool,
    fail_disable: bool,
}

impl FakeClock {
    /// Clock that always succeeds.
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            fail_configure: false,
            fail_enable: false,
            fail_disable: false,
        }
    }

    /// `configure` fails.
    #[must_use]
    pub fn failing_configure(mut self) -> Self {
        self.fail_configure = true;
        self
    }

    /// `enable` fails.
    #[must_use]
    pub fn failing_enable(mut self) -> Self {
        self.fail_enable = true;
        self
    }

    /// `disable` fails.
    #[must_use]
    pub fn failing_disable(mut self) -> Self {
        self.fail_disable = true;
        self
    }
}

impl PwmClock for FakeClock {
    type Error = FakeFault;

    fn configure(&mut self, period_ns: u32, duty_ns: u32) -> Result<(), Self::Error> {
        if self.fail_configure {
            return Err(FakeFault);
        }
        self.log.push(Event::ClockConfigured { period_ns, duty_ns });
        Ok(())
    }

    fn enable(&mut self) -> Result<(), Self::Error> {
        if self.fail_enable {
            return Err(FakeFault);
        }
        self.log.push(Event::ClockEnabled);
        Ok(())
    }

    fn disable(&mut self) -> Result<(), Self::Error> {
        if self.fail_disable {
            return Err(FakeFault);
        }
        self.log.push(Event::ClockDisabled);
        Ok(())
    }
}

// ── Sensor ────────────────────────────────────────────────────────────────────

/// [`TemperatureSensor`] with a settable reading.
pub struct FakeSensor {
    log: EventLog,
    celsius: Rc<Cell<i16>>,
    fail_attach: bool,
    fail_read: bool,
}

impl FakeSensor {
    /// Sensor reading `celsius`.
    pub fn new(log: &EventLog, celsius: i16) -> Self {
        Self {
            log: log.clone(),
            celsius: Rc::new(Cell::new(celsius)),
            fail_attach: false,
            fail_read: false,
        }
    }

    /// Handle for changing the reading after the sensor was moved into a driver.
    pub fn dial(&self) -> Rc<Cell<i16>> {
        Rc::clone(&self.celsius)
    }

    /// `attach` fails.
    #[must_use]
    pub fn failing_attach(mut self) -> Self {
        self.fail_attach = true;
        self
    }

    /// `get_temperature` fails.
    #[must_use]
    pub fn failing_read(mut self) -> Self {
        self.fail_read = true;
        self
    }
}

impl TemperatureSensor for FakeSensor {
    type Error = FakeFault;

    fn attach(&mut self) -> Result<(), Self::Error> {
        if self.fail_attach {
            return Err(FakeFault);
        }
        self.log.push(Event::SensorAttached);
        Ok(())
    }

    fn get_temperature(&mut self) -> Result<i16, Self::Error> {
        if self.fail_read {
            return Err(FakeFault);
        }
        let celsius = self.celsius.get();
        self.log.push(Event::SensorRead(celsius));
        Ok(celsius)
    }

    fn detach(&mut self) -> Result<(), Self::Error> {
        self.log.push(Event::SensorDetached);
        Ok(())
    }
}

// ── GPIO ──────────────────────────────────────────────────────────────────────

/// Digital line that records reads and writes.
///
/// As an input it replays a scripted sequence of levels, then reads the
/// idle level (low unless stuck high).
pub struct FakePin {
    line: u32,
    log: EventLog,
    reads: VecDeque<bool>,
    stuck_high: bool,
    fail: bool,
}

impl FakePin {
    /// Line that reads low and accepts writes.
    pub fn new(line: u32, log: &EventLog) -> Self {
        Self {
            line,
            log: log.clone(),
            reads: VecDeque::new(),
            stuck_high: false,
            fail: false,
        }
    }

    /// Levels returned by the next reads, in order.
    #[must_use]
    pub fn with_reads(mut self, reads: impl IntoIterator<Item = bool>) -> Self {
        self.reads.extend(reads);
        self
    }

    /// Read high forever once the script runs out.
    #[must_use]
    pub fn stuck_high(mut self) -> Self {
        self.stuck_high = true;
        self
    }

    /// Every access fails.
    #[must_use]
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Line number.
    pub fn line(&self) -> u32 {
        self.line
    }
}

impl digital::ErrorType for FakePin {
    type Error = FakeFault;
}

impl InputPin for FakePin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        if self.fail {
            return Err(FakeFault);
        }
        let busy = self.reads.pop_front().unwrap_or(self.stuck_high);
        self.log.push(Event::BusyPoll { busy });
        Ok(busy)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high().map(|high| !high)
    }
}

impl OutputPin for FakePin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.fail {
            return Err(FakeFault);
        }
        self.log.push(Event::Line {
            line: self.line,
            high: false,
        });
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if self.fail {
            return Err(FakeFault);
        }
        self.log.push(Event::Line {
            line: self.line,
            high: true,
        });
        Ok(())
    }
}

/// [`GpioProvider`] handing out [`FakePin`]s.
pub struct FakeGpio {
    log: EventLog,
    busy_reads: Vec<bool>,
    busy_stuck: bool,
    unavailable: Option<u32>,
}

impl FakeGpio {
    /// Provider whose lines all exist and whose busy line reads idle.
    pub fn new(log: &EventLog) -> Self {
        Self {
            log: log.clone(),
            busy_reads: Vec::new(),
            busy_stuck: false,
            unavailable: None,
        }
    }

    /// Script the levels of the next input line handed out.
    #[must_use]
    pub fn busy_reads(mut self, reads: impl IntoIterator<Item = bool>) -> Self {
        self.busy_reads.extend(reads);
        self
    }

    /// The input line handed out reads busy forever.
    #[must_use]
    pub fn busy_stuck(mut self) -> Self {
        self.busy_stuck = true;
        self
    }

    /// Requests for `line` fail.
    #[must_use]
    pub fn without_line(mut self, line: u32) -> Self {
        self.unavailable = Some(line);
        self
    }
}

impl GpioProvider for FakeGpio {
    type Input = FakePin;
    type Output = FakePin;
    type Error = FakeFault;

    fn request_input(&mut self, line: u32) -> Result<Self::Input, Self::Error> {
        if self.unavailable == Some(line) {
            return Err(FakeFault);
        }
        let mut pin = FakePin::new(line, &self.log).with_reads(self.busy_reads.drain(..));
        if self.busy_stuck {
            pin = pin.stuck_high();
        }
        Ok(pin)
    }

    fn request_output(&mut self, line: u32, initial: PinState) -> Result<Self::Output, Self::Error> {
        if self.unavailable == Some(line) {
            return Err(FakeFault);
        }
        let mut pin = FakePin::new(line, &self.log);
        match initial {
            PinState::Low => pin.set_low()?,
            PinState::High => pin.set_high()?,
        }
        Ok(pin)
    }
}

// ── Delay ─────────────────────────────────────────────────────────────────────

/// [`DelayNs`] that returns immediately and records the requested duration.
pub struct FakeDelay {
    log: EventLog,
}

impl FakeDelay {
    /// Delay writing into `log`.
    pub fn new(log: &EventLog) -> Self {
        Self { log: log.clone() }
    }
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.log.push(Event::Delay { ns: u64::from(ns) });
    }

    fn delay_us(&mut self, us: u32) {
        self.log.push(Event::Delay {
            ns: u64::from(us).saturating_mul(1_000),
        });
    }

    fn delay_ms(&mut self, ms: u32) {
        self.log.push(Event::Delay {
            ns: u64::from(ms).saturating_mul(1_000_000),
        });
    }
}
