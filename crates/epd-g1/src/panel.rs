//! Panel power and refresh sequencing.
//!
//! ## States
//! ```text
//! [Off] --bring_up()--> [PoweringUp] --ok--> [Ready] --begin_refresh()--> [Refreshing]
//!   ^                        |                 |  ^                            |
//!   |                      error               |  +------finish_refresh()------+
//!   |                        v                 v                               |
//!   +-------------------[PoweringDown] <---power_down()------------------------+
//! ```
//!
//! Rails come up in dependency order: reference clock before the
//! oscillator, oscillator before the charge pumps, charge pumps before the
//! output stage. Power-down walks the same chain backwards and then bleeds
//! the rails through the discharge line.
//!
//! `PoweringUp` and `PoweringDown` only exist inside a `&mut self` call, so
//! callers only ever observe `Off`, `Ready` or `Refreshing`.

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use epd_platform::{BusTransport, PwmClock, TemperatureSensor};

use crate::clock::{ClockHandle, ClockState};
use crate::command::CommandId;
use crate::config::{PanelConfig, PanelSize};
use crate::controller::Controller;
use crate::error::{DriverError, Operation, Stage};
use crate::thermal::{SensorHandle, TimingProfile};

// ── Sequences ────────────────────────────────────────────────────────────────

/// Register writes issued by `bring_up` once the clock is running.
pub const fn bring_up_sequence(size: PanelSize) -> [CommandId; 8] {
    [
        CommandId::channel_select(size),
        CommandId::gate_source_level(size),
        CommandId::OscillatorOn,
        CommandId::ChargePumpPositiveOn,
        CommandId::ChargePumpNegativeOn,
        CommandId::ChargePumpVcomOn,
        CommandId::VcomLevel,
        CommandId::OutputEnable,
    ]
}

/// Register writes issued by `power_down`, before the discharge pulse.
pub const POWER_DOWN_SEQUENCE: [CommandId; 5] = [
    CommandId::OutputDisable,
    CommandId::ChargePumpVcomOff,
    CommandId::ChargePumpNegativeOff,
    CommandId::ChargePumpPositiveOff,
    CommandId::OscillatorOff,
];

/// Upper bound on teardown stages: five dispatches plus discharge, clock and sensor.
pub const MAX_TEARDOWN_FAILURES: usize = 8;

/// Stage failures collected by the last power-down, in the order they happened.
pub type TeardownReport = heapless::Vec<(Stage, DriverError), MAX_TEARDOWN_FAILURES>;

// ── PanelState ───────────────────────────────────────────────────────────────

/// Panel power state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PanelState {
    /// Rails off, clock and sensor released
    Off,
    /// Bring-up in progress
    PoweringUp,
    /// Powered and idle
    Ready,
    /// Frame latched and streamed, waiting for `finish_refresh`
    Refreshing,
    /// Power-down in progress
    PoweringDown,
}

impl PanelState {
    /// Short name for log output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::PoweringUp => "powering-up",
            Self::Ready => "ready",
            Self::Refreshing => "refreshing",
            Self::PoweringDown => "powering-down",
        }
    }
}

// ── Panel ────────────────────────────────────────────────────────────────────

/// Everything a [`Panel`] owned, handed back by [`Panel::release`].
///
/// The clock and sensor come back wrapped in their (released) handles.
pub struct Released<T, BUSY, DIS, C: PwmClock, S: TemperatureSensor, D> {
    /// Bus transport
    pub bus: T,
    /// Busy input line
    pub busy: BUSY,
    /// Discharge output line
    pub discharge: DIS,
    /// Oscillator reference
    pub clock: ClockHandle<C>,
    /// Temperature sensor
    pub sensor: SensorHandle<S>,
    /// Delay provider
    pub delay: D,
}

/// One G1 panel and every resource it drives.
pub struct Panel<T, BUSY, DIS, C: PwmClock, S: TemperatureSensor, D> {
    controller: Controller<T>,
    busy: BUSY,
    discharge: DIS,
    clock: ClockHandle<C>,
    sensor: SensorHandle<S>,
    delay: D,
    config: PanelConfig,
    state: PanelState,
    profile: Option<TimingProfile>,
    teardown: TeardownReport,
}

impl<T, BUSY, DIS, C, S, D> Panel<T, BUSY, DIS, C, S, D>
where
    T: BusTransport,
    BUSY: InputPin,
    DIS: OutputPin,
    C: PwmClock,
    S: TemperatureSensor,
    D: DelayNs,
{
    /// Assemble a panel in [`PanelState::Off`]. Nothing is touched until
    /// [`bring_up`](Self::bring_up).
    pub fn new(config: PanelConfig, bus: T, busy: BUSY, discharge: DIS, clock: C, sensor: S, delay: D) -> Self {
        Self {
            controller: Controller::new(bus),
            busy,
            discharge,
            clock: ClockHandle::new(clock),
            sensor: SensorHandle::new(sensor),
            delay,
            config,
            state: PanelState::Off,
            profile: None,
            teardown: TeardownReport::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> PanelState {
        self.state
    }

    /// Configuration the panel was built with.
    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Failures from the most recent power-down; empty if it was clean.
    pub fn last_teardown(&self) -> &[(Stage, DriverError)] {
        &self.teardown
    }

    /// Oscillator reference state.
    pub fn clock_state(&self) -> ClockState {
        self.clock.state()
    }

    /// Whether the temperature sensor is attached.
    pub fn sensor_attached(&self) -> bool {
        self.sensor.is_acquired()
    }

    /// Profile chosen by the refresh in flight, if any.
    pub fn active_profile(&self) -> Option<TimingProfile> {
        self.profile
    }

    fn transition(&mut self, next: PanelState) {
        tracing::debug!(from = self.state.as_str(), to = next.as_str(), "panel state");
        self.state = next;
    }

    fn invalid(&self, operation: Operation) -> DriverError {
        DriverError::InvalidState {
            state: self.state,
            operation,
        }
    }

    // ── Bring-up ─────────────────────────────────────────────────────────────

    /// Power the panel: Off → Ready.
    ///
    /// On any failure the full power-down runs, the panel ends in `Off` and
    /// the original error is returned. Teardown failures from that unwind
    /// are only available through [`last_teardown`](Self::last_teardown).
    pub fn bring_up(&mut self) -> Result<(), DriverError> {
        if self.state != PanelState::Off {
            return Err(self.invalid(Operation::BringUp));
        }
        self.transition(PanelState::PoweringUp);

        if let Err(error) = self.power_up() {
            tracing::warn!(error = %error, "bring-up failed, powering down");
            if let Err(unwind) = self.unwind() {
                tracing::warn!(error = %unwind, "power-down after failed bring-up incomplete");
            }
            return Err(error);
        }

        self.transition(PanelState::Ready);
        Ok(())
    }

    fn power_up(&mut self) -> Result<(), DriverError> {
        self.sensor.acquire()?;

        let clock = self.config.clock();
        self.clock
            .configure(Duration::from_nanos(u64::from(clock.period_ns)), clock.duty)?;
        self.clock.enable()?;

        for id in bring_up_sequence(self.config.size()) {
            self.controller.dispatch(id)?;
        }
        Ok(())
    }

    // ── Refresh ──────────────────────────────────────────────────────────────

    /// Push one frame to the glass: latch, stream, hold, unlatch.
    pub fn refresh(&mut self, frame: &[u8]) -> Result<(), DriverError> {
        self.begin_refresh(frame)?;
        self.finish_refresh()
    }

    /// First half of [`refresh`](Self::refresh): read the temperature, pick
    /// a timing profile, latch and stream `frame`. Leaves the panel in
    /// [`PanelState::Refreshing`].
    ///
    /// Returns [`DriverError::Busy`] without touching hardware if a refresh
    /// is already in flight. On failure the panel returns to `Ready` and the
    /// frame has to be sent again; latch-off is attempted if the stream had
    /// started.
    pub fn begin_refresh(&mut self, frame: &[u8]) -> Result<TimingProfile, DriverError> {
        match self.state {
            PanelState::Ready => {}
            PanelState::Refreshing => return Err(DriverError::Busy),
            _ => return Err(self.invalid(Operation::Refresh)),
        }
        self.transition(PanelState::Refreshing);

        let celsius = match self.sensor.get_temperature() {
            Ok(celsius) => celsius,
            Err(error) => return Err(self.abort_refresh(error, false)),
        };
        let profile = self.config.waveforms().profile_for(celsius);
        tracing::debug!(celsius, stage_hold_ms = profile.stage_hold_ms, "timing profile");

        if let Err(error) = self.controller.dispatch(CommandId::LatchOn) {
            return Err(self.abort_refresh(error, false));
        }
        let policy = self.config.busy_policy();
        if let Err(error) = self
            .controller
            .write_stream(frame, &mut self.busy, &mut self.delay, policy)
        {
            return Err(self.abort_refresh(error, true));
        }

        self.profile = Some(profile);
        Ok(profile)
    }

    /// Back to `Ready` after a failed first half. Latch-off goes out only
    /// if latch-on did.
    fn abort_refresh(&mut self, error: DriverError, latched: bool) -> DriverError {
        tracing::warn!(error = %error, latched, "refresh aborted");
        if latched {
            if let Err(latch) = self.controller.dispatch(CommandId::LatchOff) {
                tracing::warn!(error = %latch, "latch-off after aborted refresh failed");
            }
        }
        self.transition(PanelState::Ready);
        error
    }

    /// Second half of [`refresh`](Self::refresh): hold for the profile's
    /// stage time, then unlatch. Returns to `Ready` even if latch-off fails.
    pub fn finish_refresh(&mut self) -> Result<(), DriverError> {
        if self.state != PanelState::Refreshing {
            return Err(self.invalid(Operation::FinishRefresh));
        }
        let hold_ms = self.profile.take().map_or(0, |profile| profile.stage_hold_ms);
        self.delay.delay_ms(hold_ms);
        let unlatched = self.controller.dispatch(CommandId::LatchOff);
        self.transition(PanelState::Ready);
        unlatched
    }

    /// Send a raw command identifier while the panel is `Ready`.
    ///
    /// Unknown identifiers are rejected before anything reaches the bus.
    pub fn dispatch_raw(&mut self, raw: u8) -> Result<(), DriverError> {
        if self.state != PanelState::Ready {
            return Err(self.invalid(Operation::Dispatch));
        }
        self.controller.dispatch_raw(raw)
    }

    // ── Power-down ───────────────────────────────────────────────────────────

    /// Power the panel off from any powered state.
    ///
    /// Every stage runs even if an earlier one fails; the panel ends in
    /// `Off` regardless. Failures are summarised in
    /// [`DriverError::Teardown`] and listed by
    /// [`last_teardown`](Self::last_teardown). A refresh in flight is
    /// abandoned without latch-off.
    pub fn power_down(&mut self) -> Result<(), DriverError> {
        match self.state {
            PanelState::Off | PanelState::PoweringDown => Err(self.invalid(Operation::PowerDown)),
            PanelState::PoweringUp | PanelState::Ready | PanelState::Refreshing => self.unwind(),
        }
    }

    fn unwind(&mut self) -> Result<(), DriverError> {
        self.transition(PanelState::PoweringDown);
        self.teardown.clear();
        self.profile = None;

        for id in POWER_DOWN_SEQUENCE {
            if let Err(error) = self.controller.dispatch(id) {
                self.record(Stage::Dispatch(id), error);
            }
        }
        if let Err(error) = self.pulse_discharge() {
            self.record(Stage::Discharge, error);
        }
        if let Err(error) = self.clock.release() {
            self.record(Stage::Clock, error);
        }
        if let Err(error) = self.sensor.release() {
            self.record(Stage::Sensor, error);
        }

        self.transition(PanelState::Off);
        match self.teardown.first() {
            None => Ok(()),
            Some(&(first, _)) => Err(DriverError::Teardown {
                failed: u8::try_from(self.teardown.len()).unwrap_or(u8::MAX),
                first,
            }),
        }
    }

    fn record(&mut self, stage: Stage, error: DriverError) {
        tracing::warn!(stage = stage.as_str(), error = %error, "power-down stage failed");
        // One entry per stage at most, so this never overflows.
        let _ = self.teardown.push((stage, error));
    }

    fn pulse_discharge(&mut self) -> Result<(), DriverError> {
        let asserted = self.discharge.set_high().map_err(DriverError::gpio);
        if asserted.is_ok() {
            self.delay.delay_ms(self.config.discharge_settle_ms());
        }
        let deasserted = self.discharge.set_low().map_err(DriverError::gpio);
        asserted.and(deasserted)
    }

    /// Take the panel apart. Does not power down; see
    /// [`lifecycle::remove`](crate::lifecycle::remove) for that.
    pub fn release(self) -> Released<T, BUSY, DIS, C, S, D> {
        Released {
            bus: self.controller.release(),
            busy: self.busy,
            discharge: self.discharge,
            clock: self.clock,
            sensor: self.sensor,
            delay: self.delay,
        }
    }
}
