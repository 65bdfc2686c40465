//! Oscillator reference clock management.
//!
//! ## Lifecycle
//! ```text
//! [Unconfigured] --configure()--> [Disabled] --enable()--> [Enabled]
//!       ^                            ^   <--disable()--        |
//!       +--------- release() --------+-------------------------+
//! ```
//!
//! The controller's oscillator stage must never be commanded on without
//! the reference running, and the reference must not be left running
//! once the driver lets go of it. [`ClockHandle`] disables the output on
//! `release()` and, failing that, when dropped.

use core::time::Duration;

use epd_platform::PwmClock;

use crate::error::{DriverError, OutOfRangeError, Resource};

// ── DutyPercent ──────────────────────────────────────────────────────────────

/// Duty cycle as a percentage, 0–100.
///
/// Construct with [`DutyPercent::new`] (clamping) or
/// [`DutyPercent::try_new`] (fallible, strict).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
#[repr(transparent)]
pub struct DutyPercent(u8);

impl DutyPercent {
    /// Create a `DutyPercent`, clamping values above 100 to 100.
    #[must_use]
    pub const fn new(value: u8) -> Self {
        if value > 100 {
            Self(100)
        } else {
            Self(value)
        }
    }

    /// Create a `DutyPercent`, returning an error if `value > 100`.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `value > 100`.
    pub fn try_new(value: u8) -> Result<Self, OutOfRangeError> {
        if value > 100 {
            Err(OutOfRangeError {
                value: u32::from(value),
                min: 0,
                max: 100,
            })
        } else {
            Ok(Self(value))
        }
    }

    /// Return the inner percentage (0–100).
    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// High time for a given period, in nanoseconds.
    #[must_use]
    pub fn of_period_ns(self, period_ns: u32) -> u32 {
        let high = u64::from(period_ns).saturating_mul(u64::from(self.0)) / 100;
        // self.0 <= 100, so high <= period_ns.
        u32::try_from(high).unwrap_or(period_ns)
    }
}

impl TryFrom<u8> for DutyPercent {
    type Error = OutOfRangeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_new(value)
    }
}

impl From<DutyPercent> for u8 {
    fn from(duty: DutyPercent) -> Self {
        duty.0
    }
}

// ── ClockHandle ──────────────────────────────────────────────────────────────

/// Where a [`ClockHandle`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockState {
    /// Not configured; output off
    Unconfigured,
    /// Waveform set, output off
    Disabled,
    /// Output running
    Enabled,
}

/// Owned oscillator reference.
pub struct ClockHandle<C: PwmClock> {
    clock: C,
    state: ClockState,
}

impl<C: PwmClock> ClockHandle<C> {
    /// Take ownership of an idle clock.
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            state: ClockState::Unconfigured,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ClockState {
        self.state
    }

    /// Whether the clock is held (configured or running).
    pub fn is_acquired(&self) -> bool {
        self.state != ClockState::Unconfigured
    }

    /// Set the waveform. Leaves a running clock running.
    pub fn configure(&mut self, period: Duration, duty: DutyPercent) -> Result<(), DriverError> {
        let period_ns =
            u32::try_from(period.as_nanos()).map_err(|_| DriverError::ResourceUnavailable(Resource::Clock))?;
        let duty_ns = duty.of_period_ns(period_ns);
        self.clock.configure(period_ns, duty_ns).map_err(|error| {
            tracing::warn!(period_ns, duty_ns, error = ?error, "clock configure failed");
            DriverError::ResourceUnavailable(Resource::Clock)
        })?;
        if self.state == ClockState::Unconfigured {
            self.state = ClockState::Disabled;
        }
        Ok(())
    }

    /// Start the output. Requires a prior `configure`.
    pub fn enable(&mut self) -> Result<(), DriverError> {
        match self.state {
            ClockState::Enabled => Ok(()),
            ClockState::Unconfigured => Err(DriverError::ResourceUnavailable(Resource::Clock)),
            ClockState::Disabled => {
                self.clock.enable().map_err(|error| {
                    tracing::warn!(error = ?error, "clock enable failed");
                    DriverError::ResourceUnavailable(Resource::Clock)
                })?;
                self.state = ClockState::Enabled;
                Ok(())
            }
        }
    }

    /// Stop the output. No-op unless enabled.
    pub fn disable(&mut self) -> Result<(), DriverError> {
        if self.state != ClockState::Enabled {
            return Ok(());
        }
        self.clock.disable().map_err(|error| {
            tracing::warn!(error = ?error, "clock disable failed");
            DriverError::ResourceUnavailable(Resource::Clock)
        })?;
        self.state = ClockState::Disabled;
        Ok(())
    }

    /// Disable, then drop the configuration.
    ///
    /// If disabling fails the handle stays `Enabled`, so the drop guard
    /// tries again.
    pub fn release(&mut self) -> Result<(), DriverError> {
        self.disable()?;
        self.state = ClockState::Unconfigured;
        Ok(())
    }
}

impl<C: PwmClock> Drop for ClockHandle<C> {
    fn drop(&mut self) {
        if self.state == ClockState::Enabled {
            if let Err(error) = self.clock.disable() {
                tracing::warn!(error = ?error, "clock still running at drop and disable failed");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use epd_platform::mocks::{Event, EventLog, FakeClock};

    fn period() -> Duration {
        Duration::from_nanos(5_000)
    }

    #[test]
    fn duty_percent_clamps_and_checks() {
        assert_eq!(DutyPercent::new(150).get(), 100);
        assert!(DutyPercent::try_new(101).is_err());
        assert_eq!(DutyPercent::try_new(50).unwrap().of_period_ns(5_000), 2_500);
    }

    #[test]
    fn configure_then_enable() {
        let log = EventLog::new();
        let mut clk = ClockHandle::new(FakeClock::new(&log));
        assert_eq!(clk.state(), ClockState::Unconfigured);
        clk.configure(period(), DutyPercent::new(50)).unwrap();
        assert_eq!(clk.state(), ClockState::Disabled);
        clk.enable().unwrap();
        assert_eq!(clk.state(), ClockState::Enabled);
        assert_eq!(
            log.events(),
            vec![
                Event::ClockConfigured {
                    period_ns: 5_000,
                    duty_ns: 2_500
                },
                Event::ClockEnabled,
            ]
        );
    }

    #[test]
    fn enable_without_configure_is_refused() {
        let log = EventLog::new();
        let mut clk = ClockHandle::new(FakeClock::new(&log));
        assert_eq!(
            clk.enable(),
            Err(DriverError::ResourceUnavailable(Resource::Clock))
        );
        assert!(log.events().is_empty());
    }

    #[test]
    fn configure_failure_is_resource_unavailable() {
        let log = EventLog::new();
        let mut clk = ClockHandle::new(FakeClock::new(&log).failing_configure());
        assert_eq!(
            clk.configure(period(), DutyPercent::new(50)),
            Err(DriverError::ResourceUnavailable(Resource::Clock))
        );
        assert!(!clk.is_acquired());
    }

    #[test]
    fn release_disables_first() {
        let log = EventLog::new();
        let mut clk = ClockHandle::new(FakeClock::new(&log));
        clk.configure(period(), DutyPercent::new(50)).unwrap();
        clk.enable().unwrap();
        clk.release().unwrap();
        assert_eq!(clk.state(), ClockState::Unconfigured);
        assert_eq!(log.events().last(), Some(&Event::ClockDisabled));
    }

    #[test]
    fn drop_disables_running_clock() {
        let log = EventLog::new();
        {
            let mut clk = ClockHandle::new(FakeClock::new(&log));
            clk.configure(period(), DutyPercent::new(50)).unwrap();
            clk.enable().unwrap();
        }
        assert_eq!(log.events().last(), Some(&Event::ClockDisabled));
    }

    #[test]
    fn drop_of_idle_clock_is_silent() {
        let log = EventLog::new();
        drop(ClockHandle::new(FakeClock::new(&log)));
        assert!(log.events().is_empty());
    }
}
