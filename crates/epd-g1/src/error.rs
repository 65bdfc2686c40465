//! Driver error types

use embedded_hal::{digital, spi};

use crate::command::CommandId;
use crate::panel::PanelState;

/// A resource the driver acquires from its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resource {
    /// PWM oscillator reference
    Clock,
    /// Temperature sensor
    Sensor,
    /// GPIO line, by number
    Gpio(u32),
}

/// Operation rejected by the panel state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Operation {
    /// `bring_up`
    BringUp,
    /// `refresh` / `begin_refresh`
    Refresh,
    /// `finish_refresh`
    FinishRefresh,
    /// `power_down`
    PowerDown,
    /// `dispatch_raw`
    Dispatch,
}

impl Operation {
    /// Short name for log output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BringUp => "bring-up",
            Self::Refresh => "refresh",
            Self::FinishRefresh => "finish-refresh",
            Self::PowerDown => "power-down",
            Self::Dispatch => "dispatch",
        }
    }
}

/// One step of the power-down unwind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Stage {
    /// A rail/oscillator register write
    Dispatch(CommandId),
    /// Pulsing the discharge line
    Discharge,
    /// Disabling and releasing the clock
    Clock,
    /// Releasing the sensor
    Sensor,
}

impl Stage {
    /// Short name for log output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dispatch(id) => id.as_str(),
            Self::Discharge => "discharge",
            Self::Clock => "clock",
            Self::Sensor => "sensor",
        }
    }
}

/// Errors surfaced by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DriverError {
    /// Bus transfer failed; the message was aborted
    Bus(spi::ErrorKind),
    /// Reading the busy line or driving the discharge line failed
    Gpio(digital::ErrorKind),
    /// Raw command identifier outside the known set
    InvalidCommand(u8),
    /// Operation not valid in the current panel state
    InvalidState {
        /// State the panel was in
        state: PanelState,
        /// What was asked for
        operation: Operation,
    },
    /// A refresh is already in flight
    Busy,
    /// Clock, sensor or GPIO line could not be acquired
    ResourceUnavailable(Resource),
    /// The temperature sensor did not answer
    Sensor,
    /// Busy line stayed asserted past the poll budget
    Timeout,
    /// Power-down finished but some stages failed; details in
    /// [`Panel::last_teardown`](crate::Panel::last_teardown)
    Teardown {
        /// Number of failed stages
        failed: u8,
        /// First stage that failed
        first: Stage,
    },
}

impl DriverError {
    /// Map any SPI-flavoured error onto [`DriverError::Bus`].
    pub fn bus<E: spi::Error>(error: E) -> Self {
        Self::Bus(error.kind())
    }

    /// Map any GPIO error onto [`DriverError::Gpio`].
    pub fn gpio<E: digital::Error>(error: E) -> Self {
        Self::Gpio(error.kind())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DriverError {}

impl core::fmt::Display for DriverError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bus(kind) => write!(f, "bus transfer failed: {kind}"),
            Self::Gpio(kind) => write!(f, "GPIO access failed: {kind}"),
            Self::InvalidCommand(raw) => write!(f, "unknown command identifier {raw:#04x}"),
            Self::InvalidState { state, operation } => write!(
                f,
                "{} not allowed while panel is {}",
                operation.as_str(),
                state.as_str()
            ),
            Self::Busy => write!(f, "refresh already in progress"),
            Self::ResourceUnavailable(Resource::Clock) => write!(f, "clock source unavailable"),
            Self::ResourceUnavailable(Resource::Sensor) => {
                write!(f, "temperature sensor unavailable")
            }
            Self::ResourceUnavailable(Resource::Gpio(line)) => {
                write!(f, "GPIO line {line} unavailable")
            }
            Self::Sensor => write!(f, "temperature read failed"),
            Self::Timeout => write!(f, "timed out waiting for busy line"),
            Self::Teardown { failed, .. } => {
                write!(f, "power-down completed with {failed} failed stage(s)")
            }
        }
    }
}

/// Error returned when a value is out of the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct OutOfRangeError {
    /// The value that was out of range.
    pub value: u32,
    /// The inclusive minimum allowed value.
    pub min: u32,
    /// The inclusive maximum allowed value.
    pub max: u32,
}

#[cfg(feature = "std")]
impl std::error::Error for OutOfRangeError {}

impl core::fmt::Display for OutOfRangeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "value {} outside {}..={}",
            self.value, self.min, self.max
        )
    }
}

/// Rejected panel configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// More waveform bands than the table holds
    TooManyBands,
    /// Band `index` does not raise the threshold or raises the hold time
    NonMonotonicBands {
        /// Offending band
        index: usize,
    },
    /// Busy policy with a zero poll budget
    ZeroBusyPolls,
    /// Clock period of zero
    ZeroClockPeriod,
    /// Two signals assigned the same GPIO line
    DuplicateLine(u32),
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::TooManyBands => write!(f, "too many waveform bands"),
            Self::NonMonotonicBands { index } => {
                write!(f, "waveform band {index} breaks temperature ordering")
            }
            Self::ZeroBusyPolls => write!(f, "busy poll budget must be non-zero"),
            Self::ZeroClockPeriod => write!(f, "clock period must be non-zero"),
            Self::DuplicateLine(line) => write!(f, "GPIO line {line} assigned twice"),
        }
    }
}
