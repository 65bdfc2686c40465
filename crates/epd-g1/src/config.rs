//! Panel configuration
//!
//! Supplied once when a panel is probed and never changed afterwards.
//! Everything except the panel size has a default matching the G1
//! reference board, so the common case is
//! `PanelConfig::builder(PanelSize::Inch2_7).build()`.

use crate::clock::DutyPercent;
use crate::error::ConfigError;
use crate::thermal::WaveformTable;

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Oscillator reference period: 5 µs (200 kHz).
pub const DEFAULT_CLOCK_PERIOD_NS: u32 = 5_000;
/// Oscillator reference duty: 50 %.
pub const DEFAULT_CLOCK_DUTY_PERCENT: u8 = 50;
/// How long the discharge line is held after the rails are off.
pub const DEFAULT_DISCHARGE_SETTLE_MS: u32 = 150;
/// Busy-line samples per streamed byte before giving up.
pub const DEFAULT_MAX_BUSY_POLLS: u32 = 10_000;
/// Gap between busy-line samples.
pub const DEFAULT_POLL_INTERVAL_US: u32 = 10;

// ---------------------------------------------------------------------------
// Panel size
// ---------------------------------------------------------------------------

/// Supported glass sizes. Selects channel-select and gate/source level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PanelSize {
    /// 1.44" (128×96)
    Inch1_44,
    /// 2" (200×96)
    Inch2,
    /// 2.7" (264×176)
    Inch2_7,
}

impl PanelSize {
    /// Width in pixels.
    pub const fn width(self) -> u16 {
        match self {
            Self::Inch1_44 => 128,
            Self::Inch2 => 200,
            Self::Inch2_7 => 264,
        }
    }

    /// Height in pixels (gate lines).
    pub const fn height(self) -> u16 {
        match self {
            Self::Inch1_44 | Self::Inch2 => 96,
            Self::Inch2_7 => 176,
        }
    }

    /// Bytes per gate line at one bit per pixel.
    pub const fn line_bytes(self) -> u16 {
        self.width() / 8
    }

    /// Short name for log output.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Inch1_44 => "1.44in",
            Self::Inch2 => "2in",
            Self::Inch2_7 => "2.7in",
        }
    }
}

// ---------------------------------------------------------------------------
// GPIO lines
// ---------------------------------------------------------------------------

/// GPIO line numbers wired to the panel connector.
///
/// Only `busy` and `discharge` are claimed by the driver; the others are
/// recorded for board support and validated for collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GpioLines {
    /// Panel power switch
    pub panel_on: u32,
    /// Controller reset (active low)
    pub reset: u32,
    /// Border control
    pub border: u32,
    /// Busy (input, high = busy)
    pub busy: u32,
    /// Discharge (output, high = discharging)
    pub discharge: u32,
}

impl GpioLines {
    fn all(&self) -> [u32; 5] {
        [self.panel_on, self.reset, self.border, self.busy, self.discharge]
    }

    fn check_unique(&self) -> Result<(), ConfigError> {
        let lines = self.all();
        for (i, line) in lines.iter().enumerate() {
            if lines.iter().skip(i.saturating_add(1)).any(|other| other == line) {
                return Err(ConfigError::DuplicateLine(*line));
            }
        }
        Ok(())
    }
}

impl Default for GpioLines {
    fn default() -> Self {
        Self {
            panel_on: 1,
            reset: 2,
            border: 3,
            busy: 4,
            discharge: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// Busy policy / clock settings
// ---------------------------------------------------------------------------

/// Bound on the per-byte busy handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BusyPolicy {
    /// Samples before [`DriverError::Timeout`](crate::DriverError::Timeout)
    pub max_polls: u32,
    /// Delay between samples (µs)
    pub poll_interval_us: u32,
}

impl Default for BusyPolicy {
    fn default() -> Self {
        Self {
            max_polls: DEFAULT_MAX_BUSY_POLLS,
            poll_interval_us: DEFAULT_POLL_INTERVAL_US,
        }
    }
}

/// Oscillator reference waveform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClockSettings {
    /// Period (ns)
    pub period_ns: u32,
    /// High fraction of the period
    pub duty: DutyPercent,
}

impl Default for ClockSettings {
    fn default() -> Self {
        Self {
            period_ns: DEFAULT_CLOCK_PERIOD_NS,
            duty: DutyPercent::new(DEFAULT_CLOCK_DUTY_PERCENT),
        }
    }
}

// ---------------------------------------------------------------------------
// PanelConfig
// ---------------------------------------------------------------------------

/// Immutable per-instance configuration.
///
/// Only the builder and deserialization produce one, and both validate, so
/// every `PanelConfig` in hand already passed [`validate`](Self::validate).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "PanelConfigDef")
)]
pub struct PanelConfig {
    size: PanelSize,
    lines: GpioLines,
    busy_policy: BusyPolicy,
    clock: ClockSettings,
    discharge_settle_ms: u32,
    waveforms: WaveformTable,
}

impl PanelConfig {
    /// Start a builder for `size` with reference-board defaults.
    pub fn builder(size: PanelSize) -> PanelConfigBuilder {
        PanelConfigBuilder::new(size)
    }

    /// Panel size
    pub fn size(&self) -> PanelSize {
        self.size
    }

    /// GPIO line numbers
    pub fn lines(&self) -> &GpioLines {
        &self.lines
    }

    /// Busy handshake bound
    pub fn busy_policy(&self) -> BusyPolicy {
        self.busy_policy
    }

    /// Oscillator reference settings
    pub fn clock(&self) -> ClockSettings {
        self.clock
    }

    /// Discharge hold after power-down (ms)
    pub fn discharge_settle_ms(&self) -> u32 {
        self.discharge_settle_ms
    }

    /// Temperature → timing calibration
    pub fn waveforms(&self) -> &WaveformTable {
        &self.waveforms
    }

    /// The checks run by the builder and on deserialization.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.lines.check_unique()?;
        if self.busy_policy.max_polls == 0 {
            return Err(ConfigError::ZeroBusyPolls);
        }
        if self.clock.period_ns == 0 {
            return Err(ConfigError::ZeroClockPeriod);
        }
        self.waveforms.validate()
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct PanelConfigDef {
    size: PanelSize,
    lines: GpioLines,
    busy_policy: BusyPolicy,
    clock: ClockSettings,
    discharge_settle_ms: u32,
    waveforms: WaveformTable,
}

#[cfg(feature = "serde")]
impl TryFrom<PanelConfigDef> for PanelConfig {
    type Error = ConfigError;

    fn try_from(def: PanelConfigDef) -> Result<Self, Self::Error> {
        let config = Self {
            size: def.size,
            lines: def.lines,
            busy_policy: def.busy_policy,
            clock: def.clock,
            discharge_settle_ms: def.discharge_settle_ms,
            waveforms: def.waveforms,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Builder for [`PanelConfig`].
#[derive(Debug, Clone)]
pub struct PanelConfigBuilder {
    config: PanelConfig,
}

impl PanelConfigBuilder {
    fn new(size: PanelSize) -> Self {
        Self {
            config: PanelConfig {
                size,
                lines: GpioLines::default(),
                busy_policy: BusyPolicy::default(),
                clock: ClockSettings::default(),
                discharge_settle_ms: DEFAULT_DISCHARGE_SETTLE_MS,
                waveforms: WaveformTable::default(),
            },
        }
    }

    /// GPIO line numbers
    #[must_use]
    pub fn lines(mut self, lines: GpioLines) -> Self {
        self.config.lines = lines;
        self
    }

    /// Busy handshake bound
    #[must_use]
    pub fn busy_policy(mut self, policy: BusyPolicy) -> Self {
        self.config.busy_policy = policy;
        self
    }

    /// Oscillator reference settings
    #[must_use]
    pub fn clock(mut self, clock: ClockSettings) -> Self {
        self.config.clock = clock;
        self
    }

    /// Discharge hold after power-down (ms)
    #[must_use]
    pub fn discharge_settle_ms(mut self, ms: u32) -> Self {
        self.config.discharge_settle_ms = ms;
        self
    }

    /// Temperature → timing calibration
    #[must_use]
    pub fn waveforms(mut self, table: WaveformTable) -> Self {
        self.config.waveforms = table;
        self
    }

    /// Validate and finish.
    pub fn build(self) -> Result<PanelConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
