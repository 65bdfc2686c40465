//! Temperature reading and waveform timing selection.
//!
//! E-paper particles move slower in the cold, so each refresh stage has to
//! be held longer. The [`WaveformTable`] maps a sensor reading to a
//! [`TimingProfile`]; the bands are calibration data, not logic.

use epd_platform::TemperatureSensor;

use crate::error::{ConfigError, DriverError, Resource};

// ── SensorHandle ─────────────────────────────────────────────────────────────

/// Owned temperature sensor, attached while the panel is powered.
pub struct SensorHandle<S: TemperatureSensor> {
    sensor: S,
    attached: bool,
}

impl<S: TemperatureSensor> SensorHandle<S> {
    /// Take ownership of a detached sensor.
    pub fn new(sensor: S) -> Self {
        Self {
            sensor,
            attached: false,
        }
    }

    /// Whether the sensor is attached.
    pub fn is_acquired(&self) -> bool {
        self.attached
    }

    /// Attach the sensor. No-op if already attached.
    pub fn acquire(&mut self) -> Result<(), DriverError> {
        if self.attached {
            return Ok(());
        }
        self.sensor.attach().map_err(|error| {
            tracing::warn!(error = ?error, "sensor attach failed");
            DriverError::ResourceUnavailable(Resource::Sensor)
        })?;
        self.attached = true;
        Ok(())
    }

    /// Current temperature in °C.
    pub fn get_temperature(&mut self) -> Result<i16, DriverError> {
        if !self.attached {
            return Err(DriverError::ResourceUnavailable(Resource::Sensor));
        }
        self.sensor.get_temperature().map_err(|error| {
            tracing::warn!(error = ?error, "temperature read failed");
            DriverError::Sensor
        })
    }

    /// Detach the sensor. No-op if not attached.
    pub fn release(&mut self) -> Result<(), DriverError> {
        if !self.attached {
            return Ok(());
        }
        self.sensor.detach().map_err(|error| {
            tracing::warn!(error = ?error, "sensor detach failed");
            DriverError::Sensor
        })?;
        self.attached = false;
        Ok(())
    }
}

impl<S: TemperatureSensor> Drop for SensorHandle<S> {
    fn drop(&mut self) {
        if self.attached {
            if let Err(error) = self.sensor.detach() {
                tracing::warn!(error = ?error, "sensor still attached at drop and detach failed");
            }
        }
    }
}

// ── Waveform bands ───────────────────────────────────────────────────────────

/// Maximum bands a [`WaveformTable`] holds.
pub const MAX_BANDS: usize = 8;

/// Stage hold at room temperature for the reference 2.7" glass (ms).
pub const BASE_STAGE_HOLD_MS: u32 = 630;

/// One calibration band: readings below `below_celsius` use `stage_hold_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Band {
    /// Exclusive upper bound of the band (°C)
    pub below_celsius: i16,
    /// Hold time per refresh stage (ms)
    pub stage_hold_ms: u32,
}

/// Timing chosen for one refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimingProfile {
    /// Reading the profile was chosen for (°C)
    pub celsius: i16,
    /// Hold time per refresh stage (ms)
    pub stage_hold_ms: u32,
}

/// Temperature bands, coldest first.
///
/// Thresholds strictly increase and hold times never increase, so a colder
/// reading can never select a shorter hold.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "WaveformTableDef")
)]
pub struct WaveformTable {
    bands: heapless::Vec<Band, MAX_BANDS>,
    above_hold_ms: u32,
}

impl WaveformTable {
    /// Build a table from `bands` plus the hold used above the last band.
    pub fn new(bands: &[Band], above_hold_ms: u32) -> Result<Self, ConfigError> {
        let bands = heapless::Vec::from_slice(bands).map_err(|_| ConfigError::TooManyBands)?;
        let table = Self {
            bands,
            above_hold_ms,
        };
        table.validate()?;
        Ok(table)
    }

    /// Check the ordering invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, pair) in self.bands.windows(2).enumerate() {
            if let [colder, warmer] = pair {
                if warmer.below_celsius <= colder.below_celsius
                    || warmer.stage_hold_ms > colder.stage_hold_ms
                {
                    return Err(ConfigError::NonMonotonicBands {
                        index: i.saturating_add(1),
                    });
                }
            }
        }
        if let Some(last) = self.bands.last() {
            if self.above_hold_ms > last.stage_hold_ms {
                return Err(ConfigError::NonMonotonicBands {
                    index: self.bands.len(),
                });
            }
        }
        Ok(())
    }

    /// Profile for a reading.
    pub fn profile_for(&self, celsius: i16) -> TimingProfile {
        let stage_hold_ms = self
            .bands
            .iter()
            .find(|band| celsius < band.below_celsius)
            .map_or(self.above_hold_ms, |band| band.stage_hold_ms);
        TimingProfile {
            celsius,
            stage_hold_ms,
        }
    }

    /// Bands, coldest first.
    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// Hold above the warmest band (ms).
    pub fn above_hold_ms(&self) -> u32 {
        self.above_hold_ms
    }
}

/// G1 stage-time factors applied to [`BASE_STAGE_HOLD_MS`]:
/// ×17 below -10 °C down to ×0.7 at 40 °C and above.
const G1_BANDS: [Band; 7] = [
    Band { below_celsius: -10, stage_hold_ms: 10_710 },
    Band { below_celsius: -5, stage_hold_ms: 7_560 },
    Band { below_celsius: 5, stage_hold_ms: 5_040 },
    Band { below_celsius: 10, stage_hold_ms: 2_520 },
    Band { below_celsius: 15, stage_hold_ms: 1_890 },
    Band { below_celsius: 20, stage_hold_ms: 1_260 },
    Band { below_celsius: 40, stage_hold_ms: BASE_STAGE_HOLD_MS },
];

const G1_ABOVE_HOLD_MS: u32 = 441;

impl Default for WaveformTable {
    fn default() -> Self {
        let mut bands = heapless::Vec::new();
        for band in G1_BANDS {
            // G1_BANDS.len() < MAX_BANDS
            let _ = bands.push(band);
        }
        Self {
            bands,
            above_hold_ms: G1_ABOVE_HOLD_MS,
        }
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct WaveformTableDef {
    bands: heapless::Vec<Band, MAX_BANDS>,
    above_hold_ms: u32,
}

#[cfg(feature = "serde")]
impl TryFrom<WaveformTableDef> for WaveformTable {
    type Error = ConfigError;

    fn try_from(def: WaveformTableDef) -> Result<Self, Self::Error> {
        let table = Self {
            bands: def.bands,
            above_hold_ms: def.above_hold_ms,
        };
        table.validate()?;
        Ok(table)
    }
}
