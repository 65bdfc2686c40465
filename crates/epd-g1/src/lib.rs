//! Driver for G1 chip-on-glass e-paper controllers
//!
//! Covers the controller's register protocol and panel power sequencing:
//! command table, two-phase bus framing, the byte-then-busy streaming
//! handshake, oscillator reference and temperature-compensated refresh
//! timing. Hardware access goes through the seams in `epd-platform`.
//!
//! # Layers
//!
//! ```text
//! lifecycle::{probe, remove}
//!         ↓
//! Panel (state machine: Off → Ready ⇄ Refreshing → Off)
//!         ↓
//! Controller (dispatch, write_stream)
//!         ↓
//! FrameTransport (0x70 register select / 0x72 data)
//!         ↓
//! epd_platform::BusTransport
//! ```
//!
//! # Example
//!
//! ```ignore
//! let config = PanelConfig::builder(PanelSize::Inch2_7).build()?;
//! let mut panel = lifecycle::probe(config, &mut gpio, Resources { bus, clock, sensor, delay })?;
//! panel.bring_up()?;
//! panel.refresh(&frame)?;
//! let released = lifecycle::remove(panel);
//! ```
//!
//! # Features
//!
//! - `std`: `std::error::Error` impls
//! - `defmt`: `defmt::Format` derives
//! - `serde`: (de)serialisable [`PanelConfig`] and [`WaveformTable`]

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(clippy::unreachable)] // no unreachable!() that isn't documented
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(unsafe_op_in_unsafe_fn)]
#![warn(clippy::print_stdout)] // prefer tracing/defmt over println! in lib code
#![allow(clippy::doc_markdown)] // register names in doc comments
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::match_same_arms)] // command table mirrors the register map

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod clock;
pub mod command;
pub mod config;
pub mod controller;
pub mod error;
pub mod frame;
pub mod lifecycle;
pub mod panel;
pub mod thermal;

pub use clock::{ClockHandle, ClockState, DutyPercent};
pub use command::{lookup, CommandEntry, CommandId, Register};
pub use config::{BusyPolicy, ClockSettings, GpioLines, PanelConfig, PanelConfigBuilder, PanelSize};
pub use controller::Controller;
pub use error::{ConfigError, DriverError, Operation, OutOfRangeError, Resource, Stage};
pub use frame::FrameTransport;
pub use lifecycle::{probe, remove, Resources};
pub use panel::{Panel, PanelState, Released, TeardownReport};
pub use thermal::{Band, SensorHandle, TimingProfile, WaveformTable};
