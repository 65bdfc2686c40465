//! Hardware collaborator seams for the G1 e-paper driver
//!
//! The driver core (`epd-g1`) never touches a HAL directly. Everything it
//! needs from the board goes through the traits in this crate, so the
//! sequencing logic can be exercised on a desktop against recording mocks.
//!
//! # Architecture Layers
//!
//! ```text
//! Host lifecycle hooks (probe / remove)
//!         ↓
//! Panel sequencer + command dispatcher (epd-g1)
//!         ↓
//! Collaborator seams (this crate - traits + adapters)
//!         ↓
//! embedded-hal 1.0 implementations (SPI bus, PWM, I2C, GPIO)
//! ```
//!
//! # Seams
//!
//! - [`BusTransport`] - atomic multi-transfer SPI messages with per-transfer
//!   chip-select control, implemented by [`SpiTransport`]
//! - [`PwmClock`] - the controller's external oscillator reference,
//!   implemented by [`DutyCycleClock`] over any `SetDutyCycle` channel
//! - [`TemperatureSensor`] - ambient temperature, implemented by [`Lm75`]
//! - [`GpioProvider`] - hands out the busy and discharge lines by number
//!
//! # Features
//!
//! - `std`: Enable the recording mocks in [`mocks`]
//! - `defmt`: Enable defmt::Format derives

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
// Pedantic lints suppressed for this hardware HAL crate:
#![allow(clippy::doc_markdown)] // hex addresses and register names in doc comments
#![allow(clippy::must_use_candidate)] // hardware accessors — callers decide
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

#[cfg(all(feature = "std", not(test)))]
extern crate std;

pub mod bus;
pub mod clock;
pub mod gpio;
pub mod mocks;
pub mod thermal;

pub use bus::{BusTransport, SpiTransport, Transfer, TransportError};
pub use clock::{ClockError, DutyCycleClock, PwmClock};
pub use gpio::GpioProvider;
pub use thermal::{Lm75, TemperatureSensor, LM75_DEFAULT_ADDR};
