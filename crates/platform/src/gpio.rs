//! GPIO line provider
//!
//! Board support owns line allocation. The driver asks for lines by the
//! number recorded in its configuration and only ever reads (busy) or
//! drives (discharge) what it is given.

use embedded_hal::digital::{InputPin, OutputPin, PinState};

/// Hands out digital line handles by line number.
pub trait GpioProvider {
    /// Input line handle
    type Input: InputPin;
    /// Output line handle
    type Output: OutputPin;
    /// Allocation error type
    type Error: core::fmt::Debug;

    /// Claim `line` as an input.
    fn request_input(&mut self, line: u32) -> Result<Self::Input, Self::Error>;

    /// Claim `line` as an output driven to `initial`.
    fn request_output(&mut self, line: u32, initial: PinState) -> Result<Self::Output, Self::Error>;
}
