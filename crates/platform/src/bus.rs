//! Bus transport seam
//!
//! The G1 controller frames every access as a short run of sub-transfers
//! whose chip-select behaviour differs per transfer. `SpiDevice` only
//! models "CS asserted for the whole transaction", so the driver talks to
//! a [`BusTransport`] instead and [`SpiTransport`] drives CS by hand over
//! an exclusively owned [`SpiBus`].
//!
//! # Chip-select semantics
//!
//! A message is a slice of [`Transfer`]s issued atomically. CS is asserted
//! before the first transfer. The `cs_change` flag then means:
//!
//! | Position | `cs_change = false` | `cs_change = true` |
//! |----------|---------------------|--------------------|
//! | inside the message | keep CS asserted | release CS, re-assert before the next transfer |
//! | last transfer | release CS at the end | keep CS asserted after the message |
//!
//! A message that ends with CS held leaves the following message running
//! inside the same selection window.

use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{self, ErrorKind, SpiBus};

/// One sub-transfer of an atomic bus message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transfer<'a> {
    /// Bytes clocked out on MOSI.
    pub bytes: &'a [u8],
    /// Chip-select change request (see module docs).
    pub cs_change: bool,
}

impl<'a> Transfer<'a> {
    /// Transfer with default chip-select behaviour.
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            cs_change: false,
        }
    }

    /// Transfer with the `cs_change` flag set.
    pub const fn cs_change(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            cs_change: true,
        }
    }

    /// Whether CS is released after this transfer, given its position.
    pub const fn releases_cs(&self, is_last: bool) -> bool {
        self.cs_change != is_last
    }
}

/// Exclusive bus connection able to issue atomic multi-transfer messages.
///
/// No other bus user may interleave with a message. A failure aborts the
/// rest of the message; implementations must not retry.
pub trait BusTransport {
    /// Transport error type
    type Error: spi::Error;

    /// Issue `message` as one atomic transaction.
    fn transfer(&mut self, message: &[Transfer<'_>]) -> Result<(), Self::Error>;
}

impl<T: BusTransport + ?Sized> BusTransport for &mut T {
    type Error = T::Error;

    fn transfer(&mut self, message: &[Transfer<'_>]) -> Result<(), Self::Error> {
        (**self).transfer(message)
    }
}

/// Errors raised by [`SpiTransport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError<SpiE, PinE> {
    /// SPI write or flush failed
    Spi(SpiE),
    /// Driving the chip-select line failed
    ChipSelect(PinE),
}

impl<SpiE, PinE> spi::Error for TransportError<SpiE, PinE>
where
    SpiE: spi::Error,
    PinE: core::fmt::Debug,
{
    fn kind(&self) -> ErrorKind {
        match self {
            Self::Spi(e) => e.kind(),
            Self::ChipSelect(_) => ErrorKind::ChipSelectFault,
        }
    }
}

/// [`BusTransport`] over an owned SPI bus and a manually driven CS pin.
///
/// CS is active low. Owning the bus is what makes each message atomic:
/// nothing else can reach the wires while a message is in flight.
pub struct SpiTransport<SPI, CS> {
    spi: SPI,
    cs: CS,
    selected: bool,
}

impl<SPI, CS> SpiTransport<SPI, CS>
where
    SPI: SpiBus,
    CS: OutputPin,
{
    /// Wrap a bus and its chip-select line. CS is assumed released.
    pub fn new(spi: SPI, cs: CS) -> Self {
        Self {
            spi,
            cs,
            selected: false,
        }
    }

    /// Whether CS is currently held asserted from a previous message.
    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Give back the bus and CS pin.
    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }

    fn select(&mut self) -> Result<(), TransportError<SPI::Error, CS::Error>> {
        self.cs.set_low().map_err(TransportError::ChipSelect)?;
        self.selected = true;
        Ok(())
    }

    fn deselect(&mut self) -> Result<(), TransportError<SPI::Error, CS::Error>> {
        self.selected = false;
        self.cs.set_high().map_err(TransportError::ChipSelect)
    }

    fn run(&mut self, message: &[Transfer<'_>]) -> Result<(), TransportError<SPI::Error, CS::Error>> {
        let Some(last) = message.len().checked_sub(1) else {
            return Ok(());
        };

        for (position, transfer) in message.iter().enumerate() {
            if !self.selected {
                self.select()?;
            }
            if !transfer.bytes.is_empty() {
                self.spi.write(transfer.bytes).map_err(TransportError::Spi)?;
            }

            let is_last = position == last;
            let release = transfer.releases_cs(is_last);
            // Bytes must be on the wire before a CS edge or before the
            // caller starts polling the busy line.
            if release || is_last {
                self.spi.flush().map_err(TransportError::Spi)?;
            }
            if release {
                self.deselect()?;
            }
        }
        Ok(())
    }
}

impl<SPI, CS> BusTransport for SpiTransport<SPI, CS>
where
    SPI: SpiBus,
    CS: OutputPin,
{
    type Error = TransportError<SPI::Error, CS::Error>;

    fn transfer(&mut self, message: &[Transfer<'_>]) -> Result<(), Self::Error> {
        let result = self.run(message);
        if result.is_err() && self.selected {
            // Abort: never leave the controller selected after a failed message.
            let _ = self.deselect();
        }
        result
    }
}
