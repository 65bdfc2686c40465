//! G1 bus framing.
//!
//! Every access is a register-select phase followed by a data phase, each
//! introduced by a fixed header byte:
//!
//! ```text
//! CS ‾‾\__________/‾‾\____________________/‾‾
//!        0x70  idx      0x72  payload ...
//! ```
//!
//! A full register write goes out as one four-transfer message so nothing
//! else can land between the two phases. A streamed write leaves CS held
//! after its header and must be closed, by its last byte or by
//! [`FrameTransport::end_stream`].

use epd_platform::{BusTransport, Transfer};

use crate::error::DriverError;

/// Header byte opening a register-select phase.
pub const REGISTER_HEADER: u8 = 0x70;
/// Header byte opening a data phase.
pub const DATA_HEADER: u8 = 0x72;

/// Framing layer over an exclusively owned [`BusTransport`].
pub struct FrameTransport<T> {
    bus: T,
}

impl<T: BusTransport> FrameTransport<T> {
    /// Wrap a transport.
    pub fn new(bus: T) -> Self {
        Self { bus }
    }

    /// Give back the transport.
    pub fn release(self) -> T {
        self.bus
    }

    fn send(&mut self, message: &[Transfer<'_>]) -> Result<(), DriverError> {
        self.bus.transfer(message).map_err(DriverError::bus)
    }

    /// Register-select phase on its own. Ends with CS held, so a following
    /// [`send_data_frame`](Self::send_data_frame) lands in the same selection.
    pub fn send_register_select(&mut self, index: u8) -> Result<(), DriverError> {
        self.send(&[Transfer::new(&[REGISTER_HEADER]), Transfer::cs_change(&[index])])
    }

    /// Data phase on its own. Releases CS at the end.
    pub fn send_data_frame(&mut self, bytes: &[u8]) -> Result<(), DriverError> {
        self.send(&[Transfer::new(&[DATA_HEADER]), Transfer::new(bytes)])
    }

    /// Complete register write as one atomic message.
    pub fn send_command(&mut self, index: u8, payload: &[u8]) -> Result<(), DriverError> {
        self.send(&[
            Transfer::new(&[REGISTER_HEADER]),
            Transfer::cs_change(&[index]),
            Transfer::new(&[DATA_HEADER]),
            Transfer::new(payload),
        ])
    }

    /// Stream header: select `index` and open the data phase, leaving CS held.
    pub fn send_stream_header(&mut self, index: u8) -> Result<(), DriverError> {
        self.send(&[
            Transfer::new(&[REGISTER_HEADER]),
            Transfer::cs_change(&[index]),
            Transfer::cs_change(&[DATA_HEADER]),
        ])
    }

    /// One streamed byte. CS stays held unless this is the final byte.
    pub fn send_stream_byte(&mut self, byte: u8, last: bool) -> Result<(), DriverError> {
        let bytes = [byte];
        let transfer = if last {
            Transfer::new(&bytes)
        } else {
            Transfer::cs_change(&bytes)
        };
        self.send(&[transfer])
    }

    /// Close a stream whose CS is still held: an empty final transfer
    /// flushes the bus and releases the selection.
    pub fn end_stream(&mut self) -> Result<(), DriverError> {
        self.send(&[Transfer::new(&[])])
    }
}
