//! Command dispatch and streamed data writes.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::InputPin;
use epd_platform::BusTransport;

use crate::command::{lookup, CommandId, Register};
use crate::config::BusyPolicy;
use crate::error::DriverError;
use crate::frame::FrameTransport;

/// Register-level access to one G1 controller.
pub struct Controller<T> {
    frame: FrameTransport<T>,
}

impl<T: BusTransport> Controller<T> {
    /// Wrap an exclusively owned transport.
    pub fn new(bus: T) -> Self {
        Self {
            frame: FrameTransport::new(bus),
        }
    }

    /// Give back the transport.
    pub fn release(self) -> T {
        self.frame.release()
    }

    /// Issue the register write for `id`.
    ///
    /// Not idempotent: re-sending a charge-pump stage re-triggers it, so
    /// callers retry only with knowledge of which stage failed.
    pub fn dispatch(&mut self, id: CommandId) -> Result<(), DriverError> {
        let entry = lookup(id);
        tracing::trace!(
            command = id.as_str(),
            register = entry.register().index(),
            len = entry.declared_len(),
            "dispatch"
        );
        self.frame
            .send_command(entry.register().index(), entry.payload())
    }

    /// Dispatch an identifier that came from outside the driver.
    pub fn dispatch_raw(&mut self, raw: u8) -> Result<(), DriverError> {
        let id = CommandId::try_from(raw)?;
        self.dispatch(id)
    }

    /// Stream `data` into the data register one byte at a time, waiting
    /// for the busy line to drop after every byte.
    ///
    /// Bytes already sent when an error occurs are latched by the
    /// controller; the frame has to be streamed again from the start.
    /// CS is released on every return path, including an empty `data`.
    pub fn write_stream<B, D>(
        &mut self,
        data: &[u8],
        busy: &mut B,
        delay: &mut D,
        policy: BusyPolicy,
    ) -> Result<(), DriverError>
    where
        B: InputPin,
        D: DelayNs,
    {
        self.frame.send_stream_header(Register::Data.index())?;

        let mut bytes = data.iter().peekable();
        if bytes.peek().is_none() {
            self.frame.end_stream()?;
            tracing::trace!("empty stream");
            return Ok(());
        }
        while let Some(&byte) = bytes.next() {
            let last = bytes.peek().is_none();
            // A failed transfer is deselected by the transport itself.
            self.frame.send_stream_byte(byte, last)?;
            if let Err(error) = wait_while_busy(busy, delay, policy) {
                if !last {
                    self.abandon_stream();
                }
                return Err(error);
            }
        }
        tracing::trace!(len = data.len(), "stream complete");
        Ok(())
    }

    fn abandon_stream(&mut self) {
        if let Err(error) = self.frame.end_stream() {
            tracing::warn!(error = %error, "could not release CS after aborted stream");
        }
    }
}

/// Poll `busy` until it reads low, at most `policy.max_polls` times.
pub fn wait_while_busy<B, D>(busy: &mut B, delay: &mut D, policy: BusyPolicy) -> Result<(), DriverError>
where
    B: InputPin,
    D: DelayNs,
{
    for _ in 0..policy.max_polls {
        if !busy.is_high().map_err(DriverError::gpio)? {
            return Ok(());
        }
        delay.delay_us(policy.poll_interval_us);
    }
    tracing::warn!(polls = policy.max_polls, "busy line stuck high");
    Err(DriverError::Timeout)
}
