//! PWM clock seam
//!
//! The G1 controller needs an external square wave as its oscillator
//! reference before the oscillator register is switched on. The driver
//! only needs three things from the PWM hardware, captured by [`PwmClock`].

use embedded_hal::pwm::SetDutyCycle;

/// A periodic clock output.
///
/// Mirrors the classic `config / enable / disable` PWM lifecycle. Durations
/// are in nanoseconds.
pub trait PwmClock {
    /// Clock error type
    type Error: core::fmt::Debug;

    /// Set period and high time. Does not start the output.
    fn configure(&mut self, period_ns: u32, duty_ns: u32) -> Result<(), Self::Error>;

    /// Start driving the configured waveform.
    fn enable(&mut self) -> Result<(), Self::Error>;

    /// Stop the output (line held low).
    fn disable(&mut self) -> Result<(), Self::Error>;
}

/// Errors raised by [`DutyCycleClock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockError<E> {
    /// Underlying PWM channel error
    Pwm(E),
    /// The channel's timer runs at a fixed period that differs from the request
    UnsupportedPeriod {
        /// Requested period (ns)
        requested_ns: u32,
        /// Period the channel actually runs at (ns)
        fixed_ns: u32,
    },
    /// High time longer than the period
    DutyExceedsPeriod,
    /// `enable` called before `configure`
    NotConfigured,
}

/// [`PwmClock`] over an embedded-hal PWM channel whose timer frequency was
/// fixed when the HAL set it up.
///
/// `SetDutyCycle` cannot change the period, so `configure` only accepts the
/// period the timer already runs at and scales the high time onto the
/// channel's duty range.
pub struct DutyCycleClock<P> {
    pwm: P,
    period_ns: u32,
    duty: Option<u16>,
}

impl<P: SetDutyCycle> DutyCycleClock<P> {
    /// Wrap a channel whose timer runs with period `period_ns`.
    pub fn new(pwm: P, period_ns: u32) -> Self {
        Self {
            pwm,
            period_ns,
            duty: None,
        }
    }

    /// Give back the PWM channel.
    pub fn release(self) -> P {
        self.pwm
    }
}

impl<P: SetDutyCycle> PwmClock for DutyCycleClock<P> {
    type Error = ClockError<P::Error>;

    fn configure(&mut self, period_ns: u32, duty_ns: u32) -> Result<(), Self::Error> {
        if period_ns != self.period_ns || period_ns == 0 {
            return Err(ClockError::UnsupportedPeriod {
                requested_ns: period_ns,
                fixed_ns: self.period_ns,
            });
        }
        if duty_ns > period_ns {
            return Err(ClockError::DutyExceedsPeriod);
        }

        let max = u64::from(self.pwm.max_duty_cycle());
        // duty_ns <= period_ns, so the quotient never exceeds max (a u16).
        let scaled = u64::from(duty_ns)
            .saturating_mul(max)
            .checked_div(u64::from(period_ns))
            .unwrap_or(0);
        let duty = u16::try_from(scaled).map_err(|_| ClockError::DutyExceedsPeriod)?;
        self.duty = Some(duty);
        Ok(())
    }

    fn enable(&mut self) -> Result<(), Self::Error> {
        let duty = self.duty.ok_or(ClockError::NotConfigured)?;
        self.pwm.set_duty_cycle(duty).map_err(ClockError::Pwm)
    }

    fn disable(&mut self) -> Result<(), Self::Error> {
        self.pwm.set_duty_cycle_fully_off().map_err(ClockError::Pwm)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use core::convert::Infallible;

    struct Channel {
        max: u16,
        duty: u16,
    }

    impl embedded_hal::pwm::ErrorType for Channel {
        type Error = Infallible;
    }

    impl SetDutyCycle for Channel {
        fn max_duty_cycle(&self) -> u16 {
            self.max
        }

        fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
            self.duty = duty;
            Ok(())
        }
    }

    fn clock() -> DutyCycleClock<Channel> {
        DutyCycleClock::new(Channel { max: 1000, duty: 0 }, 5000)
    }

    #[test]
    fn half_duty_maps_to_half_of_max() {
        let mut clk = clock();
        clk.configure(5000, 2500).unwrap();
        clk.enable().unwrap();
        assert_eq!(clk.release().duty, 500);
    }

    #[test]
    fn disable_drives_duty_to_zero() {
        let mut clk = clock();
        clk.configure(5000, 2500).unwrap();
        clk.enable().unwrap();
        clk.disable().unwrap();
        assert_eq!(clk.release().duty, 0);
    }

    #[test]
    fn rejects_foreign_period() {
        let mut clk = clock();
        assert_eq!(
            clk.configure(4000, 2000),
            Err(ClockError::UnsupportedPeriod {
                requested_ns: 4000,
                fixed_ns: 5000
            })
        );
    }

    #[test]
    fn rejects_duty_longer_than_period() {
        let mut clk = clock();
        assert_eq!(clk.configure(5000, 5001), Err(ClockError::DutyExceedsPeriod));
    }

    #[test]
    fn enable_before_configure_fails() {
        let mut clk = clock();
        assert_eq!(clk.enable(), Err(ClockError::NotConfigured));
    }
}
