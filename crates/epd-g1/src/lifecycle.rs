//! Attach/detach hooks for the host platform.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin, PinState};
use epd_platform::{BusTransport, GpioProvider, PwmClock, TemperatureSensor};

use crate::config::PanelConfig;
use crate::error::{DriverError, Resource};
use crate::panel::{Panel, PanelState, Released};

/// Resources the host hands over at attach time.
pub struct Resources<T, C, S, D> {
    /// Exclusive bus transport to the controller
    pub bus: T,
    /// Oscillator reference
    pub clock: C,
    /// Temperature sensor
    pub sensor: S,
    /// Delay provider
    pub delay: D,
}

/// Panel type produced by [`probe`] for a given GPIO provider.
pub type ProbedPanel<T, G, C, S, D> =
    Panel<T, <G as GpioProvider>::Input, <G as GpioProvider>::Output, C, S, D>;

/// Claim the busy and discharge lines and assemble a panel in `Off`.
///
/// The discharge line starts low. Nothing is sent to the controller.
pub fn probe<T, G, C, S, D>(
    config: PanelConfig,
    gpio: &mut G,
    resources: Resources<T, C, S, D>,
) -> Result<ProbedPanel<T, G, C, S, D>, DriverError>
where
    T: BusTransport,
    G: GpioProvider,
    C: PwmClock,
    S: TemperatureSensor,
    D: DelayNs,
{
    let lines = *config.lines();

    let busy = gpio.request_input(lines.busy).map_err(|error| {
        tracing::warn!(line = lines.busy, error = ?error, "busy line unavailable");
        DriverError::ResourceUnavailable(Resource::Gpio(lines.busy))
    })?;
    let discharge = gpio
        .request_output(lines.discharge, PinState::Low)
        .map_err(|error| {
            tracing::warn!(line = lines.discharge, error = ?error, "discharge line unavailable");
            DriverError::ResourceUnavailable(Resource::Gpio(lines.discharge))
        })?;

    let size = config.size();
    tracing::debug!(
        size = size.as_str(),
        width = size.width(),
        height = size.height(),
        "panel probed"
    );

    Ok(Panel::new(
        config,
        resources.bus,
        busy,
        discharge,
        resources.clock,
        resources.sensor,
        resources.delay,
    ))
}

/// Power the panel down if needed and hand back everything it owned.
///
/// Teardown failures are logged and dropped; the host is detaching anyway.
pub fn remove<T, BUSY, DIS, C, S, D>(
    mut panel: Panel<T, BUSY, DIS, C, S, D>,
) -> Released<T, BUSY, DIS, C, S, D>
where
    T: BusTransport,
    BUSY: InputPin,
    DIS: OutputPin,
    C: PwmClock,
    S: TemperatureSensor,
    D: DelayNs,
{
    if panel.state() != PanelState::Off {
        if let Err(error) = panel.power_down() {
            tracing::warn!(error = %error, "power-down on remove incomplete");
        }
    }
    tracing::debug!("panel removed");
    panel.release()
}
