//! Power rails and lifecycle
//!
//! The chip has two supplies: `vdd` for the sensor core and `vddio` for the
//! interface. `vdd` stays on for the whole lifetime of an [`ICM426xx`];
//! suspend only ever drops `vddio`.

use core::convert::Infallible;
use core::time::Duration;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;

use crate::config::PowerState;
use crate::ll::RegisterPort;
use crate::register_bank::{bank0, FIFO_CONFIG_BYPASS, FIFO_CONFIG_STREAM};
use crate::state::Core;
use crate::{Error, ICM426xx};

/// Wait after enabling `vdd`
pub const VDD_POWER_UP_MS: u32 = 100;
/// Wait after enabling `vddio`
pub const VDDIO_RAMP_US: u32 = 3000;
/// Idle time before the host may runtime-suspend the device
pub const AUTOSUSPEND_DELAY_MS: u64 = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RailId {
    /// Core supply
    Vdd,
    /// I/O supply
    Vddio,
}

/// Switchable supply rails
pub trait PowerSupply {
    type Error;

    fn enable(&mut self, rail: RailId) -> Result<(), Self::Error>;
    fn disable(&mut self, rail: RailId) -> Result<(), Self::Error>;
}

/// Rails that are hardwired on
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysOn;

impl PowerSupply for AlwaysOn {
    type Error = Infallible;

    fn enable(&mut self, _rail: RailId) -> Result<(), Self::Error> {
        Ok(())
    }

    fn disable(&mut self, _rail: RailId) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// Rails behind two active-high load switch enables
pub struct GpioSupply<VDD, VDDIO> {
    vdd: VDD,
    vddio: VDDIO,
}

impl<VDD, VDDIO> GpioSupply<VDD, VDDIO>
where
    VDD: OutputPin,
    VDDIO: OutputPin,
{
    pub fn new(vdd: VDD, vddio: VDDIO) -> Self {
        GpioSupply { vdd, vddio }
    }

    pub fn release(self) -> (VDD, VDDIO) {
        (self.vdd, self.vddio)
    }
}

impl<VDD, VDDIO> PowerSupply for GpioSupply<VDD, VDDIO>
where
    VDD: OutputPin,
    VDDIO: OutputPin,
{
    type Error = embedded_hal::digital::ErrorKind;

    fn enable(&mut self, rail: RailId) -> Result<(), Self::Error> {
        use embedded_hal::digital::Error as _;
        match rail {
            RailId::Vdd => self.vdd.set_high().map_err(|e| e.kind()),
            RailId::Vddio => self.vddio.set_high().map_err(|e| e.kind()),
        }
    }

    fn disable(&mut self, rail: RailId) -> Result<(), Self::Error> {
        use embedded_hal::digital::Error as _;
        match rail {
            RailId::Vdd => self.vdd.set_low().map_err(|e| e.kind()),
            RailId::Vddio => self.vddio.set_low().map_err(|e| e.kind()),
        }
    }
}

/// Which rails are currently switched on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct RailState {
    pub vdd: bool,
    pub vddio: bool,
}

impl RailState {
    fn set(&mut self, rail: RailId, on: bool) {
        match rail {
            RailId::Vdd => self.vdd = on,
            RailId::Vddio => self.vddio = on,
        }
    }
}

/// Runtime power management bookkeeping
///
/// The host decides when to runtime-suspend; this only records whether it is
/// allowed and what state the device is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimePm {
    enabled: bool,
    active: bool,
    autosuspend_delay: Duration,
}

impl RuntimePm {
    pub(crate) const fn new() -> Self {
        RuntimePm {
            enabled: false,
            active: false,
            autosuspend_delay: Duration::from_millis(AUTOSUSPEND_DELAY_MS),
        }
    }

    pub(crate) fn enable(&mut self) {
        self.enabled = true;
    }

    pub(crate) fn disable(&mut self) {
        self.enabled = false;
    }

    pub(crate) fn set_active(&mut self) {
        self.active = true;
    }

    pub(crate) fn set_suspended(&mut self) {
        self.active = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_suspended(&self) -> bool {
        !self.active
    }

    pub fn autosuspend_delay(&self) -> Duration {
        self.autosuspend_delay
    }
}

/// Enable `rail` on a supply that is not owned by a [`Core`] yet
pub(crate) fn enable_rail<V: PowerSupply, E>(
    supply: &mut V,
    rails: &mut RailState,
    rail: RailId,
) -> Result<(), Error<E>> {
    supply.enable(rail).map_err(|_| {
        error!("failed to enable rail {}", rail);
        Error::Rail(rail)
    })?;
    rails.set(rail, true);
    Ok(())
}

/// Disable `rail`, logging a failure
pub(crate) fn disable_rail<V: PowerSupply, E>(
    supply: &mut V,
    rails: &mut RailState,
    rail: RailId,
) -> Result<(), Error<E>> {
    supply.disable(rail).map_err(|_| {
        error!("failed to disable rail {}", rail);
        Error::Rail(rail)
    })?;
    rails.set(rail, false);
    Ok(())
}

/// Disable whatever is still on, `vddio` first, ignoring failures
pub(crate) fn release_rails<V: PowerSupply>(supply: &mut V, rails: &mut RailState) {
    if rails.vddio {
        let _ = disable_rail::<V, ()>(supply, rails, RailId::Vddio);
    }
    if rails.vdd {
        let _ = disable_rail::<V, ()>(supply, rails, RailId::Vdd);
    }
}

impl<P, D, V> Core<P, D, V>
where
    P: RegisterPort,
    D: DelayNs,
    V: PowerSupply,
{
    async fn vddio_on(&mut self) -> Result<(), Error<P::Error>> {
        enable_rail(&mut self.supply, &mut self.rails, RailId::Vddio)?;
        self.delay.delay_us(VDDIO_RAMP_US).await;
        Ok(())
    }

    fn vddio_off(&mut self) -> Result<(), Error<P::Error>> {
        disable_rail(&mut self.supply, &mut self.rails, RailId::Vddio)
    }

    pub(crate) async fn set_fifo_mode(&mut self, stream: bool) -> Result<(), Error<P::Error>> {
        let value = if stream {
            FIFO_CONFIG_STREAM
        } else {
            FIFO_CONFIG_BYPASS
        };
        self.port.write(bank0::FIFO_CONFIG, value).await?;
        Ok(())
    }

    async fn suspend(&mut self) -> Result<(), Error<P::Error>> {
        self.suspended = self.conf.power_state();

        if self.pm.is_suspended() {
            debug!("suspend: already runtime suspended");
            return Ok(());
        }

        if self.fifo.on {
            self.set_fifo_mode(false).await?;
        }
        self.set_power_mode_and_wait(PowerState::OFF).await?;
        self.vddio_off()
    }

    async fn resume(&mut self) -> Result<(), Error<P::Error>> {
        self.vddio_on().await?;

        self.pm.disable();
        self.pm.set_active();
        self.pm.enable();

        let state = self.suspended;
        self.set_power_mode_and_wait(state).await?;

        if self.fifo.on {
            self.set_fifo_mode(true).await?;
        }
        Ok(())
    }

    async fn runtime_suspend(&mut self) -> Result<(), Error<P::Error>> {
        self.set_power_mode_and_wait(PowerState::OFF).await?;
        self.vddio_off()?;
        self.pm.set_suspended();
        debug!("runtime suspended");
        Ok(())
    }

    async fn runtime_resume(&mut self) -> Result<(), Error<P::Error>> {
        self.vddio_on().await?;
        self.pm.set_active();
        debug!("runtime resumed");
        Ok(())
    }
}

impl<M, P, D, V> ICM426xx<M, P, D, V>
where
    M: RawMutex,
    P: RegisterPort,
    D: DelayNs,
    V: PowerSupply,
{
    /// System suspend
    ///
    /// Saves the sensor power modes, then turns the sensors and `vddio` off
    /// unless the device is already runtime-suspended.
    pub async fn suspend(&self) -> Result<(), Error<P::Error>> {
        self.core.lock().await.suspend().await
    }

    /// System resume, restoring the modes saved by [`ICM426xx::suspend`]
    pub async fn resume(&self) -> Result<(), Error<P::Error>> {
        self.core.lock().await.resume().await
    }

    /// Turn the sensors and `vddio` off
    ///
    /// The saved system-suspend state is left alone, and
    /// [`ICM426xx::runtime_resume`] does not turn the sensors back on.
    pub async fn runtime_suspend(&self) -> Result<(), Error<P::Error>> {
        self.core.lock().await.runtime_suspend().await
    }

    pub async fn runtime_resume(&self) -> Result<(), Error<P::Error>> {
        self.core.lock().await.runtime_resume().await
    }

    pub async fn is_runtime_suspended(&self) -> bool {
        self.core.lock().await.pm.is_suspended()
    }

    pub async fn runtime_pm(&self) -> RuntimePm {
        self.core.lock().await.pm
    }

    /// Stream samples into the FIFO or bypass it
    pub async fn set_fifo_streaming(&self, on: bool) -> Result<(), Error<P::Error>> {
        let mut core = self.core.lock().await;
        core.set_fifo_mode(on).await?;
        core.fifo.on = on;
        Ok(())
    }

    /// Tear the device down and hand back its resources
    ///
    /// Sensors are turned off unless the device is runtime-suspended, then
    /// the rails are switched off `vddio` first. Failures are logged and do
    /// not stop the remaining steps.
    pub async fn shutdown(self) -> (P, D, V) {
        let mut core = self.core.into_inner();
        if !core.pm.is_suspended()
            && core.set_power_mode_and_wait(PowerState::OFF).await.is_err()
        {
            error!("failed to turn sensors off");
        }
        core.pm.disable();
        release_rails(&mut core.supply, &mut core.rails);
        (core.port, core.delay, core.supply)
    }
}
