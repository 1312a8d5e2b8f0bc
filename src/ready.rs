use core::time::Duration;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;

use crate::config::{
    AccelFullScale, DeviceConfig, GyroFullScale, PowerState, SensorConfigRequest, SensorRequest,
};
use crate::ll::RegisterPort;
use crate::{Error, ICM426xx};

/// Configuration entry points
///
/// Every call holds the device lock for its whole register sequence. The
/// plain variants return the settle time instead of waiting, so a caller can
/// wait outside the lock; the `_and_wait` variants wait with the lock held.
impl<M, P, D, V> ICM426xx<M, P, D, V>
where
    M: RawMutex,
    P: RegisterPort,
    D: DelayNs,
{
    /// Snapshot of the configuration applied to the hardware
    pub async fn config(&self) -> DeviceConfig {
        self.core.lock().await.conf
    }

    /// Apply a partial configuration to one sensor
    ///
    /// Only registers whose value changes are written. If a write fails, the
    /// writes before it stay applied and are reflected by [`ICM426xx::config`].
    pub async fn apply_sensor_config(
        &self,
        request: SensorRequest,
    ) -> Result<Duration, Error<P::Error>> {
        self.core.lock().await.apply_sensor_config(request).await
    }

    pub async fn apply_sensor_config_and_wait(
        &self,
        request: SensorRequest,
    ) -> Result<(), Error<P::Error>> {
        let mut core = self.core.lock().await;
        let settle = core.apply_sensor_config(request).await?;
        core.wait(settle).await;
        Ok(())
    }

    pub async fn set_gyro_conf(
        &self,
        request: SensorConfigRequest<GyroFullScale>,
    ) -> Result<Duration, Error<P::Error>> {
        self.core.lock().await.set_gyro_conf(request).await
    }

    pub async fn set_accel_conf(
        &self,
        request: SensorConfigRequest<AccelFullScale>,
    ) -> Result<Duration, Error<P::Error>> {
        self.core.lock().await.set_accel_conf(request).await
    }

    pub async fn set_temperature(&self, enabled: bool) -> Result<Duration, Error<P::Error>> {
        self.core.lock().await.set_temperature(enabled).await
    }

    pub async fn set_temperature_and_wait(&self, enabled: bool) -> Result<(), Error<P::Error>> {
        let mut core = self.core.lock().await;
        let settle = core.set_temperature(enabled).await?;
        core.wait(settle).await;
        Ok(())
    }

    pub async fn set_power_mode(&self, state: PowerState) -> Result<Duration, Error<P::Error>> {
        self.core.lock().await.set_power_mode(state).await
    }

    pub async fn set_power_mode_and_wait(&self, state: PowerState) -> Result<(), Error<P::Error>> {
        self.core.lock().await.set_power_mode_and_wait(state).await
    }
}
