//! Configuration state machine
//!
//! [`Core`] owns the bus, the delay provider and the applied
//! [`DeviceConfig`]. Every change is written to the chip first and committed
//! to `conf` only once the write succeeded, so on error `conf` reflects the
//! subset of writes that actually reached the hardware.

use core::time::Duration;

use bilge::prelude::*;
use embedded_hal_async::delay::DelayNs;

use crate::chip::Chip;
use crate::config::{
    AccelFullScale, DeviceConfig, FifoState, FilterBandwidth, FullScale, GyroFullScale, Odr,
    PowerState, SensorConfigRequest, SensorMode, SensorRequest,
};
use crate::ll::RegisterPort;
use crate::power::{RailState, RuntimePm};
use crate::register_bank::{bank0, GyroAccelConfig0, PwrMgmt0, SensorConfig0};
use crate::Error;

/// Temperature sensor startup time
pub const TEMP_STARTUP_TIME_MS: u64 = 14;
/// Accelerometer startup time
pub const ACCEL_STARTUP_TIME_MS: u64 = 20;
/// Gyroscope startup time
pub const GYRO_STARTUP_TIME_MS: u64 = 60;
/// Gyroscope stop time
pub const GYRO_STOP_TIME_MS: u64 = 150;
/// No register access is allowed this long after a sensor leaves OFF
pub const SENSOR_ON_ACCESS_DELAY_US: u64 = 200;

/// Waits required after a PWR_MGMT0 write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SettleDelay {
    /// Blocking wait before the next register access
    pub pre_access: Duration,
    /// Time until the sensor output is valid
    pub settle: Duration,
}

/// Waits needed to go from `old` to `new`
///
/// Each applicable constraint is a lower bound, so the result is their
/// maximum. The pre-access window applies once even when both sensors leave
/// OFF together.
pub fn settle_delay(old: PowerState, new: PowerState) -> SettleDelay {
    let mut settle_ms = 0;
    let mut pre_access = false;

    if new.temperature && !old.temperature {
        settle_ms = settle_ms.max(TEMP_STARTUP_TIME_MS);
    }
    if new.accel != old.accel && old.accel == SensorMode::Off {
        pre_access = true;
        settle_ms = settle_ms.max(ACCEL_STARTUP_TIME_MS);
    }
    if new.gyro != old.gyro {
        if old.gyro == SensorMode::Off {
            pre_access = true;
            settle_ms = settle_ms.max(GYRO_STARTUP_TIME_MS);
        } else if new.gyro == SensorMode::Off {
            settle_ms = settle_ms.max(GYRO_STOP_TIME_MS);
        }
    }

    SettleDelay {
        pre_access: if pre_access {
            Duration::from_micros(SENSOR_ON_ACCESS_DELAY_US)
        } else {
            Duration::ZERO
        },
        settle: Duration::from_millis(settle_ms),
    }
}

fn pwr_mgmt0(state: PowerState) -> u8 {
    let mut r = PwrMgmt0::from(0u8);
    r.set_gyro_mode(u2::new(state.gyro as u8));
    r.set_accel_mode(u2::new(state.accel as u8));
    r.set_temp_dis(u1::new(!state.temperature as u8));
    u8::from(r)
}

fn sensor_config0(full_scale: u8, odr: Odr) -> u8 {
    let mut r = SensorConfig0::from(0u8);
    r.set_fs_sel(u3::new(full_scale));
    r.set_odr(u4::new(odr as u8));
    u8::from(r)
}

fn gyro_accel_config0(accel: FilterBandwidth, gyro: FilterBandwidth) -> u8 {
    let mut r = GyroAccelConfig0::from(0u8);
    r.set_accel_ui_filt_bw(u4::new(accel as u8));
    r.set_gyro_ui_filt_bw(u4::new(gyro as u8));
    u8::from(r)
}

/// Device state guarded by the device lock
pub struct Core<P, D, V> {
    pub(crate) port: P,
    pub(crate) delay: D,
    pub(crate) supply: V,
    pub(crate) chip: Chip,
    pub(crate) conf: DeviceConfig,
    pub(crate) fifo: FifoState,
    pub(crate) suspended: PowerState,
    pub(crate) pm: RuntimePm,
    pub(crate) rails: RailState,
}

impl<P, D, V> Core<P, D, V> {
    pub(crate) fn new(port: P, delay: D, supply: V, chip: Chip, rails: RailState) -> Self {
        Core {
            port,
            delay,
            supply,
            chip,
            conf: chip.descriptor().default_config,
            fifo: FifoState::default(),
            suspended: PowerState::OFF,
            pm: RuntimePm::new(),
            rails,
        }
    }
}

impl<P, D, V> Core<P, D, V>
where
    P: RegisterPort,
    D: DelayNs,
{
    /// Block for a settle time returned by one of the deferred operations
    pub(crate) async fn wait(&mut self, settle: Duration) {
        if !settle.is_zero() {
            self.delay.delay_ms(settle.as_millis() as u32).await;
        }
    }

    /// Write PWR_MGMT0 if `state` differs from the applied one
    ///
    /// Performs the pre-access wait and returns the settle time without
    /// waiting for it.
    pub(crate) async fn set_power_mode(
        &mut self,
        state: PowerState,
    ) -> Result<Duration, Error<P::Error>> {
        let old = self.conf.power_state();
        if state == old {
            return Ok(Duration::ZERO);
        }

        self.port.write(bank0::PWR_MGMT0, pwr_mgmt0(state)).await?;
        self.conf.set_power_state(state);

        let wait = settle_delay(old, state);
        if !wait.pre_access.is_zero() {
            self.delay
                .delay_us(wait.pre_access.as_micros() as u32)
                .await;
        }
        trace!("pwr_mgmt0 settle {=u64} ms", wait.settle.as_millis() as u64);
        Ok(wait.settle)
    }

    pub(crate) async fn set_power_mode_and_wait(
        &mut self,
        state: PowerState,
    ) -> Result<(), Error<P::Error>> {
        let settle = self.set_power_mode(state).await?;
        self.wait(settle).await;
        Ok(())
    }

    pub(crate) async fn set_gyro_conf(
        &mut self,
        request: SensorConfigRequest<GyroFullScale>,
    ) -> Result<Duration, Error<P::Error>> {
        let current = self.conf.gyro;
        let target = request.resolve(&current);

        if target.full_scale != current.full_scale || target.odr != current.odr {
            let value = sensor_config0(target.full_scale.bits(), target.odr);
            self.port.write(bank0::GYRO_CONFIG0, value).await?;
            self.conf.gyro.full_scale = target.full_scale;
            self.conf.gyro.odr = target.odr;
        }

        if target.filter != current.filter {
            let value = gyro_accel_config0(self.conf.accel.filter, target.filter);
            self.port.write(bank0::GYRO_ACCEL_CONFIG0, value).await?;
            self.conf.gyro.filter = target.filter;
        }

        let power = PowerState {
            gyro: target.mode,
            ..self.conf.power_state()
        };
        self.set_power_mode(power).await
    }

    pub(crate) async fn set_accel_conf(
        &mut self,
        request: SensorConfigRequest<AccelFullScale>,
    ) -> Result<Duration, Error<P::Error>> {
        let current = self.conf.accel;
        let target = request.resolve(&current);

        if target.full_scale != current.full_scale || target.odr != current.odr {
            let value = sensor_config0(target.full_scale.bits(), target.odr);
            self.port.write(bank0::ACCEL_CONFIG0, value).await?;
            self.conf.accel.full_scale = target.full_scale;
            self.conf.accel.odr = target.odr;
        }

        if target.filter != current.filter {
            let value = gyro_accel_config0(target.filter, self.conf.gyro.filter);
            self.port.write(bank0::GYRO_ACCEL_CONFIG0, value).await?;
            self.conf.accel.filter = target.filter;
        }

        let power = PowerState {
            accel: target.mode,
            ..self.conf.power_state()
        };
        self.set_power_mode(power).await
    }

    pub(crate) async fn apply_sensor_config(
        &mut self,
        request: SensorRequest,
    ) -> Result<Duration, Error<P::Error>> {
        match request {
            SensorRequest::Gyro(req) => self.set_gyro_conf(req).await,
            SensorRequest::Accel(req) => self.set_accel_conf(req).await,
        }
    }

    pub(crate) async fn set_temperature(
        &mut self,
        enabled: bool,
    ) -> Result<Duration, Error<P::Error>> {
        let power = PowerState {
            temperature: enabled,
            ..self.conf.power_state()
        };
        self.set_power_mode(power).await
    }

    /// Write a whole configuration without diffing, then commit it at once
    pub(crate) async fn set_conf(&mut self, conf: &DeviceConfig) -> Result<(), Error<P::Error>> {
        self.port
            .write(bank0::PWR_MGMT0, pwr_mgmt0(conf.power_state()))
            .await?;
        self.port
            .write(
                bank0::GYRO_CONFIG0,
                sensor_config0(conf.gyro.full_scale.bits(), conf.gyro.odr),
            )
            .await?;
        self.port
            .write(
                bank0::ACCEL_CONFIG0,
                sensor_config0(conf.accel.full_scale.bits(), conf.accel.odr),
            )
            .await?;
        self.port
            .write(
                bank0::GYRO_ACCEL_CONFIG0,
                gyro_accel_config0(conf.accel.filter, conf.gyro.filter),
            )
            .await?;

        self.conf = *conf;
        Ok(())
    }
}
