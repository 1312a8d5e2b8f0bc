#![cfg_attr(not(test), no_std)]
#![cfg_attr(not(doctest), doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md")))]

// This must go first so the logging macros are visible to every module.
mod fmt;

pub mod chip;
pub mod config;
pub mod irq;
pub mod ll;
pub mod power;
pub mod ready;
pub mod register_bank;
pub mod state;
pub mod uninitialized;

#[cfg(test)]
pub(crate) mod testing;

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::mutex::Mutex;
use embassy_sync::signal::Signal;

pub use chip::{Chip, ChipDescriptor};
pub use config::{
    AccelConfig, AccelFullScale, DeviceConfig, FifoState, FilterBandwidth, GyroConfig,
    GyroFullScale, Odr, PowerState, SensorConfig, SensorConfigRequest, SensorMode, SensorRequest,
};
pub use irq::{InterruptConfig, IrqTrigger, SampleSink, ScanSample, TimestampPair};
pub use ll::{RegisterPort, SpiPort};
pub use power::{AlwaysOn, GpioSupply, PowerSupply, RailId, RuntimePm};
pub use state::{settle_delay, SettleDelay};
pub use uninitialized::{Config, Uninitialized};

use crate::state::Core;

/// Driver errors
#[derive(Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// Register access failed
    Bus(E),
    /// WHO_AM_I does not match the requested chip
    WhoAmIMismatch { expected: u8, found: u8 },
    /// The reset done bit was not set after a soft reset
    ResetNotConfirmed,
    /// Chip identifier outside the known table
    InvalidChipId(u8),
    /// A power rail could not be switched
    Rail(RailId),
}

impl<E> From<E> for Error<E> {
    fn from(error: E) -> Self {
        Self::Bus(error)
    }
}

/// ICM426xx device context
///
/// Created by [`Uninitialized::initialize`]. All methods take `&self` so one
/// instance can be shared between the task issuing configuration changes,
/// the interrupt handler and the stage-2 worker. Every register sequence runs
/// under one async mutex; only [`ICM426xx::on_interrupt`] bypasses it.
///
/// Usage:
///
/// ```rust,ignore
/// let port = icm426xx_core::SpiPort::new(spi_device);
/// let icm: ICM426xx<CriticalSectionRawMutex, _, _, _> =
///     Uninitialized::new(port, AlwaysOn)
///         .initialize(Delay, Chip::Icm42600, Config::default())
///         .await
///         .unwrap();
///
/// icm.apply_sensor_config_and_wait(SensorRequest::Accel(
///     SensorConfigRequest::new()
///         .with_mode(SensorMode::LowNoise)
///         .with_odr(Odr::Hz200),
/// ))
/// .await
/// .unwrap();
///
/// // INT1 handler
/// icm.on_interrupt(now_ns());
///
/// // worker task
/// icm.run(&mut sink).await;
/// ```
pub struct ICM426xx<M: RawMutex, P, D, V> {
    core: Mutex<M, Core<P, D, V>>,
    timestamp: BlockingMutex<M, Cell<TimestampPair>>,
    irq_pending: Signal<M, ()>,
    chip: Chip,
}

impl<M: RawMutex, P, D, V> ICM426xx<M, P, D, V> {
    pub(crate) fn from_core(core: Core<P, D, V>) -> Self {
        ICM426xx {
            chip: core.chip,
            core: Mutex::new(core),
            timestamp: BlockingMutex::new(Cell::new(TimestampPair::default())),
            irq_pending: Signal::new(),
        }
    }

    pub fn chip(&self) -> Chip {
        self.chip
    }

    pub fn name(&self) -> &'static str {
        self.chip.name()
    }
}
