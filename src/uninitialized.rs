//! Power-up and reset sequence, before the device can be shared

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;

use crate::chip::Chip;
use crate::irq::InterruptConfig;
use crate::ll::RegisterPort;
use crate::power::{
    enable_rail, release_rails, PowerSupply, RailId, RailState, VDDIO_RAMP_US, VDD_POWER_UP_MS,
};
use crate::register_bank::{
    bank0, IntStatus, DEVICE_CONFIG_SOFT_RESET, INTF_CONFIG0_SENSOR_DATA_ENDIAN,
    TMST_CONFIG_MASK, TMST_CONFIG_TMST_EN, TMST_CONFIG_TMST_TO_REGS_EN,
};
use crate::state::Core;
use crate::{Error, ICM426xx};

/// Time for the soft reset to complete
pub const SOFT_RESET_TIME_MS: u32 = 1;

/// Board level configuration applied during [`Uninitialized::initialize`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    pub interrupt: InterruptConfig,
}

/// A device that has not been powered up yet
pub struct Uninitialized<P, V> {
    port: P,
    supply: V,
}

impl<P, V> Uninitialized<P, V>
where
    P: RegisterPort,
    V: PowerSupply,
{
    pub fn new(port: P, supply: V) -> Self {
        Uninitialized { port, supply }
    }

    /// Power the chip up, reset it and load the default configuration of `chip`
    ///
    /// On failure every rail that was switched on is switched off again,
    /// `vddio` first.
    pub async fn initialize<M, D>(
        self,
        mut delay: D,
        chip: Chip,
        config: Config,
    ) -> Result<ICM426xx<M, P, D, V>, Error<P::Error>>
    where
        M: RawMutex,
        D: DelayNs,
    {
        let Uninitialized { port, mut supply } = self;
        let mut rails = RailState::default();

        enable_rail(&mut supply, &mut rails, RailId::Vdd)?;
        delay.delay_ms(VDD_POWER_UP_MS).await;

        if let Err(e) = enable_rail(&mut supply, &mut rails, RailId::Vddio) {
            release_rails(&mut supply, &mut rails);
            return Err(e);
        }
        delay.delay_us(VDDIO_RAMP_US).await;

        let mut core = Core::new(port, delay, supply, chip, rails);
        match core.setup(&config).await {
            Ok(()) => {
                debug!("{} initialized", chip.name());
                Ok(ICM426xx::from_core(core))
            }
            Err(e) => {
                release_rails(&mut core.supply, &mut core.rails);
                Err(e)
            }
        }
    }
}

impl<P, D, V> Core<P, D, V>
where
    P: RegisterPort,
    D: DelayNs,
{
    async fn setup(&mut self, config: &Config) -> Result<(), Error<P::Error>> {
        let expected = self.chip.descriptor().whoami;
        let found = self.port.read(bank0::WHO_AM_I).await?;
        if found != expected {
            error!(
                "invalid whoami {=u8:#x} expected {=u8:#x}",
                found,
                expected
            );
            return Err(Error::WhoAmIMismatch { expected, found });
        }

        self.port
            .write(bank0::DEVICE_CONFIG, DEVICE_CONFIG_SOFT_RESET)
            .await?;
        self.delay.delay_ms(SOFT_RESET_TIME_MS).await;

        let status = IntStatus::from(self.port.read(bank0::INT_STATUS).await?);
        if status.reset_done_int().value() == 0 {
            error!("reset error, reset done bit not set");
            return Err(Error::ResetNotConfirmed);
        }

        // sensor data in little endian
        self.port
            .update_bits(bank0::INTF_CONFIG0, INTF_CONFIG0_SENSOR_DATA_ENDIAN, 0)
            .await?;

        let conf = self.chip.descriptor().default_config;
        self.set_conf(&conf).await?;

        self.port
            .update_bits(
                bank0::TMST_CONFIG,
                TMST_CONFIG_MASK,
                TMST_CONFIG_TMST_TO_REGS_EN | TMST_CONFIG_TMST_EN,
            )
            .await?;

        self.setup_irq(&config.interrupt).await?;

        self.pm.set_active();
        self.pm.enable();
        Ok(())
    }
}
