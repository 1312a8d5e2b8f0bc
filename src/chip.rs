//! Chip identity table

use crate::config::{
    AccelFullScale, DeviceConfig, FilterBandwidth, GyroFullScale, Odr, SensorConfig, SensorMode,
};

/// Supported chip variants
///
/// Discriminants are the identifiers accepted by `Chip::try_from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Chip {
    Icm42600 = 1,
    Icm42602 = 2,
    Icm42605 = 3,
    Icm42622 = 4,
    Icm42631 = 5,
    Icm42670 = 6,
}

/// Static description of a chip variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipDescriptor {
    /// Expected WHO_AM_I value
    pub whoami: u8,
    pub name: &'static str,
    /// Configuration applied right after reset
    pub default_config: DeviceConfig,
}

const ICM42600_DEFAULT_CONFIG: DeviceConfig = DeviceConfig {
    gyro: SensorConfig {
        mode: SensorMode::Off,
        full_scale: GyroFullScale::Dps2000,
        odr: Odr::Hz50,
        filter: FilterBandwidth::OdrDiv2,
    },
    accel: SensorConfig {
        mode: SensorMode::Off,
        full_scale: AccelFullScale::G16,
        odr: Odr::Hz50,
        filter: FilterBandwidth::OdrDiv2,
    },
    temperature_enabled: false,
};

const ICM42670_DEFAULT_CONFIG: DeviceConfig = DeviceConfig {
    gyro: SensorConfig {
        mode: SensorMode::LowNoise,
        full_scale: GyroFullScale::Dps2000,
        odr: Odr::Hz200,
        filter: FilterBandwidth::OdrDiv2,
    },
    accel: SensorConfig {
        mode: SensorMode::LowNoise,
        full_scale: AccelFullScale::G16,
        odr: Odr::Hz200,
        filter: FilterBandwidth::OdrDiv2,
    },
    temperature_enabled: false,
};

static CHIPS: [ChipDescriptor; 6] = [
    ChipDescriptor {
        whoami: 0x40,
        name: "icm42600",
        default_config: ICM42600_DEFAULT_CONFIG,
    },
    ChipDescriptor {
        whoami: 0x41,
        name: "icm42602",
        default_config: ICM42600_DEFAULT_CONFIG,
    },
    ChipDescriptor {
        whoami: 0x42,
        name: "icm42605",
        default_config: ICM42600_DEFAULT_CONFIG,
    },
    ChipDescriptor {
        whoami: 0x46,
        name: "icm42622",
        default_config: ICM42600_DEFAULT_CONFIG,
    },
    ChipDescriptor {
        whoami: 0x5C,
        name: "icm42631",
        default_config: ICM42600_DEFAULT_CONFIG,
    },
    ChipDescriptor {
        whoami: 0x67,
        name: "icm42670",
        default_config: ICM42670_DEFAULT_CONFIG,
    },
];

impl TryFrom<u8> for Chip {
    /// The rejected identifier, see [`crate::Error::InvalidChipId`]
    type Error = u8;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(Chip::Icm42600),
            2 => Ok(Chip::Icm42602),
            3 => Ok(Chip::Icm42605),
            4 => Ok(Chip::Icm42622),
            5 => Ok(Chip::Icm42631),
            6 => Ok(Chip::Icm42670),
            _ => {
                error!("invalid chip = {=u8}", id);
                Err(id)
            }
        }
    }
}

impl Chip {
    pub fn descriptor(self) -> &'static ChipDescriptor {
        &CHIPS[self as usize - 1]
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }
}
