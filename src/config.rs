//! Sensor configuration data model
//!
//! Every enum carries the raw field value it is written as, so the register
//! encoders in [`crate::state`] can use `as u8` directly.

/// Power state of one sensor, as encoded in PWR_MGMT0
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum SensorMode {
    Off = 0,
    Standby = 1,
    LowPower = 2,
    LowNoise = 3,
}

/// Sensor specific full-scale selection
pub trait FullScale: Copy + PartialEq + core::fmt::Debug {
    /// Value of the `FS_SEL` field
    fn bits(self) -> u8;
}

/// Gyroscope full-scale range in degrees per second
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum GyroFullScale {
    Dps2000 = 0,
    Dps1000 = 1,
    Dps500 = 2,
    Dps250 = 3,
    Dps125 = 4,
    Dps62_5 = 5,
    Dps31_25 = 6,
    Dps15_625 = 7,
}

impl FullScale for GyroFullScale {
    fn bits(self) -> u8 {
        self as u8
    }
}

/// Accelerometer full-scale range in g
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum AccelFullScale {
    G16 = 0,
    G8 = 1,
    G4 = 2,
    G2 = 3,
}

impl FullScale for AccelFullScale {
    fn bits(self) -> u8 {
        self as u8
    }
}

/// Output data rate, shared encoding for gyro and accel
///
/// Codes 0..=2 are reserved by the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Odr {
    Hz8000 = 3,
    Hz4000 = 4,
    Hz2000 = 5,
    Hz1000 = 6,
    Hz200 = 7,
    Hz100 = 8,
    Hz50 = 9,
    Hz25 = 10,
    Hz12_5 = 11,
    Hz6_25 = 12,
    Hz3_125 = 13,
    Hz1_5625 = 14,
    Hz500 = 15,
}

impl Odr {
    /// Sampling period in nanoseconds
    pub const fn period_ns(self) -> u32 {
        match self {
            Odr::Hz8000 => 125_000,
            Odr::Hz4000 => 250_000,
            Odr::Hz2000 => 500_000,
            Odr::Hz1000 => 1_000_000,
            Odr::Hz200 => 5_000_000,
            Odr::Hz100 => 10_000_000,
            Odr::Hz50 => 20_000_000,
            Odr::Hz25 => 40_000_000,
            Odr::Hz12_5 => 80_000_000,
            Odr::Hz6_25 => 160_000_000,
            Odr::Hz3_125 => 320_000_000,
            Odr::Hz1_5625 => 640_000_000,
            Odr::Hz500 => 2_000_000,
        }
    }
}

/// UI low-pass filter bandwidth (`*_UI_FILT_BW`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FilterBandwidth {
    OdrDiv2 = 0,
    OdrDiv4 = 1,
    OdrDiv5 = 2,
    OdrDiv8 = 3,
    OdrDiv10 = 4,
    OdrDiv16 = 5,
    OdrDiv20 = 6,
    OdrDiv40 = 7,
    /// Low latency, dec2 filter at ODR
    LowLatency = 14,
    /// Low latency, dec2 filter at 8x ODR
    LowLatency8x = 15,
}

/// Applied configuration of one sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorConfig<FS> {
    pub mode: SensorMode,
    pub full_scale: FS,
    pub odr: Odr,
    pub filter: FilterBandwidth,
}

pub type GyroConfig = SensorConfig<GyroFullScale>;
pub type AccelConfig = SensorConfig<AccelFullScale>;

/// Partial configuration request, `None` keeps the applied value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorConfigRequest<FS> {
    pub mode: Option<SensorMode>,
    pub full_scale: Option<FS>,
    pub odr: Option<Odr>,
    pub filter: Option<FilterBandwidth>,
}

impl<FS: FullScale> SensorConfigRequest<FS> {
    /// A request that changes nothing
    pub const fn new() -> Self {
        Self {
            mode: None,
            full_scale: None,
            odr: None,
            filter: None,
        }
    }

    pub fn with_mode(mut self, mode: SensorMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_full_scale(mut self, full_scale: FS) -> Self {
        self.full_scale = Some(full_scale);
        self
    }

    pub fn with_odr(mut self, odr: Odr) -> Self {
        self.odr = Some(odr);
        self
    }

    pub fn with_filter(mut self, filter: FilterBandwidth) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Fill the unspecified fields from `current`
    pub fn resolve(&self, current: &SensorConfig<FS>) -> SensorConfig<FS> {
        SensorConfig {
            mode: self.mode.unwrap_or(current.mode),
            full_scale: self.full_scale.unwrap_or(current.full_scale),
            odr: self.odr.unwrap_or(current.odr),
            filter: self.filter.unwrap_or(current.filter),
        }
    }
}

impl<FS: FullScale> Default for SensorConfigRequest<FS> {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration request addressed to one sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorRequest {
    Gyro(SensorConfigRequest<GyroFullScale>),
    Accel(SensorConfigRequest<AccelFullScale>),
}

/// Power triple encoded in PWR_MGMT0
///
/// Also the snapshot kept across a system suspend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PowerState {
    pub gyro: SensorMode,
    pub accel: SensorMode,
    pub temperature: bool,
}

impl PowerState {
    /// Everything off
    pub const OFF: PowerState = PowerState {
        gyro: SensorMode::Off,
        accel: SensorMode::Off,
        temperature: false,
    };
}

/// Whole device configuration as applied to the hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    pub gyro: GyroConfig,
    pub accel: AccelConfig,
    pub temperature_enabled: bool,
}

impl DeviceConfig {
    pub fn power_state(&self) -> PowerState {
        PowerState {
            gyro: self.gyro.mode,
            accel: self.accel.mode,
            temperature: self.temperature_enabled,
        }
    }

    pub(crate) fn set_power_state(&mut self, state: PowerState) {
        self.gyro.mode = state.gyro;
        self.accel.mode = state.accel;
        self.temperature_enabled = state.temperature;
    }
}

/// FIFO streaming flag, consulted around system suspend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FifoState {
    pub on: bool,
}
