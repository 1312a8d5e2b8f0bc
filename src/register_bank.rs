//! Register bank module
//!
//! The ICM426xx exposes five 256-byte register banks. They are addressed here
//! as one flat space `0x0000..=0x4FFF`, where bits 12..15 of an address select
//! a 4 KiB window (the value written to `REG_BANK_SEL`) and the low byte is the
//! register offset inside that bank.
#![allow(clippy::identity_op)]

use bilge::prelude::*;

// #[feature(adt_const_params)] is not stable yet, banks stay plain integers
pub type RegisterBank = u8;
pub const BANK0: RegisterBank = 0x00;
pub const BANK1: RegisterBank = 0x01;
pub const BANK4: RegisterBank = 0x04;

/// Bank selector, present at the same offset in every bank
pub const REG_BANK_SEL: u8 = 0x76;
pub const BANK_SEL_MASK: u8 = 0x07;

/// Size of one bank window in the flat address space
pub const WINDOW_LEN: u16 = 0x1000;
/// Highest valid flat register address
pub const MAX_REGISTER: u16 = 0x4FFF;

/// Flat address of register `offset` in `bank`
#[inline(always)]
pub const fn address(bank: RegisterBank, offset: u8) -> u16 {
    (bank as u16) * WINDOW_LEN + offset as u16
}

/// Bank selected by a flat address
#[inline(always)]
pub const fn bank_of(addr: u16) -> RegisterBank {
    ((addr / WINDOW_LEN) as u8) & BANK_SEL_MASK
}

/// Register offset inside its bank
#[inline(always)]
pub const fn offset_of(addr: u16) -> u8 {
    (addr % WINDOW_LEN) as u8
}

/// User bank 0 registers used by the driver core
pub mod bank0 {
    use super::{address, BANK0};

    pub const DEVICE_CONFIG: u16 = address(BANK0, 0x11);
    pub const INT_CONFIG: u16 = address(BANK0, 0x14);
    pub const FIFO_CONFIG: u16 = address(BANK0, 0x16);
    /// First of the 12 contiguous accel + gyro data registers
    pub const ACCEL_DATA_X1: u16 = address(BANK0, 0x1F);
    pub const GYRO_DATA_X1: u16 = address(BANK0, 0x25);
    pub const INT_STATUS: u16 = address(BANK0, 0x2D);
    pub const INTF_CONFIG0: u16 = address(BANK0, 0x4C);
    pub const PWR_MGMT0: u16 = address(BANK0, 0x4E);
    pub const GYRO_CONFIG0: u16 = address(BANK0, 0x4F);
    pub const ACCEL_CONFIG0: u16 = address(BANK0, 0x50);
    pub const GYRO_ACCEL_CONFIG0: u16 = address(BANK0, 0x52);
    pub const TMST_CONFIG: u16 = address(BANK0, 0x54);
    pub const INT_CONFIG1: u16 = address(BANK0, 0x64);
    pub const INT_SOURCE0: u16 = address(BANK0, 0x65);
    pub const WHO_AM_I: u16 = address(BANK0, 0x75);
}

/// DEVICE_CONFIG: software reset
pub const DEVICE_CONFIG_SOFT_RESET: u8 = 1 << 0;

/// FIFO_CONFIG modes
pub const FIFO_CONFIG_BYPASS: u8 = 0b00 << 6;
pub const FIFO_CONFIG_STREAM: u8 = 0b01 << 6;

/// INTF_CONFIG0: 1 = big endian sensor data (reset value)
pub const INTF_CONFIG0_SENSOR_DATA_ENDIAN: u8 = 1 << 4;

/// TMST_CONFIG fields
pub const TMST_CONFIG_MASK: u8 = 0x1F;
pub const TMST_CONFIG_TMST_TO_REGS_EN: u8 = 1 << 4;
pub const TMST_CONFIG_TMST_EN: u8 = 1 << 0;

/// INT_CONFIG1: must be cleared for proper INT pin operation
pub const INT_CONFIG1_ASYNC_RESET: u8 = 1 << 4;

/// INT_SOURCE0: route UI data ready to INT1
pub const INT_SOURCE0_UI_DRDY_INT1_EN: u8 = 1 << 3;

#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, PartialEq)]
pub struct PwrMgmt0 {
    pub accel_mode: u2, // 00/01: off, 10: low power, 11: low noise
    pub gyro_mode: u2,  // 00: off, 01: standby, 11: low noise
    pub idle: u1,       // 1: RC oscillator kept on with sensors off
    pub temp_dis: u1,   // 1: temperature sensor disabled
    reserved: u2,
}

/// Layout shared by GYRO_CONFIG0 and ACCEL_CONFIG0
#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, PartialEq)]
pub struct SensorConfig0 {
    pub odr: u4,
    reserved: u1,
    pub fs_sel: u3,
}

#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, PartialEq)]
pub struct GyroAccelConfig0 {
    pub gyro_ui_filt_bw: u4,
    pub accel_ui_filt_bw: u4,
}

/// INT_STATUS bits clear on read
#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, PartialEq)]
pub struct IntStatus {
    pub agc_rdy_int: u1,
    pub fifo_full_int: u1,
    pub fifo_ths_int: u1,
    pub data_rdy_int: u1,
    pub reset_done_int: u1,
    pub pll_rdy_int: u1,
    pub ui_fsync_int: u1,
    reserved: u1,
}

#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, PartialEq)]
pub struct IntConfig {
    pub int1_polarity: u1,      // 1: active high
    pub int1_drive_circuit: u1, // 1: push pull
    pub int1_mode: u1,          // 1: latched
    pub int2_polarity: u1,
    pub int2_drive_circuit: u1,
    pub int2_mode: u1,
    reserved: u2,
}
