//! Low level register access
//!
//! [`RegisterPort`] is the only way the driver touches the chip. Addresses are
//! flat (see [`crate::register_bank`]); implementations take care of selecting
//! the right bank.

use embedded_hal_async::spi::{Operation, SpiDevice};

use crate::register_bank::{self, RegisterBank, BANK0, REG_BANK_SEL};

/// Addressed register access over a banked address space
#[allow(async_fn_in_trait)]
pub trait RegisterPort {
    type Error;

    /// Read one register
    async fn read(&mut self, addr: u16) -> Result<u8, Self::Error>;

    /// Write one register
    async fn write(&mut self, addr: u16, value: u8) -> Result<(), Self::Error>;

    /// Read `buffer.len()` consecutive registers starting at `addr`
    async fn bulk_read(&mut self, addr: u16, buffer: &mut [u8]) -> Result<(), Self::Error>;

    /// Read-modify-write of the bits in `mask`
    ///
    /// The write is skipped when the register already holds the value.
    async fn update_bits(&mut self, addr: u16, mask: u8, value: u8) -> Result<(), Self::Error> {
        let old = self.read(addr).await?;
        let new = (old & !mask) | (value & mask);
        if new != old {
            self.write(addr, new).await?;
        }
        Ok(())
    }
}

/// SPI implementation of [`RegisterPort`]
///
/// Keeps track of the selected bank and only writes `REG_BANK_SEL` when an
/// access targets another bank.
pub struct SpiPort<SPI> {
    bus: SPI,
    current_bank: RegisterBank,
}

impl<SPI> SpiPort<SPI> {
    pub fn new(bus: SPI) -> Self {
        SpiPort {
            bus,
            current_bank: BANK0,
        }
    }

    pub fn get_bank(&self) -> RegisterBank {
        self.current_bank
    }

    /// Release the bus from the port
    pub fn release(self) -> SPI {
        self.bus
    }
}

/// Read bit of the SPI header byte
const READ: u8 = 0x80;

impl<SPI> SpiPort<SPI>
where
    SPI: SpiDevice<u8>,
{
    async fn select(&mut self, addr: u16) -> Result<u8, SPI::Error> {
        debug_assert!(addr <= register_bank::MAX_REGISTER);
        let bank = register_bank::bank_of(addr);
        if bank != self.current_bank {
            self.bus.write(&[REG_BANK_SEL, bank]).await?;
            self.current_bank = bank;
        }
        Ok(register_bank::offset_of(addr))
    }
}

impl<SPI> RegisterPort for SpiPort<SPI>
where
    SPI: SpiDevice<u8>,
{
    type Error = SPI::Error;

    async fn read(&mut self, addr: u16) -> Result<u8, Self::Error> {
        let offset = self.select(addr).await?;
        let mut buffer = [offset | READ, 0];
        self.bus.transfer_in_place(&mut buffer).await?;
        Ok(buffer[1])
    }

    async fn write(&mut self, addr: u16, value: u8) -> Result<(), Self::Error> {
        let offset = self.select(addr).await?;
        self.bus.write(&[offset, value]).await
    }

    async fn bulk_read(&mut self, addr: u16, buffer: &mut [u8]) -> Result<(), Self::Error> {
        let offset = self.select(addr).await?;
        let header = [offset | READ];
        self.bus
            .transaction(&mut [Operation::Write(&header), Operation::Read(buffer)])
            .await
    }
}
