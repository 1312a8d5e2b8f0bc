//! Test doubles shared by the unit tests

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use embassy_sync::blocking_mutex::raw::NoopRawMutex;

use crate::irq::{SampleSink, ScanSample};
use crate::ll::RegisterPort;
use crate::power::{PowerSupply, RailId};
use crate::register_bank::{bank0, IntStatus};
use crate::uninitialized::{Config, Uninitialized};
use crate::{Chip, ICM426xx};

/// One access seen by [`FakePort`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read(u16),
    Write(u16, u8),
    BulkRead(u16, usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeBusError;

#[derive(Default)]
struct Bus {
    registers: HashMap<u16, u8>,
    log: Vec<Access>,
    failing_reads: HashSet<u16>,
    failing_writes: HashSet<u16>,
}

/// Register file with an access log and failure injection
///
/// Clones share the same state, so a test can keep a handle after moving the
/// port into the driver.
#[derive(Clone, Default)]
pub struct FakePort(Rc<RefCell<Bus>>);

impl FakePort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, addr: u16, value: u8) {
        self.0.borrow_mut().registers.insert(addr, value);
    }

    pub fn get(&self, addr: u16) -> u8 {
        self.0.borrow().registers.get(&addr).copied().unwrap_or(0)
    }

    pub fn log(&self) -> Vec<Access> {
        self.0.borrow().log.clone()
    }

    pub fn writes(&self) -> Vec<(u16, u8)> {
        self.0
            .borrow()
            .log
            .iter()
            .filter_map(|a| match *a {
                Access::Write(addr, value) => Some((addr, value)),
                _ => None,
            })
            .collect()
    }

    pub fn writes_to(&self, addr: u16) -> Vec<u8> {
        self.writes()
            .into_iter()
            .filter(|(a, _)| *a == addr)
            .map(|(_, v)| v)
            .collect()
    }

    pub fn clear_log(&self) {
        self.0.borrow_mut().log.clear();
    }

    pub fn fail_reads_of(&self, addr: u16) {
        self.0.borrow_mut().failing_reads.insert(addr);
    }

    pub fn fail_writes_to(&self, addr: u16) {
        self.0.borrow_mut().failing_writes.insert(addr);
    }

    pub fn clear_failures(&self) {
        let mut bus = self.0.borrow_mut();
        bus.failing_reads.clear();
        bus.failing_writes.clear();
    }
}

impl RegisterPort for FakePort {
    type Error = FakeBusError;

    async fn read(&mut self, addr: u16) -> Result<u8, Self::Error> {
        let mut bus = self.0.borrow_mut();
        bus.log.push(Access::Read(addr));
        if bus.failing_reads.contains(&addr) {
            return Err(FakeBusError);
        }
        Ok(bus.registers.get(&addr).copied().unwrap_or(0))
    }

    async fn write(&mut self, addr: u16, value: u8) -> Result<(), Self::Error> {
        let mut bus = self.0.borrow_mut();
        bus.log.push(Access::Write(addr, value));
        if bus.failing_writes.contains(&addr) {
            return Err(FakeBusError);
        }
        bus.registers.insert(addr, value);
        Ok(())
    }

    async fn bulk_read(&mut self, addr: u16, buffer: &mut [u8]) -> Result<(), Self::Error> {
        let mut bus = self.0.borrow_mut();
        bus.log.push(Access::BulkRead(addr, buffer.len()));
        if bus.failing_reads.contains(&addr) {
            return Err(FakeBusError);
        }
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = bus.registers.get(&(addr + i as u16)).copied().unwrap_or(0);
        }
        Ok(())
    }
}

/// One wait requested from [`RecordingDelay`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    Ns(u32),
    Us(u32),
    Ms(u32),
}

#[derive(Clone, Default)]
pub struct RecordingDelay(Rc<RefCell<Vec<Wait>>>);

impl RecordingDelay {
    pub fn waits(&self) -> Vec<Wait> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl embedded_hal_async::delay::DelayNs for RecordingDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().push(Wait::Ns(ns));
    }

    async fn delay_us(&mut self, us: u32) {
        self.0.borrow_mut().push(Wait::Us(us));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.0.borrow_mut().push(Wait::Ms(ms));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RailEvent {
    Enabled(RailId),
    Disabled(RailId),
}

#[derive(Default)]
struct Supply {
    events: Vec<RailEvent>,
    failing: HashSet<(RailId, bool)>,
}

#[derive(Clone, Default)]
pub struct FakeSupply(Rc<RefCell<Supply>>);

impl FakeSupply {
    pub fn events(&self) -> Vec<RailEvent> {
        self.0.borrow().events.clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().events.clear();
    }

    pub fn fail_enable(&self, rail: RailId) {
        self.0.borrow_mut().failing.insert((rail, true));
    }

    pub fn fail_disable(&self, rail: RailId) {
        self.0.borrow_mut().failing.insert((rail, false));
    }
}

impl PowerSupply for FakeSupply {
    type Error = ();

    fn enable(&mut self, rail: RailId) -> Result<(), Self::Error> {
        let mut supply = self.0.borrow_mut();
        if supply.failing.contains(&(rail, true)) {
            return Err(());
        }
        supply.events.push(RailEvent::Enabled(rail));
        Ok(())
    }

    fn disable(&mut self, rail: RailId) -> Result<(), Self::Error> {
        let mut supply = self.0.borrow_mut();
        if supply.failing.contains(&(rail, false)) {
            return Err(());
        }
        supply.events.push(RailEvent::Disabled(rail));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub disabled: bool,
    pub samples: Vec<ScanSample>,
}

impl SampleSink for RecordingSink {
    fn is_enabled(&self) -> bool {
        !self.disabled
    }

    fn push(&mut self, sample: &ScanSample) {
        self.samples.push(*sample);
    }
}

pub type TestDevice = ICM426xx<NoopRawMutex, FakePort, RecordingDelay, FakeSupply>;

/// Handles onto the doubles owned by a [`TestDevice`]
pub struct Harness {
    pub port: FakePort,
    pub delay: RecordingDelay,
    pub supply: FakeSupply,
}

impl Harness {
    /// Doubles answering like a freshly powered `chip`
    pub fn new(chip: Chip) -> Self {
        let port = FakePort::new();
        port.set(bank0::WHO_AM_I, chip.descriptor().whoami);
        let mut status = IntStatus::from(0u8);
        status.set_reset_done_int(bilge::prelude::u1::new(1));
        port.set(bank0::INT_STATUS, u8::from(status));
        // reset value, big endian data
        port.set(bank0::INTF_CONFIG0, 0x30);
        port.set(bank0::INT_CONFIG1, 0x10);
        Harness {
            port,
            delay: RecordingDelay::default(),
            supply: FakeSupply::default(),
        }
    }

    pub fn uninitialized(&self) -> Uninitialized<FakePort, FakeSupply> {
        Uninitialized::new(self.port.clone(), self.supply.clone())
    }

    pub async fn initialize(&self, chip: Chip) -> Result<TestDevice, crate::Error<FakeBusError>> {
        self.uninitialized()
            .initialize(self.delay.clone(), chip, Config::default())
            .await
    }

    /// Initialized device with all logs cleared
    pub async fn ready(chip: Chip) -> (TestDevice, Harness) {
        let harness = Harness::new(chip);
        let icm = harness.initialize(chip).await.unwrap();
        harness.port.clear_log();
        harness.delay.clear();
        harness.supply.clear();
        (icm, harness)
    }
}
