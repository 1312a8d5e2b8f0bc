//! Data-ready interrupt handling
//!
//! Handling is split in two. [`ICM426xx::on_interrupt`] runs in the interrupt
//! handler: it stores the edge time and wakes the worker without touching the
//! bus. [`ICM426xx::process_interrupt`] runs in the worker, reads the sample
//! under the device lock and hands it to a [`SampleSink`].

use bilge::prelude::*;
use bytemuck::{Pod, Zeroable};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal_async::delay::DelayNs;

use crate::ll::RegisterPort;
use crate::register_bank::{
    bank0, IntConfig, IntStatus, INT_CONFIG1_ASYNC_RESET, INT_SOURCE0_UI_DRDY_INT1_EN,
};
use crate::state::Core;
use crate::{Error, ICM426xx};

/// Electrical trigger of the interrupt line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IrqTrigger {
    RisingEdge,
    #[default]
    FallingEdge,
    LevelHigh,
    LevelLow,
}

/// INT1 pin configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InterruptConfig {
    pub trigger: IrqTrigger,
    pub open_drain: bool,
}

impl InterruptConfig {
    /// INT_CONFIG value for this pin configuration
    fn int_config(&self) -> u8 {
        let active_high = matches!(self.trigger, IrqTrigger::RisingEdge | IrqTrigger::LevelHigh);
        let latched = matches!(self.trigger, IrqTrigger::LevelHigh | IrqTrigger::LevelLow);

        let mut r = IntConfig::from(0u8);
        r.set_int1_polarity(u1::new(active_high as u8));
        r.set_int1_mode(u1::new(latched as u8));
        r.set_int1_drive_circuit(u1::new(!self.open_drain as u8));
        u8::from(r)
    }
}

/// Edge time captured in the interrupt handler, in nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TimestampPair {
    pub gyro: i64,
    pub accel: i64,
}

/// Sensor data registers from ACCEL_DATA_X1, gyro starting at GYRO_DATA_X1,
/// little endian
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C)]
pub struct RawDataBlock {
    accel: [[u8; 2]; 3],
    gyro: [[u8; 2]; 3],
}

impl RawDataBlock {
    pub fn accel(&self) -> [i16; 3] {
        self.accel.map(i16::from_le_bytes)
    }

    pub fn gyro(&self) -> [i16; 3] {
        self.gyro.map(i16::from_le_bytes)
    }
}

/// One sample as delivered to a [`SampleSink`]
///
/// Channels are accel X, Y, Z followed by gyro X, Y, Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(C, align(8))]
pub struct ScanSample {
    pub channels: [i16; 6],
    _pad: [u8; 4],
    pub timestamp: i64,
}

impl ScanSample {
    pub fn new(raw: &RawDataBlock, timestamp: i64) -> Self {
        let [ax, ay, az] = raw.accel();
        let [gx, gy, gz] = raw.gyro();
        ScanSample {
            channels: [ax, ay, az, gx, gy, gz],
            _pad: [0; 4],
            timestamp,
        }
    }

    pub fn accel(&self) -> [i16; 3] {
        [self.channels[0], self.channels[1], self.channels[2]]
    }

    pub fn gyro(&self) -> [i16; 3] {
        [self.channels[3], self.channels[4], self.channels[5]]
    }
}

/// Consumer of decoded samples
pub trait SampleSink {
    /// Samples are decoded but not pushed while this returns `false`
    fn is_enabled(&self) -> bool {
        true
    }

    fn push(&mut self, sample: &ScanSample);
}

impl<P, D, V> Core<P, D, V>
where
    P: RegisterPort,
    D: DelayNs,
{
    /// Configure INT1 and route data-ready to it
    pub(crate) async fn setup_irq(
        &mut self,
        config: &InterruptConfig,
    ) -> Result<(), Error<P::Error>> {
        self.port.write(bank0::INT_CONFIG, config.int_config()).await?;

        // the pin does not work with the async reset asserted
        self.port
            .update_bits(bank0::INT_CONFIG1, INT_CONFIG1_ASYNC_RESET, 0)
            .await?;

        self.port
            .update_bits(
                bank0::INT_SOURCE0,
                INT_SOURCE0_UI_DRDY_INT1_EN,
                INT_SOURCE0_UI_DRDY_INT1_EN,
            )
            .await?;
        Ok(())
    }

    /// Read the data registers if new data is available
    pub(crate) async fn read_data_ready(&mut self) -> Result<Option<RawDataBlock>, P::Error> {
        let status = IntStatus::from(self.port.read(bank0::INT_STATUS).await?);
        if status.data_rdy_int().value() == 0 {
            return Ok(None);
        }

        let mut raw = RawDataBlock::zeroed();
        self.port
            .bulk_read(bank0::ACCEL_DATA_X1, bytemuck::bytes_of_mut(&mut raw))
            .await?;
        Ok(Some(raw))
    }
}

impl<M, P, D, V> ICM426xx<M, P, D, V>
where
    M: RawMutex,
    P: RegisterPort,
    D: DelayNs,
{
    /// Interrupt handler half
    ///
    /// Never blocks and never takes the device lock, so it may preempt a
    /// configuration change or a running [`ICM426xx::process_interrupt`].
    pub fn on_interrupt(&self, now_ns: i64) {
        self.timestamp.lock(|slot| {
            slot.set(TimestampPair {
                gyro: now_ns,
                accel: now_ns,
            })
        });
        self.irq_pending.signal(());
    }

    /// Wait for the next [`ICM426xx::on_interrupt`]
    pub async fn wait_interrupt(&self) {
        self.irq_pending.wait().await
    }

    /// Worker half
    ///
    /// Returns the decoded sample, or `None` when there was no new data or
    /// the read failed. A failure is logged and leaves the pipeline armed.
    pub async fn process_interrupt<S: SampleSink>(&self, sink: &mut S) -> Option<ScanSample> {
        let timestamp = self.timestamp.lock(|slot| slot.get());

        let mut core = self.core.lock().await;
        let raw = match core.read_data_ready().await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(_) => {
                error!("failed to read sample");
                return None;
            }
        };

        // keep the lock until the sample is delivered
        let sample = ScanSample::new(&raw, timestamp.accel);
        if sink.is_enabled() {
            sink.push(&sample);
        }
        drop(core);
        Some(sample)
    }

    /// Serve interrupts forever
    pub async fn run<S: SampleSink>(&self, sink: &mut S) -> ! {
        loop {
            self.wait_interrupt().await;
            self.process_interrupt(sink).await;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::testing::{Access, FakePort, Harness, RecordingSink, TestDevice};
    use crate::Chip;

    const DATA_RDY: u8 = 1 << 3;
    const BLOCK: [u8; 12] = [
        0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x10, 0x00, 0x20, 0x00, 0x30, 0x00,
    ];

    fn load_block(port: &FakePort, block: &[u8; 12]) {
        for (i, byte) in block.iter().enumerate() {
            port.set(bank0::ACCEL_DATA_X1 + i as u16, *byte);
        }
        port.set(bank0::INT_STATUS, DATA_RDY);
    }

    #[test]
    fn raw_block_decodes_little_endian() {
        let raw: RawDataBlock = bytemuck::cast(BLOCK);
        assert_eq!(raw.accel(), [1, 2, 3]);
        assert_eq!(raw.gyro(), [16, 32, 48]);

        let extremes = [0xFFu8, 0xFF, 0x00, 0x80, 0xFF, 0x7F, 0, 0, 0, 0, 0, 0];
        let raw: RawDataBlock = bytemuck::cast(extremes);
        assert_eq!(raw.accel(), [-1, i16::MIN, i16::MAX]);
    }

    #[test]
    fn raw_block_follows_register_layout() {
        assert_eq!(core::mem::size_of::<RawDataBlock>(), 12);
        assert_eq!(
            core::mem::offset_of!(RawDataBlock, gyro) as u16,
            bank0::GYRO_DATA_X1 - bank0::ACCEL_DATA_X1
        );
    }

    #[test]
    fn scan_sample_layout() {
        assert_eq!(core::mem::size_of::<ScanSample>(), 24);
        assert_eq!(core::mem::align_of::<ScanSample>(), 8);

        let sample = ScanSample::new(&bytemuck::cast(BLOCK), 42);
        let bytes = bytemuck::bytes_of(&sample);
        assert_eq!(&bytes[16..], &42i64.to_ne_bytes());
        assert_eq!(sample.accel(), [1, 2, 3]);
        assert_eq!(sample.gyro(), [16, 32, 48]);
    }

    #[test]
    fn int_config_encoding() {
        let cfg = |trigger, open_drain| InterruptConfig { trigger, open_drain }.int_config();
        // push-pull, pulsed, active low
        assert_eq!(cfg(IrqTrigger::FallingEdge, false), 0b010);
        assert_eq!(cfg(IrqTrigger::RisingEdge, false), 0b011);
        assert_eq!(cfg(IrqTrigger::LevelHigh, true), 0b101);
        assert_eq!(cfg(IrqTrigger::LevelLow, true), 0b100);
    }

    #[async_std::test]
    async fn sample_is_pushed_with_the_captured_timestamp() {
        let (icm, h) = Harness::ready(Chip::Icm42600).await;
        load_block(&h.port, &BLOCK);
        let mut sink = RecordingSink::default();

        icm.on_interrupt(1_000_000);
        icm.wait_interrupt().await;
        let sample = icm.process_interrupt(&mut sink).await.unwrap();

        assert_eq!(sample.accel(), [1, 2, 3]);
        assert_eq!(sample.gyro(), [16, 32, 48]);
        assert_eq!(sample.timestamp, 1_000_000);
        assert_eq!(sink.samples, vec![sample]);
        assert_eq!(
            h.port.log(),
            vec![
                Access::Read(bank0::INT_STATUS),
                Access::BulkRead(bank0::ACCEL_DATA_X1, 12),
            ]
        );
    }

    #[async_std::test]
    async fn no_data_ready_stops_after_status() {
        let (icm, h) = Harness::ready(Chip::Icm42600).await;
        h.port.set(bank0::INT_STATUS, 0);
        let mut sink = RecordingSink::default();

        icm.on_interrupt(5);
        assert_eq!(icm.process_interrupt(&mut sink).await, None);
        assert!(sink.samples.is_empty());
        assert_eq!(h.port.log(), vec![Access::Read(bank0::INT_STATUS)]);
    }

    #[async_std::test]
    async fn read_failure_drops_the_sample_and_stays_armed() {
        let (icm, h) = Harness::ready(Chip::Icm42600).await;
        load_block(&h.port, &BLOCK);
        h.port.fail_reads_of(bank0::ACCEL_DATA_X1);
        let mut sink = RecordingSink::default();

        icm.on_interrupt(10);
        assert_eq!(icm.process_interrupt(&mut sink).await, None);
        assert!(sink.samples.is_empty());

        h.port.clear_failures();
        icm.on_interrupt(20);
        let sample = icm.process_interrupt(&mut sink).await.unwrap();
        assert_eq!(sample.timestamp, 20);
        assert_eq!(sink.samples.len(), 1);
    }

    #[async_std::test]
    async fn disabled_sink_receives_nothing() {
        let (icm, h) = Harness::ready(Chip::Icm42600).await;
        load_block(&h.port, &BLOCK);
        let mut sink = RecordingSink {
            disabled: true,
            ..Default::default()
        };

        icm.on_interrupt(7);
        assert!(icm.process_interrupt(&mut sink).await.is_some());
        assert!(sink.samples.is_empty());
    }

    #[async_std::test]
    async fn latest_edge_wins() {
        let (icm, h) = Harness::ready(Chip::Icm42600).await;
        load_block(&h.port, &BLOCK);
        let mut sink = RecordingSink::default();

        icm.on_interrupt(100);
        icm.on_interrupt(200);
        icm.wait_interrupt().await;
        let sample = icm.process_interrupt(&mut sink).await.unwrap();
        assert_eq!(sample.timestamp, 200);
    }

    /// Records whether the device lock was free while a sample was pushed
    struct LockCheckingSink<'a> {
        icm: &'a TestDevice,
        lock_free: Vec<bool>,
    }

    impl SampleSink for LockCheckingSink<'_> {
        fn push(&mut self, _sample: &ScanSample) {
            self.lock_free.push(self.icm.core.try_lock().is_ok());
        }
    }

    #[async_std::test]
    async fn sample_is_pushed_under_the_device_lock() {
        let (icm, h) = Harness::ready(Chip::Icm42600).await;
        load_block(&h.port, &BLOCK);
        let mut sink = LockCheckingSink {
            icm: &icm,
            lock_free: Vec::new(),
        };

        icm.on_interrupt(3);
        assert!(icm.process_interrupt(&mut sink).await.is_some());
        assert_eq!(sink.lock_free, vec![false]);
        assert!(icm.core.try_lock().is_ok());
    }
}
