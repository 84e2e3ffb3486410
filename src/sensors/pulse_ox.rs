//! PPG / SpO2 / heart-rate board.
//!
//! The optical front-end (AFE4400 on the reference hardware) produces raw
//! IR and red photodiode counts plus derived SpO2 and heart rate.  This
//! board maps one front-end sample onto four channels and grades it:
//!
//! | bit              | condition                         |
//! |------------------|-----------------------------------|
//! | `BUFFER_OVERFLOW`| front-end sample buffer overflowed|
//! | `NO_SIGNAL`      | heart rate 0 or above 250 bpm     |
//! | `INVALID_DATA`   | SpO2 below 70 % or above 100 %    |
//!
//! Unlike the capacitance board, a front-end failure aborts the whole
//! cycle: the four values come from one transaction.

use log::info;

use crate::app::model::{BoardId, BoardLayout, BusPins, ChannelDescriptor, MeasurementRecord, status};
use crate::app::ports::SensorDriver;
use crate::error::{HardwareError, LayoutError, ReadError};
use crate::pins;

pub const MIN_INTERVAL_MS: u32 = 8;
pub const MAX_INTERVAL_MS: u32 = 10_000;
/// Full scale of the 19-bit photodiode ADC.
pub const ADC_FULL_SCALE: f32 = 524_288.0;
pub const MAX_HEART_RATE_BPM: u16 = 250;
pub const MIN_VALID_SPO2: f32 = 70.0;

/// One front-end sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PpgSample {
    pub ir: u32,
    pub red: u32,
    pub spo2: f32,
    pub heart_rate: u16,
    pub overflow: bool,
}

pub trait PpgFrontEnd {
    fn init(&mut self) -> Result<(), HardwareError>;

    /// Latest sample; `Err(ReadError::NoData)` when nothing new is ready.
    fn sample(&mut self) -> Result<PpgSample, ReadError>;
}

pub fn layout() -> Result<BoardLayout, LayoutError> {
    BoardLayout::builder(BoardId::PulseOx, "Sensything OX", "AFE4400 PPG/SpO2")
        .channel(ChannelDescriptor::new("ir_raw", "ADC", 0.0, ADC_FULL_SCALE)?)
        .channel(ChannelDescriptor::new("red_raw", "ADC", 0.0, ADC_FULL_SCALE)?)
        .channel(ChannelDescriptor::new("spo2", "%", 0.0, 100.0)?)
        .channel(ChannelDescriptor::new("heart_rate", "bpm", 0.0, 250.0)?)
        .pins(BusPins {
            spi_cs: Some(pins::AFE_CS_GPIO),
            spi_mosi: Some(pins::SPI_MOSI_GPIO),
            spi_miso: Some(pins::SPI_MISO_GPIO),
            spi_sck: Some(pins::SPI_SCK_GPIO),
            ..BusPins::default()
        })
        .interval_range(MIN_INTERVAL_MS, MAX_INTERVAL_MS)
        .build()
}

pub struct PulseOxBoard<F: PpgFrontEnd> {
    front_end: F,
    layout: BoardLayout,
    ready: bool,
}

impl<F: PpgFrontEnd> PulseOxBoard<F> {
    pub fn new(front_end: F) -> Result<Self, LayoutError> {
        Ok(Self {
            front_end,
            layout: layout()?,
            ready: false,
        })
    }
}

/// Status bits for a sample.
pub fn grade(sample: &PpgSample) -> u8 {
    let mut flags = 0;
    if sample.overflow {
        flags |= status::BUFFER_OVERFLOW;
    }
    if sample.heart_rate == 0 || sample.heart_rate > MAX_HEART_RATE_BPM {
        flags |= status::NO_SIGNAL;
    }
    if !(MIN_VALID_SPO2..=100.0).contains(&sample.spo2) {
        flags |= status::INVALID_DATA;
    }
    flags
}

impl<F: PpgFrontEnd> SensorDriver for PulseOxBoard<F> {
    fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    fn init(&mut self) -> Result<(), HardwareError> {
        self.ready = false;
        self.front_end.init()?;
        self.ready = true;
        info!("PulseOxBoard: front-end ready");
        Ok(())
    }

    fn read(&mut self, now_ms: u32) -> Result<MeasurementRecord, ReadError> {
        if !self.ready {
            return Err(ReadError::NotInitialized);
        }
        let s = self.front_end.sample()?;

        let mut rec = MeasurementRecord::for_layout(now_ms, &self.layout);
        rec.set_channel(0, s.ir as f32);
        rec.set_channel(1, s.red as f32);
        rec.set_channel(2, s.spo2);
        rec.set_channel(3, f32::from(s.heart_rate));
        rec.status = grade(&s);
        rec.metadata[0] = s.spo2.clamp(0.0, 255.0) as u8;
        rec.metadata[1] = s.heart_rate.min(255) as u8;
        rec.metadata[2] = u8::from(s.overflow);
        Ok(rec)
    }
}
