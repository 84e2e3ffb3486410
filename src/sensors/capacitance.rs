//! Four-channel capacitance board.
//!
//! Channel `i` carries picofarads from front-end input `i`.  A channel
//! whose conversion fails is zeroed, its CAPDAC metadata byte cleared and
//! its failure bit set; the other channels are still reported.  Any
//! channel that needed a CAPDAC adjustment raises `CAPDAC_ADJUSTING`.

use log::{info, warn};

use crate::app::model::{
    BoardId, BoardLayout, BusPins, ChannelDescriptor, MAX_CHANNELS, MeasurementRecord, status,
};
use crate::app::ports::SensorDriver;
use crate::error::{HardwareError, LayoutError, ReadError};
use crate::pins;

pub const CHANNELS: usize = 4;
pub const MIN_INTERVAL_MS: u32 = 20;
pub const MAX_INTERVAL_MS: u32 = 10_000;

/// One single-ended conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapReading {
    pub picofarads: f32,
    /// Offset DAC code used for this conversion.
    pub capdac: u8,
    /// The conversion saturated and the CAPDAC was moved for next time.
    pub capdac_adjusted: bool,
}

pub trait CapacitanceFrontEnd {
    /// Identify and configure the chip.
    fn probe(&mut self) -> Result<(), HardwareError>;

    /// Convert input `channel` (0..4).
    fn measure(&mut self, channel: u8) -> Result<CapReading, HardwareError>;
}

pub fn layout() -> Result<BoardLayout, LayoutError> {
    let mut b = BoardLayout::builder(BoardId::Capacitance, "Sensything Cap", "FDC1004 Capacitance")
        .pins(BusPins {
            i2c_sda: Some(pins::I2C_SDA_GPIO),
            i2c_scl: Some(pins::I2C_SCL_GPIO),
            ..BusPins::default()
        })
        .interval_range(MIN_INTERVAL_MS, MAX_INTERVAL_MS);
    for i in 0..CHANNELS {
        b = b.channel(ChannelDescriptor::new(&format!("ch{i}_pf"), "pF", -100.0, 100.0)?);
    }
    b.build()
}

pub struct CapacitanceBoard<F: CapacitanceFrontEnd> {
    front_end: F,
    layout: BoardLayout,
    ready: bool,
}

impl<F: CapacitanceFrontEnd> CapacitanceBoard<F> {
    pub fn new(front_end: F) -> Result<Self, LayoutError> {
        Ok(Self {
            front_end,
            layout: layout()?,
            ready: false,
        })
    }
}

impl<F: CapacitanceFrontEnd> SensorDriver for CapacitanceBoard<F> {
    fn layout(&self) -> &BoardLayout {
        &self.layout
    }

    fn init(&mut self) -> Result<(), HardwareError> {
        self.ready = false;
        self.front_end.probe()?;
        self.ready = true;
        info!("CapacitanceBoard: front-end ready");
        Ok(())
    }

    fn read(&mut self, now_ms: u32) -> Result<MeasurementRecord, ReadError> {
        if !self.ready {
            return Err(ReadError::NotInitialized);
        }
        let mut rec = MeasurementRecord::for_layout(now_ms, &self.layout);
        for i in 0..CHANNELS.min(MAX_CHANNELS) {
            match self.front_end.measure(i as u8) {
                Ok(r) if !r.picofarads.is_finite() => {
                    warn!("CapacitanceBoard: ch{} returned {}", i, r.picofarads);
                    rec.mark_failed(i);
                    rec.metadata[i] = 0;
                }
                Ok(r) => {
                    rec.set_channel(i, r.picofarads);
                    rec.metadata[i] = r.capdac;
                    if r.capdac_adjusted {
                        rec.status |= status::CAPDAC_ADJUSTING;
                    }
                }
                Err(e) => {
                    warn!("CapacitanceBoard: ch{} failed: {}", i, e);
                    rec.mark_failed(i);
                    rec.metadata[i] = 0;
                }
            }
        }
        Ok(rec)
    }
}
