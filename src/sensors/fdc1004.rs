//! TI FDC1004 4-channel capacitance-to-digital converter.
//!
//! Blocking driver over `embedded-hal` 1.0 [`I2c`] and [`DelayNs`].  Each
//! input is measured single-ended against an offset DAC (CAPDAC); when a
//! conversion approaches full scale the CAPDAC for that input is stepped
//! so the next conversion lands back in range.
//!
//! ```text
//!   CONF_MEASn ◀── CHA=n, CHB=CAPDAC, code
//!   FDC_CONF   ◀── rate | MEASn enable      (one-shot)
//!   FDC_CONF   ──▶ DONEn ?                  (poll)
//!   MEASn_MSB/LSB ──▶ 24-bit two's complement, 2^19 LSB per pF
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use super::capacitance::{CapReading, CapacitanceFrontEnd};
use crate::error::HardwareError;

/// 7-bit bus address (fixed).
pub const ADDRESS: u8 = 0x50;
pub const MANUFACTURER_ID: u16 = 0x5449;
pub const DEVICE_ID: u16 = 0x1004;

pub const CAPDAC_MAX: u8 = 31;
/// Offset contributed by one CAPDAC step.
pub const CAPDAC_STEP_PF: f32 = 3.125;
/// Raw counts per picofarad.
const COUNTS_PER_PF: f32 = 524_288.0;
/// Step the CAPDAC when a conversion passes ±14 pF of the ±16 pF span.
const SATURATION_COUNTS: i32 = 0x70_0000;
const DONE_POLLS: u32 = 4;

mod reg {
    pub const fn meas_msb(slot: u8) -> u8 {
        slot * 2
    }
    pub const fn meas_lsb(slot: u8) -> u8 {
        slot * 2 + 1
    }
    pub const fn conf_meas(slot: u8) -> u8 {
        0x08 + slot
    }
    pub const FDC_CONF: u8 = 0x0C;
    pub const MANUFACTURER_ID: u8 = 0xFE;
    pub const DEVICE_ID: u8 = 0xFF;
}

/// CHB code selecting the CAPDAC as the negative input.
const CHB_CAPDAC: u16 = 0b100;
const FDC_CONF_RESET: u16 = 1 << 15;

/// Output data rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rate {
    Hz100 = 1,
    Hz200 = 2,
    Hz400 = 3,
}

impl Rate {
    fn conversion_ms(self) -> u32 {
        match self {
            Self::Hz100 => 11,
            Self::Hz200 => 6,
            Self::Hz400 => 3,
        }
    }
}

pub struct Fdc1004<I, D> {
    i2c: I,
    delay: D,
    rate: Rate,
    capdac: [u8; 4],
}

impl<I: I2c, D: DelayNs> Fdc1004<I, D> {
    pub fn new(i2c: I, delay: D, rate: Rate) -> Self {
        Self {
            i2c,
            delay,
            rate,
            capdac: [0; 4],
        }
    }

    fn read_reg(&mut self, reg: u8) -> Result<u16, HardwareError> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(ADDRESS, &[reg], &mut buf)
            .map_err(|_| HardwareError::Bus)?;
        Ok(u16::from_be_bytes(buf))
    }

    fn write_reg(&mut self, reg: u8, value: u16) -> Result<(), HardwareError> {
        let [hi, lo] = value.to_be_bytes();
        self.i2c
            .write(ADDRESS, &[reg, hi, lo])
            .map_err(|_| HardwareError::Bus)
    }

    /// Check both identity registers.
    pub fn identify(&mut self) -> Result<(), HardwareError> {
        let manufacturer = self
            .read_reg(reg::MANUFACTURER_ID)
            .map_err(|_| HardwareError::DeviceNotFound)?;
        if manufacturer != MANUFACTURER_ID {
            return Err(HardwareError::IdentityMismatch {
                expected: MANUFACTURER_ID,
                found: manufacturer,
            });
        }
        let device = self.read_reg(reg::DEVICE_ID)?;
        if device != DEVICE_ID {
            return Err(HardwareError::IdentityMismatch {
                expected: DEVICE_ID,
                found: device,
            });
        }
        Ok(())
    }

    /// One-shot conversion of input `channel` against `capdac`, in raw
    /// signed counts.  Measurement slot `n` is used for input `n`.
    pub fn measure_raw(&mut self, channel: u8, capdac: u8) -> Result<i32, HardwareError> {
        if channel > 3 {
            return Err(HardwareError::InvalidChannel(channel));
        }
        let conf = (u16::from(channel) << 13)
            | (CHB_CAPDAC << 10)
            | (u16::from(capdac.min(CAPDAC_MAX)) << 5);
        self.write_reg(reg::conf_meas(channel), conf)?;
        self.write_reg(reg::FDC_CONF, ((self.rate as u16) << 10) | (1 << (7 - channel)))?;

        self.delay.delay_ms(self.rate.conversion_ms());
        let done_bit = 1 << (3 - channel);
        let mut done = false;
        for _ in 0..DONE_POLLS {
            if self.read_reg(reg::FDC_CONF)? & done_bit != 0 {
                done = true;
                break;
            }
            self.delay.delay_ms(1);
        }
        if !done {
            return Err(HardwareError::Timeout);
        }

        let msb = self.read_reg(reg::meas_msb(channel))?;
        let lsb = self.read_reg(reg::meas_lsb(channel))?;
        let raw = (u32::from(msb) << 8) | (u32::from(lsb) >> 8);
        // Sign-extend 24 → 32 bits.
        Ok(((raw << 8) as i32) >> 8)
    }

    /// CAPDAC code that will be used for `channel`'s next conversion.
    pub fn capdac(&self, channel: u8) -> Option<u8> {
        self.capdac.get(channel as usize).copied()
    }

    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }
}

/// Picofarads for a raw conversion taken against `capdac`.
pub fn to_picofarads(raw: i32, capdac: u8) -> f32 {
    raw as f32 / COUNTS_PER_PF + f32::from(capdac) * CAPDAC_STEP_PF
}

impl<I: I2c, D: DelayNs> CapacitanceFrontEnd for Fdc1004<I, D> {
    fn probe(&mut self) -> Result<(), HardwareError> {
        self.identify()?;
        self.write_reg(reg::FDC_CONF, FDC_CONF_RESET)?;
        self.delay.delay_ms(1);
        self.capdac = [0; 4];
        Ok(())
    }

    fn measure(&mut self, channel: u8) -> Result<CapReading, HardwareError> {
        let capdac = self
            .capdac(channel)
            .ok_or(HardwareError::InvalidChannel(channel))?;
        let raw = self.measure_raw(channel, capdac)?;

        let next = if raw > SATURATION_COUNTS && capdac < CAPDAC_MAX {
            capdac + 1
        } else if raw < -SATURATION_COUNTS && capdac > 0 {
            capdac - 1
        } else {
            capdac
        };
        self.capdac[channel as usize] = next;

        Ok(CapReading {
            picofarads: to_picofarads(raw, capdac),
            capdac,
            capdac_adjusted: next != capdac,
        })
    }
}
