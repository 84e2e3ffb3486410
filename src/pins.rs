//! GPIO / peripheral pin assignments for the Sensything ES3 main board.
//!
//! Single source of truth: board layouts and the bring-up code reference
//! this module rather than hard-coding pin numbers.

// ---------------------------------------------------------------------------
// I2C (FDC1004 + QWIIC)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: u8 = 8;
pub const I2C_SCL_GPIO: u8 = 9;
/// Fast mode.
pub const I2C_FREQ_HZ: u32 = 400_000;

// ---------------------------------------------------------------------------
// SPI (AFE4400 on the OX board)
// ---------------------------------------------------------------------------

pub const SPI_MOSI_GPIO: u8 = 11;
pub const SPI_MISO_GPIO: u8 = 13;
pub const SPI_SCK_GPIO: u8 = 12;
pub const SPI_FREQ_HZ: u32 = 4_000_000;

pub const AFE_CS_GPIO: u8 = 10;
pub const AFE_DRDY_GPIO: u8 = 14;
pub const AFE_PWDN_GPIO: u8 = 21;

// ---------------------------------------------------------------------------
// SDIO (SD card, 4-bit)
// ---------------------------------------------------------------------------

pub const SDIO_CMD_GPIO: i32 = 41;
pub const SDIO_CLK_GPIO: i32 = 38;
pub const SDIO_D0_GPIO: i32 = 39;
pub const SDIO_D1_GPIO: i32 = 40;
pub const SDIO_D2_GPIO: i32 = 47;
pub const SDIO_D3_GPIO: i32 = 42;
