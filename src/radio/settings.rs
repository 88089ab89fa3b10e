//! # Radio Settings and Tuning Parameters
//!
//! Tunable parameters for the LoRa modem along with the enumerations that
//! carry their chip-level encodings. Values with a validated range convert
//! from raw bytes through `TryFrom<u8>`, which is the single place the range
//! checks live, so a setter that receives one of these enums can no longer
//! hold an illegal value.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::DriverError;

/// Modem selection. Only the LoRa framing path is implemented; FSK
/// operations fail with `Unsupported`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modem {
    LoRa,
    Fsk,
}

/// LoRa signal bandwidth (`REG_LR_MODEM_CONFIG1` high nibble, SX1276 coding)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Bandwidth {
    Bw125 = 0x07,
    Bw250 = 0x08,
    Bw500 = 0x09,
}

impl Bandwidth {
    pub fn hz(self) -> u32 {
        match self {
            Bandwidth::Bw125 => 125_000,
            Bandwidth::Bw250 => 250_000,
            Bandwidth::Bw500 => 500_000,
        }
    }
}

impl TryFrom<u8> for Bandwidth {
    type Error = DriverError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0x07 => Ok(Bandwidth::Bw125),
            0x08 => Ok(Bandwidth::Bw250),
            0x09 => Ok(Bandwidth::Bw500),
            _ => Err(DriverError::InvalidArgument),
        }
    }
}

/// Spreading factor (`REG_LR_MODEM_CONFIG2` high nibble)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum SpreadingFactor {
    Sf6 = 6,
    Sf7 = 7,
    Sf8 = 8,
    Sf9 = 9,
    Sf10 = 10,
    Sf11 = 11,
    Sf12 = 12,
}

impl SpreadingFactor {
    /// Chips per symbol exponent: a symbol spans `2^sf` chips
    pub fn chips_exp(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u8> for SpreadingFactor {
    type Error = DriverError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            6 => Ok(SpreadingFactor::Sf6),
            7 => Ok(SpreadingFactor::Sf7),
            8 => Ok(SpreadingFactor::Sf8),
            9 => Ok(SpreadingFactor::Sf9),
            10 => Ok(SpreadingFactor::Sf10),
            11 => Ok(SpreadingFactor::Sf11),
            12 => Ok(SpreadingFactor::Sf12),
            _ => Err(DriverError::InvalidArgument),
        }
    }
}

/// Forward error correction rate (`REG_LR_MODEM_CONFIG1` bits 3:1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum CodingRate {
    Cr4_5 = 1,
    Cr4_6 = 2,
    Cr4_7 = 3,
    Cr4_8 = 4,
}

impl CodingRate {
    /// Denominator minus four: the datasheet's CR parameter
    pub fn parity_symbols(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u8> for CodingRate {
    type Error = DriverError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(CodingRate::Cr4_5),
            2 => Ok(CodingRate::Cr4_6),
            3 => Ok(CodingRate::Cr4_7),
            4 => Ok(CodingRate::Cr4_8),
            _ => Err(DriverError::InvalidArgument),
        }
    }
}

/// The full tunable state of the radio. Owned by the driver aggregate and
/// mutated only through its validated setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RadioSettings {
    /// Carrier frequency in Hz
    pub channel: u32,
    pub modem: Modem,
    pub bandwidth: Bandwidth,
    pub spreading_factor: SpreadingFactor,
    pub coding_rate: CodingRate,
    /// Output power in dBm (PA_BOOST path)
    pub tx_power: i8,
    /// Preamble length in symbols
    pub preamble_length: u16,
    pub crc_enabled: bool,
    /// Implicit (fixed-length) header mode
    pub fixed_header_mode: bool,
    pub iq_invert: bool,
    /// Software receive deadline; zero disables the RX timer
    pub rx_timeout: Duration,
    /// Software transmit deadline
    pub tx_timeout: Duration,
    /// Single-shot receive: return to standby after one packet
    pub rx_single: bool,
    pub frequency_hopping: bool,
    /// Symbol periods between hops when hopping is enabled
    pub hop_period: u8,
    /// Receiver symbol timeout window; zero means unbounded
    pub window_timeout: u16,
    /// Largest payload accepted in explicit-header receive
    pub max_payload_len: u8,
}

impl Default for RadioSettings {
    fn default() -> Self {
        Self {
            channel: 868_300_000,
            modem: Modem::LoRa,
            bandwidth: Bandwidth::Bw125,
            spreading_factor: SpreadingFactor::Sf7,
            coding_rate: CodingRate::Cr4_5,
            tx_power: 14,
            preamble_length: 8,
            crc_enabled: true,
            fixed_header_mode: false,
            iq_invert: false,
            rx_timeout: Duration::from_secs(30),
            tx_timeout: Duration::from_secs(30),
            rx_single: false,
            frequency_hopping: false,
            hop_period: 0,
            window_timeout: 0,
            max_payload_len: 255,
        }
    }
}

impl RadioSettings {
    /// Whether the receiver stays active across packets instead of
    /// returning to standby after one
    pub fn continuous_receive(&self) -> bool {
        !self.rx_single
    }

    /// Low data rate optimize is mandated for the slowest symbol rates
    pub fn low_data_rate_optimize(&self) -> bool {
        matches!(
            self.spreading_factor,
            SpreadingFactor::Sf11 | SpreadingFactor::Sf12
        ) && self.bandwidth == Bandwidth::Bw125
    }
}
