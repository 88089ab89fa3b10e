//! # SX127x Register Definitions and Constants
//!
//! Register addresses, operating modes and bit field definitions for the
//! SX127x family in LoRa mode, based on the SX1276 datasheet. Registers
//! prefixed `REG_LR_` belong to the LoRa register page and are only
//! meaningful while the long-range modem is selected.
//!
//! ## Register Map
//!
//! - 0x00-0x0C: common configuration (FIFO, operation mode, frequency, PA)
//! - 0x0D-0x3F: LoRa page (FIFO pointers, IRQ flags, modem configuration)
//! - 0x40-0x41: DIO pin mapping
//! - 0x42: silicon revision

use bitflags::bitflags;
use std::time::Duration;

use crate::error::DriverError;

// =============================================================================
// Register addresses
// =============================================================================

/// FIFO read/write access register
pub const REG_FIFO: u8 = 0x00;

/// Operating mode and modem selection
pub const REG_OP_MODE: u8 = 0x01;

/// RF carrier frequency (MSB)
pub const REG_FRF_MSB: u8 = 0x06;

/// RF carrier frequency (MID)
pub const REG_FRF_MID: u8 = 0x07;

/// RF carrier frequency (LSB)
pub const REG_FRF_LSB: u8 = 0x08;

/// PA selection and output power control
pub const REG_PA_CONFIG: u8 = 0x09;

/// SPI-visible FIFO address pointer
pub const REG_LR_FIFO_ADDR_PTR: u8 = 0x0D;

/// Base address of the transmit portion of the FIFO
pub const REG_LR_FIFO_TX_BASE_ADDR: u8 = 0x0E;

/// Base address of the receive portion of the FIFO
pub const REG_LR_FIFO_RX_BASE_ADDR: u8 = 0x0F;

/// Start address of the last packet received
pub const REG_LR_FIFO_RX_CURRENT_ADDR: u8 = 0x10;

/// IRQ mask: a set bit disables the corresponding interrupt source
pub const REG_LR_IRQ_FLAGS_MASK: u8 = 0x11;

/// IRQ flags: write 1 to a bit to clear it
pub const REG_LR_IRQ_FLAGS: u8 = 0x12;

/// Number of payload bytes of the last packet received
pub const REG_LR_RX_NB_BYTES: u8 = 0x13;

/// SNR estimate of the last packet received (quarter-dB, two's complement)
pub const REG_LR_PKT_SNR_VALUE: u8 = 0x19;

/// RSSI estimate of the last packet received
pub const REG_LR_PKT_RSSI_VALUE: u8 = 0x1A;

/// FHSS state: PLL timeout, payload CRC presence, current hop channel
pub const REG_LR_HOP_CHANNEL: u8 = 0x1C;

/// Bandwidth, coding rate and header mode
pub const REG_LR_MODEM_CONFIG1: u8 = 0x1D;

/// Spreading factor, CRC enable and symbol timeout MSB
pub const REG_LR_MODEM_CONFIG2: u8 = 0x1E;

/// Receiver symbol timeout (LSB)
pub const REG_LR_SYMB_TIMEOUT_LSB: u8 = 0x1F;

/// Preamble length (MSB)
pub const REG_LR_PREAMBLE_MSB: u8 = 0x20;

/// Preamble length (LSB)
pub const REG_LR_PREAMBLE_LSB: u8 = 0x21;

/// Payload length for transmit and implicit-header receive
pub const REG_LR_PAYLOAD_LENGTH: u8 = 0x22;

/// Maximum accepted payload length in explicit-header receive
pub const REG_LR_MAX_PAYLOAD_LENGTH: u8 = 0x23;

/// Symbol periods between frequency hops (0 disables hopping)
pub const REG_LR_HOP_PERIOD: u8 = 0x24;

/// Low data rate optimize and AGC control
pub const REG_LR_MODEM_CONFIG3: u8 = 0x26;

/// RX IQ polarity control
pub const REG_LR_INVERT_IQ: u8 = 0x33;

/// Companion register for IQ inversion
pub const REG_LR_INVERT_IQ2: u8 = 0x3B;

/// DIO0-DIO3 pin function mapping
pub const REG_DIO_MAPPING1: u8 = 0x40;

/// Silicon revision (read-only)
pub const REG_VERSION: u8 = 0x42;

// =============================================================================
// Bit fields
// =============================================================================

/// Mode bits within `REG_OP_MODE`
pub const OP_MODE_MASK: u8 = 0x07;

/// Long-range (LoRa) modem selection bit within `REG_OP_MODE`
pub const OP_MODE_LONG_RANGE: u8 = 0x80;

/// Clears the DIO0 field of `REG_DIO_MAPPING1` when ANDed
pub const DIO0_MAPPING_MASK: u8 = 0x3F;

/// DIO0 = RxDone
pub const DIO0_MAPPING_RX_DONE: u8 = 0x00;

/// DIO0 = TxDone
pub const DIO0_MAPPING_TX_DONE: u8 = 0x40;

/// DIO0 = CadDone
pub const DIO0_MAPPING_CAD_DONE: u8 = 0x80;

/// Current hop channel field of `REG_LR_HOP_CHANNEL`
pub const HOP_CHANNEL_MASK: u8 = 0x3F;

/// RX IQ inversion bit of `REG_LR_INVERT_IQ`
pub const INVERT_IQ_RX: u8 = 0x40;

/// `REG_LR_INVERT_IQ2` value when inversion is active
pub const INVERT_IQ2_ON: u8 = 0x19;

/// `REG_LR_INVERT_IQ2` value for standard polarity
pub const INVERT_IQ2_OFF: u8 = 0x1D;

/// PA_BOOST output selection bit of `REG_PA_CONFIG`
pub const PA_CONFIG_PA_BOOST: u8 = 0x80;

/// Keeps everything but the bandwidth field of `REG_LR_MODEM_CONFIG1`
pub const MODEM_CONFIG1_BW_MASK: u8 = 0x0F;

/// Keeps everything but the coding rate field of `REG_LR_MODEM_CONFIG1`
pub const MODEM_CONFIG1_CR_MASK: u8 = 0xF1;

/// Implicit header mode bit of `REG_LR_MODEM_CONFIG1`
pub const MODEM_CONFIG1_IMPLICIT_HEADER: u8 = 0x01;

/// Keeps everything but the spreading factor field of `REG_LR_MODEM_CONFIG2`
pub const MODEM_CONFIG2_SF_MASK: u8 = 0x0F;

/// Payload CRC enable bit of `REG_LR_MODEM_CONFIG2`
pub const MODEM_CONFIG2_RX_CRC: u8 = 0x04;

/// Symbol timeout MSB field of `REG_LR_MODEM_CONFIG2`
pub const MODEM_CONFIG2_SYMB_TIMEOUT_MSB: u8 = 0x03;

/// Low data rate optimize bit of `REG_LR_MODEM_CONFIG3`
pub const MODEM_CONFIG3_LOW_DATA_RATE: u8 = 0x08;

/// Automatic gain control bit of `REG_LR_MODEM_CONFIG3`
pub const MODEM_CONFIG3_AGC_AUTO: u8 = 0x04;

// =============================================================================
// Fixed radio constants
// =============================================================================

/// Crystal oscillator frequency the frequency synthesizer divides down
pub const XTAL_FREQ_HZ: u64 = 32_000_000;

/// FRF register resolution: `XTAL / 2^19` Hz per LSB
pub const FRF_DIVIDER: u64 = 1 << 19;

/// Packet RSSI offset for channels above [`MID_BAND_THRESHOLD_HZ`], in dBm
pub const RSSI_OFFSET_HF: i16 = -157;

/// Packet RSSI offset for channels at or below [`MID_BAND_THRESHOLD_HZ`]
pub const RSSI_OFFSET_LF: i16 = -164;

/// Carrier frequency separating the LF and HF RSSI calibration bands
pub const MID_BAND_THRESHOLD_HZ: u32 = 525_000_000;

/// Settle time after waking the chip from sleep before FIFO access is legal
pub const WAKEUP_SETTLE: Duration = Duration::from_millis(1);

/// Silicon revision reported by SX1276-family parts
pub const VERSION_SX1276: u8 = 0x12;

/// Width of the on-chip payload length field
pub const MAX_PAYLOAD_LEN: usize = 255;

// =============================================================================
// Operating modes
// =============================================================================

/// Raw chip operating modes (mode bits of `REG_OP_MODE`, LoRa page)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpMode {
    /// Lowest-power mode; FIFO and most registers inaccessible
    Sleep = 0x00,
    /// Oscillator running, modem idle
    Standby = 0x01,
    /// Frequency synthesis towards transmit
    FsTx = 0x02,
    /// Transmitting
    Tx = 0x03,
    /// Frequency synthesis towards receive
    FsRx = 0x04,
    /// Continuous receive
    Rx = 0x05,
    /// Single-shot receive; returns to standby after one packet or timeout
    RxSingle = 0x06,
    /// Channel activity detection scan
    Cad = 0x07,
}

impl TryFrom<u8> for OpMode {
    type Error = DriverError;

    /// Expects the mode field only; callers mask `REG_OP_MODE` with
    /// [`OP_MODE_MASK`] first. Values above the field width fail with
    /// `Unsupported`.
    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0x00 => Ok(OpMode::Sleep),
            0x01 => Ok(OpMode::Standby),
            0x02 => Ok(OpMode::FsTx),
            0x03 => Ok(OpMode::Tx),
            0x04 => Ok(OpMode::FsRx),
            0x05 => Ok(OpMode::Rx),
            0x06 => Ok(OpMode::RxSingle),
            0x07 => Ok(OpMode::Cad),
            _ => Err(DriverError::Unsupported),
        }
    }
}

bitflags! {
    /// LoRa IRQ flag register bits (`REG_LR_IRQ_FLAGS`)
    ///
    /// The same layout is used by `REG_LR_IRQ_FLAGS_MASK`, where a set bit
    /// *disables* the source. Flags are cleared by writing 1 back to the
    /// flag register.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct IrqFlags: u8 {
        /// Channel activity found during a CAD scan
        const CAD_DETECTED = 0x01;
        /// FHSS hop boundary reached
        const FHSS_CHANGE_CHANNEL = 0x02;
        /// CAD scan finished
        const CAD_DONE = 0x04;
        /// Packet transmission finished
        const TX_DONE = 0x08;
        /// Valid explicit header received
        const VALID_HEADER = 0x10;
        /// Payload CRC check failed
        const PAYLOAD_CRC_ERROR = 0x20;
        /// Packet reception finished
        const RX_DONE = 0x40;
        /// Single-shot receive window expired
        const RX_TIMEOUT = 0x80;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn op_mode_round_trips_defined_modes() {
        for raw in 0x00..=0x07u8 {
            let mode = OpMode::try_from(raw).unwrap();
            assert_eq!(mode as u8, raw);
        }
    }

    #[test]
    fn op_mode_rejects_out_of_field_values() {
        assert!(OpMode::try_from(0x08).is_err());
        assert!(OpMode::try_from((OP_MODE_LONG_RANGE | 0x05) & OP_MODE_MASK).is_ok());
    }

    #[test]
    fn irq_flags_cover_the_full_register() {
        assert_eq!(IrqFlags::all().bits(), 0xFF);
    }
}
