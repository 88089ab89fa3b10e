//! Runtime configuration surface.
//!
//! Two layers: a typed setter per tunable that validates its argument,
//! updates the cached [`RadioSettings`](crate::radio::settings::RadioSettings)
//! and writes the affected registers through immediately, and a uniform
//! [`Opt`]/[`OptValue`] get/set pair on top of it for callers that treat
//! the radio as a key-value device. A rejected value leaves both the
//! cache and the chip untouched.

use std::time::Duration;

use log::debug;

use crate::error::DriverError;
use crate::radio::driver::{RadioState, StateCommand, Sx127x};
use crate::radio::hal::{DeadlineTimer, RegisterPort};
use crate::radio::registers::{
    OpMode, FRF_DIVIDER, INVERT_IQ2_OFF, INVERT_IQ2_ON, INVERT_IQ_RX, MODEM_CONFIG1_BW_MASK,
    MODEM_CONFIG1_CR_MASK, MODEM_CONFIG1_IMPLICIT_HEADER, MODEM_CONFIG2_RX_CRC,
    MODEM_CONFIG2_SF_MASK, MODEM_CONFIG3_AGC_AUTO, MODEM_CONFIG3_LOW_DATA_RATE,
    OP_MODE_LONG_RANGE, PA_CONFIG_PA_BOOST, REG_FRF_LSB, REG_FRF_MID, REG_FRF_MSB,
    REG_LR_HOP_PERIOD, REG_LR_INVERT_IQ, REG_LR_INVERT_IQ2, REG_LR_MAX_PAYLOAD_LENGTH,
    REG_LR_MODEM_CONFIG1, REG_LR_MODEM_CONFIG2, REG_LR_MODEM_CONFIG3, REG_LR_PREAMBLE_LSB,
    REG_LR_PREAMBLE_MSB, REG_OP_MODE, REG_PA_CONFIG, XTAL_FREQ_HZ,
};
use crate::radio::settings::{Bandwidth, CodingRate, Modem, SpreadingFactor};

/// Keys of the uniform option surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opt {
    State,
    /// Modem selection (LoRa or FSK)
    DeviceMode,
    /// Center frequency in Hz
    Channel,
    Bandwidth,
    SpreadingFactor,
    CodingRate,
    /// Largest payload accepted in explicit-header receive
    MaxPacketSize,
    /// Payload CRC on receive
    IntegrityCheck,
    /// Frequency hopping enable
    ChannelHop,
    /// Symbols between hops
    ChannelHopPeriod,
    /// Leave receive after one packet
    SingleReceive,
    RxTimeout,
    TxTimeout,
    /// Transmit power in dBm
    TxPower,
    /// Implicit (fixed-length) header mode
    FixedHeader,
    /// Preamble length in symbols
    PreambleLength,
    IqInvert,
    /// Receiver symbol window, in symbols; 0 is unbounded
    WindowTimeout,
}

/// Values carried across the option surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptValue {
    U8(u8),
    U16(u16),
    U32(u32),
    I8(i8),
    Bool(bool),
    Duration(Duration),
    State(StateCommand),
    Modem(Modem),
}

impl<P: RegisterPort, T: DeadlineTimer> Sx127x<P, T> {
    /// Read one option. Values come from the settings cache except where
    /// noted on the key.
    pub fn get_opt(&mut self, opt: Opt) -> Result<OptValue, DriverError> {
        Ok(match opt {
            Opt::DeviceMode => OptValue::Modem(self.settings.modem),
            Opt::Channel => OptValue::U32(self.settings.channel),
            Opt::Bandwidth => OptValue::U8(self.settings.bandwidth as u8),
            Opt::SpreadingFactor => OptValue::U8(self.settings.spreading_factor as u8),
            Opt::CodingRate => OptValue::U8(self.settings.coding_rate as u8),
            Opt::TxPower => OptValue::I8(self.settings.tx_power),
            Opt::PreambleLength => OptValue::U16(self.settings.preamble_length),
            Opt::IntegrityCheck => OptValue::Bool(self.settings.crc_enabled),
            Opt::FixedHeader => OptValue::Bool(self.settings.fixed_header_mode),
            Opt::IqInvert => OptValue::Bool(self.settings.iq_invert),
            Opt::SingleReceive => OptValue::Bool(self.settings.rx_single),
            Opt::WindowTimeout => OptValue::U16(self.settings.window_timeout),
            Opt::RxTimeout => OptValue::Duration(self.settings.rx_timeout),
            Opt::TxTimeout => OptValue::Duration(self.settings.tx_timeout),
            Opt::ChannelHop => OptValue::Bool(self.settings.frequency_hopping),
            // Read back from the chip, which owns the live value.
            Opt::ChannelHopPeriod => OptValue::U8(self.port.read(REG_LR_HOP_PERIOD)?),
            Opt::MaxPacketSize => OptValue::U8(self.settings.max_payload_len),
            // The chip leaves receive on its own in single-shot mode, so
            // the op-mode register is the authority, not the tracked state.
            Opt::State => OptValue::State(match self.state()? {
                RadioState::Sleep => StateCommand::Sleep,
                RadioState::Standby => StateCommand::Standby,
                RadioState::Transmitting => StateCommand::Tx,
                RadioState::Receiving | RadioState::ReceivingSingle => StateCommand::Idle,
            }),
        })
    }

    /// Write one option. A value of the wrong kind, or out of range for
    /// its key, fails with [`DriverError::InvalidArgument`] and changes
    /// nothing.
    pub fn set_opt(&mut self, opt: Opt, value: OptValue) -> Result<(), DriverError> {
        debug!("set_opt {opt:?} = {value:?}");
        match (opt, value) {
            (Opt::Channel, OptValue::U32(hz)) => self.set_channel(hz),
            (Opt::Bandwidth, OptValue::U8(raw)) => self.set_bandwidth(Bandwidth::try_from(raw)?),
            (Opt::SpreadingFactor, OptValue::U8(raw)) => {
                self.set_spreading_factor(SpreadingFactor::try_from(raw)?)
            }
            (Opt::CodingRate, OptValue::U8(raw)) => {
                self.set_coding_rate(CodingRate::try_from(raw)?)
            }
            (Opt::TxPower, OptValue::I8(dbm)) => self.set_tx_power(dbm),
            (Opt::PreambleLength, OptValue::U16(symbols)) => self.set_preamble_length(symbols),
            (Opt::IntegrityCheck, OptValue::Bool(on)) => self.set_crc(on),
            (Opt::FixedHeader, OptValue::Bool(on)) => self.set_fixed_header_mode(on),
            (Opt::IqInvert, OptValue::Bool(on)) => self.set_iq_invert(on),
            (Opt::SingleReceive, OptValue::Bool(on)) => {
                self.settings.rx_single = on;
                Ok(())
            }
            (Opt::WindowTimeout, OptValue::U16(symbols)) => self.set_window_timeout(symbols),
            (Opt::RxTimeout, OptValue::Duration(timeout)) => {
                self.settings.rx_timeout = timeout;
                Ok(())
            }
            (Opt::TxTimeout, OptValue::Duration(timeout)) => {
                self.settings.tx_timeout = timeout;
                Ok(())
            }
            (Opt::ChannelHop, OptValue::Bool(on)) => {
                self.settings.frequency_hopping = on;
                Ok(())
            }
            (Opt::ChannelHopPeriod, OptValue::U8(symbols)) => self.set_hop_period(symbols),
            (Opt::MaxPacketSize, OptValue::U8(len)) => self.set_max_payload_len(len),
            (Opt::DeviceMode, OptValue::Modem(modem)) => self.set_modem(modem),
            (Opt::State, OptValue::State(command)) => self.set_state(command),
            _ => Err(DriverError::InvalidArgument),
        }
    }

    /// Select the modem path. The selection bit can only be flipped in
    /// sleep mode; the previous operating mode is restored afterwards.
    /// Only the LoRa path is implemented.
    pub fn set_modem(&mut self, modem: Modem) -> Result<(), DriverError> {
        match modem {
            Modem::Fsk => Err(DriverError::Unsupported),
            Modem::LoRa => {
                let previous = self.op_mode()?;
                self.write_op_mode(OpMode::Sleep)?;
                let op = self.port.read(REG_OP_MODE)?;
                self.port.write(REG_OP_MODE, op | OP_MODE_LONG_RANGE)?;
                self.write_op_mode(previous)?;
                self.settings.modem = Modem::LoRa;
                Ok(())
            }
        }
    }

    /// Tune the carrier. The frequency is quantized to the synthesizer
    /// step (about 61 Hz with a 32 MHz crystal).
    pub fn set_channel(&mut self, hz: u32) -> Result<(), DriverError> {
        let frf = (u64::from(hz) * FRF_DIVIDER) / XTAL_FREQ_HZ;
        self.port.write(REG_FRF_MSB, (frf >> 16) as u8)?;
        self.port.write(REG_FRF_MID, (frf >> 8) as u8)?;
        self.port.write(REG_FRF_LSB, frf as u8)?;
        self.settings.channel = hz;
        Ok(())
    }

    pub fn set_bandwidth(&mut self, bandwidth: Bandwidth) -> Result<(), DriverError> {
        let mc1 = self.port.read(REG_LR_MODEM_CONFIG1)?;
        self.port.write(
            REG_LR_MODEM_CONFIG1,
            (mc1 & MODEM_CONFIG1_BW_MASK) | ((bandwidth as u8) << 4),
        )?;
        self.settings.bandwidth = bandwidth;
        self.update_low_data_rate()
    }

    pub fn set_spreading_factor(&mut self, sf: SpreadingFactor) -> Result<(), DriverError> {
        let mc2 = self.port.read(REG_LR_MODEM_CONFIG2)?;
        self.port.write(
            REG_LR_MODEM_CONFIG2,
            (mc2 & MODEM_CONFIG2_SF_MASK) | ((sf as u8) << 4),
        )?;
        self.settings.spreading_factor = sf;
        self.update_low_data_rate()
    }

    pub fn set_coding_rate(&mut self, cr: CodingRate) -> Result<(), DriverError> {
        let mc1 = self.port.read(REG_LR_MODEM_CONFIG1)?;
        self.port.write(
            REG_LR_MODEM_CONFIG1,
            (mc1 & MODEM_CONFIG1_CR_MASK) | ((cr as u8) << 1),
        )?;
        self.settings.coding_rate = cr;
        Ok(())
    }

    /// Output power in dBm. Levels above 14 dBm route through the PA_BOOST
    /// pin, lower levels through RFO. Requests outside the 0..=17 range
    /// the two stages can encode are clamped to it.
    pub fn set_tx_power(&mut self, dbm: i8) -> Result<(), DriverError> {
        let dbm = dbm.clamp(0, 17);
        let pa = if dbm > 14 {
            PA_CONFIG_PA_BOOST | (dbm as u8 - 2)
        } else {
            // Max RFO output stage, OutputPower trim below it.
            0x70 | dbm as u8
        };
        self.port.write(REG_PA_CONFIG, pa)?;
        self.settings.tx_power = dbm;
        Ok(())
    }

    pub fn set_preamble_length(&mut self, symbols: u16) -> Result<(), DriverError> {
        self.port.write(REG_LR_PREAMBLE_MSB, (symbols >> 8) as u8)?;
        self.port.write(REG_LR_PREAMBLE_LSB, symbols as u8)?;
        self.settings.preamble_length = symbols;
        Ok(())
    }

    pub fn set_crc(&mut self, enabled: bool) -> Result<(), DriverError> {
        let mc2 = self.port.read(REG_LR_MODEM_CONFIG2)?;
        let mc2 = if enabled {
            mc2 | MODEM_CONFIG2_RX_CRC
        } else {
            mc2 & !MODEM_CONFIG2_RX_CRC
        };
        self.port.write(REG_LR_MODEM_CONFIG2, mc2)?;
        self.settings.crc_enabled = enabled;
        Ok(())
    }

    pub fn set_fixed_header_mode(&mut self, fixed: bool) -> Result<(), DriverError> {
        let mc1 = self.port.read(REG_LR_MODEM_CONFIG1)?;
        let mc1 = if fixed {
            mc1 | MODEM_CONFIG1_IMPLICIT_HEADER
        } else {
            mc1 & !MODEM_CONFIG1_IMPLICIT_HEADER
        };
        self.port.write(REG_LR_MODEM_CONFIG1, mc1)?;
        self.settings.fixed_header_mode = fixed;
        Ok(())
    }

    pub fn set_iq_invert(&mut self, inverted: bool) -> Result<(), DriverError> {
        let iq = self.port.read(REG_LR_INVERT_IQ)?;
        if inverted {
            self.port.write(REG_LR_INVERT_IQ, iq | INVERT_IQ_RX)?;
            self.port.write(REG_LR_INVERT_IQ2, INVERT_IQ2_ON)?;
        } else {
            self.port.write(REG_LR_INVERT_IQ, iq & !INVERT_IQ_RX)?;
            self.port.write(REG_LR_INVERT_IQ2, INVERT_IQ2_OFF)?;
        }
        self.settings.iq_invert = inverted;
        Ok(())
    }

    /// Bound the receiver's packet search to `symbols` symbol periods;
    /// 0 keeps it listening indefinitely. Takes effect on the next
    /// receive entry.
    pub fn set_window_timeout(&mut self, symbols: u16) -> Result<(), DriverError> {
        // Split across MODEM_CONFIG2 and the LSB register, 10 bits total.
        if symbols > 0x3FF {
            return Err(DriverError::InvalidArgument);
        }
        self.settings.window_timeout = symbols;
        Ok(())
    }

    pub fn set_hop_period(&mut self, symbols: u8) -> Result<(), DriverError> {
        self.port.write(REG_LR_HOP_PERIOD, symbols)?;
        self.settings.hop_period = symbols;
        Ok(())
    }

    pub fn set_max_payload_len(&mut self, len: u8) -> Result<(), DriverError> {
        self.port.write(REG_LR_MAX_PAYLOAD_LENGTH, len)?;
        self.settings.max_payload_len = len;
        Ok(())
    }

    pub fn set_rx_single(&mut self, single: bool) {
        self.settings.rx_single = single;
    }

    pub fn set_rx_timeout(&mut self, timeout: Duration) {
        self.settings.rx_timeout = timeout;
    }

    pub fn set_tx_timeout(&mut self, timeout: Duration) {
        self.settings.tx_timeout = timeout;
    }

    pub fn set_frequency_hopping(&mut self, enabled: bool) {
        self.settings.frequency_hopping = enabled;
    }

    /// Program every cached setting into the chip, in one pass
    pub(crate) fn apply_settings(&mut self) -> Result<(), DriverError> {
        let s = self.settings.clone();
        self.set_channel(s.channel)?;
        self.set_bandwidth(s.bandwidth)?;
        self.set_spreading_factor(s.spreading_factor)?;
        self.set_coding_rate(s.coding_rate)?;
        self.set_tx_power(s.tx_power)?;
        self.set_preamble_length(s.preamble_length)?;
        self.set_crc(s.crc_enabled)?;
        self.set_fixed_header_mode(s.fixed_header_mode)?;
        self.set_iq_invert(s.iq_invert)?;
        self.set_max_payload_len(s.max_payload_len)?;
        if s.frequency_hopping {
            self.set_hop_period(s.hop_period)?;
        }
        let mc3 = self.port.read(REG_LR_MODEM_CONFIG3)?;
        self.port
            .write(REG_LR_MODEM_CONFIG3, mc3 | MODEM_CONFIG3_AGC_AUTO)?;
        Ok(())
    }

    fn update_low_data_rate(&mut self) -> Result<(), DriverError> {
        let mc3 = self.port.read(REG_LR_MODEM_CONFIG3)?;
        let mc3 = if self.settings.low_data_rate_optimize() {
            mc3 | MODEM_CONFIG3_LOW_DATA_RATE
        } else {
            mc3 & !MODEM_CONFIG3_LOW_DATA_RATE
        };
        self.port.write(REG_LR_MODEM_CONFIG3, mc3)?;
        Ok(())
    }
}
