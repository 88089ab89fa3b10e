//! Packet framing over the 256-byte chip FIFO.
//!
//! One packet occupies the FIFO at a time. The send path stages scattered
//! payload fragments from the base address and hands off to the transmit
//! state tail in [`Sx127x::set_tx`]; the receive path drains a completed
//! packet from wherever the modem landed it and derives its link-quality
//! metrics.

use std::thread;
use std::time::Duration;

use log::{debug, warn};

use crate::error::DriverError;
use crate::radio::driver::{Event, RadioState, Sx127x};
use crate::radio::hal::{DeadlineTimer, RegisterPort};
use crate::radio::params::{rssi_from_raw, snr_from_raw, time_on_air};
use crate::radio::registers::{
    IrqFlags, MAX_PAYLOAD_LEN, REG_FIFO, REG_LR_FIFO_ADDR_PTR, REG_LR_FIFO_RX_CURRENT_ADDR,
    REG_LR_FIFO_TX_BASE_ADDR, REG_LR_IRQ_FLAGS, REG_LR_PAYLOAD_LENGTH, REG_LR_PKT_RSSI_VALUE,
    REG_LR_PKT_SNR_VALUE, REG_LR_RX_NB_BYTES, WAKEUP_SETTLE,
};

/// Link-quality metrics for one received packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PacketInfo {
    /// Received signal strength in dBm
    pub rssi: i16,
    /// Signal-to-noise ratio in dB
    pub snr: i8,
    /// Link-quality indicator; the LoRa modem does not report one
    pub lqi: u8,
    /// Estimated on-air duration of the packet under the current
    /// modulation settings
    pub time_on_air: Duration,
}

impl<P: RegisterPort, T: DeadlineTimer> Sx127x<P, T> {
    /// Stage a packet in the FIFO and start transmitting it.
    ///
    /// `fragments` are concatenated in order into one on-air payload.
    /// Returns the staged payload length. Fails with
    /// [`DriverError::Busy`] while a transmission is already running,
    /// leaving the FIFO and the TX deadline untouched.
    pub fn send(&mut self, fragments: &[&[u8]]) -> Result<usize, DriverError> {
        if self.state == RadioState::Transmitting {
            warn!("cannot send: transmission already running");
            return Err(DriverError::Busy);
        }

        let total: usize = fragments.iter().map(|f| f.len()).sum();
        if total == 0 || total > MAX_PAYLOAD_LEN {
            return Err(DriverError::InvalidArgument);
        }
        self.port.write(REG_LR_PAYLOAD_LENGTH, total as u8)?;

        // The FIFO is inaccessible in sleep; wake up and let the
        // oscillator settle before touching it.
        if self.state == RadioState::Sleep {
            self.set_standby()?;
            thread::sleep(WAKEUP_SETTLE);
        }

        self.port.write(REG_LR_FIFO_TX_BASE_ADDR, 0x00)?;
        self.port.write(REG_LR_FIFO_ADDR_PTR, 0x00)?;
        for fragment in fragments {
            if !fragment.is_empty() {
                self.port.write_burst(REG_FIFO, fragment)?;
            }
        }
        debug!("staged {total} byte payload, starting tx");

        self.set_tx()?;
        Ok(total)
    }

    /// Drain a completed packet from the FIFO.
    ///
    /// * `buf: None` probes: the pending packet's length (and metrics,
    ///   when `want_info`) are returned and the packet stays in the FIFO.
    /// * A too-small buffer fails with [`DriverError::BufferTooSmall`]
    ///   and also leaves the packet in the FIFO, so the caller can retry
    ///   with a larger buffer.
    ///
    /// A packet that failed its CRC yields no payload: the flag is
    /// cleared, [`Event::CrcError`](crate::Event::CrcError) is emitted
    /// and `Ok((0, None))` is returned.
    pub fn receive(
        &mut self,
        buf: Option<&mut [u8]>,
        want_info: bool,
    ) -> Result<(usize, Option<PacketInfo>), DriverError> {
        self.port
            .write(REG_LR_IRQ_FLAGS, IrqFlags::RX_DONE.bits())?;

        let flags = IrqFlags::from_bits_truncate(self.port.read(REG_LR_IRQ_FLAGS)?);
        if flags.contains(IrqFlags::PAYLOAD_CRC_ERROR) {
            warn!("dropping packet with invalid crc");
            self.port
                .write(REG_LR_IRQ_FLAGS, IrqFlags::PAYLOAD_CRC_ERROR.bits())?;
            self.rx_timer.cancel();
            if !self.settings.continuous_receive() {
                self.set_standby()?;
            }
            self.emit(Event::CrcError);
            return Ok((0, None));
        }

        let info = if want_info {
            Some(self.packet_info()?)
        } else {
            None
        };

        let size = self.port.read(REG_LR_RX_NB_BYTES)? as usize;
        let buf = match buf {
            None => return Ok((size, info)),
            Some(buf) => buf,
        };
        if size > buf.len() {
            warn!("packet of {size} bytes exceeds {} byte buffer", buf.len());
            // State and the rx deadline stay untouched so a retry with a
            // larger buffer can still succeed.
            return Err(DriverError::BufferTooSmall {
                len: size,
                capacity: buf.len(),
            });
        }

        if !self.settings.continuous_receive() {
            self.set_standby()?;
        }
        self.rx_timer.cancel();

        // Rewind to where the modem parked this packet, then drain it.
        let start = self.port.read(REG_LR_FIFO_RX_CURRENT_ADDR)?;
        self.port.write(REG_LR_FIFO_ADDR_PTR, start)?;
        self.port.read_burst(REG_FIFO, &mut buf[..size])?;
        debug!("received {size} byte payload");
        Ok((size, info))
    }

    /// Read the link-quality metrics of the packet currently latched in
    /// the modem
    pub fn packet_info(&mut self) -> Result<PacketInfo, DriverError> {
        let snr = snr_from_raw(self.port.read(REG_LR_PKT_SNR_VALUE)?);
        let rssi = rssi_from_raw(
            self.port.read(REG_LR_PKT_RSSI_VALUE)?,
            snr,
            self.settings.channel,
        );
        let size = self.port.read(REG_LR_RX_NB_BYTES)? as usize;
        Ok(PacketInfo {
            rssi,
            snr,
            lqi: 0,
            time_on_air: time_on_air(&self.settings, size),
        })
    }
}
