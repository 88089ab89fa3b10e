//! Interrupt latching and dispatch.
//!
//! Hardware interrupt context only records which DIO line fired, through
//! the lock-free [`PendingIrq`] latch; all register traffic happens later
//! in [`Sx127x::dispatch`] on the control context. The latch holds a
//! single source: a second line firing before dispatch overwrites the
//! first, and a line firing twice collapses into one service pass.

use std::sync::atomic::{AtomicU8, Ordering};

use log::{debug, warn};

use crate::error::DriverError;
use crate::radio::driver::{Event, RadioState, Sx127x};
use crate::radio::hal::{DeadlineTimer, RegisterPort};
use crate::radio::registers::{IrqFlags, HOP_CHANNEL_MASK, REG_LR_HOP_CHANNEL, REG_LR_IRQ_FLAGS};

/// Physical interrupt lines of the transceiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptSource {
    /// TX done / RX done, per the active DIO mapping
    Dio0,
    /// RX symbol-window timeout
    Dio1,
    /// Frequency-hop boundary
    Dio2,
    /// Channel activity detection done
    Dio3,
}

/// Single-slot pending-interrupt latch.
///
/// Encoded as `0` for empty, else `1 + source index`, so a plain atomic
/// store both raises and overwrites.
pub struct PendingIrq(AtomicU8);

impl PendingIrq {
    pub fn new() -> Self {
        Self(AtomicU8::new(0))
    }

    /// Latch a source, overwriting any source already pending
    pub fn raise(&self, source: InterruptSource) {
        let encoded = match source {
            InterruptSource::Dio0 => 1,
            InterruptSource::Dio1 => 2,
            InterruptSource::Dio2 => 3,
            InterruptSource::Dio3 => 4,
        };
        self.0.store(encoded, Ordering::SeqCst);
    }

    /// Consume the latched source, if any
    pub fn take(&self) -> Option<InterruptSource> {
        match self.0.swap(0, Ordering::SeqCst) {
            0 => None,
            1 => Some(InterruptSource::Dio0),
            2 => Some(InterruptSource::Dio1),
            3 => Some(InterruptSource::Dio2),
            _ => Some(InterruptSource::Dio3),
        }
    }

    pub fn is_pending(&self) -> bool {
        self.0.load(Ordering::SeqCst) != 0
    }
}

impl Default for PendingIrq {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: RegisterPort, T: DeadlineTimer> Sx127x<P, T> {
    /// Record that a DIO line fired. Safe to call from interrupt context;
    /// performs no register traffic.
    pub fn raise_interrupt(&self, source: InterruptSource) {
        self.pending.raise(source);
    }

    /// Service the latched interrupt source, if any. Runs on the control
    /// context; this is where flags get cleared and events get emitted.
    pub fn dispatch(&mut self) -> Result<(), DriverError> {
        match self.pending.take() {
            None => Ok(()),
            Some(InterruptSource::Dio0) => self.on_dio0(),
            Some(InterruptSource::Dio1) => self.on_dio1(),
            Some(InterruptSource::Dio2) => self.on_dio2(),
            Some(InterruptSource::Dio3) => self.on_dio3(),
        }
    }

    /// DIO0: packet boundary. Meaning depends on the active mode.
    fn on_dio0(&mut self) -> Result<(), DriverError> {
        match self.state {
            RadioState::Transmitting => {
                self.tx_timer.cancel();
                self.port
                    .write(REG_LR_IRQ_FLAGS, IrqFlags::TX_DONE.bits())?;
                self.set_standby()?;
                self.emit(Event::TransmitComplete);
                Ok(())
            }
            RadioState::Receiving | RadioState::ReceivingSingle => {
                self.rx_timer.cancel();
                let flags = IrqFlags::from_bits_truncate(self.port.read(REG_LR_IRQ_FLAGS)?);
                if flags.contains(IrqFlags::PAYLOAD_CRC_ERROR) {
                    warn!("dropping packet with invalid crc");
                    self.port.write(
                        REG_LR_IRQ_FLAGS,
                        (IrqFlags::PAYLOAD_CRC_ERROR | IrqFlags::RX_DONE).bits(),
                    )?;
                    if !self.settings.continuous_receive() {
                        self.set_standby()?;
                    }
                    self.emit(Event::CrcError);
                    return Ok(());
                }
                // Payload stays in the FIFO until receive() drains it.
                let info = self.packet_info()?;
                self.emit(Event::ReceiveComplete(info));
                Ok(())
            }
            state => {
                debug!("dio0 in {state:?} ignored");
                Ok(())
            }
        }
    }

    /// DIO1: the receiver's symbol window elapsed without a packet
    fn on_dio1(&mut self) -> Result<(), DriverError> {
        self.port
            .write(REG_LR_IRQ_FLAGS, IrqFlags::RX_TIMEOUT.bits())?;
        self.rx_timer.cancel();
        if !self.settings.continuous_receive() {
            self.set_standby()?;
        }
        self.emit(Event::Timeout);
        Ok(())
    }

    /// DIO2: frequency hopping crossed a hop boundary
    fn on_dio2(&mut self) -> Result<(), DriverError> {
        self.port
            .write(REG_LR_IRQ_FLAGS, IrqFlags::FHSS_CHANGE_CHANNEL.bits())?;
        let channel = self.port.read(REG_LR_HOP_CHANNEL)? & HOP_CHANNEL_MASK;
        self.emit(Event::ChannelHop { channel });
        Ok(())
    }

    /// DIO3: a channel activity detection scan finished
    fn on_dio3(&mut self) -> Result<(), DriverError> {
        let flags = IrqFlags::from_bits_truncate(self.port.read(REG_LR_IRQ_FLAGS)?);
        let detected = flags.contains(IrqFlags::CAD_DETECTED);
        self.port.write(
            REG_LR_IRQ_FLAGS,
            (IrqFlags::CAD_DONE | IrqFlags::CAD_DETECTED).bits(),
        )?;
        self.emit(Event::CadDone { detected });
        Ok(())
    }
}
