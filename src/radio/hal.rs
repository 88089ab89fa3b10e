//! # Hardware Abstraction for Register and Timer Access
//!
//! This module defines the two narrow interfaces the driver core consumes:
//! [`RegisterPort`] for synchronous chip register and FIFO access, and
//! [`DeadlineTimer`] for one-shot TX/RX deadline scheduling. Platform
//! integrations (SPI transports, OS timers) implement these; the crate ships
//! [`MemoryPort`] and [`ManualTimer`] so the whole driver can be exercised
//! on a host without hardware.

use std::time::Duration;

use thiserror::Error;

use crate::radio::registers::{
    IrqFlags, REG_FIFO, REG_LR_FIFO_RX_CURRENT_ADDR, REG_LR_IRQ_FLAGS, REG_LR_RX_NB_BYTES,
    REG_OP_MODE, REG_VERSION, VERSION_SX1276,
};

/// Errors that can occur below the register interface
#[derive(Debug, Error)]
pub enum PortError {
    #[error("bus transfer failed")]
    Bus,

    #[error("reset line unavailable")]
    Reset,
}

/// Synchronous access to chip registers and the FIFO.
///
/// Transfers are assumed bounded-latency; transport-level retries and
/// framing live below this trait.
pub trait RegisterPort {
    /// Read a single register
    fn read(&mut self, reg: u8) -> Result<u8, PortError>;

    /// Write a single register
    fn write(&mut self, reg: u8, value: u8) -> Result<(), PortError>;

    /// Read `buf.len()` bytes starting at `reg`; reading [`REG_FIFO`]
    /// consumes FIFO contents instead of advancing the address
    fn read_burst(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), PortError>;

    /// Write a run of bytes starting at `reg`
    fn write_burst(&mut self, reg: u8, data: &[u8]) -> Result<(), PortError>;

    /// Pulse the hardware reset line and wait for the chip to come back up
    fn reset(&mut self) -> Result<(), PortError>;
}

/// One-shot deadline owned by the driver's TX or RX timer slot.
///
/// Implementations deliver expiry by invoking the matching
/// `on_tx_timeout`/`on_rx_timeout` entry point on the driver from the
/// control context.
pub trait DeadlineTimer {
    /// Arm the deadline, replacing any previously armed one
    fn arm(&mut self, timeout: Duration);

    /// Disarm. Cancelling an already-fired or never-armed deadline is a
    /// no-op, not an error.
    fn cancel(&mut self);
}

/// One recorded port operation, for asserting write ordering in tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortOp {
    Write { reg: u8, value: u8 },
    WriteBurst { reg: u8, len: usize },
    Reset,
}

/// In-memory simulated SX127x used by the test suite and the demo CLI.
///
/// Models the pieces of chip behavior the driver depends on: a register
/// file, write-1-to-clear IRQ flags, and separate TX/RX FIFO views. Every
/// mutation is journaled so tests can assert side-effect ordering.
pub struct MemoryPort {
    regs: [u8; 0x80],
    tx_fifo: Vec<u8>,
    rx_fifo: Vec<u8>,
    journal: Vec<PortOp>,
}

impl Default for MemoryPort {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPort {
    pub fn new() -> Self {
        let mut port = Self {
            regs: [0u8; 0x80],
            tx_fifo: Vec::new(),
            rx_fifo: Vec::new(),
            journal: Vec::new(),
        };
        port.power_on_defaults();
        port
    }

    fn power_on_defaults(&mut self) {
        self.regs = [0u8; 0x80];
        self.regs[REG_OP_MODE as usize] = 0x01; // standby after reset
        self.regs[REG_VERSION as usize] = VERSION_SX1276;
    }

    /// Peek a register without journaling
    pub fn reg(&self, reg: u8) -> u8 {
        self.regs[reg as usize]
    }

    /// Poke a register without journaling (test setup)
    pub fn set_reg(&mut self, reg: u8, value: u8) {
        self.regs[reg as usize] = value;
    }

    /// Assert IRQ flag bits as the chip would
    pub fn latch_irq(&mut self, flags: IrqFlags) {
        self.regs[REG_LR_IRQ_FLAGS as usize] |= flags.bits();
    }

    /// Stage a received packet: FIFO contents, byte count and read pointer
    pub fn load_rx(&mut self, payload: &[u8]) {
        self.rx_fifo = payload.to_vec();
        self.regs[REG_LR_RX_NB_BYTES as usize] = payload.len() as u8;
        self.regs[REG_LR_FIFO_RX_CURRENT_ADDR as usize] = 0;
    }

    /// Bytes the driver has pushed into the transmit FIFO
    pub fn tx_data(&self) -> &[u8] {
        &self.tx_fifo
    }

    pub fn journal(&self) -> &[PortOp] {
        &self.journal
    }

    pub fn clear_journal(&mut self) {
        self.journal.clear();
    }
}

impl RegisterPort for MemoryPort {
    fn read(&mut self, reg: u8) -> Result<u8, PortError> {
        if reg == REG_FIFO {
            let byte = if self.rx_fifo.is_empty() {
                0
            } else {
                self.rx_fifo.remove(0)
            };
            return Ok(byte);
        }
        Ok(self.regs[reg as usize])
    }

    fn write(&mut self, reg: u8, value: u8) -> Result<(), PortError> {
        self.journal.push(PortOp::Write { reg, value });
        match reg {
            REG_FIFO => self.tx_fifo.push(value),
            // IRQ flags clear on writing 1 back
            REG_LR_IRQ_FLAGS => self.regs[reg as usize] &= !value,
            _ => self.regs[reg as usize] = value,
        }
        Ok(())
    }

    fn read_burst(&mut self, reg: u8, buf: &mut [u8]) -> Result<(), PortError> {
        if reg == REG_FIFO {
            for slot in buf.iter_mut() {
                *slot = if self.rx_fifo.is_empty() {
                    0
                } else {
                    self.rx_fifo.remove(0)
                };
            }
            return Ok(());
        }
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = self.regs[reg as usize + i];
        }
        Ok(())
    }

    fn write_burst(&mut self, reg: u8, data: &[u8]) -> Result<(), PortError> {
        self.journal.push(PortOp::WriteBurst {
            reg,
            len: data.len(),
        });
        if reg == REG_FIFO {
            self.tx_fifo.extend_from_slice(data);
            return Ok(());
        }
        for (i, byte) in data.iter().enumerate() {
            self.regs[reg as usize + i] = *byte;
        }
        Ok(())
    }

    fn reset(&mut self) -> Result<(), PortError> {
        self.journal.push(PortOp::Reset);
        self.power_on_defaults();
        self.tx_fifo.clear();
        self.rx_fifo.clear();
        Ok(())
    }
}

/// Host-side timer slot: records the armed deadline, fired manually by the
/// caller (tests invoke the driver's timeout entry points directly).
#[derive(Debug, Default)]
pub struct ManualTimer {
    armed: Option<Duration>,
    arm_count: usize,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.armed
    }

    /// How many times this slot has been (re)armed since creation
    pub fn times_armed(&self) -> usize {
        self.arm_count
    }
}

impl DeadlineTimer for ManualTimer {
    fn arm(&mut self, timeout: Duration) {
        self.armed = Some(timeout);
        self.arm_count += 1;
    }

    fn cancel(&mut self) {
        self.armed = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn irq_flags_clear_on_write_back() {
        let mut port = MemoryPort::new();
        port.latch_irq(IrqFlags::RX_DONE | IrqFlags::PAYLOAD_CRC_ERROR);
        port.write(REG_LR_IRQ_FLAGS, IrqFlags::RX_DONE.bits()).unwrap();
        assert_eq!(
            port.reg(REG_LR_IRQ_FLAGS),
            IrqFlags::PAYLOAD_CRC_ERROR.bits()
        );
    }

    #[test]
    fn fifo_writes_accumulate_in_order() {
        let mut port = MemoryPort::new();
        port.write_burst(REG_FIFO, &[1, 2]).unwrap();
        port.write(REG_FIFO, 3).unwrap();
        assert_eq!(port.tx_data(), &[1, 2, 3]);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut timer = ManualTimer::new();
        timer.arm(Duration::from_secs(1));
        timer.cancel();
        timer.cancel();
        assert!(!timer.is_armed());
        assert_eq!(timer.times_armed(), 1);
    }
}
