//! # SX127x Radio Driver
//!
//! High-level driver for SX127x-family sub-GHz LoRa transceivers. The
//! driver owns the logical radio state, the tunable settings and the two
//! deadline timer slots, and enforces the mode-exclusivity rules on the
//! shared chip: exactly one operating state at a time, interrupt masks and
//! timeouts armed for exactly that state.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────┐
//! │   Application / network shim    │
//! ├─────────────────────────────────┤
//! │     Sx127x driver (this crate)  │
//! ├─────────────────────────────────┤
//! │  RegisterPort / DeadlineTimer   │
//! ├─────────────────────────────────┤
//! │   Platform transport & timers   │
//! └─────────────────────────────────┘
//! ```
//!
//! Commands arrive from the control context through `&mut self` methods;
//! hardware interrupt lines are latched through
//! [`raise_interrupt`](Sx127x::raise_interrupt) and serviced by
//! [`dispatch`](Sx127x::dispatch). Completion, failure and timeout
//! conditions are pushed upward through the registered [`Event`] callback;
//! the driver never enters an error-terminal state.

use log::{debug, warn};

use crate::error::DriverError;
use crate::radio::framer::PacketInfo;
use crate::radio::hal::{DeadlineTimer, RegisterPort};
use crate::radio::irq::PendingIrq;
use crate::radio::registers::{
    IrqFlags, OpMode, DIO0_MAPPING_MASK, DIO0_MAPPING_RX_DONE, DIO0_MAPPING_TX_DONE,
    INVERT_IQ2_OFF, INVERT_IQ2_ON, INVERT_IQ_RX, MODEM_CONFIG2_SYMB_TIMEOUT_MSB,
    OP_MODE_LONG_RANGE, OP_MODE_MASK, REG_DIO_MAPPING1, REG_LR_FIFO_ADDR_PTR,
    REG_LR_FIFO_RX_BASE_ADDR, REG_LR_HOP_PERIOD, REG_LR_INVERT_IQ, REG_LR_INVERT_IQ2,
    REG_LR_IRQ_FLAGS_MASK, REG_LR_MODEM_CONFIG2, REG_LR_SYMB_TIMEOUT_LSB, REG_OP_MODE,
    REG_VERSION,
};
use crate::radio::settings::{Modem, RadioSettings};

/// Logical radio operating states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioState {
    /// Lowest-power mode; the FIFO is inaccessible
    Sleep,
    /// Powered and configurable, modem idle
    Standby,
    /// A transmission is in flight
    Transmitting,
    /// Listening continuously
    Receiving,
    /// Listening for a single packet, then back to standby
    ReceivingSingle,
}

impl From<OpMode> for RadioState {
    /// Collapse the chip's raw operating modes onto the logical state
    /// model. Lossy by design: the synthesis modes map to the mode they
    /// work toward, both hardware receive variants map to the logical
    /// receive state, and a CAD scan reads as standby.
    fn from(mode: OpMode) -> Self {
        match mode {
            OpMode::Sleep => RadioState::Sleep,
            OpMode::Standby | OpMode::Cad => RadioState::Standby,
            OpMode::FsTx | OpMode::Tx => RadioState::Transmitting,
            OpMode::FsRx | OpMode::Rx | OpMode::RxSingle => RadioState::Receiving,
        }
    }
}

/// Application-commanded state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StateCommand {
    Sleep = 0,
    Standby = 1,
    /// Continuous listen: clears the symbol window bound, then receives
    Idle = 2,
    /// Receive with the configured window and deadline
    Rx = 3,
    /// Transmit whatever the FIFO holds (the send path stages it first)
    Tx = 4,
    /// Hardware reset sequence
    Reset = 5,
}

impl TryFrom<u8> for StateCommand {
    type Error = DriverError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(StateCommand::Sleep),
            1 => Ok(StateCommand::Standby),
            2 => Ok(StateCommand::Idle),
            3 => Ok(StateCommand::Rx),
            4 => Ok(StateCommand::Tx),
            5 => Ok(StateCommand::Reset),
            _ => Err(DriverError::Unsupported),
        }
    }
}

/// Upward signals consumed by the layer above the driver
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A transmission finished; the TX deadline has been disarmed
    TransmitComplete,
    /// A packet with a valid CRC arrived; the payload stays in the chip
    /// FIFO until drained with [`Sx127x::receive`]
    ReceiveComplete(PacketInfo),
    /// A packet arrived but failed its integrity check; no payload
    CrcError,
    /// A TX or RX deadline expired
    Timeout,
    /// Frequency hopping reached a hop boundary
    ChannelHop { channel: u8 },
    /// A channel activity detection scan finished
    CadDone { detected: bool },
}

type EventCallback = Box<dyn FnMut(Event) + Send>;

/// Driver aggregate for one physical transceiver.
///
/// All mutable radio state lives here (settings, logical state, timer
/// slots and the pending-interrupt latch), so independent simulated
/// devices can coexist in one test process.
///
/// ## Type parameters
///
/// * `P` - register/FIFO transport
/// * `T` - deadline timer slot implementation
pub struct Sx127x<P: RegisterPort, T: DeadlineTimer> {
    pub(crate) port: P,
    pub(crate) settings: RadioSettings,
    pub(crate) state: RadioState,
    pub(crate) tx_timer: T,
    pub(crate) rx_timer: T,
    pub(crate) pending: PendingIrq,
    pub(crate) callback: Option<EventCallback>,
}

impl<P: RegisterPort, T: DeadlineTimer> Sx127x<P, T> {
    /// Create a driver over an already-open port. The chip is not touched
    /// until [`init`](Self::init).
    pub fn new(port: P, tx_timer: T, rx_timer: T) -> Self {
        Self {
            port,
            settings: RadioSettings::default(),
            state: RadioState::Standby,
            tx_timer,
            rx_timer,
            pending: PendingIrq::new(),
            callback: None,
        }
    }

    /// Reset the chip, select the LoRa modem, program the default settings
    /// and leave the chip asleep. All driver state is volatile; `init`
    /// rebuilds it from defaults.
    pub fn init(&mut self) -> Result<(), DriverError> {
        debug!("initializing radio");
        self.settings = RadioSettings::default();
        self.reset()?;

        // Modem selection is only legal in sleep mode.
        self.write_op_mode(OpMode::Sleep)?;
        let op = self.port.read(REG_OP_MODE)?;
        self.port.write(REG_OP_MODE, op | OP_MODE_LONG_RANGE)?;

        self.apply_settings()?;
        self.set_sleep()?;
        debug!("radio initialization done");
        Ok(())
    }

    /// Register the upward event callback
    pub fn set_event_callback(&mut self, callback: impl FnMut(Event) + Send + 'static) {
        self.callback = Some(Box::new(callback));
    }

    pub(crate) fn emit(&mut self, event: Event) {
        debug!("event: {event:?}");
        if let Some(cb) = self.callback.as_mut() {
            cb(event);
        }
    }

    // ====================== commanded transitions ======================

    /// Execute an application-commanded state transition
    pub fn set_state(&mut self, command: StateCommand) -> Result<(), DriverError> {
        debug!("set_state {command:?} (from {:?})", self.state);
        match command {
            StateCommand::Sleep => self.set_sleep(),
            StateCommand::Standby => self.set_standby(),
            StateCommand::Idle => {
                // Permanent listening: unbounded symbol window.
                self.settings.window_timeout = 0;
                self.set_rx()
            }
            StateCommand::Rx => self.set_rx(),
            StateCommand::Tx => {
                if self.state == RadioState::Transmitting {
                    warn!("cannot enter tx: transmission already running");
                    return Err(DriverError::Busy);
                }
                self.set_tx()
            }
            StateCommand::Reset => self.reset(),
        }
    }

    /// Current logical state, derived from the chip's raw operating mode
    pub fn state(&mut self) -> Result<RadioState, DriverError> {
        Ok(self.op_mode()?.into())
    }

    /// Enter the lowest-power mode; both deadlines are disarmed
    pub fn set_sleep(&mut self) -> Result<(), DriverError> {
        self.tx_timer.cancel();
        self.rx_timer.cancel();
        self.state = RadioState::Sleep;
        self.write_op_mode(OpMode::Sleep)
    }

    /// Enter standby. Leaving an active mode disarms its deadline.
    pub fn set_standby(&mut self) -> Result<(), DriverError> {
        self.tx_timer.cancel();
        self.rx_timer.cancel();
        self.state = RadioState::Standby;
        self.write_op_mode(OpMode::Standby)
    }

    /// Arm the receiver: IQ polarity, RX interrupt mask, hop period,
    /// symbol window, FIFO pointers, RX deadline, then the mode command.
    pub fn set_rx(&mut self) -> Result<(), DriverError> {
        match self.settings.modem {
            Modem::Fsk => return Err(DriverError::Unsupported),
            Modem::LoRa => {}
        }

        let iq = self.port.read(REG_LR_INVERT_IQ)?;
        if self.settings.iq_invert {
            self.port.write(REG_LR_INVERT_IQ, iq | INVERT_IQ_RX)?;
            self.port.write(REG_LR_INVERT_IQ2, INVERT_IQ2_ON)?;
        } else {
            self.port.write(REG_LR_INVERT_IQ, iq & !INVERT_IQ_RX)?;
            self.port.write(REG_LR_INVERT_IQ2, INVERT_IQ2_OFF)?;
        }

        // Transmit-side sources stay masked while receiving.
        let masked = IrqFlags::TX_DONE | IrqFlags::CAD_DONE | IrqFlags::CAD_DETECTED;
        self.port.write(REG_LR_IRQ_FLAGS_MASK, masked.bits())?;

        let dio = self.port.read(REG_DIO_MAPPING1)?;
        self.port.write(
            REG_DIO_MAPPING1,
            (dio & DIO0_MAPPING_MASK) | DIO0_MAPPING_RX_DONE,
        )?;

        if self.settings.frequency_hopping {
            self.port
                .write(REG_LR_HOP_PERIOD, self.settings.hop_period)?;
        }

        let window = self.settings.window_timeout;
        let cfg2 = self.port.read(REG_LR_MODEM_CONFIG2)?;
        self.port.write(
            REG_LR_MODEM_CONFIG2,
            (cfg2 & !MODEM_CONFIG2_SYMB_TIMEOUT_MSB) | ((window >> 8) as u8 & 0x03),
        )?;
        self.port.write(REG_LR_SYMB_TIMEOUT_LSB, window as u8)?;

        // Whole FIFO dedicated to receive.
        self.port.write(REG_LR_FIFO_RX_BASE_ADDR, 0x00)?;
        self.port.write(REG_LR_FIFO_ADDR_PTR, 0x00)?;

        if !self.settings.rx_timeout.is_zero() {
            self.rx_timer.arm(self.settings.rx_timeout);
        }

        if self.settings.rx_single {
            self.state = RadioState::ReceivingSingle;
            self.write_op_mode(OpMode::RxSingle)?;
        } else {
            self.state = RadioState::Receiving;
            self.write_op_mode(OpMode::Rx)?;
        }
        debug!("receiver armed ({:?})", self.state);
        Ok(())
    }

    /// Mask/arm/transition tail of the transmit sequence. [`send`]
    /// (Sx127x::send) stages the FIFO first and then runs this; the
    /// ordering of the three steps is significant under interrupt
    /// preemption and must not change.
    pub fn set_tx(&mut self) -> Result<(), DriverError> {
        match self.settings.modem {
            Modem::Fsk => return Err(DriverError::Unsupported),
            Modem::LoRa => {}
        }

        // Only the transmit-complete source is unmasked.
        let masked = IrqFlags::RX_TIMEOUT
            | IrqFlags::RX_DONE
            | IrqFlags::PAYLOAD_CRC_ERROR
            | IrqFlags::VALID_HEADER
            | IrqFlags::CAD_DONE
            | IrqFlags::FHSS_CHANGE_CHANNEL
            | IrqFlags::CAD_DETECTED;
        self.port.write(REG_LR_IRQ_FLAGS_MASK, masked.bits())?;

        let dio = self.port.read(REG_DIO_MAPPING1)?;
        self.port.write(
            REG_DIO_MAPPING1,
            (dio & DIO0_MAPPING_MASK) | DIO0_MAPPING_TX_DONE,
        )?;

        self.tx_timer.arm(self.settings.tx_timeout);
        self.state = RadioState::Transmitting;
        self.write_op_mode(OpMode::Tx)
    }

    /// Pulse the hardware reset line; the chip comes back in standby with
    /// power-on register defaults. Settings are only re-applied by
    /// [`init`](Self::init).
    pub fn reset(&mut self) -> Result<(), DriverError> {
        self.tx_timer.cancel();
        self.rx_timer.cancel();
        self.port.reset()?;
        self.state = RadioState::Standby;
        Ok(())
    }

    // ====================== deadline expiry entry points ======================

    /// TX deadline fired: back to standby, signal upward
    pub fn on_tx_timeout(&mut self) -> Result<(), DriverError> {
        warn!("tx deadline expired");
        self.tx_timer.cancel();
        self.set_standby()?;
        self.emit(Event::Timeout);
        Ok(())
    }

    /// RX deadline fired: back to standby unless the receiver is
    /// continuous, signal upward
    pub fn on_rx_timeout(&mut self) -> Result<(), DriverError> {
        warn!("rx deadline expired");
        self.rx_timer.cancel();
        if !self.settings.continuous_receive() {
            self.set_standby()?;
        }
        self.emit(Event::Timeout);
        Ok(())
    }

    // ====================== helpers & accessors ======================

    pub(crate) fn op_mode(&mut self) -> Result<OpMode, DriverError> {
        let raw = self.port.read(REG_OP_MODE)? & OP_MODE_MASK;
        OpMode::try_from(raw)
    }

    pub(crate) fn write_op_mode(&mut self, mode: OpMode) -> Result<(), DriverError> {
        let op = self.port.read(REG_OP_MODE)?;
        self.port
            .write(REG_OP_MODE, (op & !OP_MODE_MASK) | mode as u8)?;
        Ok(())
    }

    /// Silicon revision register
    pub fn version(&mut self) -> Result<u8, DriverError> {
        Ok(self.port.read(REG_VERSION)?)
    }

    pub fn settings(&self) -> &RadioSettings {
        &self.settings
    }

    /// Logical state as last commanded or observed; [`state`](Self::state)
    /// asks the chip instead
    pub fn tracked_state(&self) -> RadioState {
        self.state
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn tx_timer(&self) -> &T {
        &self.tx_timer
    }

    pub fn rx_timer(&self) -> &T {
        &self.rx_timer
    }
}
