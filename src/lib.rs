//! # sx127x-rs
//!
//! Host-side driver core for SX127x-family sub-GHz LoRa transceivers:
//! a half-duplex packet radio state machine over a register/FIFO port,
//! with validated runtime configuration, link-quality metrics and
//! interrupt-driven completion events.
//!
//! ## Features
//!
//! - **State machine**: sleep / standby / transmit / receive (continuous
//!   and single-shot) with deadline timers armed per mode
//! - **Packet framing**: scatter-gather send and zero-copy drain over the
//!   256-byte chip FIFO, with probe and retry-on-short-buffer paths
//! - **Link quality**: per-packet RSSI and SNR, plus AN1200.13 airtime
//!   math for duty-cycle budgeting
//! - **Interrupt dispatch**: lock-free single-slot latch between the
//!   hardware lines and the control context
//! - **Option surface**: validated typed setters with register
//!   write-through, mirrored by a uniform key/value interface
//!
//! ## Quick Start
//!
//! ```rust
//! use sx127x_rs::{ManualTimer, MemoryPort, Sx127x};
//!
//! let mut radio = Sx127x::new(MemoryPort::new(), ManualTimer::new(), ManualTimer::new());
//! radio.init()?;
//! radio.send(&[b"hello".as_slice()])?;
//! # Ok::<(), sx127x_rs::DriverError>(())
//! ```
//!
//! The driver is transport-agnostic: implement
//! [`RegisterPort`](radio::hal::RegisterPort) for a real SPI bus and
//! [`DeadlineTimer`](radio::hal::DeadlineTimer) for the platform timer to
//! drive actual hardware. [`MemoryPort`](radio::hal::MemoryPort) is a
//! register-accurate in-memory stand-in used throughout the test suite.

pub mod error;
pub mod logging;
pub mod radio;

pub use error::DriverError;
pub use radio::{
    Bandwidth, CodingRate, DeadlineTimer, Event, InterruptSource, ManualTimer, MemoryPort, Modem,
    Opt, OptValue, PacketInfo, PortError, PortOp, RadioSettings, RadioState, RegisterPort,
    SpreadingFactor, StateCommand, Sx127x,
};
