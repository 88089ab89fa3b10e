//! SX127x radio subsystem: register map, transport traits, driver state
//! machine, FIFO framing, interrupt dispatch and the runtime option
//! surface.

pub mod config;
pub mod driver;
pub mod framer;
pub mod hal;
pub mod irq;
pub mod params;
pub mod registers;
pub mod settings;

pub use config::{Opt, OptValue};
pub use driver::{Event, RadioState, StateCommand, Sx127x};
pub use framer::PacketInfo;
pub use hal::{DeadlineTimer, ManualTimer, MemoryPort, PortError, PortOp, RegisterPort};
pub use irq::{InterruptSource, PendingIrq};
pub use params::{rssi_from_raw, snr_from_raw, symbol_duration, time_on_air};
pub use registers::{IrqFlags, OpMode};
pub use settings::{Bandwidth, CodingRate, Modem, RadioSettings, SpreadingFactor};
