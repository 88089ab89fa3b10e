//! # Driver Error Handling
//!
//! This module defines the [`DriverError`] enum covering every failure the
//! driver core can report to a caller. Hardware-detected conditions (CRC
//! failure, timeout) are not errors at this level: they are surfaced as
//! [`Event`](crate::radio::driver::Event) signals and the driver always
//! settles into a well-defined next state.

use thiserror::Error;

use crate::radio::hal::PortError;

/// Represents the different error types that can occur in the driver core.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The operation conflicts with the current mode, e.g. a send issued
    /// while a transmission is already running. Retry once the current
    /// operation signals completion.
    #[error("radio busy")]
    Busy,

    /// The requested mode, modem path or raw discriminant is not
    /// implemented.
    #[error("operation or mode not supported")]
    Unsupported,

    /// A configuration value fell outside its validated range. Neither the
    /// cached settings nor any chip register were touched.
    #[error("invalid argument")]
    InvalidArgument,

    /// The received packet does not fit the caller's buffer; the payload is
    /// left uncommitted in the chip FIFO and can be fetched with a larger
    /// buffer.
    #[error("receive buffer too small: packet is {len} bytes, capacity {capacity}")]
    BufferTooSmall { len: usize, capacity: usize },

    /// An operation was invoked without a bound device context.
    #[error("no device bound")]
    NoDevice,

    /// Register bus failure propagated from the port layer.
    #[error("port error: {0}")]
    Port(#[from] PortError),
}
