//! Logging initialization helpers.

/// Initializes the logger with the `env_logger` crate.
///
/// Filtering is controlled through the `RUST_LOG` environment variable as
/// usual, e.g. `RUST_LOG=sx127x_rs=debug`.
pub fn init_logger() {
    env_logger::init();
}
