//! LoRa link-quality and airtime math derived from raw register values.

use std::time::Duration;

use crate::radio::registers::{MID_BAND_THRESHOLD_HZ, RSSI_OFFSET_HF, RSSI_OFFSET_LF};
use crate::radio::settings::RadioSettings;

/// Decode the packet SNR register (quarter-dB, two's complement) into whole
/// dB, rounding toward negative infinity.
///
/// The negative branch masks the negated magnitude to the register's seven
/// magnitude bits, so the reserved extreme 0x80 decodes to 0 rather than an
/// out-of-scale value.
pub fn snr_from_raw(raw: u8) -> i8 {
    if raw & 0x80 != 0 {
        -(((((!raw).wrapping_add(1)) & 0x7F) >> 2) as i8)
    } else {
        (raw >> 2) as i8
    }
}

/// Derive the packet RSSI estimate in dBm from the raw register value.
///
/// The offset is selected by the carrier band (HF above the mid-band
/// threshold), a sixteenth of the raw value corrects the detector slope,
/// and in the negative-SNR regime the SNR is folded in as well.
pub fn rssi_from_raw(raw: u8, snr: i8, channel_hz: u32) -> i16 {
    let offset = if channel_hz > MID_BAND_THRESHOLD_HZ {
        RSSI_OFFSET_HF
    } else {
        RSSI_OFFSET_LF
    };
    let raw = raw as i16;
    let mut rssi = offset + raw + (raw >> 4);
    if snr < 0 {
        rssi += snr as i16;
    }
    rssi
}

/// Duration of one LoRa symbol: `2^SF / BW`
pub fn symbol_duration(settings: &RadioSettings) -> Duration {
    let secs = f64::from(1u32 << settings.spreading_factor.chips_exp())
        / settings.bandwidth.hz() as f64;
    Duration::from_secs_f64(secs)
}

/// Estimated time on air for a payload of `payload_len` bytes under the
/// current modulation settings (datasheet airtime formula: preamble plus
/// coded payload symbols).
pub fn time_on_air(settings: &RadioSettings, payload_len: usize) -> Duration {
    let sf = settings.spreading_factor.chips_exp() as f64;
    let ts = f64::from(1u32 << settings.spreading_factor.chips_exp())
        / settings.bandwidth.hz() as f64;

    let t_preamble = (f64::from(settings.preamble_length) + 4.25) * ts;

    let de = if settings.low_data_rate_optimize() { 1.0 } else { 0.0 };
    let ih = if settings.fixed_header_mode { 1.0 } else { 0.0 };
    let crc = if settings.crc_enabled { 1.0 } else { 0.0 };

    let numerator = 8.0 * payload_len as f64 - 4.0 * sf + 28.0 + 16.0 * crc - 20.0 * ih;
    let denominator = 4.0 * (sf - 2.0 * de);
    let coded = (numerator / denominator).ceil()
        * (settings.coding_rate.parity_symbols() as f64 + 4.0);
    let payload_symbols = 8.0 + coded.max(0.0);

    Duration::from_secs_f64(t_preamble + payload_symbols * ts)
}

#[cfg(test)]
#[path = "params_tests.rs"]
mod tests;
