//! Tests for SNR/RSSI decoding and the airtime estimate.

use std::time::Duration;

use crate::radio::params::{rssi_from_raw, snr_from_raw, symbol_duration, time_on_air};
use crate::radio::registers::{MID_BAND_THRESHOLD_HZ, RSSI_OFFSET_HF, RSSI_OFFSET_LF};
use crate::radio::settings::{Bandwidth, CodingRate, RadioSettings, SpreadingFactor};

#[test]
fn snr_sign_handling() {
    assert_eq!(snr_from_raw(0x80), 0);
    assert_eq!(snr_from_raw(0x04), 1);
    assert_eq!(snr_from_raw(0xFC), -1);
    // +10 dB and -10 dB in quarter-dB steps
    assert_eq!(snr_from_raw(40), 10);
    assert_eq!(snr_from_raw(0xD8), -10);
    assert_eq!(snr_from_raw(0), 0);
}

#[test]
fn rssi_band_selection_switches_at_threshold() {
    let raw = 100u8;
    let at = rssi_from_raw(raw, 0, MID_BAND_THRESHOLD_HZ);
    let above = rssi_from_raw(raw, 0, MID_BAND_THRESHOLD_HZ + 1);
    assert_eq!(at, RSSI_OFFSET_LF + 100 + (100 >> 4));
    assert_eq!(above, RSSI_OFFSET_HF + 100 + (100 >> 4));
    assert_eq!(above - at, RSSI_OFFSET_HF - RSSI_OFFSET_LF);
}

#[test]
fn rssi_snr_correction_applies_only_when_negative() {
    let raw = 64u8;
    let base = rssi_from_raw(raw, 0, 868_300_000);
    assert_eq!(rssi_from_raw(raw, 5, 868_300_000), base);
    assert_eq!(rssi_from_raw(raw, -5, 868_300_000), base - 5);
}

#[test]
fn symbol_duration_sf7_bw125() {
    let settings = RadioSettings::default();
    let ts = symbol_duration(&settings);
    assert_eq!(ts.as_micros(), 1024);
}

#[test]
fn airtime_matches_datasheet_example() {
    // SF7 / BW125 / CR4-5, 8-symbol preamble, CRC on, explicit header,
    // one payload byte: 12.25 preamble symbols + 13 payload symbols at
    // 1.024 ms each.
    let settings = RadioSettings::default();
    let toa = time_on_air(&settings, 1);
    let expected = Duration::from_secs_f64((12.25 + 13.0) * 0.001024);
    let delta = toa.as_micros() as i64 - expected.as_micros() as i64;
    assert!(delta.abs() <= 1, "got {toa:?}, expected {expected:?}");
}

#[test]
fn airtime_grows_with_payload_and_spreading_factor() {
    let mut settings = RadioSettings::default();
    let short = time_on_air(&settings, 8);
    let long = time_on_air(&settings, 64);
    assert!(long > short);

    settings.spreading_factor = SpreadingFactor::Sf12;
    assert!(time_on_air(&settings, 8) > short);
}

#[test]
fn airtime_accounts_for_ldro_and_coding_rate() {
    let mut settings = RadioSettings {
        spreading_factor: SpreadingFactor::Sf12,
        bandwidth: Bandwidth::Bw125,
        ..RadioSettings::default()
    };
    assert!(settings.low_data_rate_optimize());
    let cr45 = time_on_air(&settings, 32);

    settings.coding_rate = CodingRate::Cr4_8;
    let cr48 = time_on_air(&settings, 32);
    assert!(cr48 > cr45);
}
