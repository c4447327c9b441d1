//! Modified Julian Date + BCD time decoding (ETSI EN 300 468 Annex C)
//!
//! The Annex C formulas are written with decimal constants
//! (`15078.2`, `365.25`, `30.6001`). Here they are scaled to integers so the
//! conversion is exact; every division is a floor division.

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{ProbeError, Result};

/// MJD of 1858-11-17, the epoch day.
const MJD_EPOCH: (i32, u32, u32) = (1858, 11, 17);

/// Decode a single BCD byte into its two-digit value.
///
/// Returns `None` if either nibble is not a decimal digit.
pub fn decode_bcd(byte: u8) -> Option<u8> {
    let high = byte >> 4;
    let low = byte & 0x0F;
    if high > 9 || low > 9 {
        return None;
    }
    Some(high * 10 + low)
}

/// Encode a value in `0..100` as a BCD byte.
pub fn encode_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

/// Convert an MJD day number to a calendar date `(year, month, day)`.
fn mjd_to_ymd(mjd: u16) -> (i64, i64, i64) {
    let mjd = mjd as i64;

    // y' = floor((mjd - 15078.2) / 365.25)
    let y_prime = (20 * mjd - 301_564).div_euclid(7305);
    // floor(y' * 365.25)
    let year_days = (1461 * y_prime).div_euclid(4);
    // m' = floor((mjd - 14956.1 - floor(y' * 365.25)) / 30.6001)
    let m_prime = ((10 * (mjd - year_days) - 149_561) * 1000).div_euclid(306_001);
    // floor(m' * 30.6001)
    let month_days = (306_001 * m_prime).div_euclid(10_000);

    let day = mjd - 14_956 - year_days - month_days;
    let k = if m_prime == 14 || m_prime == 15 { 1 } else { 0 };

    (y_prime + k + 1900, m_prime - 1 - k * 12, day)
}

/// Decode a 16-bit MJD plus 3-byte BCD `HHMMSS` into a broadcast-local date-time.
///
/// No timezone arithmetic is applied: ARIB time tables already carry local
/// civil time.
pub fn decode(mjd: u16, bcd_time: [u8; 3]) -> Result<NaiveDateTime> {
    let invalid = || ProbeError::InvalidTimeEncoding { mjd, bcd: bcd_time };

    let hour = decode_bcd(bcd_time[0]).ok_or_else(invalid)?;
    let minute = decode_bcd(bcd_time[1]).ok_or_else(invalid)?;
    let second = decode_bcd(bcd_time[2]).ok_or_else(invalid)?;

    if hour > 23 || minute > 59 || second > 59 {
        return Err(invalid());
    }

    let (year, month, day) = mjd_to_ymd(mjd);
    let date = match (i32::try_from(year), u32::try_from(month), u32::try_from(day)) {
        (Ok(y), Ok(m), Ok(d)) => NaiveDate::from_ymd_opt(y, m, d),
        _ => None,
    }
    .ok_or_else(invalid)?;

    date.and_hms_opt(hour as u32, minute as u32, second as u32)
        .ok_or_else(invalid)
}

/// Convert a calendar date back to its MJD day number.
///
/// Returns `None` for dates outside the 16-bit MJD range.
pub fn to_mjd(date: NaiveDate) -> Option<u16> {
    let (y, m, d) = MJD_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?;
    u16::try_from(date.signed_duration_since(epoch).num_days()).ok()
}
