//! Shared fixtures for root integration tests.

#![allow(dead_code)]

use std::io::Write;

use chrono::{NaiveDate, NaiveDateTime};
use tempfile::NamedTempFile;
use tstot_probe::synth::Broadcast;

/// Frames in the end-to-end recording.
pub const E2E_FRAMES: u32 = 53_657;

/// Trim calls of the end-to-end editing script.
pub const E2E_SCRIPT: &str = "LWLibavVideoSource(\"rec.ts\")\n\
    Trim(193,3188) ++ Trim(4988,22040) ++ Trim(23839,46345) ++ Trim(48145,48743)\n";

/// Broadcast start used by every fixture.
pub fn broadcast_start() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2022, 12, 14)
        .unwrap()
        .and_hms_opt(19, 0, 0)
        .unwrap()
}

/// Write a synthetic 29.97 fps recording to a temp file.
pub fn recording(frames: u32) -> NamedTempFile {
    write_temp(".ts", &Broadcast::new(frames, broadcast_start()).to_bytes())
}

pub fn script(contents: &str) -> NamedTempFile {
    write_temp(".avs", contents.as_bytes())
}

pub fn write_temp(suffix: &str, bytes: &[u8]) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}
