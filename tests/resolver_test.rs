//! End-to-end resolution over synthetic recordings.

mod common;

use chrono::TimeDelta;
use common::{broadcast_start, recording, script, E2E_FRAMES, E2E_SCRIPT};
use tstot::config::Config;
use tstot::{analyze, Error};
use tstot_probe::synth::Broadcast;
use tstot_probe::ProbeError;

/// Four trim ranges over a 29.97 fps broadcast with a TOT every 5 seconds.
#[test]
fn test_four_segment_broadcast() {
    let ts = recording(E2E_FRAMES);
    let avs = script(E2E_SCRIPT);

    let report = analyze(ts.path(), Some(avs.path()), &Config::default()).unwrap();

    assert_eq!(report.video_pid, 0x0100);
    assert_eq!(report.total_frames, E2E_FRAMES);
    assert_eq!(report.sid, Some(0x0400));
    assert_eq!(report.segments.len(), 4);

    let frames: Vec<_> = report.segments.iter().map(|s| s.frames).collect();
    assert_eq!(
        frames,
        vec![(193, 3188), (4988, 22040), (23839, 46345), (48145, 48743)]
    );

    let durations: Vec<_> = report
        .segments
        .iter()
        .map(|s| s.duration_seconds)
        .collect();
    assert_eq!(durations, vec![100, 570, 750, 20]);

    let indices: Vec<_> = report.segments.iter().map(|s| s.index).collect();
    assert_eq!(indices, vec![1, 2, 3, 4]);

    // each boundary maps to the first TOT broadcast after that frame
    let first = &report.segments[0];
    assert_eq!(first.start_time, broadcast_start() + TimeDelta::seconds(10));
    assert_eq!(first.end_time, broadcast_start() + TimeDelta::seconds(110));
    let last = &report.segments[3];
    assert_eq!(last.start_time, broadcast_start() + TimeDelta::seconds(1610));
    assert_eq!(last.end_time, broadcast_start() + TimeDelta::seconds(1630));
}

/// Same inputs produce byte-identical JSON.
#[test]
fn test_json_report_is_deterministic() {
    let ts = recording(3000);
    let avs = script("Trim(10,1000)Trim(1200,2500)");
    let config = Config::default();

    let first = analyze(ts.path(), Some(avs.path()), &config)
        .unwrap()
        .to_json()
        .unwrap();
    let second = analyze(ts.path(), Some(avs.path()), &config)
        .unwrap()
        .to_json()
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_range_ending_at_total_frames_is_rejected() {
    let ts = recording(600);
    let avs = script("Trim(0,100) Trim(100,600)");

    let err = analyze(ts.path(), Some(avs.path()), &Config::default()).unwrap_err();
    assert!(matches!(
        err,
        Error::FrameRangeOutOfBounds {
            start: 100,
            end: 600,
            total_frames: 600
        }
    ));
    assert!(err.to_string().contains("600 frames"));
}

/// A frame past the last TOT of the recording cannot be timed.
#[test]
fn test_frame_without_following_tot() {
    let ts = recording(600);
    let avs = script("Trim(10,590)");

    let err = analyze(ts.path(), Some(avs.path()), &Config::default()).unwrap_err();
    match err {
        Error::TotSearchFailed { frame, source } => {
            assert_eq!(frame, 590);
            assert!(matches!(source, ProbeError::TotNotFound { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

/// A window shorter than the TOT spacing misses TOTs that are present.
#[test]
fn test_small_window_fails() {
    let ts = recording(600);
    let avs = script("Trim(10,20)");
    let mut config = Config::default();
    config.search.window_packets = 8;

    let err = analyze(ts.path(), Some(avs.path()), &config).unwrap_err();
    assert!(matches!(err, Error::TotSearchFailed { frame: 10, .. }));
}

#[test]
fn test_script_without_trims_gives_empty_report() {
    let ts = recording(300);
    let avs = script("return last\n");

    let report = analyze(ts.path(), Some(avs.path()), &Config::default()).unwrap();
    assert!(report.segments.is_empty());
    assert_eq!(report.total_frames, 300);
}

/// Without a script the recording is one segment ending on its last frame.
#[test]
fn test_full_recording_without_script() {
    // frame 898 is at 29.96s; a closing TOT for 19:00:30 follows it
    let mut w = Broadcast::new(899, broadcast_start()).write();
    w.tot(broadcast_start() + TimeDelta::seconds(30));
    let ts = common::write_temp(".ts", w.bytes());

    let report = analyze(ts.path(), None, &Config::default()).unwrap();
    assert!(report.script_file.is_none());
    assert_eq!(report.segments.len(), 1);

    let segment = &report.segments[0];
    assert_eq!(segment.frames, (0, 898));
    assert_eq!(segment.start_time, broadcast_start() + TimeDelta::seconds(5));
    assert_eq!(segment.end_time, broadcast_start() + TimeDelta::seconds(30));
    assert_eq!(segment.duration_seconds, 25);
}

#[test]
fn test_interpolation_from_config() {
    let ts = recording(1200);
    let avs = script("Trim(193,449)");
    let mut config = Config::default();
    config.report.interpolate = true;

    let report = analyze(ts.path(), Some(avs.path()), &config).unwrap();
    let precise = report.segments[0].precise.as_ref().unwrap();
    assert_eq!(precise.duration_millis, 8570);

    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(
        json["segments"][0]["precise"]["start_time"],
        "2022-12-14 19:00:06.463"
    );
    // the end is timed at frame 450, one frame past the 19:00:15 TOT
    assert_eq!(
        json["segments"][0]["precise"]["end_time"],
        "2022-12-14 19:00:15.033"
    );
}

#[test]
fn test_not_a_transport_stream() {
    let file = common::write_temp(".ts", &[0u8; 188 * 10]);
    let err = analyze(file.path(), None, &Config::default()).unwrap_err();
    assert!(matches!(
        err,
        Error::Probe(ProbeError::InvalidContainerFormat { .. })
    ));
}
