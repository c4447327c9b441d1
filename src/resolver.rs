//! Segment resolution: trim ranges to broadcast time.
//!
//! Each boundary frame's packet position seeds a bounded forward TOT search.
//! Ranges are resolved in input order and the first failure aborts the run.

use std::io::{Read, Seek};

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;
use tstot_probe::pes::{self, CLOCK_90KHZ};
use tstot_probe::{
    FrameEntry, ProbeError, TotLocator, TotRecord, TsReader, VideoIndex, DEFAULT_SEARCH_WINDOW,
};
use tstot_script::TrimRange;

use crate::error::{Error, Result};
use crate::format;

/// Options controlling TOT lookup for each segment boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Packets scanned forward from a boundary frame.
    pub window: u64,
    /// Require a valid CRC on TOT sections.
    pub verify_crc: bool,
    /// Compute PTS-interpolated millisecond timing as well.
    pub interpolate: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            window: DEFAULT_SEARCH_WINDOW,
            verify_crc: true,
            interpolate: false,
        }
    }
}

impl ResolveOptions {
    fn locator(&self, video_pid: u16) -> TotLocator {
        let locator = TotLocator::new()
            .window(self.window)
            .verify_crc(self.verify_crc);
        if self.interpolate {
            locator.track_video_pid(video_pid)
        } else {
            locator
        }
    }
}

/// Boundary times corrected by the PTS distance to the TOT.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreciseTiming {
    #[serde(serialize_with = "format::serialize_millis")]
    pub start_time: NaiveDateTime,
    #[serde(serialize_with = "format::serialize_millis")]
    pub end_time: NaiveDateTime,
    pub duration_millis: i64,
}

/// Broadcast time of one trim range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SegmentResult {
    /// 1-based position of the range in the script.
    pub index: u32,
    pub frames: (u32, u32),
    #[serde(serialize_with = "format::serialize_seconds")]
    pub start_time: NaiveDateTime,
    #[serde(serialize_with = "format::serialize_seconds")]
    pub end_time: NaiveDateTime,
    /// `end_time - start_time`; negative only when the TOT data is inconsistent.
    pub duration_seconds: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precise: Option<PreciseTiming>,
}

/// The whole recording as a single range.
pub fn implicit_full_range(index: &VideoIndex) -> TrimRange {
    TrimRange::new(0, index.total_frames().saturating_sub(1))
}

/// Resolve every trim range against the index.
pub fn resolve<R: Read + Seek>(
    reader: &mut TsReader<R>,
    index: &VideoIndex,
    ranges: &[TrimRange],
    options: &ResolveOptions,
) -> Result<Vec<SegmentResult>> {
    let locator = options.locator(index.video_pid);
    let mut segments = Vec::with_capacity(ranges.len());

    for (position, range) in ranges.iter().enumerate() {
        let segment = resolve_segment(
            reader,
            index,
            &locator,
            position as u32 + 1,
            *range,
            options.interpolate,
        )?;
        tracing::debug!(
            "Segment {} {}: {} -> {} ({}s)",
            segment.index,
            range,
            segment.start_time,
            segment.end_time,
            segment.duration_seconds
        );
        segments.push(segment);
    }

    Ok(segments)
}

fn resolve_segment<R: Read + Seek>(
    reader: &mut TsReader<R>,
    index: &VideoIndex,
    locator: &TotLocator,
    position: u32,
    range: TrimRange,
    interpolate: bool,
) -> Result<SegmentResult> {
    if range.is_inverted() {
        return Err(Error::InvertedTrimRange {
            start: range.start_frame,
            end: range.end_frame,
        });
    }

    let (Some(start), Some(end)) = (index.get(range.start_frame), index.get(range.end_frame))
    else {
        return Err(Error::FrameRangeOutOfBounds {
            start: range.start_frame,
            end: range.end_frame,
            total_frames: index.total_frames(),
        });
    };

    let start_tot = locate(reader, locator, start)?;
    let end_tot = locate(reader, locator, end)?;

    let duration_seconds = (end_tot.decoded - start_tot.decoded).num_seconds();
    if duration_seconds < 0 {
        tracing::warn!(
            "Segment {} {} has negative duration ({}s): TOT at packet {} precedes TOT at packet {}",
            position,
            range,
            duration_seconds,
            end_tot.packet_index,
            start_tot.packet_index
        );
    }

    // the end is timed at the frame after the range so the duration spans the
    // last frame; the final frame of the recording stands in for itself
    let precise = interpolate.then(|| {
        let after_end = index.get(range.end_frame.saturating_add(1)).unwrap_or(end);
        let start_time = frame_time(start, &start_tot);
        let end_time = frame_time(after_end, &end_tot);
        PreciseTiming {
            start_time,
            end_time,
            duration_millis: (end_time - start_time).num_milliseconds(),
        }
    });

    Ok(SegmentResult {
        index: position,
        frames: (range.start_frame, range.end_frame),
        start_time: start_tot.decoded,
        end_time: end_tot.decoded,
        duration_seconds,
        precise,
    })
}

fn locate<R: Read + Seek>(
    reader: &mut TsReader<R>,
    locator: &TotLocator,
    frame: &FrameEntry,
) -> Result<TotRecord> {
    locator
        .locate(reader, frame.packet_index)
        .map_err(|e| match e {
            ProbeError::TotNotFound { .. } => Error::TotSearchFailed {
                frame: frame.frame_number,
                source: e,
            },
            other => other.into(),
        })
}

/// TOT time shifted by the signed PTS offset from the last video PES before
/// the TOT to the frame, rounded to the nearest millisecond.
fn frame_time(frame: &FrameEntry, tot: &TotRecord) -> NaiveDateTime {
    let anchor = tot.anchor_pts.unwrap_or(frame.pts);
    let scaled = pes::pts_offset(frame.pts, anchor) * 1000;
    let clock = CLOCK_90KHZ as i64;
    let millis = if scaled < 0 {
        -((-scaled + clock / 2) / clock)
    } else {
        (scaled + clock / 2) / clock
    };
    tot.decoded + TimeDelta::milliseconds(millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Cursor;
    use tstot_probe::synth::{Broadcast, StreamWriter};
    use tstot_probe::{build_index, IndexOptions};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2022, 12, 14)
            .unwrap()
            .and_hms_opt(19, 0, 0)
            .unwrap()
    }

    fn open(bytes: Vec<u8>) -> (TsReader<Cursor<Vec<u8>>>, VideoIndex) {
        let mut ts = TsReader::new(Cursor::new(bytes)).unwrap();
        let index = build_index(&mut ts, &IndexOptions::default()).unwrap();
        (ts, index)
    }

    #[test]
    fn test_segment_times_and_duration() {
        let (mut ts, index) = open(Broadcast::new(1200, start()).to_bytes());
        let segments = resolve(
            &mut ts,
            &index,
            &[TrimRange::new(193, 600), TrimRange::new(0, 0)],
            &ResolveOptions::default(),
        )
        .unwrap();

        assert_eq!(segments.len(), 2);
        // frame 193 is at 6.44s, frame 600 at 20.02s
        assert_eq!(segments[0].index, 1);
        assert_eq!(segments[0].frames, (193, 600));
        assert_eq!(segments[0].start_time, start() + TimeDelta::seconds(10));
        assert_eq!(segments[0].end_time, start() + TimeDelta::seconds(25));
        assert_eq!(segments[0].duration_seconds, 15);
        assert!(segments[0].precise.is_none());

        // the 19:00:00 TOT precedes frame 0, so the search lands on 19:00:05
        assert_eq!(segments[1].index, 2);
        assert_eq!(segments[1].start_time, start() + TimeDelta::seconds(5));
        assert_eq!(segments[1].duration_seconds, 0);
    }

    #[test]
    fn test_inverted_range() {
        let (mut ts, index) = open(Broadcast::new(100, start()).to_bytes());
        let err = resolve(
            &mut ts,
            &index,
            &[TrimRange::new(50, 10)],
            &ResolveOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvertedTrimRange { start: 50, end: 10 }));
    }

    #[test]
    fn test_end_equal_to_total_is_out_of_bounds() {
        // the first range resolves against the 19:00:05 TOT before the second fails
        let (mut ts, index) = open(Broadcast::new(200, start()).to_bytes());
        let err = resolve(
            &mut ts,
            &index,
            &[TrimRange::new(0, 100), TrimRange::new(100, 200)],
            &ResolveOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::FrameRangeOutOfBounds {
                start: 100,
                end: 200,
                total_frames: 200
            }
        ));
    }

    #[test]
    fn test_missing_tot_names_frame() {
        // TOTs only up to 5s; frames past 5s have nothing ahead of them
        let (mut ts, index) = open(Broadcast::new(200, start()).to_bytes());
        let err = resolve(
            &mut ts,
            &index,
            &[TrimRange::new(10, 190)],
            &ResolveOptions::default(),
        )
        .unwrap_err();
        match err {
            Error::TotSearchFailed { frame, source } => {
                assert_eq!(frame, 190);
                assert!(matches!(source, ProbeError::TotNotFound { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_negative_duration_kept() {
        let mut w = StreamWriter::new();
        w.video_pes(0x0100, 0);
        w.tot(start() + TimeDelta::seconds(30));
        w.video_pes(0x0100, 3003);
        w.tot(start());

        let (mut ts, index) = open(w.into_bytes());
        let segments = resolve(
            &mut ts,
            &index,
            &[TrimRange::new(0, 1)],
            &ResolveOptions::default(),
        )
        .unwrap();
        assert_eq!(segments[0].duration_seconds, -30);
    }

    #[test]
    fn test_interpolated_timing() {
        let (mut ts, index) = open(Broadcast::new(1200, start()).to_bytes());
        let options = ResolveOptions {
            interpolate: true,
            ..Default::default()
        };
        let segments = resolve(&mut ts, &index, &[TrimRange::new(193, 449)], &options).unwrap();
        let segment = &segments[0];

        assert_eq!(segment.start_time, start() + TimeDelta::seconds(10));
        assert_eq!(segment.end_time, start() + TimeDelta::seconds(15));
        assert_eq!(segment.duration_seconds, 5);

        // TOT 19:00:10 follows frame 299, 106 frames (3.537s) after frame 193;
        // TOT 19:00:15 directly follows frame 449, so frame 450 is 33ms past it
        let precise = segment.precise.as_ref().unwrap();
        assert_eq!(
            precise.start_time,
            start() + TimeDelta::seconds(10) - TimeDelta::milliseconds(3537)
        );
        assert_eq!(
            precise.end_time,
            start() + TimeDelta::seconds(15) + TimeDelta::milliseconds(33)
        );
        assert_eq!(precise.duration_millis, 8570);
    }

    #[test]
    fn test_interpolated_timing_with_reordered_pts() {
        // B-frame decode order: the last PTS before the TOT is below frame 0's
        let mut w = StreamWriter::new();
        w.video_pes(0x0100, 9009);
        w.video_pes(0x0100, 3003);
        w.video_pes(0x0100, 6006);
        w.tot(start() + TimeDelta::seconds(5));
        w.video_pes(0x0100, 18018);
        w.tot(start() + TimeDelta::seconds(10));

        let (mut ts, index) = open(w.into_bytes());
        let options = ResolveOptions {
            interpolate: true,
            ..Default::default()
        };
        let segments = resolve(&mut ts, &index, &[TrimRange::new(0, 1)], &options).unwrap();
        let segment = &segments[0];
        assert_eq!(segment.start_time, start() + TimeDelta::seconds(5));
        assert_eq!(segment.end_time, start() + TimeDelta::seconds(5));

        let precise = segment.precise.as_ref().unwrap();
        assert_eq!(
            precise.start_time,
            start() + TimeDelta::seconds(5) + TimeDelta::milliseconds(33)
        );
        // timed at frame 2, the anchor itself
        assert_eq!(precise.end_time, start() + TimeDelta::seconds(5));
        assert_eq!(precise.duration_millis, -33);
    }

    #[test]
    fn test_interpolated_end_at_last_frame() {
        let mut w = StreamWriter::new();
        w.video_pes(0x0100, 0);
        w.video_pes(0x0100, 3003);
        w.tot(start() + TimeDelta::seconds(5));

        let (mut ts, index) = open(w.into_bytes());
        let options = ResolveOptions {
            interpolate: true,
            ..Default::default()
        };
        let segments = resolve(&mut ts, &index, &[TrimRange::new(0, 1)], &options).unwrap();

        let precise = segments[0].precise.as_ref().unwrap();
        assert_eq!(
            precise.start_time,
            start() + TimeDelta::seconds(5) - TimeDelta::milliseconds(33)
        );
        assert_eq!(precise.end_time, start() + TimeDelta::seconds(5));
        assert_eq!(precise.duration_millis, 33);
    }

    #[test]
    fn test_implicit_full_range() {
        let (_, index) = open(Broadcast::new(42, start()).to_bytes());
        assert_eq!(implicit_full_range(&index), TrimRange::new(0, 41));
    }
}
