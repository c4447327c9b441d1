//! Frame-indexed PTS table for one elementary video stream.
//!
//! The index is built in a single linear pass. PSI tables and PES headers are
//! collected together; the target PID is chosen once the pass ends:
//!
//! 1. an explicitly configured PID,
//! 2. otherwise the PMT-declared video PID carrying the most frames,
//! 3. otherwise the PID carrying the most video PES starts.
//!
//! Ties resolve to the lowest PID.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Read, Seek};
use std::ops::ControlFlow;

use serde::Serialize;

use crate::error::{ProbeError, Result};
use crate::packet::{TsPacket, TsReader};
use crate::pes::{self, PesTimestamp};
use crate::psi::{self, pid};
use crate::section;

/// One detected video frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameEntry {
    /// Sequential frame number (0-based).
    pub frame_number: u32,
    /// 33-bit presentation timestamp (90 kHz).
    pub pts: u64,
    /// Packet at which the frame's PES header was observed.
    pub packet_index: u64,
}

/// How the video PID was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PidSource {
    /// Given by the caller.
    Configured,
    /// Declared as a video stream in a PMT.
    ProgramMap,
    /// Inferred from PES stream ids.
    PesFallback,
}

impl std::fmt::Display for PidSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PidSource::Configured => write!(f, "configured"),
            PidSource::ProgramMap => write!(f, "PMT"),
            PidSource::PesFallback => write!(f, "PES fallback"),
        }
    }
}

/// Options for [`build_index`].
#[derive(Debug, Clone, Default)]
pub struct IndexOptions {
    /// Force this PID instead of detecting one.
    pub video_pid: Option<u16>,
}

/// Immutable frame index of the target video stream.
#[derive(Debug, Clone, Serialize)]
pub struct VideoIndex {
    pub video_pid: u16,
    pub pid_source: PidSource,
    /// First non-zero program number in the PAT.
    pub service_id: Option<u16>,
    /// PES starts on the target PID whose PTS failed validation.
    pub skipped_pes: u32,
    frames: Vec<FrameEntry>,
}

impl VideoIndex {
    /// Number of indexed frames.
    pub fn total_frames(&self) -> u32 {
        self.frames.len() as u32
    }

    /// Look up a frame by number.
    pub fn get(&self, frame_number: u32) -> Option<&FrameEntry> {
        self.frames.get(frame_number as usize)
    }

    pub fn frames(&self) -> &[FrameEntry] {
        &self.frames
    }

    pub fn first(&self) -> Option<&FrameEntry> {
        self.frames.first()
    }

    pub fn last(&self) -> Option<&FrameEntry> {
        self.frames.last()
    }
}

/// Per-PID PES observations.
#[derive(Default)]
struct PidFrames {
    frames: Vec<(u64, u64)>,
    skipped: u32,
}

/// State threaded through the single demux pass.
#[derive(Default)]
struct IndexAccumulator {
    service_id: Option<u16>,
    pmt_pids: BTreeSet<u16>,
    declared_video: BTreeSet<u16>,
    candidates: BTreeMap<u16, PidFrames>,
}

impl IndexAccumulator {
    fn observe(&mut self, index: u64, packet: &TsPacket) {
        let packet_pid = packet.pid();

        if packet_pid == pid::PAT {
            self.observe_pat(packet);
        } else if self.pmt_pids.contains(&packet_pid) {
            self.observe_pmt(packet);
        }

        let Some(pes) = pes::parse_pes_start(packet) else {
            return;
        };
        if !pes::is_video_stream_id(pes.stream_id) {
            return;
        }

        let entry = self.candidates.entry(packet_pid).or_default();
        match pes.timestamp {
            PesTimestamp::Pts(pts) => entry.frames.push((pts, index)),
            PesTimestamp::Invalid => {
                entry.skipped += 1;
                tracing::trace!(
                    "Skipping PES on PID 0x{:04x} at packet {}: invalid PTS field",
                    packet_pid,
                    index
                );
            }
            PesTimestamp::Absent => {}
        }
    }

    fn observe_pat(&mut self, packet: &TsPacket) {
        let programs = match section::read_section(packet, pid::PAT)
            .and_then(|s| {
                if s.crc_valid() {
                    Ok(s)
                } else {
                    Err(ProbeError::malformed("PAT CRC mismatch"))
                }
            })
            .and_then(|s| psi::parse_pat(&s))
        {
            Ok(programs) => programs,
            Err(e) => {
                tracing::debug!("Ignoring PAT packet: {}", e);
                return;
            }
        };

        if self.service_id.is_none() {
            self.service_id = programs.first().map(|p| p.program_number);
        }
        self.pmt_pids.extend(programs.iter().map(|p| p.pmt_pid));
    }

    fn observe_pmt(&mut self, packet: &TsPacket) {
        let packet_pid = packet.pid();
        let section = match section::read_section(packet, packet_pid) {
            Ok(s) if s.table_id == psi::table_id::PMT && s.crc_valid() => s,
            Ok(_) => return,
            Err(e) => {
                tracing::trace!("Ignoring PMT packet on 0x{:04x}: {}", packet_pid, e);
                return;
            }
        };

        match psi::parse_pmt(&section) {
            Ok(streams) => {
                for stream in streams {
                    if psi::is_video_stream_type(stream.stream_type)
                        && self.declared_video.insert(stream.elementary_pid)
                    {
                        tracing::debug!(
                            "PMT declares video PID 0x{:04x} (stream type 0x{:02x})",
                            stream.elementary_pid,
                            stream.stream_type
                        );
                    }
                }
            }
            Err(e) => tracing::debug!("Ignoring PMT on 0x{:04x}: {}", packet_pid, e),
        }
    }

    /// Pick the most populated PID among `pids`, lowest PID on ties.
    fn busiest<'a>(&self, pids: impl Iterator<Item = &'a u16>) -> Option<u16> {
        pids.filter_map(|p| {
            self.candidates
                .get(p)
                .filter(|c| !c.frames.is_empty())
                .map(|c| (*p, c.frames.len()))
        })
        .fold(None, |best: Option<(u16, usize)>, (p, n)| match best {
            Some((_, bn)) if bn >= n => best,
            _ => Some((p, n)),
        })
        .map(|(p, _)| p)
    }

    fn finish(mut self, options: &IndexOptions) -> Result<VideoIndex> {
        let (video_pid, pid_source) = if let Some(forced) = options.video_pid {
            (forced, PidSource::Configured)
        } else if let Some(p) = self.busiest(self.declared_video.iter()) {
            (p, PidSource::ProgramMap)
        } else if let Some(p) = self.busiest(self.candidates.keys()) {
            (p, PidSource::PesFallback)
        } else {
            return Err(ProbeError::NoVideoStreamFound);
        };

        let chosen = self.candidates.remove(&video_pid).unwrap_or_default();
        if chosen.frames.is_empty() {
            return Err(ProbeError::NoVideoStreamFound);
        }

        let frames = chosen
            .frames
            .into_iter()
            .enumerate()
            .map(|(i, (pts, packet_index))| FrameEntry {
                frame_number: i as u32,
                pts,
                packet_index,
            })
            .collect();

        Ok(VideoIndex {
            video_pid,
            pid_source,
            service_id: self.service_id,
            skipped_pes: chosen.skipped,
            frames,
        })
    }
}

/// Scan the whole stream once and build the frame index of its video stream.
pub fn build_index<R: Read + Seek>(
    reader: &mut TsReader<R>,
    options: &IndexOptions,
) -> Result<VideoIndex> {
    let mut acc = IndexAccumulator::default();

    reader.scan(0, None, |index, packet| {
        acc.observe(index, packet);
        Ok(ControlFlow::<()>::Continue(()))
    })?;

    let index = acc.finish(options)?;

    tracing::info!(
        "Indexed {} frames on video PID 0x{:04x} ({})",
        index.total_frames(),
        index.video_pid,
        index.pid_source
    );
    if index.skipped_pes > 0 {
        tracing::warn!(
            "Skipped {} PES headers with invalid PTS on PID 0x{:04x}",
            index.skipped_pes,
            index.video_pid
        );
    }

    Ok(index)
}
