//! Bounded forward search for Time Offset Table sections.

use std::io::{Read, Seek};
use std::ops::ControlFlow;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::error::{ProbeError, Result};
use crate::packet::{TsPacket, TsReader};
use crate::pes::{self, PesTimestamp};
use crate::psi::{pid, table_id};
use crate::section::{self, Section};
use crate::mjd;

/// Default number of packets scanned forward from a seed before giving up.
///
/// TOT is repeated every few seconds; at broadcast bitrates this window
/// covers several repetitions.
pub const DEFAULT_SEARCH_WINDOW: u64 = 50_000;

/// Smallest valid TOT section_length: time (5) + loop length (2) + CRC (4).
const MIN_TOT_SECTION_LENGTH: u16 = 11;

/// A decoded TOT entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TotRecord {
    pub mjd: u16,
    pub bcd_time: [u8; 3],
    pub decoded: NaiveDateTime,
    /// Packet at which the section was found.
    pub packet_index: u64,
    /// Last PTS seen on the tracked video PID before the TOT, if tracking.
    pub anchor_pts: Option<u64>,
}

/// Raw TOT time fields before calendar decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TotFields {
    pub mjd: u16,
    pub bcd_time: [u8; 3],
}

/// Validate a TOT section and pull out its time fields.
///
/// Returns `None` when the section is not a TOT or fails length, descriptor
/// loop or (when `verify_crc`) CRC checks.
pub fn tot_fields(section: &Section<'_>, verify_crc: bool) -> Option<TotFields> {
    if section.table_id != table_id::TOT || section.section_length < MIN_TOT_SECTION_LENGTH {
        return None;
    }

    let body = section.body();
    let loop_length = (((body[5] & 0x0F) as usize) << 8) | body[6] as usize;
    if 7 + loop_length + 4 > body.len() {
        return None;
    }

    if verify_crc && !section.crc_valid() {
        return None;
    }

    Some(TotFields {
        mjd: u16::from_be_bytes([body[0], body[1]]),
        bcd_time: [body[2], body[3], body[4]],
    })
}

/// Searches forward from a seed packet for the first valid TOT.
#[derive(Debug, Clone)]
pub struct TotLocator {
    window: u64,
    verify_crc: bool,
    video_pid: Option<u16>,
}

impl Default for TotLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl TotLocator {
    /// Create a locator with the default window and CRC checking enabled.
    pub fn new() -> Self {
        Self {
            window: DEFAULT_SEARCH_WINDOW,
            verify_crc: true,
            video_pid: None,
        }
    }

    /// Set the search window in packets.
    pub fn window(mut self, packets: u64) -> Self {
        self.window = packets;
        self
    }

    /// Enable or disable TOT CRC verification.
    pub fn verify_crc(mut self, verify: bool) -> Self {
        self.verify_crc = verify;
        self
    }

    /// Track PTS on this PID so results carry an `anchor_pts`.
    pub fn track_video_pid(mut self, pid: u16) -> Self {
        self.video_pid = Some(pid);
        self
    }

    pub fn search_window(&self) -> u64 {
        self.window
    }

    /// Find the first valid TOT at or after `seed_packet_index`.
    pub fn locate<R: Read + Seek>(
        &self,
        reader: &mut TsReader<R>,
        seed_packet_index: u64,
    ) -> Result<TotRecord> {
        let mut anchor_pts = None;
        let mut rejected = 0u32;

        let found = reader.scan(seed_packet_index, Some(self.window), |index, packet| {
            if Some(packet.pid()) == self.video_pid {
                if let Some(PesTimestamp::Pts(pts)) =
                    pes::parse_pes_start(packet).map(|p| p.timestamp)
                {
                    anchor_pts = Some(pts);
                }
                return Ok(ControlFlow::Continue(()));
            }

            if packet.pid() != pid::TOT {
                return Ok(ControlFlow::Continue(()));
            }

            match self.candidate(packet) {
                Some(fields) => {
                    let decoded = mjd::decode(fields.mjd, fields.bcd_time)?;
                    Ok(ControlFlow::Break(TotRecord {
                        mjd: fields.mjd,
                        bcd_time: fields.bcd_time,
                        decoded,
                        packet_index: index,
                        anchor_pts,
                    }))
                }
                None => {
                    rejected += 1;
                    Ok(ControlFlow::Continue(()))
                }
            }
        })?;

        match found {
            Some(record) => {
                tracing::debug!(
                    "TOT {} at packet {} (seed {}, +{})",
                    record.decoded,
                    record.packet_index,
                    seed_packet_index,
                    record.packet_index - seed_packet_index
                );
                Ok(record)
            }
            None => {
                tracing::debug!(
                    "No TOT within {} packets of {} ({} PID 0x0014 packets rejected)",
                    self.window,
                    seed_packet_index,
                    rejected
                );
                Err(ProbeError::TotNotFound {
                    seed: seed_packet_index,
                    window: self.window,
                })
            }
        }
    }

    fn candidate(&self, packet: &TsPacket) -> Option<TotFields> {
        match section::read_section(packet, pid::TOT) {
            Ok(section) => tot_fields(&section, self.verify_crc),
            Err(e) => {
                tracing::trace!("Skipping PID 0x0014 packet: {}", e);
                None
            }
        }
    }
}
