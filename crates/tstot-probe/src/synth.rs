//! Synthetic transport-stream writer for tests and benchmarks.
//!
//! Produces sync-aligned 188-byte packets carrying PAT, PMT, video/audio PES
//! headers and TOT sections with valid CRCs. Payload contents beyond the
//! headers are stuffing.

use std::collections::BTreeMap;

use chrono::{NaiveDateTime, Timelike};

use crate::mjd;
use crate::packet::{SYNC_BYTE, TS_PACKET_SIZE};
use crate::pes::encode_timestamp;
use crate::psi::{pid, table_id};
use crate::section::crc32_mpeg;

/// Low-level packet writer.
#[derive(Debug, Default, Clone)]
pub struct StreamWriter {
    buf: Vec<u8>,
    continuity: BTreeMap<u16, u8>,
}

impl StreamWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Packets written so far.
    pub fn packet_count(&self) -> u64 {
        (self.buf.len() / TS_PACKET_SIZE) as u64
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Write one packet with a payload-only adaptation field control.
    pub fn packet(&mut self, packet_pid: u16, pusi: bool, payload: &[u8]) -> &mut Self {
        let cc = self.continuity.entry(packet_pid).or_insert(0);
        let mut p = [0xFFu8; TS_PACKET_SIZE];
        p[0] = SYNC_BYTE;
        p[1] = ((packet_pid >> 8) as u8 & 0x1F) | if pusi { 0x40 } else { 0 };
        p[2] = packet_pid as u8;
        p[3] = 0x10 | *cc;
        *cc = (*cc + 1) & 0x0F;

        let len = payload.len().min(TS_PACKET_SIZE - 4);
        p[4..4 + len].copy_from_slice(&payload[..len]);
        self.buf.extend_from_slice(&p);
        self
    }

    /// Write a complete section (CRC appended) in a single packet.
    pub fn section(&mut self, packet_pid: u16, section: &[u8]) -> &mut Self {
        let mut payload = Vec::with_capacity(section.len() + 5);
        payload.push(0x00);
        payload.extend_from_slice(section);
        payload.extend_from_slice(&crc32_mpeg(section).to_be_bytes());
        self.packet(packet_pid, true, &payload)
    }

    /// Program Association Table listing `(program_number, pmt_pid)` pairs.
    pub fn pat(&mut self, programs: &[(u16, u16)]) -> &mut Self {
        let mut body = Vec::new();
        for &(program, pmt_pid) in programs {
            body.extend_from_slice(&program.to_be_bytes());
            body.push(0xE0 | ((pmt_pid >> 8) as u8 & 0x1F));
            body.push(pmt_pid as u8);
        }
        let section = long_section(table_id::PAT, 0x7FE0, &body);
        self.section(pid::PAT, &section)
    }

    /// Program Map Table listing `(stream_type, elementary_pid)` pairs.
    pub fn pmt(&mut self, pmt_pid: u16, program: u16, streams: &[(u8, u16)]) -> &mut Self {
        let pcr_pid = streams.first().map(|s| s.1).unwrap_or(pid::NULL);
        let mut body = vec![0xE0 | ((pcr_pid >> 8) as u8 & 0x1F), pcr_pid as u8, 0xF0, 0x00];
        for &(stream_type, es_pid) in streams {
            body.extend_from_slice(&[
                stream_type,
                0xE0 | ((es_pid >> 8) as u8 & 0x1F),
                es_pid as u8,
                0xF0,
                0x00,
            ]);
        }
        let section = long_section(table_id::PMT, program, &body);
        self.section(pmt_pid, &section)
    }

    /// PES header start on `packet_pid` with an optional raw 5-byte PTS field.
    pub fn pes_start(&mut self, packet_pid: u16, stream_id: u8, pts_field: Option<[u8; 5]>) -> &mut Self {
        let mut payload = vec![0x00, 0x00, 0x01, stream_id, 0x00, 0x00, 0x80];
        match pts_field {
            Some(field) => {
                payload.extend_from_slice(&[0x80, 0x05]);
                payload.extend_from_slice(&field);
            }
            None => payload.extend_from_slice(&[0x00, 0x00]),
        }
        self.packet(packet_pid, true, &payload)
    }

    /// Video PES start (stream id 0xE0) with a valid PTS.
    pub fn video_pes(&mut self, packet_pid: u16, pts: u64) -> &mut Self {
        self.pes_start(packet_pid, 0xE0, Some(encode_timestamp(0b0010, pts)))
    }

    /// Continuation packets without payload_unit_start.
    pub fn filler(&mut self, packet_pid: u16, count: usize) -> &mut Self {
        for _ in 0..count {
            self.packet(packet_pid, false, &[]);
        }
        self
    }

    /// TOT carrying `time`, with a JST local time offset descriptor.
    pub fn tot(&mut self, time: NaiveDateTime) -> &mut Self {
        let (mjd, bcd) = encode_time(time);
        self.tot_raw(mjd, bcd)
    }

    /// TOT with raw MJD/BCD fields and a valid CRC.
    pub fn tot_raw(&mut self, mjd: u16, bcd_time: [u8; 3]) -> &mut Self {
        let section = tot_section(mjd, bcd_time);
        self.section(pid::TOT, &section)
    }

    /// TOT whose CRC does not match its contents.
    pub fn tot_bad_crc(&mut self, time: NaiveDateTime) -> &mut Self {
        let (mjd, bcd) = encode_time(time);
        let section = tot_section(mjd, bcd);
        let mut payload = vec![0x00];
        payload.extend_from_slice(&section);
        payload.extend_from_slice(&(crc32_mpeg(&section) ^ 0xDEAD_BEEF).to_be_bytes());
        self.packet(pid::TOT, true, &payload)
    }

    /// Time and Date Table (short section, shares the TOT PID).
    pub fn tdt(&mut self, time: NaiveDateTime) -> &mut Self {
        let (mjd, bcd) = encode_time(time);
        let mut payload = vec![0x00, table_id::TDT, 0x70, 0x05];
        payload.extend_from_slice(&mjd.to_be_bytes());
        payload.extend_from_slice(&bcd);
        self.packet(pid::TOT, true, &payload)
    }
}

fn encode_time(time: NaiveDateTime) -> (u16, [u8; 3]) {
    let mjd = mjd::to_mjd(time.date()).unwrap_or(0);
    let bcd = [
        mjd::encode_bcd(time.hour() as u8),
        mjd::encode_bcd(time.minute() as u8),
        mjd::encode_bcd(time.second() as u8),
    ];
    (mjd, bcd)
}

/// Long-form section without CRC: header, 5-byte extension header, body.
fn long_section(table: u8, id_ext: u16, body: &[u8]) -> Vec<u8> {
    let length = 5 + body.len() + 4;
    let mut s = vec![
        table,
        0xB0 | ((length >> 8) as u8 & 0x0F),
        length as u8,
        (id_ext >> 8) as u8,
        id_ext as u8,
        0xC1,
        0x00,
        0x00,
    ];
    s.extend_from_slice(body);
    s
}

/// TOT section without CRC.
fn tot_section(mjd: u16, bcd_time: [u8; 3]) -> Vec<u8> {
    // local_time_offset_descriptor: JPN, +09:00
    let descriptor = [
        0x58, 0x0D, b'J', b'P', b'N', 0x02, 0x09, 0x00, 0x00, 0x00, 0x00, 0x00, 0x09, 0x00, 0x00,
    ];
    let length = 5 + 2 + descriptor.len() + 4;
    let mut s = vec![table_id::TOT, 0x70 | ((length >> 8) as u8 & 0x0F), length as u8];
    s.extend_from_slice(&mjd.to_be_bytes());
    s.extend_from_slice(&bcd_time);
    s.push(0xF0 | ((descriptor.len() >> 8) as u8 & 0x0F));
    s.push(descriptor.len() as u8);
    s.extend_from_slice(&descriptor);
    s
}

/// A single-program broadcast with constant frame rate and periodic TOT.
///
/// Frame `k` is shown at `k * fps_den / fps_num` seconds after `start`. A TOT
/// carrying `start + T` is written just before the first frame shown at or
/// after `T`, for every multiple `T` of `tot_interval_secs`.
#[derive(Debug, Clone)]
pub struct Broadcast {
    pub video_pid: u16,
    pub audio_pid: u16,
    pub pmt_pid: u16,
    pub service_id: u16,
    pub frames: u32,
    pub fps_num: u64,
    pub fps_den: u64,
    pub first_pts: u64,
    pub tot_interval_secs: u64,
    pub start: NaiveDateTime,
    /// Video continuation packets after each PES start.
    pub packets_per_frame: usize,
    /// Frames between PAT/PMT repetitions.
    pub psi_interval: u32,
    /// Declare the video stream in the PMT.
    pub declare_video: bool,
}

impl Broadcast {
    /// 29.97 fps, TOT every 5 s, video on 0x0100.
    pub fn new(frames: u32, start: NaiveDateTime) -> Self {
        Self {
            video_pid: 0x0100,
            audio_pid: 0x0110,
            pmt_pid: 0x01F0,
            service_id: 0x0400,
            frames,
            fps_num: 30_000,
            fps_den: 1001,
            first_pts: 900_000,
            tot_interval_secs: 5,
            start,
            packets_per_frame: 0,
            psi_interval: 300,
            declare_video: true,
        }
    }

    /// PTS increment per frame on the 90 kHz clock.
    pub fn frame_duration_pts(&self) -> u64 {
        90_000 * self.fps_den / self.fps_num
    }

    pub fn write(&self) -> StreamWriter {
        let mut w = StreamWriter::new();
        let mut next_tot = 0u64;

        for k in 0..self.frames as u64 {
            if k % self.psi_interval.max(1) as u64 == 0 {
                w.pat(&[(self.service_id, self.pmt_pid)]);
                let mut streams = vec![(0x0F, self.audio_pid)];
                if self.declare_video {
                    streams.insert(0, (0x02, self.video_pid));
                }
                w.pmt(self.pmt_pid, self.service_id, &streams);
            }

            // frame k time >= next_tot  <=>  k * den >= next_tot * num
            while k * self.fps_den >= next_tot * self.fps_num {
                w.tot(self.start + chrono::Duration::seconds(next_tot as i64));
                next_tot += self.tot_interval_secs.max(1);
            }

            let pts = self.first_pts + k * self.frame_duration_pts();
            w.video_pes(self.video_pid, pts);
            w.filler(self.video_pid, self.packets_per_frame);

            if k % 2 == 0 {
                w.pes_start(self.audio_pid, 0xC0, Some(encode_timestamp(0b0010, pts)));
            }
        }

        w
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.write().into_bytes()
    }
}
