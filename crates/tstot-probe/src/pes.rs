//! PES header parsing: start code, stream id and the 33-bit PTS.

use crate::packet::TsPacket;

/// PTS/DTS clock rate.
pub const CLOCK_90KHZ: u64 = 90_000;

/// PTS values wrap at 2^33.
pub const PTS_WRAP: u64 = 1 << 33;

/// Whether a PES stream_id denotes a video elementary stream.
pub fn is_video_stream_id(stream_id: u8) -> bool {
    (0xE0..=0xEF).contains(&stream_id)
}

/// Timestamp state of a PES header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PesTimestamp {
    /// PTS_DTS_flags indicate no PTS.
    Absent,
    /// A PTS field is flagged but truncated or its marker bits are wrong.
    Invalid,
    /// Decoded 33-bit PTS.
    Pts(u64),
}

/// The start of a PES packet found in a transport packet payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PesStart {
    pub stream_id: u8,
    pub timestamp: PesTimestamp,
}

/// Parse the PES header beginning in `packet`, if the packet starts one.
pub fn parse_pes_start(packet: &TsPacket) -> Option<PesStart> {
    if !packet.payload_unit_start() {
        return None;
    }

    let payload = packet.payload()?;
    if payload.len() < 9 || payload[0..3] != [0x00, 0x00, 0x01] {
        return None;
    }

    let stream_id = payload[3];
    let pts_dts_flags = (payload[7] >> 6) & 0x03;
    let header_data_length = payload[8] as usize;

    let timestamp = if pts_dts_flags & 0x02 == 0 {
        PesTimestamp::Absent
    } else if header_data_length < 5 || payload.len() < 14 {
        PesTimestamp::Invalid
    } else {
        let field: [u8; 5] = [payload[9], payload[10], payload[11], payload[12], payload[13]];
        decode_timestamp(&field).map_or(PesTimestamp::Invalid, PesTimestamp::Pts)
    };

    Some(PesStart {
        stream_id,
        timestamp,
    })
}

/// Decode a 5-byte PTS/DTS field, validating its three marker bits.
pub fn decode_timestamp(field: &[u8; 5]) -> Option<u64> {
    if field[0] & 0x01 == 0 || field[2] & 0x01 == 0 || field[4] & 0x01 == 0 {
        return None;
    }

    Some(
        (((field[0] >> 1) & 0x07) as u64) << 30
            | (field[1] as u64) << 22
            | ((field[2] >> 1) as u64) << 15
            | (field[3] as u64) << 7
            | (field[4] >> 1) as u64,
    )
}

/// Encode a 33-bit timestamp with the given 4-bit prefix (`0b0010` for PTS only).
pub fn encode_timestamp(prefix: u8, ts: u64) -> [u8; 5] {
    let ts = ts % PTS_WRAP;
    [
        (prefix << 4) | (((ts >> 30) & 0x07) as u8) << 1 | 0x01,
        (ts >> 22) as u8,
        (((ts >> 15) & 0x7F) as u8) << 1 | 0x01,
        (ts >> 7) as u8,
        ((ts & 0x7F) as u8) << 1 | 0x01,
    ]
}

/// Signed distance from `from` to `to` on the wrapping 33-bit clock.
///
/// Distances of half the clock range or more are taken as negative, so a
/// reordered (B-frame) timestamp just below `from` gives a small negative
/// offset instead of a near-full wrap.
pub fn pts_offset(to: u64, from: u64) -> i64 {
    let forward = to.wrapping_sub(from) % PTS_WRAP;
    if forward >= PTS_WRAP / 2 {
        forward as i64 - PTS_WRAP as i64
    } else {
        forward as i64
    }
}
