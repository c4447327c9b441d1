//! Single-packet PSI/SI section reader with CRC-32 (MPEG-2) validation.
//!
//! Sections spanning several packets are reported as malformed instead of
//! being reassembled; every table this crate consumes (PAT, PMT, TOT) fits in
//! one packet in practice.

use crc::{Crc, CRC_32_MPEG_2};

use crate::error::{ProbeError, Result};
use crate::packet::TsPacket;

const CRC_MPEG: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// Compute the CRC-32/MPEG-2 of a byte slice.
pub fn crc32_mpeg(data: &[u8]) -> u32 {
    CRC_MPEG.checksum(data)
}

/// A section located within one transport packet.
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
    /// table_id byte.
    pub table_id: u8,
    /// section_syntax_indicator bit.
    pub syntax_indicator: bool,
    /// 12-bit section_length (bytes following the length field).
    pub section_length: u16,
    /// The whole section, from table_id through the last byte (CRC included).
    pub data: &'a [u8],
}

impl<'a> Section<'a> {
    /// Bytes after the 3-byte section header, CRC included.
    pub fn body(&self) -> &'a [u8] {
        &self.data[3..]
    }

    /// Check the trailing CRC-32 against the section contents.
    pub fn crc_valid(&self) -> bool {
        if self.data.len() < 7 {
            return false;
        }
        let (content, crc) = self.data.split_at(self.data.len() - 4);
        crc32_mpeg(content) == u32::from_be_bytes([crc[0], crc[1], crc[2], crc[3]])
    }
}

/// Extract the section starting in `packet`, which must be on `pid`.
pub fn read_section(packet: &TsPacket, pid: u16) -> Result<Section<'_>> {
    let found = packet.pid();
    if found != pid {
        return Err(ProbeError::NotThisPid {
            expected: pid,
            found,
        });
    }

    if !packet.payload_unit_start() {
        return Err(ProbeError::malformed("payload_unit_start not set"));
    }

    let payload = packet
        .payload()
        .ok_or_else(|| ProbeError::malformed("packet carries no payload"))?;

    let pointer = payload[0] as usize;
    let start = 1 + pointer;
    if start + 3 > payload.len() {
        return Err(ProbeError::malformed(format!(
            "pointer field {} out of bounds for {}-byte payload",
            pointer,
            payload.len()
        )));
    }

    let table_id = payload[start];
    let syntax_indicator = payload[start + 1] & 0x80 != 0;
    let section_length = (((payload[start + 1] & 0x0F) as u16) << 8) | payload[start + 2] as u16;

    let end = start + 3 + section_length as usize;
    if end > payload.len() {
        return Err(ProbeError::malformed(format!(
            "table 0x{:02x} section length {} exceeds remaining {} bytes",
            table_id,
            section_length,
            payload.len() - start - 3
        )));
    }

    Ok(Section {
        table_id,
        syntax_indicator,
        section_length,
        data: &payload[start..end],
    })
}
