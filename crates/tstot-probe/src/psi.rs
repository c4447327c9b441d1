//! PAT / PMT parsing, limited to what is needed to find the video PID.

use crate::error::{ProbeError, Result};
use crate::section::Section;

/// Well-known PIDs.
pub mod pid {
    /// Program Association Table.
    pub const PAT: u16 = 0x0000;
    /// Time and Date / Time Offset Table.
    pub const TOT: u16 = 0x0014;
    /// Null packets.
    pub const NULL: u16 = 0x1FFF;
}

/// Table ids.
pub mod table_id {
    pub const PAT: u8 = 0x00;
    pub const PMT: u8 = 0x02;
    pub const TDT: u8 = 0x70;
    pub const TOT: u8 = 0x73;
}

/// Whether an ISO/IEC 13818-1 (or ARIB) stream_type carries video.
pub fn is_video_stream_type(stream_type: u8) -> bool {
    matches!(
        stream_type,
        0x01 // MPEG-1 video
            | 0x02 // MPEG-2 video
            | 0x10 // MPEG-4 visual
            | 0x1B // H.264/AVC
            | 0x24 // H.265/HEVC
            | 0x42 // AVS
            | 0xD1 // Dirac
            | 0xEA // VC-1
    )
}

/// One program entry of the PAT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatEntry {
    pub program_number: u16,
    pub pmt_pid: u16,
}

/// One elementary stream entry of a PMT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PmtStream {
    pub stream_type: u8,
    pub elementary_pid: u16,
}

/// Strip the long-form header (5 bytes after section_length) and the CRC.
fn long_form_body<'a>(section: &Section<'a>) -> Result<&'a [u8]> {
    let body = section.body();
    if !section.syntax_indicator || body.len() < 9 {
        return Err(ProbeError::malformed(format!(
            "table 0x{:02x} is not a long-form section",
            section.table_id
        )));
    }
    Ok(&body[5..body.len() - 4])
}

/// Parse PAT programs. Program number 0 (network PID) is skipped.
pub fn parse_pat(section: &Section<'_>) -> Result<Vec<PatEntry>> {
    if section.table_id != table_id::PAT {
        return Err(ProbeError::malformed("not a PAT section"));
    }

    let body = long_form_body(section)?;
    Ok(body
        .chunks_exact(4)
        .filter_map(|entry| {
            let program_number = u16::from_be_bytes([entry[0], entry[1]]);
            let pmt_pid = (((entry[2] & 0x1F) as u16) << 8) | entry[3] as u16;
            (program_number != 0).then_some(PatEntry {
                program_number,
                pmt_pid,
            })
        })
        .collect())
}

/// Parse the elementary stream loop of a PMT.
pub fn parse_pmt(section: &Section<'_>) -> Result<Vec<PmtStream>> {
    if section.table_id != table_id::PMT {
        return Err(ProbeError::malformed("not a PMT section"));
    }

    let b = long_form_body(section)?;
    if b.len() < 4 {
        return Err(ProbeError::malformed("PMT too short"));
    }

    let program_info_length = (((b[2] & 0x0F) as usize) << 8) | b[3] as usize;
    let mut idx = 4 + program_info_length;
    let mut streams = Vec::new();

    while idx + 5 <= b.len() {
        let stream_type = b[idx];
        let elementary_pid = (((b[idx + 1] & 0x1F) as u16) << 8) | b[idx + 2] as u16;
        let es_info_length = (((b[idx + 3] & 0x0F) as usize) << 8) | b[idx + 4] as usize;
        streams.push(PmtStream {
            stream_type,
            elementary_pid,
        });
        idx += 5 + es_info_length;
    }

    Ok(streams)
}
