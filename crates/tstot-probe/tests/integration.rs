//! Integration tests for tstot-probe

use std::io::Write;

use chrono::NaiveDate;
use tstot_probe::{
    build_index, mjd, open_file,
    section::{crc32_mpeg, read_section},
    tot::tot_fields,
    IndexOptions, ProbeError, TotLocator, TsPacket, TS_PACKET_SIZE,
};

/// Build one packet carrying `payload` (pointer field included by the caller).
fn packet(pid: u16, pusi: bool, payload: &[u8]) -> [u8; TS_PACKET_SIZE] {
    let mut p = [0xFFu8; TS_PACKET_SIZE];
    p[0] = 0x47;
    p[1] = ((pid >> 8) as u8 & 0x1F) | if pusi { 0x40 } else { 0 };
    p[2] = pid as u8;
    p[3] = 0x10;
    p[4..4 + payload.len()].copy_from_slice(payload);
    p
}

/// Minimal TOT (empty descriptor loop) with a valid CRC.
fn tot_packet(mjd: u16, bcd: [u8; 3]) -> [u8; TS_PACKET_SIZE] {
    let mut section = vec![0x73, 0x70, 0x0B];
    section.extend_from_slice(&mjd.to_be_bytes());
    section.extend_from_slice(&bcd);
    section.extend_from_slice(&[0xF0, 0x00]);
    let crc = crc32_mpeg(&section);
    section.extend_from_slice(&crc.to_be_bytes());

    let mut payload = vec![0x00];
    payload.extend_from_slice(&section);
    packet(0x0014, true, &payload)
}

fn video_packet(pts: u64) -> [u8; TS_PACKET_SIZE] {
    let field = tstot_probe::pes::encode_timestamp(0b0010, pts);
    let mut payload = vec![0x00, 0x00, 0x01, 0xE0, 0x00, 0x00, 0x80, 0x80, 0x05];
    payload.extend_from_slice(&field);
    packet(0x0100, true, &payload)
}

fn write_stream(packets: &[[u8; TS_PACKET_SIZE]]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for p in packets {
        file.write_all(p).unwrap();
    }
    file.flush().unwrap();
    file
}

#[test]
fn test_tot_section_decodes_known_vector() {
    let raw = tot_packet(59927, [0x19, 0x00, 0x05]);
    let packet = TsPacket::from_slice(&raw).unwrap();
    let section = read_section(&packet, 0x0014).unwrap();
    let fields = tot_fields(&section, true).unwrap();
    let decoded = mjd::decode(fields.mjd, fields.bcd_time).unwrap();
    assert_eq!(
        decoded,
        NaiveDate::from_ymd_opt(2022, 12, 14)
            .unwrap()
            .and_hms_opt(19, 0, 5)
            .unwrap()
    );
}

#[test]
fn test_file_round_trip() {
    let file = write_stream(&[
        video_packet(0),
        tot_packet(59927, [0x19, 0x00, 0x00]),
        video_packet(3003),
        video_packet(6006),
        tot_packet(59927, [0x19, 0x00, 0x01]),
    ]);

    let mut ts = open_file(file.path()).unwrap();
    assert_eq!(ts.packet_count(), 5);

    let index = build_index(&mut ts, &IndexOptions::default()).unwrap();
    assert_eq!(index.total_frames(), 3);
    assert_eq!(index.video_pid, 0x0100);

    let last = index.last().unwrap();
    assert_eq!(last.packet_index, 3);
    let record = TotLocator::new().locate(&mut ts, last.packet_index).unwrap();
    assert_eq!(record.bcd_time, [0x19, 0x00, 0x01]);
    assert_eq!(record.packet_index, 4);
}

#[test]
fn test_non_ts_file_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&[0u8; 4096]).unwrap();
    file.flush().unwrap();

    assert!(matches!(
        open_file(file.path()),
        Err(ProbeError::InvalidContainerFormat { .. })
    ));
}

#[test]
fn test_error_messages_identify_values() {
    let err = ProbeError::TotNotFound {
        seed: 1234,
        window: 50_000,
    };
    assert_eq!(
        err.to_string(),
        "TOT not found within 50000 packets of packet 1234"
    );

    let err = ProbeError::InvalidTimeEncoding {
        mjd: 59927,
        bcd: [0xFA, 0x00, 0x00],
    };
    assert!(err.to_string().contains("fa0000"));
}
