//! Transport packet access and sequential scanning.

use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::ops::ControlFlow;

use crate::error::{ProbeError, Result};

/// Size of a single MPEG-TS packet.
pub const TS_PACKET_SIZE: usize = 188;

/// Sync byte at the start of every packet.
pub const SYNC_BYTE: u8 = 0x47;

/// Number of leading packets checked for sync alignment when opening.
const SYNC_PROBE_PACKETS: u64 = 5;

/// A single 188-byte transport packet.
#[derive(Clone)]
pub struct TsPacket {
    bytes: [u8; TS_PACKET_SIZE],
}

impl std::fmt::Debug for TsPacket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsPacket")
            .field("pid", &format_args!("0x{:04x}", self.pid()))
            .field("pusi", &self.payload_unit_start())
            .field("cc", &self.continuity_counter())
            .finish()
    }
}

impl TsPacket {
    /// Wrap raw packet bytes. The sync byte is not checked here.
    pub fn new(bytes: [u8; TS_PACKET_SIZE]) -> Self {
        Self { bytes }
    }

    /// Build a packet from a slice, checking length and sync byte.
    pub fn from_slice(data: &[u8]) -> Option<Self> {
        let bytes: [u8; TS_PACKET_SIZE] = data.try_into().ok()?;
        (bytes[0] == SYNC_BYTE).then_some(Self { bytes })
    }

    /// Raw packet bytes.
    pub fn as_bytes(&self) -> &[u8; TS_PACKET_SIZE] {
        &self.bytes
    }

    /// 13-bit packet identifier.
    pub fn pid(&self) -> u16 {
        (((self.bytes[1] & 0x1F) as u16) << 8) | self.bytes[2] as u16
    }

    /// payload_unit_start_indicator.
    pub fn payload_unit_start(&self) -> bool {
        self.bytes[1] & 0x40 != 0
    }

    /// transport_error_indicator.
    pub fn transport_error(&self) -> bool {
        self.bytes[1] & 0x80 != 0
    }

    pub fn continuity_counter(&self) -> u8 {
        self.bytes[3] & 0x0F
    }

    pub fn has_adaptation_field(&self) -> bool {
        self.bytes[3] & 0x20 != 0
    }

    pub fn has_payload(&self) -> bool {
        self.bytes[3] & 0x10 != 0
    }

    /// Payload bytes following the header and any adaptation field.
    ///
    /// Returns `None` when the packet carries no payload or the adaptation
    /// field length runs past the end of the packet.
    pub fn payload(&self) -> Option<&[u8]> {
        if !self.has_payload() {
            return None;
        }

        let mut offset = 4;
        if self.has_adaptation_field() {
            offset += 1 + self.bytes[4] as usize;
        }

        if offset >= TS_PACKET_SIZE {
            return None;
        }

        Some(&self.bytes[offset..])
    }
}

/// Read-only, packet-addressed view over a transport stream.
pub struct TsReader<R> {
    reader: R,
    packet_count: u64,
}

impl<R: Read + Seek> TsReader<R> {
    /// Open a transport stream, verifying sync alignment of the first packets.
    pub fn new(mut reader: R) -> Result<Self> {
        let file_size = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let packet_count = file_size / TS_PACKET_SIZE as u64;
        if packet_count == 0 {
            return Err(ProbeError::invalid_container(
                0,
                format!("stream is shorter than one packet ({} bytes)", file_size),
            ));
        }

        let mut ts = Self {
            reader,
            packet_count,
        };

        for index in 0..packet_count.min(SYNC_PROBE_PACKETS) {
            ts.read_packet(index)?;
        }

        ts.reader.seek(SeekFrom::Start(0))?;
        Ok(ts)
    }

    /// Number of complete packets in the stream.
    pub fn packet_count(&self) -> u64 {
        self.packet_count
    }

    /// Read one packet by index.
    pub fn read_packet(&mut self, index: u64) -> Result<TsPacket> {
        if index >= self.packet_count {
            return Err(ProbeError::invalid_container(
                index,
                format!("packet index beyond end of stream ({})", self.packet_count),
            ));
        }

        self.reader
            .seek(SeekFrom::Start(index * TS_PACKET_SIZE as u64))?;
        self.next_packet(index)
    }

    fn next_packet(&mut self, index: u64) -> Result<TsPacket> {
        let mut bytes = [0u8; TS_PACKET_SIZE];
        self.reader.read_exact(&mut bytes).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                ProbeError::invalid_container(index, "truncated packet")
            } else {
                ProbeError::Io(e)
            }
        })?;

        if bytes[0] != SYNC_BYTE {
            return Err(ProbeError::invalid_container(
                index,
                format!("expected sync byte 0x47, found 0x{:02x}", bytes[0]),
            ));
        }

        Ok(TsPacket::new(bytes))
    }

    /// Visit packets sequentially starting at `start`, for at most `limit`
    /// packets (or to the end of the stream).
    ///
    /// The visitor returns `ControlFlow::Break(value)` to stop early; that
    /// value is returned as `Some`. Reaching the limit or the end yields `None`.
    pub fn scan<T, F>(&mut self, start: u64, limit: Option<u64>, mut visit: F) -> Result<Option<T>>
    where
        F: FnMut(u64, &TsPacket) -> Result<ControlFlow<T>>,
    {
        if start >= self.packet_count {
            return Ok(None);
        }

        let end = match limit {
            Some(n) => start.saturating_add(n).min(self.packet_count),
            None => self.packet_count,
        };

        self.reader
            .seek(SeekFrom::Start(start * TS_PACKET_SIZE as u64))?;

        for index in start..end {
            let packet = self.next_packet(index)?;
            if let ControlFlow::Break(value) = visit(index, &packet)? {
                return Ok(Some(value));
            }
        }

        Ok(None)
    }
}
