//! Error types for tstot-probe

/// Result type for tstot-probe operations.
pub type Result<T> = std::result::Result<T, ProbeError>;

/// Errors that can occur while demuxing a transport stream
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The input is not a sync-aligned MPEG-2 transport stream
    #[error("Invalid container format at packet {packet_index}: {reason}")]
    InvalidContainerFormat { packet_index: u64, reason: String },

    /// No PID carries video PES packets with a presentation timestamp
    #[error("No video stream found in container")]
    NoVideoStreamFound,

    /// Packet belongs to a different PID than the one requested
    #[error("Packet PID 0x{found:04x} does not match expected PID 0x{expected:04x}")]
    NotThisPid { expected: u16, found: u16 },

    /// Section bytes are structurally inconsistent
    #[error("Malformed section: {0}")]
    MalformedSection(String),

    /// MJD/BCD time field does not encode a valid date-time
    #[error("Invalid time encoding: mjd={} bcd={:02x}{:02x}{:02x}", .mjd, .bcd[0], .bcd[1], .bcd[2])]
    InvalidTimeEncoding { mjd: u16, bcd: [u8; 3] },

    /// No valid TOT section within the bounded search window
    #[error("TOT not found within {window} packets of packet {seed}")]
    TotNotFound { seed: u64, window: u64 },
}

impl ProbeError {
    /// Create an invalid container error.
    pub fn invalid_container(packet_index: u64, reason: impl Into<String>) -> Self {
        Self::InvalidContainerFormat {
            packet_index,
            reason: reason.into(),
        }
    }

    /// Create a malformed section error.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedSection(msg.into())
    }
}
