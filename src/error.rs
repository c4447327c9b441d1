//! Error types for segment resolution

use tstot_probe::ProbeError;
use tstot_script::ScriptError;

/// Result type for tstot operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a resolution run
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Script(#[from] ScriptError),

    /// Trim range whose start frame comes after its end frame
    #[error("Trim range [{start}, {end}] is inverted")]
    InvertedTrimRange { start: u32, end: u32 },

    /// Trim range reaching past the last indexed frame
    #[error("Trim range [{start}, {end}] is out of bounds: video has {total_frames} frames")]
    FrameRangeOutOfBounds {
        start: u32,
        end: u32,
        total_frames: u32,
    },

    /// No TOT could be found for a segment boundary
    #[error("TOT search failed for frame {frame}")]
    TotSearchFailed { frame: u32, source: ProbeError },
}
