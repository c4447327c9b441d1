//! Error types for tstot-script

/// Result type for script operations.
pub type Result<T> = std::result::Result<T, ScriptError>;

/// Errors that can occur while reading an editing script
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Script bytes are not valid UTF-8
    #[error("Script is not valid UTF-8 (invalid byte at offset {valid_up_to})")]
    EncodingError { valid_up_to: usize },

    /// A frame number does not fit in 32 bits
    #[error("Frame number {value} at offset {offset} is out of range")]
    FrameNumberOverflow { value: String, offset: usize },
}
