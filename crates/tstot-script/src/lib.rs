//! # tstot-script
//!
//! Reads AviSynth-style editing scripts and pulls out the frame ranges of
//! their `Trim(start,end)` calls. Nothing else in the script is interpreted.
//!
//! ## Example
//!
//! ```
//! use tstot_script::{extract_trim_ranges, TrimRange};
//!
//! let ranges = extract_trim_ranges("Trim(193,3188) ++ Trim(4988,22040)").unwrap();
//! assert_eq!(ranges, vec![TrimRange::new(193, 3188), TrimRange::new(4988, 22040)]);
//! ```

pub mod error;
pub mod extract;
pub mod tokenizer;

use std::path::Path;

pub use error::{Result, ScriptError};
pub use extract::{extract_from_bytes, extract_trim_ranges, TrimRange};

/// Read a script file and extract its trim ranges.
pub fn read_script<P: AsRef<Path>>(path: P) -> Result<Vec<TrimRange>> {
    let bytes = std::fs::read(path.as_ref())?;
    let ranges = extract_from_bytes(&bytes)?;
    if ranges.is_empty() {
        tracing::warn!("No Trim(start,end) calls in {}", path.as_ref().display());
    }
    Ok(ranges)
}
