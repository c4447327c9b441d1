//! tstot - broadcast time for trim ranges of MPEG-2 TS recordings
//!
//! This library crate ties the demuxer and script reader together and exposes
//! the resolution pipeline for integration testing.

pub mod config;
pub mod error;
pub mod format;
pub mod report;
pub mod resolver;

pub use error::{Error, Result};
pub use report::{ProbeSummary, Report};
pub use resolver::{implicit_full_range, resolve, PreciseTiming, ResolveOptions, SegmentResult};

use std::path::Path;

use tstot_probe::VideoIndex;

/// Index the recording and resolve the script's trim ranges.
///
/// Without a script the whole recording is reported as one segment.
pub fn analyze(input: &Path, script: Option<&Path>, config: &config::Config) -> Result<Report> {
    let mut ts = tstot_probe::open_file(input)?;
    let index = tstot_probe::build_index(&mut ts, &config.index_options())?;

    let ranges = match script {
        Some(path) => tstot_script::read_script(path)?,
        None => vec![implicit_full_range(&index)],
    };
    tracing::info!("Resolving {} segment(s)", ranges.len());

    let segments = resolve(&mut ts, &index, &ranges, &config.resolve_options())?;
    Ok(Report::new(input, script, &index, segments))
}

/// Index the recording without resolving any ranges.
pub fn probe(input: &Path, config: &config::Config) -> Result<VideoIndex> {
    let mut ts = tstot_probe::open_file(input)?;
    Ok(tstot_probe::build_index(&mut ts, &config.index_options())?)
}
