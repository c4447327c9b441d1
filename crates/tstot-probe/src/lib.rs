//! # tstot-probe
//!
//! MPEG-2 transport stream demuxing for broadcast time recovery.
//!
//! This crate builds a frame-indexed PTS table for the video stream of a
//! recorded broadcast and finds the Time Offset Table (TOT) entries carried
//! alongside it.
//!
//! ## Features
//!
//! - Sync-checked, packet-addressed reading over any `Read + Seek`
//! - Single-packet PSI/SI section reader with CRC-32/MPEG-2 validation
//! - PAT/PMT based video PID detection with a PES stream-id fallback
//! - Bounded forward TOT search
//! - ETSI EN 300 468 Annex C MJD/BCD decoding in integer arithmetic
//!
//! ## Example
//!
//! ```no_run
//! use tstot_probe::{build_index, open_file, IndexOptions, TotLocator};
//!
//! let mut ts = open_file("recording.ts").unwrap();
//! let index = build_index(&mut ts, &IndexOptions::default()).unwrap();
//! println!("Video PID 0x{:04x}, {} frames", index.video_pid, index.total_frames());
//!
//! let first = index.get(0).unwrap();
//! let tot = TotLocator::new().locate(&mut ts, first.packet_index).unwrap();
//! println!("Frame 0 near {}", tot.decoded);
//! ```

pub mod error;
pub mod index;
pub mod mjd;
pub mod packet;
pub mod pes;
pub mod psi;
pub mod section;
#[cfg(any(test, feature = "synth"))]
pub mod synth;
pub mod tot;

pub use error::{ProbeError, Result};
pub use index::{build_index, FrameEntry, IndexOptions, PidSource, VideoIndex};
pub use packet::{TsPacket, TsReader, TS_PACKET_SIZE};
pub use tot::{TotLocator, TotRecord, DEFAULT_SEARCH_WINDOW};

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Open a transport stream file for packet-addressed reading.
pub fn open_file<P: AsRef<Path>>(path: P) -> Result<TsReader<BufReader<File>>> {
    let path = path.as_ref();
    let file = File::open(path)?;
    TsReader::new(BufReader::with_capacity(TS_PACKET_SIZE * 1024, file))
}
