//! Text and JSON rendering of resolution results.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tstot_probe::{PidSource, VideoIndex};

use crate::format;
use crate::resolver::SegmentResult;

/// Everything a resolution run produces.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub input_file: PathBuf,
    pub script_file: Option<PathBuf>,
    pub video_pid: u16,
    pub total_frames: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<u16>,
    pub segments: Vec<SegmentResult>,
}

impl Report {
    pub fn new(
        input_file: &Path,
        script_file: Option<&Path>,
        index: &VideoIndex,
        segments: Vec<SegmentResult>,
    ) -> Self {
        Self {
            input_file: input_file.to_path_buf(),
            script_file: script_file.map(Path::to_path_buf),
            video_pid: index.video_pid,
            total_frames: index.total_frames(),
            sid: index.service_id,
            segments,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable report with times followed by `time_label`.
    pub fn render_text(&self, time_label: &str) -> String {
        let mut out = format!(
            "Video PID: 0x{:04x}\nTotal frames: {}\n",
            self.video_pid, self.total_frames
        );
        if let Some(sid) = self.sid {
            out.push_str(&format!("Service ID: {} (0x{:x})\n", sid, sid));
        }
        if self.segments.is_empty() {
            out.push_str("\nNo segments.\n");
        }

        for segment in &self.segments {
            let label = if self.script_file.is_some() {
                format!("Segment {}", segment.index)
            } else {
                "Full Video".to_string()
            };
            out.push_str(&format!(
                "\n{}: frames [{}, {}]\n",
                label, segment.frames.0, segment.frames.1
            ));

            let (start, end, duration) = match &segment.precise {
                Some(precise) => {
                    let millis = precise.duration_millis.unsigned_abs();
                    (
                        format::millis(&precise.start_time),
                        format::millis(&precise.end_time),
                        format!(
                            "{}{}.{:03}",
                            if precise.duration_millis < 0 { "-" } else { "" },
                            millis / 1000,
                            millis % 1000
                        ),
                    )
                }
                None => (
                    format::seconds(&segment.start_time),
                    format::seconds(&segment.end_time),
                    segment.duration_seconds.to_string(),
                ),
            };
            out.push_str(&format!("  Start TOT: {} {}\n", start, time_label));
            out.push_str(&format!("  End TOT:   {} {}\n", end, time_label));
            out.push_str(&format!("  Duration:  {} seconds\n", duration));
        }

        out
    }
}

/// Summary of the detected video stream, for the `probe` command.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeSummary {
    pub input_file: PathBuf,
    pub video_pid: u16,
    pub pid_source: PidSource,
    pub total_frames: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<u16>,
    pub skipped_pes: u32,
    pub first_pts: Option<u64>,
    pub last_pts: Option<u64>,
}

impl ProbeSummary {
    pub fn new(input_file: &Path, index: &VideoIndex) -> Self {
        Self {
            input_file: input_file.to_path_buf(),
            video_pid: index.video_pid,
            pid_source: index.pid_source,
            total_frames: index.total_frames(),
            sid: index.service_id,
            skipped_pes: index.skipped_pes,
            first_pts: index.first().map(|f| f.pts),
            last_pts: index.last().map(|f| f.pts),
        }
    }

    pub fn render_text(&self) -> String {
        let mut lines = vec![
            format!("File: {}", self.input_file.display()),
            format!("Video PID: 0x{:04x} ({})", self.video_pid, self.pid_source),
            format!("Total frames: {}", self.total_frames),
        ];
        if let Some(sid) = self.sid {
            lines.push(format!("Service ID: {} (0x{:x})", sid, sid));
        }
        if let (Some(first), Some(last)) = (self.first_pts, self.last_pts) {
            lines.push(format!("PTS: {} .. {}", first, last));
        }
        if self.skipped_pes > 0 {
            lines.push(format!("Skipped PES: {}", self.skipped_pes));
        }
        lines.push(String::new());
        lines.join("\n")
    }
}
