use serde::{Deserialize, Serialize};
use tstot_probe::DEFAULT_SEARCH_WINDOW;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub video: VideoConfig,

    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Packets scanned forward from a frame when looking for a TOT
    #[serde(default = "default_window_packets")]
    pub window_packets: u64,

    /// Reject TOT sections whose CRC-32 does not match
    #[serde(default = "default_true")]
    pub verify_crc: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            window_packets: default_window_packets(),
            verify_crc: true,
        }
    }
}

fn default_window_packets() -> u64 {
    DEFAULT_SEARCH_WINDOW
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct VideoConfig {
    /// Use this PID instead of detecting the video stream
    #[serde(default)]
    pub pid: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Civil-time label printed after broadcast times
    #[serde(default = "default_time_label")]
    pub time_label: String,

    /// Add PTS-interpolated millisecond timing
    #[serde(default)]
    pub interpolate: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            time_label: default_time_label(),
            interpolate: false,
        }
    }
}

fn default_time_label() -> String {
    "JST".to_string()
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub window_packets: Option<u64>,
    pub video_pid: Option<u16>,
    pub no_crc: bool,
    pub interpolate: bool,
}
