mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;
use tstot_probe::IndexOptions;

use crate::resolver::ResolveOptions;

/// Lowest PID that may carry an elementary stream.
const MIN_ELEMENTARY_PID: u16 = 0x0010;

/// Highest PID below the null PID.
const MAX_ELEMENTARY_PID: u16 = 0x1FFE;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = ["./tstot.toml", "~/.config/tstot/config.toml"];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            tracing::debug!("Using config file {:?}", path);
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.search.window_packets == 0 {
        anyhow::bail!("TOT search window cannot be 0 packets");
    }

    if let Some(pid) = config.video.pid {
        if !(MIN_ELEMENTARY_PID..=MAX_ELEMENTARY_PID).contains(&pid) {
            anyhow::bail!(
                "Video PID 0x{:04x} is outside 0x{:04x}..=0x{:04x}",
                pid,
                MIN_ELEMENTARY_PID,
                MAX_ELEMENTARY_PID
            );
        }
    }

    if config.report.time_label.trim().is_empty() {
        anyhow::bail!("Report time label cannot be empty");
    }

    if !config.search.verify_crc {
        tracing::warn!("TOT CRC verification is disabled");
    }

    Ok(())
}

/// Parse a PID given as decimal or `0x`-prefixed hex.
pub fn parse_pid(value: &str) -> std::result::Result<u16, String> {
    let value = value.trim();
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse(),
    };
    match parsed {
        Ok(pid) if pid <= 0x1FFF => Ok(pid),
        _ => Err(format!("invalid PID '{}': expected 0..=0x1fff", value)),
    }
}

impl Config {
    /// Apply command-line overrides.
    pub fn apply(&mut self, overrides: &ConfigOverrides) {
        if let Some(window) = overrides.window_packets {
            self.search.window_packets = window;
        }
        if let Some(pid) = overrides.video_pid {
            self.video.pid = Some(pid);
        }
        if overrides.no_crc {
            self.search.verify_crc = false;
        }
        if overrides.interpolate {
            self.report.interpolate = true;
        }
    }

    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            video_pid: self.video.pid,
        }
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            window: self.search.window_packets,
            verify_crc: self.search.verify_crc,
            interpolate: self.report.interpolate,
        }
    }
}
