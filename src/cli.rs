use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tstot::config::{parse_pid, ConfigOverrides};

#[derive(Parser)]
#[command(name = "tstot")]
#[command(
    author,
    version,
    about = "Broadcast TOT time for trim ranges of MPEG-2 TS recordings"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Report broadcast time for each Trim() range of a script
    Resolve {
        /// Transport stream recording
        #[arg(short, long, required = true)]
        input: PathBuf,

        /// Editing script with Trim(start,end) calls (whole recording if omitted)
        #[arg(short = 'a', long = "avs")]
        script: Option<PathBuf>,

        /// Write the JSON report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the JSON report instead of text
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        search: SearchArgs,
    },

    /// Detect the video stream and display frame index information
    Probe {
        /// Transport stream recording
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Use this video PID (decimal or 0x-prefixed hex)
        #[arg(long, value_parser = parse_pid)]
        video_pid: Option<u16>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[derive(Args)]
pub struct SearchArgs {
    /// Packets scanned forward from a frame for a TOT
    #[arg(long, value_name = "PACKETS")]
    pub window: Option<u64>,

    /// Use this video PID (decimal or 0x-prefixed hex)
    #[arg(long, value_parser = parse_pid)]
    pub video_pid: Option<u16>,

    /// Accept TOT sections with a bad CRC
    #[arg(long)]
    pub no_crc: bool,

    /// Add PTS-interpolated millisecond timing
    #[arg(long)]
    pub interpolate: bool,
}

impl From<&SearchArgs> for ConfigOverrides {
    fn from(args: &SearchArgs) -> Self {
        Self {
            window_packets: args.window,
            video_pid: args.video_pid,
            no_crc: args.no_crc,
            interpolate: args.interpolate,
        }
    }
}
