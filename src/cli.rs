use clap::{Parser, Subcommand};
use df_core::Profile;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "deckforge")]
#[command(author, version, about = "Rebuild recorded conference talks into a single video")]
pub struct Cli {
    /// Enable the on-disk resource cache
    #[arg(long, global = true)]
    pub cache: bool,

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
    /// Build a talk video from a talk manifest
    Download {
        /// Talk manifest (JSON) describing slides, timecodes and video
        #[arg(required = true)]
        manifest: PathBuf,

        /// Output file (defaults to <id>.avi)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite the output file if it exists
        #[arg(short = 'y', long)]
        overwrite: bool,

        /// Output format: legacy, h264 or h264_overlay
        #[arg(short = 't', long = "type", value_parser = parse_profile)]
        profile: Option<Profile>,

        /// Path to the ffmpeg binary
        #[arg(long)]
        ffmpeg: Option<PathBuf>,

        /// Path to the rtmpdump binary
        #[arg(long)]
        rtmpdump: Option<PathBuf>,

        /// Path to the swfrender binary
        #[arg(long)]
        swfrender: Option<PathBuf>,
    },

    /// Inspect or empty the resource cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Display version information
    Version,
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Print the disk space used by the cache
    Size,

    /// Remove every cached resource
    Clear,
}

fn parse_profile(s: &str) -> Result<Profile, String> {
    s.parse().map_err(|e: df_core::Error| e.to_string())
}
