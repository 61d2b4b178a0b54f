use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use danmaku::{PlaybackKind, RemoteKey};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "danmaku", version, about = "Danmaku overlay simulator", long_about = None)]
pub struct Args {
    /// Path to the configuration file
    #[arg(short, long, global = true, env = "DANMAKU_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a playback session against an in-memory surface
    Simulate {
        /// Kind of playback screen
        #[arg(short, long, default_value = "video", value_parser = parse_kind)]
        kind: PlaybackKind,

        /// Surface width in pixels
        #[arg(long, default_value_t = 1920)]
        width: u32,

        /// Surface height in pixels
        #[arg(long, default_value_t = 1080)]
        height: u32,

        /// How long to run, in seconds
        #[arg(short, long, default_value_t = 10)]
        duration: u64,

        /// Frames per second, overrides the configuration file
        #[arg(long)]
        fps: Option<u32>,

        /// Seed for lane, speed and feed randomness
        #[arg(long)]
        seed: Option<u64>,

        /// Danmu XML file to play instead of the demo list
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Scripted remote keys as `SECONDS:KEY`, e.g. `3:dpad_center`
        #[arg(long = "key", value_parser = parse_key_event)]
        keys: Vec<KeyEvent>,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        output: OutputFormat,
    },

    /// Print the lane layout for a surface size
    Lanes {
        #[arg(long, default_value_t = 1920)]
        width: u32,

        #[arg(long, default_value_t = 1080)]
        height: u32,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Pretty)]
        output: OutputFormat,
    },

    /// Show or reset the configuration file
    Config {
        /// Print the effective configuration
        #[arg(long)]
        show: bool,

        /// Overwrite the configuration file with defaults
        #[arg(long)]
        reset: bool,
    },

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human readable
    Pretty,
    /// Pretty-printed JSON
    Json,
    /// Single-line JSON
    JsonCompact,
}

/// A remote key pressed at a fixed point of the simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub at: Duration,
    pub key: RemoteKey,
}

fn parse_kind(s: &str) -> Result<PlaybackKind, String> {
    s.parse::<PlaybackKind>()
        .map_err(|_| format!("unknown playback kind '{s}', expected video or live"))
}

pub fn parse_key_event(s: &str) -> Result<KeyEvent, String> {
    let (secs, key) = s
        .split_once(':')
        .ok_or_else(|| format!("expected SECONDS:KEY, got '{s}'"))?;
    let secs: f64 = secs
        .trim()
        .parse()
        .map_err(|_| format!("invalid time '{secs}'"))?;
    if !secs.is_finite() || secs < 0.0 {
        return Err(format!("invalid time '{secs}'"));
    }
    let key = key
        .trim()
        .parse::<RemoteKey>()
        .map_err(|_| format!("unknown key '{key}'"))?;
    Ok(KeyEvent {
        at: Duration::from_secs_f64(secs),
        key,
    })
}
