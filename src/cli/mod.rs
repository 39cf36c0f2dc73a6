//! CLI argument definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::image_ops::ResizeStrategy;

/// scdk - stream full-panel images to Stream Deck XL devices.
///
/// Robot Mode: Use --robot or --format json for machine-parseable output.
#[derive(Parser, Debug)]
#[command(name = "scdk", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (text for humans, json for agents/scripts)
    #[arg(
        long,
        short = 'f',
        default_value = "text",
        global = true,
        env = "SCDK_FORMAT"
    )]
    pub format: OutputFormat,

    /// Robot mode: equivalent to --format=json
    #[arg(long, global = true)]
    pub robot: bool,

    /// Verbose output (-v debug, -vv trace)
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (only errors are logged)
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Target device by serial number (required if multiple devices connected)
    #[arg(long, short = 's', global = true, env = "SCDK_SERIAL")]
    pub serial: Option<String>,

    /// JPEG quality for key tiles (0-100)
    #[arg(
        long,
        global = true,
        env = "SCDK_QUALITY",
        value_parser = clap::value_parser!(u8).range(0..=100)
    )]
    pub quality: Option<u8>,

    /// Configuration file (default: <config dir>/screamdeck/config.toml)
    #[arg(long, short = 'c', global = true, env = "SCDK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format selection.
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text with optional color
    #[default]
    Text,
    /// JSON output for scripts and agents
    Json,
    /// Compact JSON (single line)
    JsonCompact,
}

impl Cli {
    /// Returns true if output should be JSON (robot mode or explicit --format=json).
    pub const fn use_json(&self) -> bool {
        self.robot || matches!(self.format, OutputFormat::Json | OutputFormat::JsonCompact)
    }

    /// Returns true if output should be compact JSON.
    pub const fn use_compact_json(&self) -> bool {
        matches!(self.format, OutputFormat::JsonCompact)
    }
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    // === Device Discovery & Info ===
    /// List connected devices
    List,

    /// Show device information and panel geometry
    Info,

    // === Display Control ===
    /// Set display brightness (clamped to 0-100)
    Brightness(BrightnessArgs),

    /// Switch the device to its screensaver
    Screensaver,

    /// Stream an image file across the whole panel
    Panel(PanelArgs),

    /// Fill the whole panel with a solid color
    Fill(FillArgs),

    /// Set a single key from an image file
    Key(KeyArgs),

    // === Input Monitoring ===
    /// Read current key states once
    Read,

    /// Watch for key presses (streams events)
    Watch(WatchArgs),

    // === Utilities ===
    /// Show the effective configuration
    Config,

    /// Show version and build information
    Version,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// === Argument Structs ===

#[derive(Parser, Debug)]
pub struct BrightnessArgs {
    /// Brightness percent; values outside 0-100 are clamped
    #[arg(allow_negative_numbers = true)]
    pub level: i32,
}

#[derive(Parser, Debug)]
pub struct PanelArgs {
    /// Image file covering the whole panel
    pub image: PathBuf,

    /// How to fit the image to the panel
    #[arg(long, short = 'r', value_enum, default_value_t = ResizeStrategy::Fit)]
    pub resize: ResizeStrategy,

    /// Resend the panel this many times (unchanged tiles are skipped)
    #[arg(long, default_value_t = 1)]
    pub frames: u32,

    /// Frames per second when --frames is greater than one
    #[arg(long, default_value_t = 40)]
    pub fps: u32,
}

#[derive(Parser, Debug)]
pub struct FillArgs {
    /// Hex color (e.g., ff0000 or #ff0000)
    pub color: String,
}

#[derive(Parser, Debug)]
pub struct KeyArgs {
    /// Key column (0-based)
    pub column: usize,

    /// Key row (0-based)
    pub row: usize,

    /// Image file for the key
    pub image: PathBuf,

    /// How to fit the image to the key
    #[arg(long, short = 'r', value_enum, default_value_t = ResizeStrategy::Fit)]
    pub resize: ResizeStrategy,
}

#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Exit after the first key press
    #[arg(long)]
    pub once: bool,

    /// Stop watching after this many seconds (0 = forever)
    #[arg(long, short = 't', default_value_t = 0)]
    pub timeout: u64,
}

#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    pub shell: clap_complete::Shell,
}
