//! scdk - stream full-panel images to Stream Deck XL devices.
//!
//! Provides both human-friendly and agent-friendly (robot mode) output.
#![forbid(unsafe_code)]

use std::io::{self, IsTerminal};
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use console::style;
use serde::Serialize;
use tracing::{debug, info};

use scdk::cli::{self, Cli, Commands};
use scdk::config::{self, Config};
use scdk::device::{self, ButtonEvent, DeviceDescriptor, HidTransport};
use scdk::error::{Result, ScdkError};
use scdk::image_ops;
use scdk::logging;
use scdk::pixel::PixelFormat;
use scdk::session::{DeviceSession, UpdateStats};

/// Build information embedded at compile time.
mod build_info {
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    pub fn git_sha() -> &'static str {
        option_env!("VERGEN_GIT_SHA").unwrap_or("unknown")
    }

    pub fn git_dirty() -> &'static str {
        option_env!("VERGEN_GIT_DIRTY").unwrap_or("false")
    }

    pub fn build_timestamp() -> &'static str {
        option_env!("VERGEN_BUILD_TIMESTAMP").unwrap_or("unknown")
    }

    pub fn rustc_semver() -> &'static str {
        option_env!("VERGEN_RUSTC_SEMVER").unwrap_or("unknown")
    }

    pub fn target() -> &'static str {
        option_env!("VERGEN_CARGO_TARGET_TRIPLE").unwrap_or("unknown")
    }
}

fn main() {
    let cli = Cli::parse();

    if cli.no_color || !io::stdout().is_terminal() {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    logging::init_logging(cli.use_json(), cli.verbose, cli.quiet);

    if let Err(e) = run(&cli) {
        output_error(&cli, &e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    match &cli.command {
        Commands::List => cmd_list(cli),
        Commands::Info => cmd_info(cli),
        Commands::Brightness(args) => cmd_brightness(cli, args),
        Commands::Screensaver => cmd_screensaver(cli),
        Commands::Panel(args) => cmd_panel(cli, args),
        Commands::Fill(args) => cmd_fill(cli, args),
        Commands::Key(args) => cmd_key(cli, args),
        Commands::Read => cmd_read(cli),
        Commands::Watch(args) => cmd_watch(cli, args),
        Commands::Config => cmd_config(cli),
        Commands::Version => cmd_version(cli),
        Commands::Completions(args) => cmd_completions(args),
    }
}

// === Configuration & Device Helpers ===

/// Merge the config file with command-line overrides.
fn effective_config(cli: &Cli) -> Result<Config> {
    let mut config = config::load_effective(cli.config.as_deref())?;
    if let Some(serial) = &cli.serial {
        config.serial = Some(serial.clone());
    }
    if let Some(quality) = cli.quality {
        config.quality = quality;
    }
    debug!(?config, "Effective configuration");
    Ok(config)
}

/// Open the configured device and apply the configured brightness.
fn open_session(config: &Config) -> Result<(DeviceSession<HidTransport>, DeviceDescriptor)> {
    let (mut session, descriptor) =
        DeviceSession::open(config.serial.as_deref(), config.session_options())?;
    if let Some(level) = config.brightness {
        session.set_brightness(i32::from(level))?;
    }
    Ok((session, descriptor))
}

// === Commands ===

fn cmd_list(cli: &Cli) -> Result<()> {
    let devices = device::list_devices()?;

    if cli.use_json() {
        output_json(cli, &devices);
    } else if devices.is_empty() {
        println!("{}", style("No Stream Deck XL devices found").yellow());
        println!("Ensure device is connected via USB");
    } else {
        for d in &devices {
            println!(
                "{}: {} ({}x{} keys, {}x{} px panel)",
                style(&d.serial).green(),
                d.product_name,
                d.geometry.columns,
                d.geometry.rows,
                d.geometry.panel_width(),
                d.geometry.panel_height()
            );
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct InfoOutput<'a> {
    #[serde(flatten)]
    device: &'a DeviceDescriptor,
    reported_serial: String,
    panel_width: usize,
    panel_height: usize,
    key_count: usize,
}

fn cmd_info(cli: &Cli) -> Result<()> {
    let config = effective_config(cli)?;
    let (mut session, descriptor) = open_session(&config)?;
    let g = descriptor.geometry;
    let info = InfoOutput {
        device: &descriptor,
        reported_serial: session.serial_number()?,
        panel_width: g.panel_width(),
        panel_height: g.panel_height(),
        key_count: g.key_count(),
    };

    if cli.use_json() {
        output_json(cli, &info);
    } else {
        println!("{}: {}", style("Product").bold(), descriptor.product_name);
        println!("{}: {}", style("Serial").bold(), info.reported_serial);
        println!("{}: {:#06x}", style("Product ID").bold(), descriptor.product_id);
        println!(
            "{}: {} cols x {} rows ({} keys)",
            style("Layout").bold(),
            g.columns,
            g.rows,
            info.key_count
        );
        println!(
            "{}: {}x{} px, gap {}x{} px",
            style("Key Size").bold(),
            g.key_width,
            g.key_height,
            g.gap_width,
            g.gap_height
        );
        println!(
            "{}: {}x{} px",
            style("Panel").bold(),
            info.panel_width,
            info.panel_height
        );
    }
    session.close();
    Ok(())
}

fn cmd_brightness(cli: &Cli, args: &cli::BrightnessArgs) -> Result<()> {
    let config = effective_config(cli)?;
    let (mut session, _) = open_session(&config)?;
    session.set_brightness(args.level)?;
    let level = args.level.clamp(0, 100);

    if cli.use_json() {
        output_json(cli, &serde_json::json!({ "success": true, "brightness": level }));
    } else if !cli.quiet {
        println!("Brightness set to {level}%");
    }
    Ok(())
}

fn cmd_screensaver(cli: &Cli) -> Result<()> {
    let config = effective_config(cli)?;
    let (mut session, _) = open_session(&config)?;
    session.show_screensaver()?;

    if cli.use_json() {
        output_json(cli, &serde_json::json!({ "success": true }));
    } else if !cli.quiet {
        println!("Screensaver shown");
    }
    Ok(())
}

#[derive(Serialize)]
struct UpdateOutput {
    success: bool,
    frames: u32,
    tiles_sent: usize,
    tiles_skipped: usize,
    reports: usize,
    elapsed_ms: u128,
}

fn print_update(cli: &Cli, frames: u32, total: UpdateStats, started: Instant) {
    let out = UpdateOutput {
        success: true,
        frames,
        tiles_sent: total.sent,
        tiles_skipped: total.skipped,
        reports: total.reports,
        elapsed_ms: started.elapsed().as_millis(),
    };
    if cli.use_json() {
        output_json(cli, &out);
    } else if !cli.quiet {
        println!(
            "{} {} tiles sent, {} unchanged, {} reports in {} ms",
            style("Updated:").green(),
            out.tiles_sent,
            out.tiles_skipped,
            out.reports,
            out.elapsed_ms
        );
    }
}

fn accumulate(total: &mut UpdateStats, stats: UpdateStats) {
    total.sent += stats.sent;
    total.skipped += stats.skipped;
    total.reports += stats.reports;
}

fn cmd_panel(cli: &Cli, args: &cli::PanelArgs) -> Result<()> {
    if args.frames == 0 || args.fps == 0 {
        return Err(ScdkError::InvalidArgument(
            "--frames and --fps must be at least 1".to_string(),
        ));
    }
    let config = effective_config(cli)?;
    let path = config::expand_home(&args.image)?;
    // Decode before touching the device so bad input never opens it.
    let image = image_ops::load_image(&path)?;

    let (mut session, _) = open_session(&config)?;
    let g = session.geometry();
    let panel = image_ops::resize_rgb(
        &image,
        g.panel_width() as u32,
        g.panel_height() as u32,
        args.resize,
    )
    .into_raw();

    let interval = Duration::from_secs(1) / args.fps;
    let started = Instant::now();
    let mut total = UpdateStats::default();
    for frame in 0..args.frames {
        let frame_start = Instant::now();
        let stats = session.set_panel_image(&panel, PixelFormat::Rgb)?;
        debug!(frame, sent = stats.sent, skipped = stats.skipped, "Frame pushed");
        accumulate(&mut total, stats);
        if frame + 1 < args.frames {
            thread::sleep(interval.saturating_sub(frame_start.elapsed()));
        }
    }

    info!(frames = args.frames, sent = total.sent, "Panel streamed");
    print_update(cli, args.frames, total, started);
    Ok(())
}

fn cmd_fill(cli: &Cli, args: &cli::FillArgs) -> Result<()> {
    let color = parse_color(&args.color)?;
    let config = effective_config(cli)?;
    let (mut session, _) = open_session(&config)?;

    let started = Instant::now();
    let panel = image_ops::solid_panel(session.geometry(), color);
    let stats = session.set_panel_image(&panel, PixelFormat::Rgb)?;
    print_update(cli, 1, stats, started);
    Ok(())
}

fn cmd_key(cli: &Cli, args: &cli::KeyArgs) -> Result<()> {
    let config = effective_config(cli)?;
    let path = config::expand_home(&args.image)?;
    let image = image_ops::load_image(&path)?;

    let (mut session, _) = open_session(&config)?;
    let g = session.geometry();
    g.key_index(args.column, args.row)?;
    let (width, height) = (g.key_width as u32, g.key_height as u32);
    let key = image_ops::resize_rgb(&image, width, height, args.resize).into_raw();

    let started = Instant::now();
    let stats = session.set_key_image(args.column, args.row, &key, PixelFormat::Rgb)?;
    print_update(cli, 1, stats, started);
    Ok(())
}

fn pressed_keys(states: &[bool], columns: usize, elapsed: Duration) -> Vec<ButtonEvent> {
    states
        .iter()
        .enumerate()
        .filter(|&(_, pressed)| *pressed)
        .map(|(key, _)| ButtonEvent {
            column: key % columns,
            row: key / columns,
            key: key as u8,
            pressed: true,
            timestamp_ms: elapsed.as_millis().min(u128::from(u64::MAX)) as u64,
        })
        .collect()
}

fn cmd_read(cli: &Cli) -> Result<()> {
    let config = effective_config(cli)?;
    let (mut session, _) = open_session(&config)?;
    let g = session.geometry();
    let mut states = vec![false; g.key_count()];
    let got = session.read_key_states(&mut states, config.input_timeout())?;

    if cli.use_json() {
        output_json(cli, &serde_json::json!({ "updated": got.is_some(), "keys": states }));
    } else {
        let pressed = pressed_keys(&states, g.columns, Duration::ZERO);
        if got.is_none() {
            println!("No new key report");
        } else if pressed.is_empty() {
            println!("No keys pressed");
        } else {
            for e in pressed {
                println!("Key ({}, {}) [{}]: pressed", e.column, e.row, e.key);
            }
        }
    }
    Ok(())
}

fn cmd_watch(cli: &Cli, args: &cli::WatchArgs) -> Result<()> {
    let config = effective_config(cli)?;
    let (mut session, _) = open_session(&config)?;
    let g = session.geometry();

    if !cli.quiet && !cli.use_json() {
        println!("Watching for key presses (Ctrl+C to stop)...");
    }

    let start = Instant::now();
    let limit = (args.timeout > 0).then(|| Duration::from_secs(args.timeout));
    let mut states = vec![false; g.key_count()];

    while limit.is_none_or(|t| start.elapsed() < t) {
        if session
            .read_key_states(&mut states, config.input_timeout())?
            .is_none()
        {
            continue;
        }
        let events = pressed_keys(&states, g.columns, start.elapsed());
        for event in &events {
            if cli.use_json() {
                // One event per line, whatever the output format.
                print_json(event, true);
            } else {
                println!("Key ({}, {}) [{}]: pressed", event.column, event.row, event.key);
            }
        }
        if args.once && !events.is_empty() {
            break;
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ConfigOutput {
    path: Option<String>,
    loaded_from_file: bool,
    #[serde(flatten)]
    config: Config,
}

fn cmd_config(cli: &Cli) -> Result<()> {
    let config = effective_config(cli)?;
    let path = cli.config.clone().or_else(config::default_config_path);
    let out = ConfigOutput {
        loaded_from_file: path.as_ref().is_some_and(|p| p.is_file()),
        path: path.map(|p| p.display().to_string()),
        config,
    };

    if cli.use_json() {
        output_json(cli, &out);
    } else {
        println!(
            "{}: {}{}",
            style("Config file").bold(),
            out.path.as_deref().unwrap_or("(none)"),
            if out.loaded_from_file { "" } else { " (not present)" }
        );
        let body = toml::to_string_pretty(&out.config)
            .map_err(|e| ScdkError::ConfigParse(e.to_string()))?;
        print!("{body}");
    }
    Ok(())
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_version(cli: &Cli) -> Result<()> {
    if cli.use_json() {
        output_json(
            cli,
            &serde_json::json!({
                "version": build_info::VERSION,
                "git_sha": build_info::git_sha(),
                "git_dirty": build_info::git_dirty() == "true",
                "build_timestamp": build_info::build_timestamp(),
                "rustc_version": build_info::rustc_semver(),
                "target": build_info::target(),
            }),
        );
    } else {
        println!("scdk {}", build_info::VERSION);
        println!(
            "git: {}{}",
            build_info::git_sha(),
            if build_info::git_dirty() == "true" {
                " (dirty)"
            } else {
                ""
            }
        );
        println!("built: {}", build_info::build_timestamp());
        println!("rustc: {}", build_info::rustc_semver());
        println!("target: {}", build_info::target());
    }
    Ok(())
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other commands
fn cmd_completions(args: &cli::CompletionsArgs) -> Result<()> {
    use clap::CommandFactory;
    clap_complete::generate(args.shell, &mut Cli::command(), "scdk", &mut io::stdout());
    Ok(())
}

// === Utility Functions ===

fn parse_color(s: &str) -> Result<(u8, u8, u8)> {
    let s = s.trim_start_matches('#');
    if s.len() != 6 || !s.is_ascii() {
        return Err(ScdkError::InvalidArgument(format!(
            "Invalid color format '{s}': expected 6 hex digits (e.g., ff0000)"
        )));
    }

    let channel = |range: std::ops::Range<usize>, name: &str| {
        u8::from_str_radix(&s[range], 16)
            .map_err(|_| ScdkError::InvalidArgument(format!("Invalid {name} component in '{s}'")))
    };

    Ok((channel(0..2, "red")?, channel(2..4, "green")?, channel(4..6, "blue")?))
}

fn render_json<T: Serialize>(data: &T, compact: bool) -> serde_json::Result<String> {
    if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    }
}

fn print_json<T: Serialize>(data: &T, compact: bool) {
    match render_json(data, compact) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("failed to serialize output: {e}"),
    }
}

fn output_json<T: Serialize>(cli: &Cli, data: &T) {
    print_json(data, cli.use_compact_json());
}

fn output_error(cli: &Cli, error: &ScdkError) {
    if cli.use_json() {
        let json = serde_json::json!({
            "error": true,
            "message": error.to_string(),
            "suggestion": error.suggestion(),
            "recoverable": error.is_user_recoverable(),
        });
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&json).unwrap_or_else(|_| error.to_string())
        );
    } else {
        eprintln!("{}: {}", style("Error").red().bold(), error);
        if let Some(suggestion) = error.suggestion() {
            eprintln!("{}: {}", style("Hint").yellow(), suggestion);
        }
    }
}
