pub mod config;
pub mod controller;
pub mod mapping;
pub mod midi;

use crate::config::{Config, ConfigError, SourceKind};
use crate::controller::cancel::CancellableSource;
use crate::controller::gamepad_source::GamepadSource;
use crate::controller::test_pattern::{TestPattern, TestPatternSource};
use crate::controller::tracking::{PoseSource, SourceError};
use crate::mapping::controller_values::ControllerEnablement;
use crate::mapping::engine::{self, RunSummary};
use crate::mapping::{DriverSettings, FrameDriver, NoteTable};
use crate::midi::log_sink::LogSink;
use crate::midi::midir_sink::{self, MidirSink};
use crate::midi::{MidiError, MidiSink};
use clap::{Args, Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "puppet_midi", version, about = "Drive a puppet rig over MIDI from tracked hand controllers")]
struct Cli {
    /// Config file, defaults to <config dir>/puppet_midi/config.toml
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log every tick at debug level
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the frame loop (default)
    Run(RunArgs),
    /// List MIDI output ports
    Ports,
    /// Print the note layout for rigging
    Notes {
        /// Show a single note by name, e.g. RightPalmUp
        name: Option<String>,
    },
    /// Write the effective config to the config path
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug, Default)]
struct RunArgs {
    /// Output port index or name substring
    #[arg(long)]
    port: Option<String>,

    /// MIDI channel 0-15
    #[arg(long)]
    channel: Option<u8>,

    /// Frames per second 1-100
    #[arg(long)]
    fps: Option<u32>,

    /// Controllers allowed to stream: all, none, or e.g. lx,ry
    #[arg(long)]
    controllers: Option<ControllerEnablement>,

    #[arg(long, allow_negative_numbers = true)]
    min_x: Option<f32>,

    #[arg(long, allow_negative_numbers = true)]
    max_x: Option<f32>,

    #[arg(long, allow_negative_numbers = true)]
    min_y: Option<f32>,

    #[arg(long, allow_negative_numbers = true)]
    max_y: Option<f32>,

    /// Heading offset of the left hand in degrees 0-359
    #[arg(long)]
    left_angle: Option<i32>,

    /// Heading offset of the right hand in degrees 0-359
    #[arg(long)]
    right_angle: Option<i32>,

    #[arg(long, value_enum)]
    source: Option<SourceKind>,

    #[arg(long, value_enum)]
    pattern: Option<TestPattern>,

    /// Stop the test pattern after this many cycles
    #[arg(long)]
    cycles: Option<u32>,

    /// Log messages instead of opening a MIDI port
    #[arg(long)]
    dry_run: bool,
}

impl RunArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(port) = &self.port {
            config.midi.port = Some(port.clone());
        }
        if let Some(channel) = self.channel {
            config.midi.channel = channel;
        }
        if let Some(fps) = self.fps {
            config.fps = fps;
        }
        if let Some(controllers) = &self.controllers {
            config.calibration.controllers = controllers.clone();
        }

        let bounds = &mut config.calibration.bounds;
        for (value, target) in [
            (self.min_x, &mut bounds.min_x),
            (self.max_x, &mut bounds.max_x),
            (self.min_y, &mut bounds.min_y),
            (self.max_y, &mut bounds.max_y),
        ] {
            if let Some(value) = value {
                *target = value;
            }
        }

        if let Some(angle) = self.left_angle {
            config.calibration.left_hand_angle = angle;
        }
        if let Some(angle) = self.right_angle {
            config.calibration.right_hand_angle = angle;
        }
        if let Some(kind) = self.source {
            config.source.kind = kind;
        }
        if let Some(pattern) = self.pattern {
            config.source.pattern = pattern;
        }
        if self.cycles.is_some() {
            config.source.cycles = self.cycles;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup(cli.verbose)?;

    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Run(RunArgs::default())) {
        Command::Run(args) => {
            args.apply(&mut config);
            config.validate()?;
            run(config, args.dry_run).await?;
        }
        Command::Ports => print_ports()?,
        Command::Notes { name } => print_notes(&config.note_table()?, name.as_deref())?,
        Command::InitConfig { force } => {
            let path = cli
                .config
                .or_else(Config::default_path)
                .ok_or(ConfigError::NoConfigDir)?;
            if path.exists() && !force {
                return Err(eyre!(
                    "{} already exists, pass --force to overwrite",
                    path.display()
                ));
            }
            config.validate()?;
            config.save(&path)?;
        }
    }

    Ok(())
}

fn setup(verbose: bool) -> Result<()> {
    if std::env::var("RUST_LIB_BACKTRACE").is_err() {
        std::env::set_var("RUST_LIB_BACKTRACE", "0")
    }
    color_eyre::install()?;
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", if verbose { "debug" } else { "info" })
    }
    setup_logging_env(if verbose { Level::DEBUG } else { Level::INFO });
    Ok(())
}

fn setup_logging_env(level: Level) {
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();
}

async fn run(config: Config, dry_run: bool) -> Result<()> {
    let table = config.note_table()?;
    let settings = DriverSettings::from(&config);
    let token = CancellationToken::new();

    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, stopping after the current tick");
                ctrl_c_token.cancel();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    // Device handles stay on the blocking thread that drives them
    let summary = tokio::task::spawn_blocking(move || -> Result<RunSummary> {
        let mut source = CancellableSource::new(open_source(&config)?, token);
        let mut sink = open_sink(&config, table.clone(), dry_run)?;
        let driver = FrameDriver::create(settings, table);
        Ok(engine::run(driver, &mut source, &mut sink))
    })
    .await??;

    info!(
        "Stopped after {} ticks and {} MIDI messages",
        summary.ticks, summary.messages
    );
    Ok(())
}

fn open_source(config: &Config) -> Result<Box<dyn PoseSource>, SourceError> {
    match config.source.kind {
        SourceKind::Gamepad => {
            info!("Using gamepad source");
            Ok(Box::new(GamepadSource::create(config.source.touch_deadzone)?))
        }
        SourceKind::Pattern => {
            info!("Using test pattern source ({:?})", config.source.pattern);
            Ok(Box::new(TestPatternSource::new(
                config.source.pattern,
                config.calibration.bounds,
                config.source.hold_frames,
                config.source.cycles,
            )))
        }
    }
}

fn open_sink(config: &Config, table: NoteTable, dry_run: bool) -> Result<Box<dyn MidiSink>, MidiError> {
    if dry_run {
        return Ok(Box::new(LogSink::new(table, config.midi.channel)));
    }
    Ok(Box::new(MidirSink::connect(
        config.midi.port.as_deref(),
        config.midi.channel,
    )?))
}

fn print_ports() -> Result<()> {
    let ports = midir_sink::list_ports()?;
    if ports.is_empty() {
        println!("No MIDI output ports found");
    }
    for port in ports {
        println!("{}: {}", port.index, port.name);
    }
    Ok(())
}

fn print_notes(table: &NoteTable, name: Option<&str>) -> Result<()> {
    let entries = match name {
        Some(name) => vec![table
            .by_name(name)
            .ok_or_else(|| eyre!("No note named {}", name))?],
        None => table.entries().iter().collect(),
    };
    for entry in entries {
        println!("{:>3}  {:<18} {}", entry.note, entry.name, entry.description);
    }
    Ok(())
}
