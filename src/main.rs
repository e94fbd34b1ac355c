//! # Skirmish Main Entry Point
//!
//! Runs a single channel of battles over standard input. Each line is a
//! command; a `start battle` command continues until a blank line.

use clap::Parser;
use log::{error, info};
use skirmish::{config, BattleRegistry, EngineConfig, PresetStore, Session, SkirmishResult};
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Command line arguments for Skirmish.
#[derive(Parser, Debug)]
#[command(name = "skirmish")]
#[command(about = "A turn-based tactical battle engine for chat channels")]
#[command(version)]
struct Args {
    /// Random seed for initial character placement
    #[arg(short, long)]
    seed: Option<u64>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// File battle presets are stored in
    #[arg(long, default_value = "data/presets.json")]
    presets: PathBuf,

    /// Delay before CPU characters act, in milliseconds
    #[arg(long, default_value_t = config::CPU_COMMAND_DELAY_MS)]
    cpu_delay_ms: u64,

    /// Guild presets are saved under
    #[arg(long, default_value = "local")]
    guild: String,

    /// Channel the battle runs in
    #[arg(long, default_value = "console")]
    channel: String,
}

#[tokio::main]
async fn main() -> SkirmishResult<()> {
    let args = Args::parse();

    initialize_logging(&args.log_level);

    info!("Starting Skirmish v{}", skirmish::VERSION);

    let engine_config = EngineConfig {
        cpu_delay: Duration::from_millis(args.cpu_delay_ms),
        placement_seed: args.seed,
        ..EngineConfig::new()
    };
    let (registry, mut events) = BattleRegistry::with_events(engine_config);
    let presets = PresetStore::open(&args.presets)?;
    info!("Loaded presets from {}", args.presets.display());

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("{}", event.to_text());
        }
    });

    let mut session = Session::new(registry, presets, args.guild, args.channel);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(message) = read_message(&mut lines).await? {
        match session.handle(&message).await {
            Ok(Some(reply)) => println!("{}", reply),
            Ok(None) => {}
            Err(e) => {
                if !e.is_user_error() {
                    error!("Command failed: {}", e);
                }
                println!("{}", e);
            }
        }
    }

    info!("Input closed, shutting down");
    Ok(())
}

/// Initializes logging; `RUST_LOG` takes precedence over `log_level`.
fn initialize_logging(log_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_target(false)
        .init();
}

/// Reads the next message, joining the roster lines of a `start battle`.
async fn read_message(lines: &mut Lines<BufReader<Stdin>>) -> SkirmishResult<Option<String>> {
    let first = loop {
        match lines.next_line().await? {
            Some(line) if line.trim().is_empty() => continue,
            Some(line) => break line,
            None => return Ok(None),
        }
    };

    let header = first.trim_start().trim_start_matches(">>").trim_start();
    if !header.to_lowercase().starts_with("start battle") {
        return Ok(Some(first));
    }

    let mut message = first;
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            break;
        }
        message.push('\n');
        message.push_str(&line);
    }
    Ok(Some(message))
}
