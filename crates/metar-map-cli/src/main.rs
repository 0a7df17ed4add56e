// SPDX-License-Identifier: MIT
// Copyright (c) 2026 StarTuz

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use metar_map_core::render::{PixelSink, Rgb};
use metar_map_core::{classify, HttpFetcher, MapConfig, MapEngine, MemoryStrip, TokenKind};
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the map config file
    #[arg(short, long, env = "METAR_MAP_CONFIG")]
    config: Option<PathBuf>,

    /// Log lookups and refresh stages
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show how the configured list maps onto LEDs
    Classify {
        /// Classify this list instead of the configured one
        list: Option<String>,
    },
    /// Run one refresh and draw the strip
    Refresh {
        /// Keep the frame in memory and print it as JSON
        #[arg(long)]
        dry_run: bool,
    },
    /// Refresh on the configured interval until interrupted
    Run,
    /// Fill the strip with red, green, blue or off
    TestColor { color: String },
    /// Show or edit the stored configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    Show,
    SetList { list: String },
    SetBrightness { level: i32 },
    SetLedCount { count: Option<usize> },
}

/// Draws committed frames as a row of true-color blocks.
struct ConsoleStrip {
    pixels: Vec<Rgb>,
    brightness: u8,
}

impl ConsoleStrip {
    fn new() -> Self {
        Self {
            pixels: Vec::new(),
            brightness: 255,
        }
    }

    fn scale(&self, v: u8) -> u8 {
        ((v as u16 * self.brightness as u16) / 255) as u8
    }
}

impl PixelSink for ConsoleStrip {
    fn set_pixel(&mut self, index: usize, color: Rgb) {
        if self.pixels.len() <= index {
            self.pixels.resize(index + 1, Rgb::OFF);
        }
        self.pixels[index] = color;
    }

    fn set_brightness(&mut self, level: u8) {
        self.brightness = level;
    }

    fn commit(&mut self) -> Result<()> {
        let mut out = std::io::stdout().lock();
        for px in &self.pixels {
            write!(
                out,
                "\x1b[38;2;{};{};{}m\u{25CF}\x1b[0m",
                self.scale(px.r),
                self.scale(px.g),
                self.scale(px.b)
            )?;
        }
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let config = ConfigBuilder::new()
        .add_filter_allow_str("metar_map")
        .build();
    let _ = TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.unwrap_or_else(MapConfig::default_path);
    let mut config = MapConfig::load(&config_path)?;

    match cli.command {
        Commands::Classify { list } => {
            let source = list.unwrap_or_else(|| config.map_list.clone());
            let arena = classify(&source);
            for token in arena.iter() {
                let kind = match &token.kind {
                    TokenKind::Airport(id) => format!("airport {}", id),
                    TokenKind::Skip => "skip".to_string(),
                    TokenKind::Legend(cat) => format!("legend {}", cat),
                    TokenKind::Invalid => "invalid (idle)".to_string(),
                };
                println!("{:>3}  {:<10} {}", token.position, token.raw, kind);
            }
            println!("{} tokens, {} airports", arena.len(), arena.airport_count());
        }
        Commands::Refresh { dry_run } => {
            let fetcher = HttpFetcher::new(config.connect_timeout(), config.request_timeout())?;
            if dry_run {
                let engine = MapEngine::new(config.engine_settings(), fetcher, MemoryStrip::new());
                let summary = engine.set_list(&config.map_list)?;
                println!("{}", serde_json::to_string_pretty(&summary)?);
                println!("{}", serde_json::to_string(&engine.frame())?);
            } else {
                let engine = MapEngine::new(config.engine_settings(), fetcher, ConsoleStrip::new());
                let summary = engine.set_list(&config.map_list)?;
                println!(
                    "{} tokens, {} without data, {} inherited",
                    summary.token_count, summary.unresolved_count, summary.inherited_count
                );
            }
        }
        Commands::Run => {
            let fetcher = HttpFetcher::new(config.connect_timeout(), config.request_timeout())?;
            let engine = MapEngine::new(config.engine_settings(), fetcher, ConsoleStrip::new());
            engine.set_list(&config.map_list)?;
            info!(
                "Refreshing every {} minutes — config={}",
                config.refresh_minutes,
                config_path.display()
            );
            loop {
                std::thread::sleep(Duration::from_secs(30));
                if let Err(e) = engine.refresh_if_due(chrono::Utc::now()) {
                    log::warn!("Periodic refresh skipped — error={}", e);
                }
            }
        }
        Commands::TestColor { color } => {
            let Some(rgb) = Rgb::from_test_name(&color) else {
                bail!("Bad color '{}'. Use red, green, blue or off.", color);
            };
            let fetcher = HttpFetcher::new(config.connect_timeout(), config.request_timeout())?;
            let mut settings = config.engine_settings();
            settings.led_count = Some(config.led_count.unwrap_or_else(|| classify(&config.map_list).len()));
            let engine = MapEngine::new(settings, fetcher, ConsoleStrip::new());
            engine.test_pattern(rgb)?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                println!("# {}", config_path.display());
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigAction::SetList { list } => {
                let count = classify(&list).len();
                config.map_list = list;
                config.save(&config_path)?;
                println!("Saved list ({} LEDs).", count);
            }
            ConfigAction::SetBrightness { level } => {
                config.brightness = level;
                config.normalize();
                config.save(&config_path)?;
                println!("Brightness set to {}.", config.brightness);
            }
            ConfigAction::SetLedCount { count } => {
                config.led_count = count;
                config.normalize();
                config.save(&config_path)?;
                match config.led_count {
                    Some(n) => println!("LED count fixed at {}.", n),
                    None => println!("LED count follows the token list."),
                }
            }
        },
    }

    Ok(())
}
