use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bevy::app::{AppExit, ScheduleRunnerPlugin};
use bevy::prelude::*;
use clap::Parser;
use simplelog::{LevelFilter, WriteLogger};
use tower_2048::configuration::AppConfiguration;
use tower_2048::high_score::HighScoreStore;
use tower_2048::hud::HudPlugin;
use tower_2048::term::{TerminalPlugin, TerminalScreen};
use tower_core::TowerCorePlugin;

const FRAME_INTERVAL: Duration = Duration::from_millis(30);

/// Slide tiles, merge them, and reach milestones fast enough to grow the board.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// TOML file with game settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed for tile placement
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    log_file: Option<PathBuf>,
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
    /// Where the best score is kept
    #[arg(long)]
    high_score_file: Option<PathBuf>,
}

fn load_configuration(args: &Args) -> tower_2048::Result<AppConfiguration> {
    let mut configuration = match &args.config {
        Some(path) => AppConfiguration::load(path)?,
        None => AppConfiguration::default(),
    };
    if args.seed.is_some() {
        configuration.core.seed = args.seed;
    }
    if args.log_file.is_some() {
        configuration.log_file.clone_from(&args.log_file);
    }
    if args.high_score_file.is_some() {
        configuration.high_score_file.clone_from(&args.high_score_file);
    }
    Ok(configuration)
}

fn setup_logging(level: LevelFilter, path: &Path) -> tower_2048::Result<()> {
    WriteLogger::init(
        level,
        simplelog::ConfigBuilder::new()
            .set_target_level(LevelFilter::Error)
            .build(),
        File::create(path)?,
    )?;
    Ok(())
}

fn high_score_file(configuration: &AppConfiguration) -> Option<PathBuf> {
    match &configuration.high_score_file {
        Some(path) => Some(path.clone()),
        None => HighScoreStore::default_path()
            .map_err(|e| log::warn!("No default high score location: {e}"))
            .ok(),
    }
}

fn main() -> tower_2048::Result<()> {
    let args = Args::parse();
    let configuration = load_configuration(&args)?;
    setup_logging(args.log_level, &configuration.log_file())?;
    log::info!("Starting with {configuration:?}");

    let terminal_screen = TerminalScreen::enter()?;
    let exit = App::new()
        .add_plugins((
            MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(FRAME_INTERVAL)),
            TowerCorePlugin {
                configuration: configuration.core.clone(),
            },
            HudPlugin {
                high_score_file: high_score_file(&configuration),
            },
            TerminalPlugin,
        ))
        .insert_resource(terminal_screen)
        .run();

    if let AppExit::Error(code) = exit {
        log::error!("Exited with code {code}");
    }
    Ok(())
}
