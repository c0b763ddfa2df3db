pub mod configuration;
pub mod high_score;
pub mod hud;
pub mod render;
pub mod term;
pub mod tower_view;
pub mod user_input;

use thiserror::Error;
use tower_core::CoreError;

use self::high_score::HighScoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("could not parse configuration file: {0}")]
    Configuration(#[from] toml::de::Error),
    #[error("high score: {0}")]
    HighScore(#[from] HighScoreError),
    #[error("could not install logger: {0}")]
    Logger(#[from] log::SetLoggerError),
}

pub type Result<T> = std::result::Result<T, AppError>;
