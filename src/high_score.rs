use std::path::{Path, PathBuf};

use getset::{CopyGetters, Getters};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const APP_DIR: &str = "tower_2048";
const FILE_NAME: &str = "high_score.json";

#[derive(Debug, Error)]
pub enum HighScoreError {
    #[error("could not access {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{} is not a high score file: {source}", .path.display())]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not find a home directory: {0}")]
    NoHome(String),
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct HighScoreRecord {
    best: u64,
}

/// The best score ever reached, kept in a small JSON file.
#[derive(CopyGetters, Debug, Getters)]
pub struct HighScoreStore {
    #[getset(get = "pub")]
    path: PathBuf,
    #[getset(get_copy = "pub")]
    best: u64,
}

impl HighScoreStore {
    /// `$XDG_DATA_HOME/tower_2048/high_score.json`, falling back to
    /// `~/.local/share` when the variable is unset.
    pub fn default_path() -> Result<PathBuf, HighScoreError> {
        let data_home = match std::env::var_os("XDG_DATA_HOME") {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => homedir::get_my_home()
                .map_err(|e| HighScoreError::NoHome(format!("{e:?}")))?
                .ok_or_else(|| HighScoreError::NoHome("no home for current user".to_string()))?
                .join(".local")
                .join("share"),
        };
        Ok(data_home.join(APP_DIR).join(FILE_NAME))
    }

    /// Reads the stored best score. A missing file counts as a best of 0.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, HighScoreError> {
        let path = path.into();
        let best = match std::fs::read_to_string(&path) {
            Ok(text) => {
                let record: HighScoreRecord =
                    serde_json::from_str(&text).map_err(|source| HighScoreError::Format {
                        path: path.clone(),
                        source,
                    })?;
                record.best
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
            Err(source) => return Err(HighScoreError::Io { path, source }),
        };
        log::debug!("Loaded best score {best} from {}", path.display());
        Ok(HighScoreStore { path, best })
    }

    /// Stores `score` if it beats the best so far. Returns whether it did.
    pub fn record(&mut self, score: u64) -> Result<bool, HighScoreError> {
        if score <= self.best {
            return Ok(false);
        }
        self.best = score;
        write_record(&self.path, &HighScoreRecord { best: score })?;
        Ok(true)
    }
}

fn write_record(path: &Path, record: &HighScoreRecord) -> Result<(), HighScoreError> {
    let io_error = |source: std::io::Error| HighScoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    let text = serde_json::to_string(record).map_err(|source| HighScoreError::Format {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, text).map_err(io_error)
}
