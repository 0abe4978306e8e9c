/// Application configuration
///
/// Read from `<config dir>/games-catalog/config.json`. Every field is
/// optional in the file; anything missing falls back to its default, and a
/// missing file means "all defaults".

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::backend::covers::COVER_MAX_EDGE;
use crate::error::{Error, Result};
use crate::state::library::DB_FILE_NAME;
use crate::state::validation::PASSWORD_MIN_LENGTH;

const APP_DIR: &str = "games-catalog";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Where the database and covers live.
    /// Linux default: ~/.local/share/games-catalog
    pub data_dir: PathBuf,
    /// Minimum accepted password length on every auth form
    pub password_min_length: usize,
    /// Covers are shrunk to fit this many pixels on their longest edge
    pub cover_max_edge: u32,
    /// `tracing` filter used when RUST_LOG is not set
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            password_min_length: PASSWORD_MIN_LENGTH,
            cover_max_edge: COVER_MAX_EDGE,
            log_filter: "info".to_string(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));
    path.push(APP_DIR);
    path
}

impl Config {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE_NAME))
    }

    /// Load from the default location, or defaults if there is none
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        let config = Self::from_json(&json)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse from JSON string
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    fn validate(&self) -> Result<()> {
        if self.password_min_length == 0 {
            return Err(Error::Config("password_min_length must be at least 1".to_string()));
        }
        if self.cover_max_edge == 0 {
            return Err(Error::Config("cover_max_edge must be at least 1".to_string()));
        }
        Ok(())
    }

    /// SQLite database file
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    /// Root of the per-user cover tree
    pub fn covers_root(&self) -> &Path {
        &self.data_dir
    }
}
