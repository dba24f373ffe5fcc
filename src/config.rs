//! User configuration.
//!
//! Settings live in `config.json` under `$XDG_CONFIG_HOME/tabconv` (or `~/.config/tabconv`).
//! A missing file means every setting takes its default.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, ConvertResult};

const APP_DIR: &str = "tabconv";
const CONFIG_FILE: &str = "config.json";

/// Persisted user settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Destination used by the CLI when `-o` is omitted.
    pub default_output: Option<String>,
    /// File that receives one line per conversion outcome.
    pub log_file: Option<PathBuf>,
}

/// Reads and writes [`Config`] in one directory.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    /// Store rooted at an explicit directory.
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Store rooted at `$XDG_CONFIG_HOME/tabconv`, falling back to `$HOME/.config/tabconv`.
    ///
    /// Returns `None` if neither variable is set.
    pub fn from_env() -> Option<Self> {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".config")))?;
        Some(Self::new(base.join(APP_DIR)))
    }

    /// Path of the config file.
    pub fn path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE)
    }

    /// Load the config; a missing file yields [`Config::default`].
    pub fn load(&self) -> ConvertResult<Config> {
        let path = self.path();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => return Err(config_error(&path, e)),
        };
        if text.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_json::from_str(&text).map_err(|e| config_error(&path, e))
    }

    /// Write the config, creating the directory if needed.
    pub fn save(&self, config: &Config) -> ConvertResult<()> {
        let path = self.path();
        fs::create_dir_all(&self.dir).map_err(|e| config_error(&path, e))?;
        let text = serde_json::to_string_pretty(config).map_err(|e| config_error(&path, e))?;
        fs::write(&path, text).map_err(|e| config_error(&path, e))
    }
}

fn config_error(path: &Path, err: impl std::fmt::Display) -> ConvertError {
    ConvertError::Configuration {
        message: format!("{}: {err}", path.display()),
    }
}
