//! Configuration file handling

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Tester settings
    #[serde(default)]
    pub tester: TesterOptions,
}

/// Options read by the tester at construction
///
/// Never mutated once a run has started.
#[derive(Debug, Clone, Deserialize)]
pub struct TesterOptions {
    /// Status label printed in front of passing assertions
    #[serde(default = "default_pass_text")]
    pub pass_text: String,

    /// Status label printed in front of failing assertions
    #[serde(default = "default_fail_text")]
    pub fail_text: String,

    /// Where to store the xUnit report, if anywhere
    #[serde(default)]
    pub save: Option<PathBuf>,

    /// Interval between two scheduler checks, in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for TesterOptions {
    fn default() -> Self {
        Self {
            pass_text: default_pass_text(),
            fail_text: default_fail_text(),
            save: None,
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl TesterOptions {
    /// Scheduler polling interval
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

fn default_pass_text() -> String {
    "PASS".to_string()
}

fn default_fail_text() -> String {
    "FAIL".to_string()
}

fn default_poll_interval() -> u64 {
    100
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }
}
