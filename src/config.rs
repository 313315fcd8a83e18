//! Shell configuration.
//!
//! Settings come from an optional `spanmem.toml`. A `.env` file next to it
//! is loaded first, and these environment variables override the file:
//!
//! - `SPANMEM_LOG` - tracing filter directive
//! - `SPANMEM_HISTORY` - line editor history file
//! - `SPANMEM_OUTPUT` - `table` or `json`

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Configuration file name
pub const CONFIG_FILE_NAME: &str = "spanmem.toml";

pub const ENV_LOG: &str = "SPANMEM_LOG";
pub const ENV_HISTORY: &str = "SPANMEM_HISTORY";
pub const ENV_OUTPUT: &str = "SPANMEM_OUTPUT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => anyhow::bail!("unknown output format {:?}, want table or json", s),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Table => f.write_str("table"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// DDL files applied at start-up, in order
    #[serde(default)]
    pub schema: Vec<PathBuf>,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    #[serde(default = "default_history_file")]
    pub history_file: PathBuf,
    #[serde(default)]
    pub output: OutputFormat,
}

fn default_log_filter() -> String {
    "spanmem=info".to_string()
}

fn default_history_file() -> PathBuf {
    std::env::var("HOME")
        .map(|h| PathBuf::from(h).join(".spanmem_history"))
        .unwrap_or_else(|_| PathBuf::from(".spanmem_history"))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema: Vec::new(),
            log_filter: default_log_filter(),
            history_file: default_history_file(),
            output: OutputFormat::default(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    ///
    /// Relative schema paths are resolved against the file's directory.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let env_path = dir.join(".env");
        if env_path.exists() {
            let _ = dotenvy::from_path(&env_path);
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("can't read {}: {}", path.display(), e))?;
        let mut config: Config = toml::from_str(&content)?;
        for schema in &mut config.schema {
            if schema.is_relative() {
                *schema = dir.join(&*schema);
            }
        }

        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load `spanmem.toml` from a directory, falling back to defaults when absent
    pub fn discover(dir: &Path) -> anyhow::Result<Self> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            return Self::load(&path);
        }
        let mut config = Config::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        if let Ok(filter) = std::env::var(ENV_LOG) {
            if !filter.is_empty() {
                self.log_filter = filter;
            }
        }

        if let Ok(history) = std::env::var(ENV_HISTORY) {
            if !history.is_empty() {
                self.history_file = PathBuf::from(history);
            }
        }

        if let Ok(output) = std::env::var(ENV_OUTPUT) {
            if !output.is_empty() {
                self.output = output.parse()?;
            }
        }
        Ok(())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
