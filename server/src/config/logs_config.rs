use crate::config::root_dir;
use anyhow::Context;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use tracing::Level;

fn default_level() -> Level {
    Level::INFO
}

#[derive(Deserialize, Debug, Clone)]
pub struct LogsConfig {
    #[serde(default = "default_level", deserialize_with = "level_deserialize")]
    pub level: Level,
    /// relative paths resolve against the working directory
    pub storage_path: Option<String>,
    #[serde(default)]
    pub enable_file_logging: bool,
}

impl LogsConfig {
    /// Resolves `storage_path`, creating the directory when it does not exist yet.
    pub fn parse_dir(&self) -> anyhow::Result<Option<PathBuf>> {
        let Some(storage_path) = &self.storage_path else {
            return Ok(None);
        };
        let path = Path::new(storage_path);
        let path = if path.is_absolute() {
            path.to_path_buf()
        } else {
            root_dir().join(path)
        };
        std::fs::create_dir_all(&path)
            .with_context(|| format!("Failed to create logs directory {path:?}"))?;
        let path = path
            .canonicalize()
            .with_context(|| format!("Failed to resolve logs directory {path:?}"))?;
        Ok(Some(path))
    }
}

/// Accepts `error`, `warn`, `info`, `debug` and `trace` in any case
fn level_deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.trim()
        .parse::<Level>()
        .map_err(|_| serde::de::Error::custom(format!("Unsupported log level: {s}")))
}
