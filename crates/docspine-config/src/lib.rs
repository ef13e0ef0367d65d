use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {}: {source}", .config_path.display())]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {}: {source}", .config_path.display())]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid exclude pattern '{pattern}' in {}: {source}", .config_path.display())]
    InvalidExcludePattern {
        config_path: PathBuf,
        pattern: String,
        source: glob::PatternError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root of the documentation tree.
    pub docs_root: PathBuf,
    pub max_include_depth: usize,
    /// Glob patterns, relative to `docs_root`, of files to leave out.
    pub exclude: Vec<String>,
    pub search_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            docs_root: PathBuf::from("."),
            max_include_depth: 20,
            exclude: Vec::new(),
            search_limit: 50,
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        for pattern in &config.exclude {
            glob::Pattern::new(pattern).map_err(|source| ConfigError::InvalidExcludePattern {
                config_path: config_path.to_path_buf(),
                pattern: pattern.clone(),
                source,
            })?;
        }

        // Expand shell variables and tilde in the docs root
        config.docs_root = Self::expand_path(&config.docs_root).unwrap_or(config.docs_root);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/docspine");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        match shellexpand::full(&path_str) {
            Ok(expanded) => Some(PathBuf::from(expanded.as_ref())),
            Err(_) => None,
        }
    }
}
