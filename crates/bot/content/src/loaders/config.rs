//! Bot configuration loader.

use std::path::Path;

use bot_core::BotConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for bot configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load and validate a [`BotConfig`] from a TOML file.
    ///
    /// Missing sections fall back to their defaults. Validation runs here so
    /// a bad file is reported before any template is read.
    pub fn load(path: &Path) -> LoadResult<BotConfig> {
        let content = read_file(path)?;
        let config = Self::parse(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {:#}", path.display(), e))?;

        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn parse(content: &str) -> LoadResult<BotConfig> {
        let config: BotConfig = toml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;
        config.validate()?;
        Ok(config)
    }
}
