use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::database::{get_database_url, DEFAULT_DATABASE_PATH};
use crate::hierarchy::DEFAULT_MAX_DEPTH;

/// Runtime settings: defaults, then an optional YAML file, then CLI flags
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// SQLite path, or `:memory:`
    pub database: String,
    pub log_level: String,
    pub max_depth: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE_PATH.to_string(),
            log_level: "info".to_string(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Values given on the command line win over the file
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database: Option<String>,
    pub log_level: Option<String>,
    pub max_depth: Option<usize>,
}

impl AppConfig {
    pub fn from_yaml(yaml: &str) -> anyhow::Result<Self> {
        let config: AppConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply(overrides)
    }

    pub fn apply(mut self, overrides: ConfigOverrides) -> anyhow::Result<Self> {
        if let Some(database) = overrides.database {
            self.database = database;
        }
        if let Some(log_level) = overrides.log_level {
            self.log_level = log_level;
        }
        if let Some(max_depth) = overrides.max_depth {
            self.max_depth = max_depth;
        }
        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.database.trim().is_empty() {
            anyhow::bail!("database must not be empty");
        }
        if self.max_depth == 0 {
            anyhow::bail!("max_depth must be at least 1");
        }
        Ok(())
    }

    pub fn database_url(&self) -> String {
        get_database_url(Some(&self.database))
    }
}
