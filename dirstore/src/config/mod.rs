use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Storage configuration, usually parsed from a small YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one subdirectory per collection
    pub root: PathBuf,
    /// Strategy used when the driver is asked for a fresh id
    #[serde(default)]
    pub id: IdStrategy,
}

impl StorageConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        StorageConfig {
            root: root.into(),
            id: IdStrategy::default(),
        }
    }

    pub fn with_id_strategy(mut self, id: IdStrategy) -> Self {
        self.id = id;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    #[default]
    Ulid,
    Uuid,
    Nanoid,
}

impl IdStrategy {
    pub fn generate(self) -> String {
        match self {
            IdStrategy::Ulid => ulid::Ulid::new().to_string().to_lowercase(),
            IdStrategy::Uuid => uuid::Uuid::new_v4().to_string(),
            IdStrategy::Nanoid => nanoid::nanoid!(),
        }
    }
}

/// Parse a storage config YAML file
pub fn load_config(path: &Path) -> Result<StorageConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_config_str(&content)
}

/// Parse a storage config YAML string
pub fn parse_config_str(content: &str) -> Result<StorageConfig> {
    let config: StorageConfig = serde_yaml::from_str(content)?;
    Ok(config)
}
