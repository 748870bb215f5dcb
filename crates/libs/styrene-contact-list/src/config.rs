use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::sort::{GroupSort, PrimarySort};

pub const DEFAULT_PREALLOC_CHUNK: usize = 16;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ListStoreConfig {
    pub primary_sort: PrimarySort,
    pub group_sort: GroupSort,
    /// Minimum number of placeholder rows added when the tail runs out.
    pub prealloc_chunk: usize,
}

impl Default for ListStoreConfig {
    fn default() -> Self {
        Self {
            primary_sort: PrimarySort::default(),
            group_sort: GroupSort::default(),
            prealloc_chunk: DEFAULT_PREALLOC_CHUNK,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid list store config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ListStoreConfig {
    pub fn from_toml(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }
}
