//! Configuration file support for hotpipe

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use hotcache::CacheConfig;
use hotwriter::WriterConfig;
use serde::{Deserialize, Serialize};

/// Settings for one pipe run, loadable from JSON
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct PipeConfig {
    /// Output writer settings
    #[serde(default)]
    pub writer: WriterConfig,

    /// Duplicate-suppression cache settings
    #[serde(default)]
    pub dedup: CacheConfig,
}

impl PipeConfig {
    /// Read a JSON config file; missing fields keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
    }
}
