//! Writer configuration.

use std::cmp::Ordering;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default deflate level for the table stream.
const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Configuration for [`crate::catalog::CatalogWriter`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WriterConfig {
    /// Deflate level, 0 (store) to 9 (best)
    pub compression_level: u32,
    /// Root namespace prefixes listed first, in this order
    pub namespace_priority: Vec<String>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            namespace_priority: vec![
                "System".to_string(),
                "Microsoft".to_string(),
                "Windows".to_string(),
            ],
        }
    }
}

impl WriterConfig {
    /// Load from a YAML or JSON file, chosen by extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            _ => serde_yaml::from_str(&content)?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.compression_level > 9 {
            return Err(Error::Config(format!(
                "compression-level must be 0..=9, got {}",
                self.compression_level
            )));
        }
        Ok(())
    }

    /// Priority bucket of a root namespace name.
    pub fn namespace_rank(&self, name: &str) -> usize {
        self.namespace_priority
            .iter()
            .position(|prefix| {
                name == prefix
                    || (name.starts_with(prefix.as_str())
                        && name[prefix.len()..].starts_with('.'))
            })
            .unwrap_or(self.namespace_priority.len())
    }

    /// Order root namespaces: priority bucket, then ordinal name.
    pub fn compare_roots(&self, a: &str, b: &str) -> Ordering {
        self.namespace_rank(a)
            .cmp(&self.namespace_rank(b))
            .then_with(|| a.cmp(b))
    }
}
