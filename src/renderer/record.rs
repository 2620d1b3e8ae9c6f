//! Persisted cache records
//!
//! `{basename}.hash` holds `{"content_hash": "...", "config": {...}}`. Older
//! installs wrote the bare hash string; it is still read, with an empty
//! config snapshot that never matches a real one.

use crate::error::{MenushotError, MenushotResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;

/// Content fingerprint plus the render-affecting config it was built with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub content_hash: String,
    #[serde(default)]
    pub config: BTreeMap<String, Value>,
}

impl CacheRecord {
    pub fn new(content_hash: String, config: BTreeMap<String, Value>) -> Self {
        Self {
            content_hash,
            config,
        }
    }

    /// Parse a record file's text; never fails
    ///
    /// Unrecognizable content yields a record that matches nothing.
    pub fn parse(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => {
                let content_hash = map
                    .get("content_hash")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                let config = match map.get("config") {
                    Some(Value::Object(cfg)) => cfg.clone().into_iter().collect(),
                    _ => BTreeMap::new(),
                };
                Self::new(content_hash, config)
            }
            Ok(Value::String(hash)) => Self::new(hash.trim().to_string(), BTreeMap::new()),
            Ok(_) => Self::new(String::new(), BTreeMap::new()),
            Err(_) => Self::new(text.trim().to_string(), BTreeMap::new()),
        }
    }

    /// Read a record from disk; `None` if the file does not exist
    pub async fn load(path: &Path) -> MenushotResult<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let text = fs::read_to_string(path)
            .await
            .map_err(|e| MenushotError::io(format!("reading cache record {}", path.display()), e))?;

        Ok(Some(Self::parse(&text)))
    }

    pub async fn save(&self, path: &Path) -> MenushotResult<()> {
        let content = serde_json::to_string(self)?;
        fs::write(path, content)
            .await
            .map_err(|e| MenushotError::io(format!("writing cache record {}", path.display()), e))
    }

    pub fn content_matches(&self, content_hash: &str) -> bool {
        !self.content_hash.is_empty() && self.content_hash == content_hash
    }

    pub fn config_matches(&self, config: &BTreeMap<String, Value>) -> bool {
        &self.config == config
    }
}
