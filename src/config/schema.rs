//! Configuration schema for Menushot
//!
//! Configuration is stored at `~/.config/menushot/config.toml`

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Layout and raster settings
    pub rendering: RenderingConfig,

    /// Data, template and font locations
    pub paths: PathsConfig,

    /// External compiler settings
    pub compiler: CompilerConfig,

    /// Delivery behaviour
    pub delivery: DeliveryConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Rendering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderingConfig {
    /// Upper bound for building the catalog JSON, in seconds
    pub timeout_analysis_secs: f64,

    /// Upper bound for one compile (unset = unbounded)
    pub timeout_compile_secs: Option<f64>,

    /// Raster resolution in pixels per inch
    pub ppi: f32,

    /// Estimated height above which event/filter containers render standalone
    pub giant_threshold: u32,

    /// Maximum height of one split part, in pixels
    pub split_height: u32,

    /// Pages taller than this are split
    pub webp_limit: u32,
}

impl Default for RenderingConfig {
    fn default() -> Self {
        Self {
            timeout_analysis_secs: 30.0,
            timeout_compile_secs: None,
            ppi: 144.0,
            giant_threshold: 1200,
            split_height: 4000,
            webp_limit: 16000,
        }
    }
}

impl RenderingConfig {
    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_analysis_secs.max(0.0))
    }

    pub fn compile_timeout(&self) -> Option<Duration> {
        self.timeout_compile_secs
            .filter(|secs| *secs > 0.0)
            .map(Duration::from_secs_f64)
    }

    /// Settings whose change must invalidate every static cache
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            giant_threshold: self.giant_threshold,
            split_height: self.split_height,
            ppi: self.ppi,
            webp_limit: self.webp_limit,
        }
    }
}

/// Render-affecting subset of the configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub giant_threshold: u32,
    pub split_height: u32,
    pub ppi: f32,
    pub webp_limit: u32,
}

impl ConfigSnapshot {
    /// Field map as persisted in cache records
    pub fn to_map(&self) -> BTreeMap<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map.into_iter().collect(),
            _ => BTreeMap::new(),
        }
    }
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Cache and temp file directory
    pub data_dir: PathBuf,

    /// Typst template rendering the layout payload
    pub template: PathBuf,

    /// Extra font search directories
    pub font_dirs: Vec<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("menushot"),
            template: PathBuf::from("templates/base.typ"),
            font_dirs: vec![PathBuf::from("resources/fonts")],
        }
    }
}

/// Compiler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Typst executable
    pub binary: PathBuf,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("typst"),
        }
    }
}

/// Delivery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Wait before deleting temp files after delivery, in seconds
    pub cleanup_delay_secs: f64,

    /// Show a progress hint while rendering
    pub send_hint: bool,

    /// Command prefixes shown in the menu header
    pub prefixes: Vec<String>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            cleanup_delay_secs: 1.0,
            send_hint: true,
            prefixes: vec!["/".to_string()],
        }
    }
}

impl DeliveryConfig {
    pub fn cleanup_delay(&self) -> Duration {
        Duration::from_secs_f64(self.cleanup_delay_secs.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        assert!(toml.contains("[rendering]"));
        assert!(toml.contains("[paths]"));
        assert!(!toml.contains("timeout_compile_secs"));
    }

    #[test]
    fn config_deserializes_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.rendering.split_height, 4000);
        assert_eq!(config.compiler.binary, PathBuf::from("typst"));
    }

    #[test]
    fn config_deserializes_partial() {
        let toml = r#"
            [rendering]
            giant_threshold = 900
            timeout_compile_secs = 120.0
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.rendering.giant_threshold, 900);
        assert_eq!(config.rendering.compile_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(config.rendering.ppi, 144.0); // default preserved
    }

    #[test]
    fn compile_timeout_unset_by_default() {
        assert_eq!(RenderingConfig::default().compile_timeout(), None);
    }

    #[test]
    fn snapshot_map_has_every_field() {
        let map = RenderingConfig::default().snapshot().to_map();
        let keys: Vec<_> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["giant_threshold", "ppi", "split_height", "webp_limit"]);
        assert_eq!(map["split_height"], serde_json::json!(4000));
    }
}
