//! Catalog data model
//!
//! A catalog is a list of container entries, each holding a tree of display
//! nodes. Catalogs are built outside this crate (by whatever walks the host's
//! handler registry) and handed in as an immutable [`CatalogSnapshot`] taken
//! at request time.

pub mod search;

pub use search::filter_entries;

use crate::error::{MenushotError, MenushotResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tokio::fs;

/// Tags marking a node as an LLM tool entry
const TOOL_TAGS: &[&str] = &["tool", "mcp"];

/// Render target mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    /// Command menu
    Command,
    /// Event listener overview
    Event,
    /// Filter overview
    Filter,
}

impl RenderMode {
    /// Basename of this mode's static cache files
    pub fn cache_basename(&self) -> &'static str {
        match self {
            Self::Command => "cache_menu_command",
            Self::Event => "cache_menu_event",
            Self::Filter => "cache_menu_filter",
        }
    }

    /// Whether oversized containers are pulled out as standalone giants
    pub fn extracts_giants(&self) -> bool {
        matches!(self, Self::Event | Self::Filter)
    }

    /// Default menu title for this mode
    pub fn default_title(&self) -> &'static str {
        match self {
            Self::Command => "Command Menu",
            Self::Event => "Event Listeners",
            Self::Filter => "Filter Overview",
        }
    }

    /// All modes, each owning one static cache
    pub fn all() -> &'static [Self] {
        &[Self::Command, Self::Event, Self::Filter]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Command => "command",
            Self::Event => "event",
            Self::Filter => "filter",
        }
    }
}

impl fmt::Display for RenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RenderMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "command" => Ok(Self::Command),
            "event" => Ok(Self::Event),
            "filter" => Ok(Self::Filter),
            other => Err(format!(
                "unknown mode '{}', expected one of: command, event, filter",
                other
            )),
        }
    }
}

/// One node of a container's display tree
///
/// In command mode a node is a command or a command group; in event/filter
/// mode it is a handler or a category grouping handlers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayNode {
    #[serde(default = "unknown_node_name", deserialize_with = "name_or_unknown")]
    pub name: String,

    #[serde(rename = "desc", default, deserialize_with = "string_or_empty")]
    pub description: String,

    #[serde(default)]
    pub is_group: bool,

    /// Classification tag: normal/admin/event/tool/mcp
    #[serde(default = "default_tag")]
    pub tag: String,

    /// Listener priority, when the node is an event handler
    #[serde(default)]
    pub priority: Option<i64>,

    #[serde(default)]
    pub children: Vec<DisplayNode>,
}

impl DisplayNode {
    /// Create a leaf node with the default tag
    pub fn leaf(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            is_group: false,
            tag: default_tag(),
            priority: None,
            children: Vec::new(),
        }
    }

    /// Create a group node holding `children`
    pub fn group(name: impl Into<String>, children: Vec<DisplayNode>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            is_group: true,
            tag: default_tag(),
            priority: None,
            children,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Whether this node represents an LLM tool (tool or mcp tag)
    pub fn is_tool(&self) -> bool {
        TOOL_TAGS.contains(&self.tag.as_str())
    }

    /// Complex nodes stack vertically; simple ones fill the compact grid
    pub fn is_complex(&self) -> bool {
        self.is_group || !self.description.is_empty()
    }
}

/// One renderable unit: a plugin, or a category in event/filter mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerEntry {
    #[serde(default = "unknown_entry_id", deserialize_with = "id_or_unknown")]
    pub name: String,

    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(rename = "desc", default, deserialize_with = "string_or_empty")]
    pub description: String,

    #[serde(default)]
    pub nodes: Vec<DisplayNode>,
}

impl ContainerEntry {
    pub fn new(name: impl Into<String>, nodes: Vec<DisplayNode>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            version: None,
            description: String::new(),
            nodes,
        }
    }

    /// Whether the first node is tagged as a tool
    pub fn is_tool_container(&self) -> bool {
        self.nodes.first().is_some_and(DisplayNode::is_tool)
    }
}

/// Immutable catalog captured at request time
///
/// Cloning is cheap; providers running on the blocking pool hold their own
/// handle instead of reading shared mutable state.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    entries: Arc<[ContainerEntry]>,
}

impl CatalogSnapshot {
    pub fn new(entries: Vec<ContainerEntry>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    /// Load a snapshot from a JSON array of container entries
    pub async fn load(path: &Path) -> MenushotResult<Self> {
        if !path.exists() {
            return Err(MenushotError::PathNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| MenushotError::io(format!("reading catalog {}", path.display()), e))?;

        let entries: Vec<ContainerEntry> = serde_json::from_str(&content)?;
        Ok(Self::new(entries))
    }

    pub fn entries(&self) -> &[ContainerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries visible for an optional search query
    pub fn select(&self, query: Option<&str>) -> Vec<ContainerEntry> {
        match query {
            Some(q) if !q.is_empty() => filter_entries(&self.entries, q),
            _ => self.entries.to_vec(),
        }
    }
}

fn default_tag() -> String {
    "normal".to_string()
}

fn unknown_node_name() -> String {
    "Unknown".to_string()
}

fn unknown_entry_id() -> String {
    "Unknown_Plugin_ID".to_string()
}

/// Accept strings, numbers or null where the host's metadata is sloppy
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}

fn name_or_unknown<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_else(unknown_node_name))
}

fn id_or_unknown<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_else(unknown_entry_id))
}
