//! Layout balancing for the menu template
//!
//! Containers are sorted into three buckets before the template sees them:
//!
//! | Bucket | Contents |
//! |--------|----------|
//! | singles | tool containers, and one-command plugins in command mode |
//! | giants | event/filter containers taller than `giant_threshold` |
//! | columns | everything else, packed into 3 balanced columns |
//!
//! Heights are estimated, not measured. The constants below mirror the
//! template's visual density and must be kept in step with it by hand.

pub mod estimate;

pub use estimate::{estimate_height, CARD_OVERHEAD};

use crate::catalog::{ContainerEntry, RenderMode};
use crate::error::{MenushotError, MenushotResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Number of balanced columns in the template
pub const COLUMN_COUNT: usize = 3;

/// Where a container ends up in the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Collapsed one-entry display
    Single,
    /// Too tall for a column, rendered standalone
    Giant,
    /// Packed into one of the balanced columns
    Column,
}

/// JSON document consumed by the typesetting template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutPayload {
    pub title: String,
    pub mode: RenderMode,
    pub prefixes: Vec<String>,
    #[serde(rename = "plugin_count")]
    pub item_count: usize,
    pub giants: Vec<ContainerEntry>,
    pub columns: Vec<Vec<ContainerEntry>>,
    pub singles: Vec<ContainerEntry>,
}

/// Classifies containers and bin-packs the rest into columns
#[derive(Debug, Clone, Copy)]
pub struct LayoutBalancer {
    giant_threshold: u32,
}

impl LayoutBalancer {
    pub fn new(giant_threshold: u32) -> Self {
        Self { giant_threshold }
    }

    /// Decide a container's bucket; first matching rule wins
    pub fn classify(&self, entry: &ContainerEntry, mode: RenderMode) -> Placement {
        if entry.is_tool_container() {
            return Placement::Single;
        }

        if mode == RenderMode::Command
            && entry.nodes.len() == 1
            && !entry.nodes[0].is_group
        {
            return Placement::Single;
        }

        if mode.extracts_giants() && estimate_height(&entry.nodes) > self.giant_threshold {
            return Placement::Giant;
        }

        Placement::Column
    }

    /// Build the full payload for a list of containers
    pub fn build_payload(
        &self,
        entries: Vec<ContainerEntry>,
        title: impl Into<String>,
        mode: RenderMode,
        prefixes: Vec<String>,
    ) -> LayoutPayload {
        let item_count = entries.len();
        let mut giants = Vec::new();
        let mut singles = Vec::new();
        let mut candidates = Vec::new();

        for entry in entries {
            match self.classify(&entry, mode) {
                Placement::Single => singles.push(entry),
                Placement::Giant => giants.push(entry),
                Placement::Column => {
                    let height = estimate_height(&entry.nodes) + CARD_OVERHEAD;
                    candidates.push((entry, height));
                }
            }
        }

        let packed = pack_columns(candidates);
        debug!(
            "Layout: {} singles, {} giants, column heights {:?}",
            singles.len(),
            giants.len(),
            packed.heights
        );

        LayoutPayload {
            title: title.into(),
            mode,
            prefixes,
            item_count,
            giants,
            columns: packed.columns,
            singles,
        }
    }

    /// Build the payload and write it as pretty JSON to `path`
    ///
    /// Blocking; intended to run inside a data provider on the blocking pool.
    pub fn write_layout(
        &self,
        entries: Vec<ContainerEntry>,
        path: &Path,
        title: impl Into<String>,
        mode: RenderMode,
        prefixes: Vec<String>,
    ) -> MenushotResult<usize> {
        let payload = self.build_payload(entries, title, mode, prefixes);
        let json = serde_json::to_string_pretty(&payload)?;

        std::fs::write(path, json)
            .map_err(|e| MenushotError::io(format!("writing layout {}", path.display()), e))?;

        Ok(payload.item_count)
    }
}

/// Result of column packing
#[derive(Debug, Clone, PartialEq)]
pub struct PackedColumns<T> {
    pub columns: Vec<Vec<T>>,
    pub heights: Vec<u32>,
}

/// Longest-processing-time packing into [`COLUMN_COUNT`] columns
///
/// Items are taken tallest first and dropped into the currently shortest
/// column (leftmost on ties). No column ends up taller than
/// `sum / COLUMN_COUNT + max`.
pub fn pack_columns<T>(mut items: Vec<(T, u32)>) -> PackedColumns<T> {
    // Stable: equal heights keep their catalog order
    items.sort_by(|a, b| b.1.cmp(&a.1));

    let mut columns: Vec<Vec<T>> = (0..COLUMN_COUNT).map(|_| Vec::new()).collect();
    let mut heights = vec![0u32; COLUMN_COUNT];

    for (item, height) in items {
        let (idx, _) = heights
            .iter()
            .enumerate()
            .min_by_key(|(_, h)| **h)
            .unwrap_or((0, &0));
        columns[idx].push(item);
        heights[idx] += height;
    }

    PackedColumns { columns, heights }
}
