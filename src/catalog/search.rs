//! Query pruning over a catalog
//!
//! A container that matches is kept whole. Otherwise its node tree is pruned
//! to the matching nodes; a matching node keeps its entire subtree, and a
//! non-matching group survives only with its matching descendants.

use super::{ContainerEntry, DisplayNode};

/// Filter entries by a case-insensitive substring query
pub fn filter_entries(entries: &[ContainerEntry], query: &str) -> Vec<ContainerEntry> {
    let query = query.to_lowercase();

    entries
        .iter()
        .filter_map(|entry| {
            if entry_matches(entry, &query) {
                return Some(entry.clone());
            }

            let nodes = filter_nodes(&entry.nodes, &query);
            if nodes.is_empty() {
                None
            } else {
                Some(ContainerEntry {
                    nodes,
                    ..entry.clone()
                })
            }
        })
        .collect()
}

fn entry_matches(entry: &ContainerEntry, query: &str) -> bool {
    contains(&entry.name, query)
        || entry
            .display_name
            .as_deref()
            .is_some_and(|d| contains(d, query))
        || contains(&entry.description, query)
}

fn filter_nodes(nodes: &[DisplayNode], query: &str) -> Vec<DisplayNode> {
    let mut kept = Vec::new();

    for node in nodes {
        if contains(&node.name, query) || contains(&node.description, query) {
            kept.push(node.clone());
            continue;
        }

        if node.children.is_empty() {
            continue;
        }

        let children = filter_nodes(&node.children, query);
        if !children.is_empty() {
            kept.push(DisplayNode {
                children,
                ..node.clone()
            });
        }
    }

    kept
}

fn contains(haystack: &str, lowered_query: &str) -> bool {
    !haystack.is_empty() && haystack.to_lowercase().contains(lowered_query)
}
