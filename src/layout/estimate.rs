//! Height estimation for container cards
//!
//! Complex nodes (groups, or leaves with a description) stack vertically.
//! Simple leaves fill a fixed-width grid.

use crate::catalog::DisplayNode;

/// Height of a described leaf, or of a group's header
pub const LEAF_UNIT: u32 = 60;
pub const GROUP_HEADER: u32 = 60;

/// Compact grid of simple leaves
pub const GRID_COLUMNS: u32 = 3;
pub const GRID_ROW: u32 = 30;
pub const GRID_MARGIN: u32 = 10;

/// Card header and padding added on top of the node estimate when packing
pub const CARD_OVERHEAD: u32 = 80;

/// Estimate the rendered height of a node list
pub fn estimate_height(nodes: &[DisplayNode]) -> u32 {
    let mut total = 0;
    let mut simple = 0u32;

    for node in nodes {
        if node.is_group {
            total += GROUP_HEADER + estimate_height(&node.children);
        } else if node.is_complex() {
            total += LEAF_UNIT;
        } else {
            simple += 1;
        }
    }

    if simple > 0 {
        total += simple.div_ceil(GRID_COLUMNS) * GRID_ROW + GRID_MARGIN;
    }

    total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_is_zero() {
        assert_eq!(estimate_height(&[]), 0);
    }

    #[test]
    fn group_of_described_leaves() {
        let group = DisplayNode::group(
            "admin",
            vec![
                DisplayNode::leaf("a", "first"),
                DisplayNode::leaf("b", "second"),
                DisplayNode::leaf("c", "third"),
            ],
        );

        assert_eq!(estimate_height(&[group]), GROUP_HEADER + 3 * LEAF_UNIT);
    }

    #[test]
    fn simple_leaves_fill_grid_rows() {
        let four: Vec<_> = (0..4).map(|i| DisplayNode::leaf(i.to_string(), "")).collect();
        assert_eq!(estimate_height(&four), 2 * GRID_ROW + GRID_MARGIN);

        let three: Vec<_> = (0..3).map(|i| DisplayNode::leaf(i.to_string(), "")).collect();
        assert_eq!(estimate_height(&three), GRID_ROW + GRID_MARGIN);
    }

    #[test]
    fn mixed_nodes_sum_both_parts() {
        let nodes = vec![
            DisplayNode::leaf("plain", ""),
            DisplayNode::leaf("described", "text"),
            DisplayNode::group("empty-group", vec![]),
        ];

        assert_eq!(
            estimate_height(&nodes),
            LEAF_UNIT + GROUP_HEADER + GRID_ROW + GRID_MARGIN
        );
    }

    #[test]
    fn nested_groups_recurse() {
        let inner = DisplayNode::group("inner", vec![DisplayNode::leaf("x", "")]);
        let outer = DisplayNode::group("outer", vec![inner]);

        assert_eq!(
            estimate_height(&[outer]),
            2 * GROUP_HEADER + GRID_ROW + GRID_MARGIN
        );
    }
}
