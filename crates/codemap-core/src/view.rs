//! Expand/collapse and chunk-disclosure state for a rendered codemap.
//!
//! View state is kept apart from the search-derived [`ResultTree`]: one
//! [`NodeViewState`] per arena slot, created with the tree and thrown away
//! with it. A fresh search therefore always starts from the default rule:
//! a node is expanded when it is active or is the root, and no chunks are
//! shown.

use crate::models::SearchResult;
use crate::tree::{NodeIndex, ResultTree, TreeNode};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeViewState {
    pub expanded: bool,
    pub chunks_visible: bool,
}

/// Per-node view state for one [`ResultTree`].
///
/// Lookups take the node id and resolve it through the tree, so the view
/// must only be used with the tree it was created from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeView {
    states: Vec<NodeViewState>,
}

/// One line of output produced by [`TreeView::visible_rows`].
#[derive(Debug, Clone, Copy)]
pub enum Row<'a> {
    Node {
        index: NodeIndex,
        depth: usize,
        node: &'a TreeNode,
        expanded: bool,
    },
    Chunk {
        depth: usize,
        chunk: &'a SearchResult,
    },
}

impl TreeView {
    pub fn new(tree: &ResultTree) -> Self {
        let mut states = vec![NodeViewState::default(); tree.len()];
        for (index, _) in tree.depth_first() {
            states[index.get()].expanded = index == NodeIndex::ROOT || tree.node(index).is_active;
        }
        Self { states }
    }

    pub fn state(&self, tree: &ResultTree, node_id: &str) -> Option<NodeViewState> {
        tree.find(node_id).map(|i| self.states[i.get()])
    }

    pub fn is_expanded(&self, index: NodeIndex) -> bool {
        self.states[index.get()].expanded
    }

    pub fn chunks_visible(&self, index: NodeIndex) -> bool {
        self.states[index.get()].chunks_visible
    }

    /// Flip `expanded` on a folder that has children.
    ///
    /// Files, childless folders, and unknown ids are left alone. Returns
    /// whether the state changed.
    pub fn toggle_expand(&mut self, tree: &ResultTree, node_id: &str) -> bool {
        let Some(index) = tree.find(node_id) else {
            return false;
        };
        let node = tree.node(index);
        if !node.is_folder() || !node.has_children() {
            return false;
        }
        let state = &mut self.states[index.get()];
        state.expanded = !state.expanded;
        true
    }

    /// Flip `chunks_visible` on a hit file. Everything else is a no-op.
    pub fn toggle_chunks(&mut self, tree: &ResultTree, node_id: &str) -> bool {
        let Some(index) = tree.find(node_id) else {
            return false;
        };
        let node = tree.node(index);
        if !node.is_file() || !node.is_hit {
            return false;
        }
        let state = &mut self.states[index.get()];
        state.chunks_visible = !state.chunks_visible;
        true
    }

    /// Open every folder on a path to a hit.
    pub fn expand_all_hits(&mut self, tree: &ResultTree) {
        for (index, _) in tree.depth_first() {
            let node = tree.node(index);
            if node.is_folder() && node.is_hit && node.has_children() {
                self.states[index.get()].expanded = true;
            }
        }
    }

    /// Rows a renderer shows, in order.
    ///
    /// Collapsed folders hide their whole subtree. Chunk rows follow the
    /// file they belong to, one level deeper.
    pub fn visible_rows<'a>(&self, tree: &'a ResultTree) -> Vec<Row<'a>> {
        let mut rows = Vec::new();
        let mut stack = vec![(NodeIndex::ROOT, 0usize)];

        while let Some((index, depth)) = stack.pop() {
            let node = tree.node(index);
            let state = self.states[index.get()];
            let open = state.expanded && node.has_children();

            rows.push(Row::Node {
                index,
                depth,
                node,
                expanded: open,
            });

            if state.chunks_visible {
                for chunk in &node.matched_chunks {
                    rows.push(Row::Chunk {
                        depth: depth + 1,
                        chunk,
                    });
                }
            }

            if open {
                for &child in node.children().iter().rev() {
                    stack.push((child, depth + 1));
                }
            }
        }

        rows
    }
}
