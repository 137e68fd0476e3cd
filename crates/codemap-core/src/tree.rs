//! Arena-backed result tree built from a search response.
//!
//! The backend sends the codemap as a nested [`CodemapNode`]. This module
//! flattens it into a [`ResultTree`]: nodes live in one `Vec`, parents own
//! their children through index lists, and the child→parent link is a plain
//! index used for breadcrumbs. Every traversal is an explicit loop over the
//! arena, so tree depth never turns into call-stack depth.
//!
//! # Hit repair
//!
//! The backend is expected to mark every ancestor of a hit file as a hit,
//! but the tree is never trusted on that point. [`ResultTree::repair_hits`]
//! recomputes each folder's `is_hit` bottom-up as the OR of its children:
//!
//! 1. Files keep their own `is_hit`.
//! 2. Folders take `children.any(is_hit)`; childless folders are never hits.
//! 3. `matched_chunks` survive only on hit files.
//! 4. The root is always active.
//!
//! Running the pass on an already repaired tree changes nothing.

use std::collections::HashMap;

use crate::error::{CodemapError, Result};
use crate::models::{CodemapNode, NodeKind, SearchResponse, SearchResult, SearchStats};

/// Position of a node inside a [`ResultTree`].
///
/// Indices are assigned in pre-order, so a child always has a larger index
/// than its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(usize);

impl NodeIndex {
    pub const ROOT: NodeIndex = NodeIndex(0);

    pub fn get(self) -> usize {
        self.0
    }
}

/// A node stored in the arena.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub layer: Option<u32>,
    pub importance: Option<f64>,
    pub is_hit: bool,
    pub is_active: bool,
    pub search_score: Option<f64>,
    pub matched_chunks: Vec<SearchResult>,
    parent: Option<NodeIndex>,
    children: Vec<NodeIndex>,
}

impl TreeNode {
    pub fn parent(&self) -> Option<NodeIndex> {
        self.parent
    }

    pub fn children(&self) -> &[NodeIndex] {
        &self.children
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    pub fn is_file(&self) -> bool {
        self.kind == NodeKind::File
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// A validated, hit-repaired codemap.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTree {
    nodes: Vec<TreeNode>,
    by_id: HashMap<String, NodeIndex>,
}

/// What [`build_from_response`] produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TreeBuild {
    Tree {
        tree: ResultTree,
        stats: Option<SearchStats>,
    },
    /// The backend had no tree for this query. The caller renders the
    /// results as a flat list instead of an empty codemap.
    Fallback(Vec<SearchResult>),
}

/// Turn a classified search response into a repaired tree, or hand the flat
/// fallback list back to the caller.
pub fn build_from_response(response: SearchResponse) -> Result<TreeBuild> {
    match response {
        SearchResponse::Tree { tree, stats } => {
            let mut tree = ResultTree::from_node(tree)?;
            tree.repair_hits();
            Ok(TreeBuild::Tree { tree, stats })
        }
        SearchResponse::Fallback { results } => Ok(TreeBuild::Fallback(results)),
    }
}

impl ResultTree {
    /// Flatten a nested node into the arena without repairing it.
    ///
    /// Fails when two nodes share an id, since view state and lookups are
    /// keyed by id, and when a file carries children.
    pub fn from_node(root: CodemapNode) -> Result<Self> {
        let mut nodes: Vec<TreeNode> = Vec::new();
        let mut by_id: HashMap<String, NodeIndex> = HashMap::new();
        let mut stack: Vec<(CodemapNode, Option<NodeIndex>)> = vec![(root, None)];

        while let Some((node, parent)) = stack.pop() {
            let index = NodeIndex(nodes.len());
            if by_id.insert(node.id.clone(), index).is_some() {
                return Err(CodemapError::Search(format!(
                    "malformed tree: duplicate node id `{}`",
                    node.id
                )));
            }
            if node.kind == NodeKind::File && !node.children.is_empty() {
                return Err(CodemapError::Search(format!(
                    "malformed tree: file `{}` has children",
                    node.id
                )));
            }
            if let Some(p) = parent {
                nodes[p.0].children.push(index);
            }

            let CodemapNode {
                id,
                name,
                kind,
                children,
                layer,
                importance,
                is_hit,
                is_active,
                search_score,
                matched_chunks,
            } = node;

            nodes.push(TreeNode {
                id,
                name,
                kind,
                layer,
                importance,
                is_hit,
                is_active,
                search_score,
                matched_chunks,
                parent,
                children: Vec::with_capacity(children.len()),
            });

            // Reversed so the first child is popped (and indexed) first.
            for child in children.into_iter().rev() {
                stack.push((child, Some(index)));
            }
        }

        Ok(Self { nodes, by_id })
    }

    /// Recompute folder hits bottom-up and normalize the derived fields.
    pub fn repair_hits(&mut self) {
        // Reverse pre-order visits every child before its parent.
        for i in (0..self.nodes.len()).rev() {
            if self.nodes[i].is_folder() {
                let hit = self.nodes[i]
                    .children
                    .iter()
                    .any(|c| self.nodes[c.0].is_hit);
                let node = &mut self.nodes[i];
                node.is_hit = hit;
                node.matched_chunks.clear();
            } else if !self.nodes[i].is_hit {
                self.nodes[i].matched_chunks.clear();
            }
        }
        if let Some(root) = self.nodes.first_mut() {
            root.is_active = true;
        }
    }

    /// True when nothing in the tree matched the query.
    pub fn is_empty(&self) -> bool {
        !self.root().is_hit && self.nodes.iter().all(|n| n.matched_chunks.is_empty())
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    pub fn node(&self, index: NodeIndex) -> &TreeNode {
        &self.nodes[index.0]
    }

    pub(crate) fn node_mut(&mut self, index: NodeIndex) -> &mut TreeNode {
        &mut self.nodes[index.0]
    }

    pub fn find(&self, id: &str) -> Option<NodeIndex> {
        self.by_id.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Pre-order walk yielding each node with its depth (root = 0).
    pub fn depth_first(&self) -> DepthFirst<'_> {
        DepthFirst {
            tree: self,
            stack: vec![(NodeIndex::ROOT, 0)],
        }
    }

    /// Names from the root down to `index`, following parent links.
    pub fn breadcrumb(&self, index: NodeIndex) -> Vec<&str> {
        let mut names = Vec::new();
        let mut cursor = Some(index);
        while let Some(i) = cursor {
            let node = &self.nodes[i.0];
            names.push(node.name.as_str());
            cursor = node.parent;
        }
        names.reverse();
        names
    }

    /// Hit files in presentation order.
    pub fn hit_files(&self) -> Vec<NodeIndex> {
        self.depth_first()
            .map(|(index, _)| index)
            .filter(|&i| {
                let node = self.node(i);
                node.is_file() && node.is_hit
            })
            .collect()
    }

    pub fn chunk_count(&self) -> usize {
        self.nodes.iter().map(|n| n.matched_chunks.len()).sum()
    }

    /// Rebuild the nested wire shape.
    pub fn to_node(&self) -> CodemapNode {
        let mut built: Vec<Option<CodemapNode>> = vec![None; self.nodes.len()];
        for i in (0..self.nodes.len()).rev() {
            let node = &self.nodes[i];
            let children = node
                .children
                .iter()
                .filter_map(|c| built[c.0].take())
                .collect();
            built[i] = Some(CodemapNode {
                id: node.id.clone(),
                name: node.name.clone(),
                kind: node.kind,
                children,
                layer: node.layer,
                importance: node.importance,
                is_hit: node.is_hit,
                is_active: node.is_active,
                search_score: node.search_score,
                matched_chunks: node.matched_chunks.clone(),
            });
        }
        built
            .into_iter()
            .next()
            .flatten()
            .unwrap_or_else(|| CodemapNode::folder("root", "root"))
    }
}

/// Iterator returned by [`ResultTree::depth_first`].
pub struct DepthFirst<'a> {
    tree: &'a ResultTree,
    stack: Vec<(NodeIndex, usize)>,
}

impl Iterator for DepthFirst<'_> {
    type Item = (NodeIndex, usize);

    fn next(&mut self) -> Option<Self::Item> {
        let (index, depth) = self.stack.pop()?;
        for &child in self.tree.node(index).children.iter().rev() {
            self.stack.push((child, depth + 1));
        }
        Some((index, depth))
    }
}
