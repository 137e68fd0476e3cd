//! Core data models shared by the lifecycle, tree, and session layers.
//!
//! The serde attributes describe the backend's JSON wire shape: keys are
//! snake_case and a node's kind travels under the `type` key.

use serde::{Deserialize, Serialize};

use crate::error::{CodemapError, Result};

/// One ingested codebase, identified by the id the backend assigned at import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub id: String,
    pub source_uri: String,
}

/// Whether a codemap node is a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

/// A node of the hierarchical project tree as the backend sends it.
///
/// Children are owned and kept in presentation order. For folders `is_hit`
/// is derived from the children; see [`ResultTree`](crate::tree::ResultTree)
/// for the repair pass that enforces this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodemapNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<CodemapNode>,
    /// Architectural layer: 0 docs, 1 API, 2 core, 3 utility, 4 other.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub importance: Option<f64>,
    #[serde(default)]
    pub is_hit: bool,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_chunks: Vec<SearchResult>,
}

impl CodemapNode {
    /// A folder node with no children and no search annotations.
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::bare(id.into(), name.into(), NodeKind::Folder)
    }

    /// A file node with no search annotations.
    pub fn file(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::bare(id.into(), name.into(), NodeKind::File)
    }

    fn bare(id: String, name: String, kind: NodeKind) -> Self {
        Self {
            id,
            name,
            kind,
            children: Vec::new(),
            layer: None,
            importance: None,
            is_hit: false,
            is_active: false,
            search_score: None,
            matched_chunks: Vec::new(),
        }
    }

    /// Builder-style helper used by tests and the in-memory backend.
    pub fn with_children(mut self, children: Vec<CodemapNode>) -> Self {
        self.children = children;
        self
    }

    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }
}

/// Kind of content a chunk was cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkKind {
    Code,
    Documentation,
}

/// Location and classification of a matched chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ChunkKind,
    pub file_path: String,
    #[serde(default)]
    pub language: String,
    pub start_line: u32,
    pub end_line: u32,
}

/// One matched code or documentation chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Lower is more relevant. The scale is backend-defined.
    #[serde(default)]
    pub distance: Option<f64>,
}

/// Summary returned by a successful import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub project_id: String,
    #[serde(default)]
    pub files_processed: u64,
    #[serde(default)]
    pub code_files: u64,
    #[serde(default)]
    pub doc_files: u64,
    #[serde(default)]
    pub chunks_generated: u64,
    #[serde(default)]
    pub code_chunks: u64,
    #[serde(default)]
    pub doc_chunks: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_url: Option<String>,
}

/// Counters the backend attaches to a tree-shaped search response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchStats {
    pub hits_found: u64,
    pub vector_results: u64,
}

/// A search response after the wire envelope has been classified.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchResponse {
    /// The backend overlaid the hits on the project tree.
    Tree {
        tree: CodemapNode,
        stats: Option<SearchStats>,
    },
    /// No tree was available; only a flat list of chunks came back.
    Fallback { results: Vec<SearchResult> },
}

/// The raw `GET /search` body. Exactly one shape is expected, but every
/// field is optional on the wire so the classification happens in one place.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree: Option<CodemapNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<SearchStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<SearchResult>>,
    #[serde(default)]
    pub fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TryFrom<SearchEnvelope> for SearchResponse {
    type Error = CodemapError;

    fn try_from(envelope: SearchEnvelope) -> Result<Self> {
        if let Some(message) = envelope.error {
            return Err(CodemapError::Search(message));
        }
        match (envelope.tree, envelope.results) {
            (Some(tree), _) if !envelope.fallback => Ok(SearchResponse::Tree {
                tree,
                stats: envelope.stats,
            }),
            (_, Some(results)) => Ok(SearchResponse::Fallback { results }),
            (_, None) if envelope.fallback => Ok(SearchResponse::Fallback {
                results: Vec::new(),
            }),
            _ => Err(CodemapError::Search(
                "response carried neither a tree nor a result list".to_string(),
            )),
        }
    }
}

/// Result of a successful `POST /clear`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearOutcome {
    pub deleted_count: u64,
}
