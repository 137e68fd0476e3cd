//! In-memory [`Backend`] implementation for tests and offline demos.
//!
//! Repositories are registered up front as lists of already-chunked
//! [`SearchResult`]s keyed by source URI. Importing one assigns a fresh
//! project id and lays its files out as a module tree; searching does
//! case-insensitive term matching over chunk text and overlays the hits on
//! that tree. There is no embedding or vector index.
//!
//! Module tree layout:
//! - the root folder has id `root`, sub-folders `root/<dir>/<dir>`;
//! - file ids are the file path;
//! - folders come first (by name), then files by layer and name.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{CodemapError, Result};
use crate::models::{
    ChunkKind, ClearOutcome, CodemapNode, IngestStats, SearchResponse, SearchResult, SearchStats,
};
use crate::tree::ResultTree;

/// Chunks considered per search before grouping by file.
const CANDIDATE_LIMIT: usize = 30;

struct StoredProject {
    chunks: Vec<SearchResult>,
    tree: CodemapNode,
}

/// In-memory backend.
pub struct InMemoryBackend {
    sources: RwLock<HashMap<String, Vec<SearchResult>>>,
    projects: RwLock<HashMap<String, StoredProject>>,
    fallback: bool,
    propagate_hits: bool,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            sources: RwLock::new(HashMap::new()),
            projects: RwLock::new(HashMap::new()),
            fallback: false,
            propagate_hits: true,
        }
    }

    /// Answer every search with a flat result list instead of a tree.
    pub fn with_fallback(mut self) -> Self {
        self.fallback = true;
        self
    }

    /// Mark only hit files, leaving ancestor folders unmarked, the way a
    /// careless service might.
    pub fn without_hit_propagation(mut self) -> Self {
        self.propagate_hits = false;
        self
    }

    /// Register a repository that a later `import(source_uri)` will find.
    pub fn add_source(&self, source_uri: &str, chunks: Vec<SearchResult>) {
        self.sources
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(source_uri.to_string(), chunks);
    }

    pub fn project_count(&self) -> usize {
        self.projects
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl super::Backend for InMemoryBackend {
    async fn import(&self, source_uri: &str) -> Result<IngestStats> {
        let chunks = self
            .sources
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(source_uri)
            .cloned()
            .ok_or_else(|| CodemapError::Import(format!("Directory not found: {}", source_uri)))?;

        let (tree, files, doc_files) = {
            let mut paths: Vec<&str> = Vec::new();
            let mut doc_only: HashMap<&str, bool> = HashMap::new();
            for c in &chunks {
                let path = c.metadata.file_path.as_str();
                let is_doc = c.metadata.kind == ChunkKind::Documentation;
                match doc_only.get_mut(path) {
                    Some(d) => *d &= is_doc,
                    None => {
                        paths.push(path);
                        doc_only.insert(path, is_doc);
                    }
                }
            }
            let doc_files = doc_only.values().filter(|d| **d).count() as u64;
            (module_tree(&paths), paths.len() as u64, doc_files)
        };

        let doc_chunks = chunks
            .iter()
            .filter(|c| c.metadata.kind == ChunkKind::Documentation)
            .count() as u64;
        let stats = IngestStats {
            project_id: uuid::Uuid::new_v4().to_string(),
            files_processed: files,
            code_files: files - doc_files,
            doc_files,
            chunks_generated: chunks.len() as u64,
            code_chunks: chunks.len() as u64 - doc_chunks,
            doc_chunks,
            repo_url: Some(source_uri.to_string()),
        };

        self.projects
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(stats.project_id.clone(), StoredProject { chunks, tree });

        debug!(project_id = %stats.project_id, files = stats.files_processed, "in-memory import");
        Ok(stats)
    }

    async fn search(&self, project_id: &str, query: &str) -> Result<SearchResponse> {
        let projects = self.projects.read().unwrap_or_else(|e| e.into_inner());
        let project = projects.get(project_id).ok_or_else(|| {
            CodemapError::Search("Project tree not found. Please ingest project first.".to_string())
        })?;

        let matched = match_chunks(&project.chunks, query);
        if self.fallback {
            return Ok(SearchResponse::Fallback { results: matched });
        }

        let mut hits: Vec<(&str, Vec<SearchResult>)> = Vec::new();
        for chunk in &matched {
            let path = chunk.metadata.file_path.as_str();
            match hits.iter_mut().find(|(p, _)| *p == path) {
                Some((_, chunks)) => chunks.push(chunk.clone()),
                None => hits.push((path, vec![chunk.clone()])),
            }
        }

        let mut tree = ResultTree::from_node(project.tree.clone())?;
        for (path, chunks) in &hits {
            let Some(index) = tree.find(path) else {
                continue;
            };
            let node = tree.node_mut(index);
            node.is_hit = true;
            node.is_active = true;
            node.search_score = chunks.iter().filter_map(|c| c.distance).reduce(f64::min);
            node.matched_chunks = chunks.clone();

            if self.propagate_hits {
                let mut cursor = tree.node(index).parent();
                while let Some(parent) = cursor {
                    let folder = tree.node_mut(parent);
                    folder.is_hit = true;
                    folder.is_active = true;
                    cursor = folder.parent();
                }
            }
        }

        Ok(SearchResponse::Tree {
            tree: tree.to_node(),
            stats: Some(SearchStats {
                hits_found: hits.len() as u64,
                vector_results: matched.len() as u64,
            }),
        })
    }

    async fn clear(&self, project_id: &str) -> Result<ClearOutcome> {
        let removed = self
            .projects
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(project_id);
        Ok(ClearOutcome {
            deleted_count: removed.map(|p| p.chunks.len() as u64).unwrap_or(0),
        })
    }
}

/// Chunks containing at least one query term, best first.
///
/// Distance is the fraction of terms a chunk misses, so lower is better as
/// with a vector store.
fn match_chunks(chunks: &[SearchResult], query: &str) -> Vec<SearchResult> {
    let query_lower = query.to_lowercase();
    let terms: Vec<&str> = query_lower.split_whitespace().collect();
    if terms.is_empty() {
        return Vec::new();
    }

    let mut matched: Vec<SearchResult> = chunks
        .iter()
        .filter_map(|c| {
            let text = format!("{}\n{}", c.metadata.name, c.content).to_lowercase();
            let found = terms.iter().filter(|t| text.contains(*t)).count();
            if found == 0 {
                return None;
            }
            let mut hit = c.clone();
            hit.distance = Some(1.0 - found as f64 / terms.len() as f64);
            Some(hit)
        })
        .collect();

    matched.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    matched.truncate(CANDIDATE_LIMIT);
    matched
}

/// Architectural layer of a file, judged from its path.
///
/// 0 docs, 1 entry points, 2 core logic, 3 data and utilities, 4 other.
pub fn classify_layer(file_path: &str) -> u32 {
    let p = file_path.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| p.contains(n));

    if p.ends_with(".md") || p.contains("docs/") {
        0
    } else if has(&["api/", "routes", "main.", "cli/", "app."]) {
        1
    } else if has(&[
        "models/", "schemas", "utils/", "lib/", "common/", "types", "dto",
    ]) {
        3
    } else if has(&["services/", "core/", "managers/", "logic/"]) {
        2
    } else {
        4
    }
}

/// Lay out file paths as a folder tree.
///
/// Folders are assembled deepest first, so no step needs to recurse.
fn module_tree(paths: &[&str]) -> CodemapNode {
    let mut folders: BTreeMap<String, (String, usize)> = BTreeMap::new();
    let mut files_in: HashMap<String, Vec<CodemapNode>> = HashMap::new();

    for path in paths {
        let parts: Vec<&str> = path.split('/').filter(|p| !p.is_empty()).collect();
        let Some((file_name, dirs)) = parts.split_last() else {
            continue;
        };
        let mut parent = "root".to_string();
        for (depth, dir) in dirs.iter().enumerate() {
            let id = format!("{}/{}", parent, dir);
            folders
                .entry(id.clone())
                .or_insert_with(|| (dir.to_string(), depth + 1));
            parent = id;
        }
        let mut file = CodemapNode::file(*path, *file_name);
        file.layer = Some(classify_layer(path));
        files_in.entry(parent).or_default().push(file);
    }

    let mut order: Vec<(String, String, usize)> = folders
        .into_iter()
        .map(|(id, (name, depth))| (id, name, depth))
        .collect();
    order.sort_by(|a, b| b.2.cmp(&a.2));

    let mut assembled: HashMap<String, Vec<CodemapNode>> = HashMap::new();
    for (id, name, _) in order {
        let node = assemble_folder(&id, &name, &mut assembled, &mut files_in);
        let parent = id
            .rsplit_once('/')
            .map(|(parent, _)| parent.to_string())
            .unwrap_or_else(|| "root".to_string());
        assembled.entry(parent).or_default().push(node);
    }
    assemble_folder("root", "root", &mut assembled, &mut files_in)
}

fn assemble_folder(
    id: &str,
    name: &str,
    assembled: &mut HashMap<String, Vec<CodemapNode>>,
    files_in: &mut HashMap<String, Vec<CodemapNode>>,
) -> CodemapNode {
    let mut children = assembled.remove(id).unwrap_or_default();
    children.sort_by(|a, b| a.name.cmp(&b.name));
    let mut files = files_in.remove(id).unwrap_or_default();
    files.sort_by(|a, b| a.layer.cmp(&b.layer).then_with(|| a.name.cmp(&b.name)));
    children.extend(files);
    CodemapNode::folder(id, name).with_children(children)
}
