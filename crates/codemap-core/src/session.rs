//! Sequencing of import, search, and clear against a [`Backend`].
//!
//! A [`Session`] owns the lifecycle controller, the rendered codemap, and a
//! counter of issued searches. Every operation follows the same pattern:
//! validate and transition under the lock, release it, await the backend,
//! then re-take the lock to apply the answer. The lock is never held across
//! an `.await`.
//!
//! # Stale responses
//!
//! Each search takes a sequence number when it is issued. When its response
//! arrives it is applied only if no newer search has been issued since and
//! the project it ran against is still the committed one. A re-import that
//! is still running does not count as a change, since it may yet fail.
//! Otherwise the response is dropped and the caller gets
//! [`SearchOutcome::Discarded`]. A successful import or clear also bumps the
//! counter, so searches that were in flight against the old project can
//! never land.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, info, warn};

use crate::backend::Backend;
use crate::error::Result;
use crate::lifecycle::{LifecycleState, ProjectLifecycle};
use crate::models::{ClearOutcome, IngestStats, Project, SearchResult, SearchStats};
use crate::tree::{build_from_response, ResultTree, TreeBuild};
use crate::view::TreeView;

/// A search response rendered as a tree, with its view state.
#[derive(Debug, Clone)]
pub struct Codemap {
    pub query: String,
    pub tree: ResultTree,
    pub view: TreeView,
    pub stats: Option<SearchStats>,
}

/// What the session is currently showing.
#[derive(Debug, Clone)]
pub enum Rendered {
    Tree(Codemap),
    /// The backend answered without a tree.
    Flat {
        query: String,
        results: Vec<SearchResult>,
    },
}

/// Counters describing a freshly applied tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSummary {
    pub hit_files: usize,
    pub chunks: usize,
    /// Nothing matched; show a "no results" state.
    pub empty: bool,
    pub stats: Option<SearchStats>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Tree(SearchSummary),
    Fallback(Vec<SearchResult>),
    /// A newer search was issued (or the project changed) before this one
    /// resolved; nothing was applied.
    Discarded,
}

struct SessionState {
    lifecycle: ProjectLifecycle,
    rendered: Option<Rendered>,
}

pub struct Session<B> {
    backend: B,
    state: Mutex<SessionState>,
    issued: AtomicU64,
}

impl<B: Backend> Session<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: Mutex::new(SessionState {
                lifecycle: ProjectLifecycle::new(),
                rendered: None,
            }),
            issued: AtomicU64::new(0),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> LifecycleState {
        self.lock().lifecycle.state()
    }

    pub fn project(&self) -> Option<Project> {
        self.lock().lifecycle.project().cloned()
    }

    /// Import a repository and make it the active project.
    ///
    /// On success any rendered codemap is dropped. On failure the previous
    /// project and codemap stay as they were.
    pub async fn import(&self, source_uri: &str) -> Result<IngestStats> {
        let source_uri = source_uri.trim();
        self.lock().lifecycle.begin_import(source_uri)?;

        let outcome = self.backend.import(source_uri).await;

        let mut state = self.lock();
        state.lifecycle.complete_import(outcome.clone())?;
        state.rendered = None;
        self.issued.fetch_add(1, Ordering::SeqCst);
        outcome
    }

    /// Run a query against the active project and render the answer.
    pub async fn search(&self, query: &str) -> Result<SearchOutcome> {
        let (project_id, seq) = {
            let state = self.lock();
            let project = state.lifecycle.authorize_search(query)?;
            let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            (project.id.clone(), seq)
        };
        debug!(seq, project_id = %project_id, query, "search issued");

        let response = self.backend.search(&project_id, query).await;

        let mut state = self.lock();
        let current = self.issued.load(Ordering::SeqCst) == seq
            && state.lifecycle.committed_project().map(|p| p.id.as_str())
                == Some(project_id.as_str());

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                warn!(seq, error = %e, "search failed, keeping previous codemap");
                return Err(e);
            }
        };
        if !current {
            debug!(seq, "stale search response discarded");
            return Ok(SearchOutcome::Discarded);
        }

        match build_from_response(response)? {
            TreeBuild::Tree { tree, stats } => {
                let summary = SearchSummary {
                    hit_files: tree.hit_files().len(),
                    chunks: tree.chunk_count(),
                    empty: tree.is_empty(),
                    stats,
                };
                let view = TreeView::new(&tree);
                state.rendered = Some(Rendered::Tree(Codemap {
                    query: query.to_string(),
                    tree,
                    view,
                    stats,
                }));
                info!(
                    seq,
                    hit_files = summary.hit_files,
                    chunks = summary.chunks,
                    "codemap updated"
                );
                Ok(SearchOutcome::Tree(summary))
            }
            TreeBuild::Fallback(results) => {
                info!(seq, results = results.len(), "backend answered without a tree");
                state.rendered = Some(Rendered::Flat {
                    query: query.to_string(),
                    results: results.clone(),
                });
                Ok(SearchOutcome::Fallback(results))
            }
        }
    }

    /// Delete the active project on the backend.
    ///
    /// Nothing local is discarded until the backend confirms.
    pub async fn clear(&self) -> Result<ClearOutcome> {
        let project = self.lock().lifecycle.begin_clear()?;

        let outcome = self.backend.clear(&project.id).await;

        let mut state = self.lock();
        let cleared = state.lifecycle.complete_clear(outcome)?;
        state.rendered = None;
        self.issued.fetch_add(1, Ordering::SeqCst);
        Ok(cleared)
    }

    /// Expand or collapse a folder of the rendered tree.
    pub fn toggle_expand(&self, node_id: &str) -> bool {
        match &mut self.lock().rendered {
            Some(Rendered::Tree(map)) => map.view.toggle_expand(&map.tree, node_id),
            _ => false,
        }
    }

    /// Show or hide the matched chunks of a hit file.
    pub fn toggle_chunks(&self, node_id: &str) -> bool {
        match &mut self.lock().rendered {
            Some(Rendered::Tree(map)) => map.view.toggle_chunks(&map.tree, node_id),
            _ => false,
        }
    }

    /// Expand every folder leading to a hit.
    pub fn reveal_hits(&self) {
        if let Some(Rendered::Tree(map)) = &mut self.lock().rendered {
            map.view.expand_all_hits(&map.tree);
        }
    }

    /// Read the rendered state without cloning it.
    pub fn with_rendered<R>(&self, f: impl FnOnce(Option<&Rendered>) -> R) -> R {
        let state = self.lock();
        f(state.rendered.as_ref())
    }
}
