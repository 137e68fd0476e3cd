//! The request/response boundary to the indexing and search service.
//!
//! The [`Backend`] trait is everything the lifecycle and session layers
//! need from the outside world: import a repository, search a project, and
//! clear a project. Ingestion, embedding, and ranking all live behind it.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//!
//! | Method | Contract |
//! |--------|----------|
//! | [`import`](Backend::import) | `POST /import`: may mint a new project id on every call |
//! | [`search`](Backend::search) | `GET /search`: tree or flat fallback |
//! | [`clear`](Backend::clear) | `POST /clear`: idempotent |

pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ClearOutcome, IngestStats, SearchResponse};

#[async_trait]
pub trait Backend: Send + Sync {
    /// Ingest the repository at `source_uri`. Failures are
    /// [`CodemapError::Import`](crate::error::CodemapError::Import).
    async fn import(&self, source_uri: &str) -> Result<IngestStats>;

    /// Search one project. Failures are
    /// [`CodemapError::Search`](crate::error::CodemapError::Search).
    async fn search(&self, project_id: &str, query: &str) -> Result<SearchResponse>;

    /// Delete everything stored for one project. Failures are
    /// [`CodemapError::Clear`](crate::error::CodemapError::Clear).
    async fn clear(&self, project_id: &str) -> Result<ClearOutcome>;
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for Arc<B> {
    async fn import(&self, source_uri: &str) -> Result<IngestStats> {
        (**self).import(source_uri).await
    }

    async fn search(&self, project_id: &str, query: &str) -> Result<SearchResponse> {
        (**self).search(project_id, query).await
    }

    async fn clear(&self, project_id: &str) -> Result<ClearOutcome> {
        (**self).clear(project_id).await
    }
}
