//! HTTP implementation of the [`Backend`] trait.
//!
//! Talks to the indexing service over its JSON API. Every path hangs off
//! `[backend] base_url` + `api_prefix` from the config:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | import | `POST {prefix}/import` with `{"repo_url": ...}` |
//! | search | `GET {prefix}/search?query=..&project_id=..` |
//! | clear | `POST {prefix}/clear?project_id=..` |
//!
//! Failures never retry. A non-2xx reply is reported with the server's
//! `detail` message when the body carries one, otherwise with the status
//! line and raw body.

use std::time::Duration;

use async_trait::async_trait;
use codemap_core::backend::Backend;
use codemap_core::models::{ClearOutcome, IngestStats, SearchEnvelope, SearchResponse};
use codemap_core::{CodemapError, Result};
use serde::Deserialize;
use tracing::debug;

use crate::config::BackendConfig;

pub struct HttpBackend {
    client: reqwest::Client,
    config: BackendConfig,
}

/// `POST /import` replies either `{"stats": {...}}` or the stats object itself.
#[derive(Deserialize)]
#[serde(untagged)]
enum ImportReply {
    Wrapped { stats: IngestStats },
    Bare(IngestStats),
}

impl ImportReply {
    fn into_stats(self) -> IngestStats {
        match self {
            ImportReply::Wrapped { stats } | ImportReply::Bare(stats) => stats,
        }
    }
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }
}

/// Read an error body and pull out the most useful message.
async fn failure_message(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<serde_json::Value>(&body) {
        Ok(json) => match json.get("detail").or_else(|| json.get("error")) {
            Some(serde_json::Value::String(detail)) => detail.clone(),
            Some(other) => other.to_string(),
            None => format!("HTTP {}: {}", status, body),
        },
        Err(_) if body.trim().is_empty() => format!("HTTP {}", status),
        Err(_) => format!("HTTP {}: {}", status, body.trim()),
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn import(&self, source_uri: &str) -> Result<IngestStats> {
        let url = self.config.endpoint("import");
        debug!(%url, source_uri, "import request");

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "repo_url": source_uri }))
            .send()
            .await
            .map_err(|e| CodemapError::Import(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(CodemapError::Import(failure_message(response).await));
        }

        let reply: ImportReply = response
            .json()
            .await
            .map_err(|e| CodemapError::Import(format!("invalid import response: {}", e)))?;
        Ok(reply.into_stats())
    }

    async fn search(&self, project_id: &str, query: &str) -> Result<SearchResponse> {
        let url = self.config.endpoint("search");
        debug!(%url, project_id, query, "search request");

        let response = self
            .client
            .get(&url)
            .query(&[("query", query), ("project_id", project_id)])
            .send()
            .await
            .map_err(|e| CodemapError::Search(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(CodemapError::Search(failure_message(response).await));
        }

        let envelope: SearchEnvelope = response
            .json()
            .await
            .map_err(|e| CodemapError::Search(format!("invalid search response: {}", e)))?;
        SearchResponse::try_from(envelope)
    }

    async fn clear(&self, project_id: &str) -> Result<ClearOutcome> {
        let url = self.config.endpoint("clear");
        debug!(%url, project_id, "clear request");

        let response = self
            .client
            .post(&url)
            .query(&[("project_id", project_id)])
            .send()
            .await
            .map_err(|e| CodemapError::Clear(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(CodemapError::Clear(failure_message(response).await));
        }

        response
            .json()
            .await
            .map_err(|e| CodemapError::Clear(format!("invalid clear response: {}", e)))
    }
}
