//! Outbound HTTP client for the two collaborator endpoints the worker
//! talks to: the event-ingest endpoint and the run-status callback.
//! Grounded in `crates/networks/src/tor.rs`'s bearer-header-building
//! pattern, trimmed down to a plain `reqwest::Client` since these calls
//! go to the clearnet backend, not an overlay network.

use eventscout_core::CanonicalCandidate;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestAction {
    Created,
    Updated,
    Duplicate,
    Error,
}

#[derive(Debug, Deserialize)]
pub struct IngestResponse {
    pub action: IngestAction,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Success,
    Partial,
    Failed,
    NeedsAttention,
}

#[derive(Debug, Serialize)]
pub struct RunStatusUpdate {
    pub status: RunStatus,
    pub events_found: usize,
    pub events_created: usize,
    pub events_updated: usize,
    pub events_skipped: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_details: Option<serde_json::Value>,
}

#[derive(Clone)]
pub struct IngestClient {
    client: reqwest::Client,
    backend_url: String,
    service_token: Option<String>,
}

impl IngestClient {
    pub fn new(client: reqwest::Client, backend_url: impl Into<String>, service_token: Option<String>) -> Self {
        Self { client, backend_url: backend_url.into(), service_token }
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.service_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    pub async fn ingest_event(&self, candidate: &CanonicalCandidate) -> Result<IngestAction, String> {
        let url = format!("{}/api/events/ingest", self.backend_url.trim_end_matches('/'));
        let req = self.auth(self.client.post(&url)).json(candidate);
        let resp = req.send().await.map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            warn!(status = %resp.status(), "ingest endpoint returned non-2xx");
            return Ok(IngestAction::Error);
        }
        let parsed: IngestResponse = resp.json().await.map_err(|e| e.to_string())?;
        Ok(parsed.action)
    }

    pub async fn update_run_status(&self, ingest_run_id: &str, update: &RunStatusUpdate) -> Result<(), String> {
        let url = format!("{}/api/admin/ingest-runs/{}", self.backend_url.trim_end_matches('/'), ingest_run_id);
        let req = self.auth(self.client.patch(&url)).json(update);
        let resp = req.send().await.map_err(|e| e.to_string())?;
        if !resp.status().is_success() {
            warn!(status = %resp.status(), ingest_run_id, "run-status callback returned non-2xx");
        }
        Ok(())
    }
}
