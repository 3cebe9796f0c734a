//! Handlers for the six inbound routes (§6). Trigger/status/detect/single-event
//! are the operator-facing surface; `lib.rs` wires these plus the metrics
//! routes into one `Router`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use eventscout_core::{CrawlJobPayload, ExtractionSource};
use eventscout_safety::fetch::{safe_get, FetchOptions};
use eventscout_safety::sniff;
use eventscout_worker::spawn_inline_crawl;
use tracing::warn;

use crate::error::ApiError;
use crate::models::{
    DetectRequest, DetectResponse, SingleEventRequest, SingleEventResponse, StatusResponse,
    TriggerRequest, TriggerResponse,
};
use crate::state::AppState;

/// `POST /crawl/trigger`. Enqueues a crawl job; on `dry_run` it runs the
/// pipeline synchronously and returns candidates inline instead of posting
/// to the ingest endpoint. When the queue itself is unreachable at enqueue
/// time, falls back to running the handler inline in a background task so
/// the caller never blocks on queue availability (§4.14).
pub async fn trigger(
    State(state): State<AppState>,
    Json(req): Json<TriggerRequest>,
) -> Result<Json<TriggerResponse>, ApiError> {
    if req.source_type == eventscout_core::SourceType::Scraper && req.scraper_config.is_none() {
        return Err(ApiError::Validation(
            "scraper source_type requires scraper_config".to_string(),
        ));
    }

    let payload = CrawlJobPayload {
        source_id: req.source_id.clone(),
        source_url: req.source_url.clone(),
        source_type: req.source_type,
        scraper_config: req.scraper_config.clone(),
        force: req.force,
        dry_run: req.dry_run,
        enable_ai: req.enable_ai,
        fetch_event_pages: req.fetch_event_pages,
        ingest_run_id: req.ingest_run_id.clone(),
    };

    if req.dry_run {
        let result = eventscout_worker::run_crawl_job(
            &payload,
            &state.worker.app_config,
            &state.worker.http_client,
            &state.worker.throttle,
            None,
        )
        .await
        .map_err(ApiError::Internal)?;
        return Ok(Json(TriggerResponse {
            job_id: "dry-run".to_string(),
            source_id: req.source_id,
            status: "success".to_string(),
            message: format!("dry run found {} event(s)", result.events_found),
            candidates: Some(result.candidates),
        }));
    }

    let job_payload = serde_json::to_value(&payload)
        .ok()
        .and_then(|v| v.as_object().cloned())
        .map(|m| m.into_iter().collect::<HashMap<_, _>>())
        .unwrap_or_default();

    match state.worker.queue.enqueue("crawl", job_payload, "crawl", 0, 0).await {
        Ok(job) => Ok(Json(TriggerResponse {
            job_id: job.id,
            source_id: req.source_id,
            status: "queued".to_string(),
            message: "crawl job queued".to_string(),
            candidates: None,
        })),
        Err(err) => {
            warn!(error = %err, "enqueue failed, running crawl inline");
            spawn_inline_crawl(Arc::clone(&state.worker), payload);
            Ok(Json(TriggerResponse {
                job_id: "inline".to_string(),
                source_id: req.source_id,
                status: "running".to_string(),
                message: "queue unavailable, crawl running inline".to_string(),
                candidates: None,
            }))
        }
    }
}

/// `GET /crawl/status/{job_id}`.
pub async fn status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<StatusResponse>, ApiError> {
    let job = state
        .worker
        .queue
        .get_status(&job_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(job_id.clone()))?;

    let (events_found, events_new) = job
        .result
        .as_ref()
        .map(|r| {
            let found = r.get("events_found").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
            let created = r.get("created").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
            (Some(found), Some(created))
        })
        .unwrap_or((None, None));

    Ok(Json(StatusResponse {
        job_id: job.id,
        source_id: job.payload.get("source_id").and_then(|v| v.as_str()).map(str::to_string),
        status: format!("{:?}", job.status).to_lowercase(),
        started_at: job.started_at,
        finished_at: job.finished_at,
        events_found,
        events_new,
        error: job.error,
    }))
}

/// `POST /crawl/detect`. Fetches the URL and classifies it by content
/// sniffing plus a structured-data probe, recommending which source_type
/// a trigger request for this URL should use.
pub async fn detect(
    State(state): State<AppState>,
    Json(req): Json<DetectRequest>,
) -> Result<Json<DetectResponse>, ApiError> {
    let opts = FetchOptions { user_agent: state.worker.app_config.scraper.user_agent.clone(), ..Default::default() };
    let resp = safe_get(&state.worker.http_client, &req.url, &opts).await?;
    let kind = sniff::sniff(resp.content_type.as_deref(), &resp.body);

    let body_text = String::from_utf8_lossy(&resp.body).into_owned();
    let base = resp.final_url.clone();

    let jsonld = eventscout_extraction::structured::extract_jsonld(&body_text);
    let microdata = if jsonld.is_empty() {
        eventscout_extraction::structured::extract_microdata(&body_text, &base)
    } else {
        Vec::new()
    };
    let has_json_ld_events = !jsonld.is_empty();
    let has_microdata_events = !microdata.is_empty();

    let sample_events: Vec<serde_json::Value> = jsonld
        .iter()
        .chain(microdata.iter())
        .take(5)
        .map(|e| serde_json::to_value(&e.fields).unwrap_or(serde_json::Value::Null))
        .collect();

    let detected_type: &'static str = match kind {
        eventscout_core::ContentKind::Rss => "rss",
        eventscout_core::ContentKind::Ics => "ics",
        eventscout_core::ContentKind::Html if has_json_ld_events => "json_ld",
        eventscout_core::ContentKind::Html if has_microdata_events => "microdata",
        eventscout_core::ContentKind::Html => "unknown",
        eventscout_core::ContentKind::Unknown => "unknown",
    };

    let recommendation: &'static str = match kind {
        eventscout_core::ContentKind::Rss => "rss",
        eventscout_core::ContentKind::Ics => "ics",
        eventscout_core::ContentKind::Html => "scraper",
        eventscout_core::ContentKind::Unknown => "unknown",
    };

    let sitemap_url = if kind == eventscout_core::ContentKind::Html {
        eventscout_feeds::sitemap::walk(&state.worker.http_client, req.url.trim_end_matches('/'), None, true, 1)
            .await
            .ok()
            .filter(|v| !v.is_empty())
            .map(|_| format!("{}/sitemap.xml", req.url.trim_end_matches('/')))
    } else {
        None
    };

    Ok(Json(DetectResponse {
        detected_type,
        rss_url: if kind == eventscout_core::ContentKind::Rss { Some(req.url.clone()) } else { None },
        ics_url: if kind == eventscout_core::ContentKind::Ics { Some(req.url.clone()) } else { None },
        has_json_ld_events,
        has_microdata_events,
        sample_events,
        recommendation,
        sitemap_url,
    }))
}

/// `POST /crawl/single-event`. Fetches one page and runs it through the
/// extraction pipeline (custom selectors first if `detail_page_config` was
/// supplied, then structured data, then the heuristic fallback), reporting
/// per-field provenance and, for anything still missing, selector
/// suggestions generated from whatever values were found.
pub async fn single_event(
    State(state): State<AppState>,
    Json(req): Json<SingleEventRequest>,
) -> Result<Json<SingleEventResponse>, ApiError> {
    let opts = FetchOptions { user_agent: state.worker.app_config.scraper.user_agent.clone(), ..Default::default() };
    let resp = match safe_get(&state.worker.http_client, &req.url, &opts).await {
        Ok(resp) => resp,
        Err(err) => {
            return Ok(Json(SingleEventResponse {
                success: false,
                fields_found: HashMap::new(),
                fields_missing: Vec::new(),
                extraction_method: String::new(),
                field_provenance: HashMap::new(),
                suggested_selectors: None,
                error: Some(err.to_string()),
            }));
        }
    };

    let html = String::from_utf8_lossy(&resp.body).into_owned();
    let base = resp.final_url.clone();

    let mut stages = Vec::new();
    if let Some(selectors) = &req.detail_page_config {
        if !selectors.is_empty() {
            stages.push(eventscout_extraction::ExtractionStage::CustomSelector { selectors });
        }
    }
    stages.push(eventscout_extraction::ExtractionStage::StructuredData);
    stages.push(eventscout_extraction::ExtractionStage::Heuristic);

    let extracted = eventscout_extraction::run(&html, &base, &stages);

    let wanted: Vec<&str> = match &req.fields_needed {
        Some(fields) => fields.iter().map(String::as_str).collect(),
        None => eventscout_extraction::ALL_FIELDS.to_vec(),
    };

    let mut fields_found = HashMap::new();
    let mut field_provenance = HashMap::new();
    let mut fields_missing = Vec::new();
    let mut sources_used: Vec<&'static str> = Vec::new();

    for field in &wanted {
        match extracted.fields.get(*field) {
            Some(result) => {
                fields_found.insert(field.to_string(), result.value.clone());
                let name = source_name(result.source);
                field_provenance.insert(field.to_string(), name.to_string());
                if !sources_used.contains(&name) {
                    sources_used.push(name);
                }
            }
            None => fields_missing.push(field.to_string()),
        }
    }

    sources_used.sort();
    let extraction_method = sources_used.join("+");

    let suggested_selectors = if !fields_missing.is_empty() && !fields_found.is_empty() {
        let known: HashMap<String, String> = fields_found
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect();
        let suggestions = eventscout_extraction::suggest::suggest(&html, &known);
        if suggestions.is_empty() {
            None
        } else {
            Some(suggestions)
        }
    } else {
        None
    };

    Ok(Json(SingleEventResponse {
        success: !fields_found.is_empty(),
        fields_found,
        fields_missing,
        extraction_method,
        field_provenance,
        suggested_selectors,
        error: None,
    }))
}

fn source_name(source: ExtractionSource) -> &'static str {
    match source {
        ExtractionSource::CustomSelector => "custom_selector",
        ExtractionSource::JsonLd => "structured",
        ExtractionSource::Microdata => "structured",
        ExtractionSource::Heuristic => "heuristic",
        ExtractionSource::Ai => "ai",
    }
}
