//! Safe-fetch wrapper: SSRF guard + 5 MB response cap + per-call timeout.
//! Grounded in `crates/networks/src/tor.rs`'s `CrawlError::BodyTooLarge`
//! enforcement, generalized from a single overlay-network client to a
//! plain `reqwest::Client`.

use std::time::Duration;

use eventscout_core::EventscoutError;
use url::Url;

use crate::ssrf;

pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub timeout: Duration,
    pub max_body_bytes: usize,
    pub user_agent: String,
    pub extra_headers: Vec<(String, String)>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            user_agent: "EventscoutBot/1.0 (+https://example.invalid/bot)".to_string(),
            extra_headers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SafeResponse {
    pub url: Url,
    pub final_url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
    pub response_time_ms: u64,
}

/// Performs a GET, enforcing the SSRF guard before connecting and the body
/// size cap while streaming the response.
pub async fn safe_get(
    client: &reqwest::Client,
    raw_url: &str,
    opts: &FetchOptions,
) -> Result<SafeResponse, EventscoutError> {
    let url = ssrf::guard(raw_url).await?;

    let start = std::time::Instant::now();
    let mut req = client.get(url.as_str()).timeout(opts.timeout).header(
        reqwest::header::USER_AGENT,
        opts.user_agent.clone(),
    );
    for (k, v) in &opts.extra_headers {
        req = req.header(k.as_str(), v.as_str());
    }

    let resp = req
        .send()
        .await
        .map_err(|e| EventscoutError::Network(e.to_string()))?;

    let status = resp.status().as_u16();
    let final_url = resp.url().clone();
    let content_type = resp
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = read_capped(resp, opts.max_body_bytes).await?;

    Ok(SafeResponse {
        url,
        final_url,
        status,
        content_type,
        body,
        response_time_ms: start.elapsed().as_millis() as u64,
    })
}

async fn read_capped(resp: reqwest::Response, max_bytes: usize) -> Result<Vec<u8>, EventscoutError> {
    use futures_util::StreamExt;

    let mut stream = resp.bytes_stream();
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| EventscoutError::Network(e.to_string()))?;
        buf.extend_from_slice(&chunk);
        if buf.len() > max_bytes {
            return Err(EventscoutError::BodyTooLarge {
                size: buf.len(),
                max: max_bytes,
            });
        }
    }
    Ok(buf)
}
