//! Retry-with-backoff fetcher. Every GET goes through robots `can_fetch`,
//! the per-host throttle, and polite headers; 429 responses back off and
//! retry up to `max_retries`, other 4xx/5xx and timeouts return empty
//! without retrying further than that cap.

use std::time::Duration;

use eventscout_core::EventscoutError;
use eventscout_safety::fetch::{safe_get, FetchOptions, SafeResponse};
use url::Url;

use crate::robots::{can_fetch, RobotsPolicy};
use crate::throttle::HostThrottle;

pub struct PoliteFetcher<'a> {
    pub client: &'a reqwest::Client,
    pub throttle: &'a HostThrottle,
    pub user_agent: String,
    pub rate_limit: Duration,
    pub max_retries: u32,
    pub timeout: Duration,
    pub respect_robots: bool,
}

impl<'a> PoliteFetcher<'a> {
    /// Fetches `url`, honoring robots.txt, per-host throttling, and 429
    /// backoff. Returns `Ok(None)` for disallowed/4xx/5xx outcomes rather
    /// than an error, since those are expected, non-fatal scraper results.
    pub async fn get(
        &self,
        url: &Url,
        policy: &RobotsPolicy,
    ) -> Result<Option<SafeResponse>, EventscoutError> {
        if self.respect_robots && !can_fetch(policy, &self.user_agent, url.as_str()) {
            return Ok(None);
        }

        let host = url.host_str().unwrap_or("").to_string();
        let opts = FetchOptions {
            timeout: self.timeout,
            user_agent: self.user_agent.clone(),
            extra_headers: vec![
                ("Accept".to_string(), "text/html,application/xhtml+xml".to_string()),
                ("Accept-Language".to_string(), "de-DE,de;q=0.9,en;q=0.8".to_string()),
            ],
            ..FetchOptions::default()
        };

        let mut attempt = 0u32;
        loop {
            self.throttle.wait_turn(&host, self.rate_limit).await;

            match safe_get(self.client, url.as_str(), &opts).await {
                Ok(resp) if resp.status == 429 => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        return Ok(None);
                    }
                    let backoff = Duration::from_secs(30).min(Duration::from_secs((attempt as u64 + 1) * 5));
                    tokio::time::sleep(backoff).await;
                    continue;
                }
                Ok(resp) if resp.status == 403 || resp.status >= 400 => {
                    return Ok(None);
                }
                Ok(resp) => return Ok(Some(resp)),
                Err(_) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        return Ok(None);
                    }
                    continue;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_caps_at_thirty_seconds() {
        for attempt in 1u64..10 {
            let backoff = Duration::from_secs(30).min(Duration::from_secs((attempt + 1) * 5));
            assert!(backoff <= Duration::from_secs(30));
        }
    }
}
