//! Per-domain politeness throttle. A `DashMap<host, last_request>` behind
//! no lock at all (DashMap shards internally), generalized from
//! `crates/frontier/src/lib.rs`'s `host_last_seen`/`can_visit_host` pair:
//! there it is a fixed delay gate, here it also carries a per-host
//! crawl-delay override discovered from robots.txt.

use std::time::{Duration, Instant};

use dashmap::DashMap;

#[derive(Default)]
pub struct HostThrottle {
    last_seen: DashMap<String, Instant>,
    crawl_delay: DashMap<String, Duration>,
}

impl HostThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_crawl_delay(&self, host: &str, delay: Duration) {
        self.crawl_delay.insert(host.to_string(), delay);
    }

    pub fn effective_delay(&self, host: &str, configured: Duration) -> Duration {
        match self.crawl_delay.get(host) {
            Some(d) => (*d).max(configured),
            None => configured,
        }
    }

    /// Sleeps until `effective_delay` has elapsed since the last recorded
    /// visit to `host`, then stamps the visit. Must be called immediately
    /// before each outbound request for a given host.
    pub async fn wait_turn(&self, host: &str, configured: Duration) {
        let delay = self.effective_delay(host, configured);
        let wait = match self.last_seen.get(host) {
            Some(last) => delay.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        };
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        self.last_seen.insert(host.to_string(), Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn second_request_waits_for_the_configured_delay() {
        let throttle = HostThrottle::new();
        let configured = Duration::from_millis(2000);

        throttle.wait_turn("example.invalid", configured).await;
        let start = tokio::time::Instant::now();
        throttle.wait_turn("example.invalid", configured).await;
        assert!(tokio::time::Instant::now().duration_since(start) >= configured);
    }

    #[test]
    fn crawl_delay_override_raises_effective_delay() {
        let throttle = HostThrottle::new();
        throttle.set_crawl_delay("example.invalid", Duration::from_secs(5));
        let effective = throttle.effective_delay("example.invalid", Duration::from_secs(2));
        assert_eq!(effective, Duration::from_secs(5));
    }
}
