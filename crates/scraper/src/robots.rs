//! robots.txt compliance. `can_fetch` delegates to Google's robots.txt
//! matcher via the `robotstxt` crate; that matcher has no concept of the
//! non-standard `Crawl-delay` directive, so it is pulled out with a
//! manual per-line scan instead, the same gap `eventscout-feeds::sitemap`
//! works around for the `Sitemap:` directive.

use std::time::Duration;

use eventscout_safety::fetch::{safe_get, FetchOptions};
use robotstxt::{DefaultMatcher, RobotsMatcher};
use url::Url;

#[derive(Debug, Clone, Default)]
pub struct RobotsPolicy {
    pub body: String,
    pub crawl_delay: Option<Duration>,
}

/// Fetches and parses `/robots.txt` for `base_url`'s origin. A fetch
/// failure or missing file is treated as "everything allowed, no
/// crawl-delay" rather than an error — robots.txt absence is normal.
pub async fn fetch_policy(client: &reqwest::Client, base_url: &Url, user_agent: &str) -> RobotsPolicy {
    let Ok(mut robots_url) = base_url.join("/robots.txt") else {
        return RobotsPolicy::default();
    };
    robots_url.set_query(None);
    robots_url.set_fragment(None);

    let opts = FetchOptions {
        user_agent: user_agent.to_string(),
        ..FetchOptions::default()
    };

    match safe_get(client, robots_url.as_str(), &opts).await {
        Ok(resp) if resp.status < 400 => {
            let body = String::from_utf8_lossy(&resp.body).to_string();
            let crawl_delay = parse_crawl_delay(&body, user_agent);
            RobotsPolicy { body, crawl_delay }
        }
        _ => RobotsPolicy::default(),
    }
}

fn parse_crawl_delay(body: &str, user_agent: &str) -> Option<Duration> {
    let agent_token = user_agent.split('/').next().unwrap_or(user_agent).to_ascii_lowercase();
    let mut current_is_wildcard = false;
    let mut current_is_us = false;
    let mut wildcard_delay = None;
    let mut agent_delay = None;

    for line in body.lines() {
        let line = line.split('#').next().unwrap_or(line).trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        match key.as_str() {
            "user-agent" => {
                let agent = value.to_ascii_lowercase();
                current_is_wildcard = agent == "*";
                current_is_us = agent_token.contains(&agent) || agent.contains(&agent_token);
            }
            "crawl-delay" => {
                if let Ok(secs) = value.parse::<f64>() {
                    let dur = Duration::from_millis((secs * 1000.0) as u64);
                    if current_is_us {
                        agent_delay = Some(dur);
                    } else if current_is_wildcard {
                        wildcard_delay = Some(dur);
                    }
                }
            }
            _ => {}
        }
    }

    agent_delay.or(wildcard_delay)
}

/// Returns true if `user_agent` is allowed to fetch `url` under `policy`.
pub fn can_fetch(policy: &RobotsPolicy, user_agent: &str, url: &str) -> bool {
    if policy.body.trim().is_empty() {
        return true;
    }
    let mut matcher = DefaultMatcher::default();
    matcher.one_agent_allowed_by_robots(&policy.body, user_agent, url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disallowed_path_is_blocked() {
        let policy = RobotsPolicy {
            body: "User-agent: *\nDisallow: /private/\n".to_string(),
            crawl_delay: None,
        };
        assert!(!can_fetch(&policy, "EventscoutBot", "https://example.invalid/private/page"));
        assert!(can_fetch(&policy, "EventscoutBot", "https://example.invalid/events/1"));
    }

    #[test]
    fn empty_robots_allows_everything() {
        let policy = RobotsPolicy::default();
        assert!(can_fetch(&policy, "EventscoutBot", "https://example.invalid/anything"));
    }

    #[test]
    fn crawl_delay_parsed_for_wildcard_agent() {
        let body = "User-agent: *\nCrawl-delay: 5\nDisallow:\n";
        let delay = parse_crawl_delay(body, "EventscoutBot/1.0");
        assert_eq!(delay, Some(Duration::from_secs(5)));
    }

    #[test]
    fn no_crawl_delay_directive_yields_none() {
        let body = "User-agent: *\nDisallow:\n";
        assert_eq!(parse_crawl_delay(body, "EventscoutBot/1.0"), None);
    }
}
