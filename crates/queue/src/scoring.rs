//! Pure scoring helpers, kept free of any storage backend so both the
//! Redis sorted-set implementation and the in-memory fallback compute
//! identical orderings.

use chrono::Utc;

/// Lower score = earlier delivery. Priority acts as a small tie-breaker on
/// top of the delivery timestamp, not an independent sort key — a job
/// delayed by even a few seconds can still jump ahead of a higher-priority
/// job scheduled further out, by design.
pub fn delivery_score(priority: i64, delay_seconds: i64) -> i64 {
    -priority + Utc::now().timestamp() + delay_seconds
}

/// `60 * 2^(attempts-1)` seconds, per job.rs retry semantics.
pub fn backoff_seconds(attempts: u32) -> i64 {
    60 * 2_i64.saturating_pow(attempts.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_priority_yields_lower_score_for_equal_delay() {
        let low = delivery_score(1, 0);
        let high = delivery_score(10, 0);
        assert!(high < low);
    }

    #[test]
    fn backoff_doubles_each_attempt() {
        assert_eq!(backoff_seconds(1), 60);
        assert_eq!(backoff_seconds(2), 120);
        assert_eq!(backoff_seconds(3), 240);
    }
}
