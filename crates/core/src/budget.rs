//! Process-wide AI-cost budget counter. A single atomic cents-counter per
//! rolling window, gated by configurable daily/monthly thresholds read
//! from `AppConfig`.
//!
//! Grounded in the circuit-breaker status vocabulary of riptide-security's
//! budget enforcement (`Closed`/`Open`/`HalfOpen`), simplified to a single
//! counter instead of riptide's full tenant/model ledger.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    /// Spend is within both thresholds.
    Ok,
    /// Daily threshold exceeded; AI fallback stage is gated off until the
    /// window rolls over.
    DailyExceeded,
    /// Monthly threshold exceeded.
    MonthlyExceeded,
}

/// Atomic day-of-epoch / month-of-epoch markers so a reset can be detected
/// without a background task: any caller that observes a stale marker rolls
/// the counter itself before adding its charge.
pub struct BudgetCounter {
    daily_cents: AtomicU64,
    monthly_cents: AtomicU64,
    daily_epoch_day: AtomicI64,
    monthly_epoch_month: AtomicI64,
    daily_budget_cents: u64,
    monthly_budget_cents: u64,
}

impl BudgetCounter {
    pub fn new(daily_budget_cents: u64, monthly_budget_cents: u64) -> Self {
        let now = chrono::Utc::now();
        Self {
            daily_cents: AtomicU64::new(0),
            monthly_cents: AtomicU64::new(0),
            daily_epoch_day: AtomicI64::new(epoch_day(now)),
            monthly_epoch_month: AtomicI64::new(epoch_month(now)),
            daily_budget_cents,
            monthly_budget_cents,
        }
    }

    /// Records a charge (in cents) against both rolling windows, rolling over
    /// stale windows first. Returns the status *after* the charge so callers
    /// can decide whether to still run the AI stage this call.
    pub fn record_cents(&self, cents: u64) -> BudgetStatus {
        let now = chrono::Utc::now();
        self.roll_if_stale(now);
        self.daily_cents.fetch_add(cents, Ordering::Relaxed);
        self.monthly_cents.fetch_add(cents, Ordering::Relaxed);
        self.status()
    }

    /// Checks whether an AI call of the given estimated cost would still be
    /// within budget, without recording it. Used as the pre-flight gate
    /// before the AI extraction stage runs.
    pub fn allows(&self, estimated_cents: u64) -> bool {
        let now = chrono::Utc::now();
        self.roll_if_stale(now);
        let daily = self.daily_cents.load(Ordering::Relaxed) + estimated_cents;
        let monthly = self.monthly_cents.load(Ordering::Relaxed) + estimated_cents;
        daily <= self.daily_budget_cents && monthly <= self.monthly_budget_cents
    }

    pub fn status(&self) -> BudgetStatus {
        let daily = self.daily_cents.load(Ordering::Relaxed);
        let monthly = self.monthly_cents.load(Ordering::Relaxed);
        if monthly > self.monthly_budget_cents {
            BudgetStatus::MonthlyExceeded
        } else if daily > self.daily_budget_cents {
            BudgetStatus::DailyExceeded
        } else {
            BudgetStatus::Ok
        }
    }

    pub fn snapshot(&self) -> BudgetSnapshot {
        let now = chrono::Utc::now();
        self.roll_if_stale(now);
        BudgetSnapshot {
            status: self.status(),
            daily_cents: self.daily_cents.load(Ordering::Relaxed),
            daily_budget_cents: self.daily_budget_cents,
            monthly_cents: self.monthly_cents.load(Ordering::Relaxed),
            monthly_budget_cents: self.monthly_budget_cents,
        }
    }

    fn roll_if_stale(&self, now: chrono::DateTime<chrono::Utc>) {
        let today = epoch_day(now);
        let prev_day = self.daily_epoch_day.swap(today, Ordering::Relaxed);
        if prev_day != today {
            self.daily_cents.store(0, Ordering::Relaxed);
        }
        let this_month = epoch_month(now);
        let prev_month = self.monthly_epoch_month.swap(this_month, Ordering::Relaxed);
        if prev_month != this_month {
            self.monthly_cents.store(0, Ordering::Relaxed);
        }
    }
}

fn epoch_day(t: chrono::DateTime<chrono::Utc>) -> i64 {
    t.timestamp() / 86_400
}

fn epoch_month(t: chrono::DateTime<chrono::Utc>) -> i64 {
    use chrono::Datelike;
    (t.year() as i64) * 12 + t.month() as i64
}

#[derive(Debug, Clone, Serialize)]
pub struct BudgetSnapshot {
    pub status: BudgetStatus,
    pub daily_cents: u64,
    pub daily_budget_cents: u64,
    pub monthly_cents: u64,
    pub monthly_budget_cents: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_within_budget() {
        let b = BudgetCounter::new(500, 10_000);
        assert!(b.allows(100));
        b.record_cents(100);
        assert_eq!(b.status(), BudgetStatus::Ok);
    }

    #[test]
    fn flags_daily_exceeded() {
        let b = BudgetCounter::new(100, 10_000);
        b.record_cents(150);
        assert_eq!(b.status(), BudgetStatus::DailyExceeded);
    }

    #[test]
    fn flags_monthly_exceeded_over_daily() {
        let b = BudgetCounter::new(100_000, 100);
        b.record_cents(150);
        assert_eq!(b.status(), BudgetStatus::MonthlyExceeded);
    }
}
