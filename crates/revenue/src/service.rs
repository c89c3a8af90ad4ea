//! Windowed revenue reads.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use thiserror::Error;
use tracing::debug;

use renolens_billing::{FeedError, PurchaseFeed, PurchaseStore, PurchaseStoreError};

use crate::day_feed::DayFeedSubscription;
use crate::stats::RevenueStats;

#[derive(Debug, Error)]
pub enum RevenueError {
    #[error(transparent)]
    Store(#[from] PurchaseStoreError),

    #[error("purchase feed unavailable: {0}")]
    Feed(#[from] FeedError),
}

/// Read-side service over the purchase store and feed.
pub struct RevenueService {
    store: Arc<dyn PurchaseStore>,
    feed: Arc<dyn PurchaseFeed>,
}

impl RevenueService {
    pub fn new(store: Arc<dyn PurchaseStore>, feed: Arc<dyn PurchaseFeed>) -> Self {
        Self { store, feed }
    }

    /// Totals over purchases with `created_at` in `[start, end)`.
    pub fn revenue_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<RevenueStats, RevenueError> {
        let records = self.store.list_between(start, end)?;
        let stats = RevenueStats::aggregate(&records);
        debug!(%start, %end, purchases = stats.total_purchases, "revenue window computed");
        Ok(stats)
    }

    /// Totals for the UTC calendar day containing `now`.
    pub fn today(&self, now: DateTime<Utc>) -> Result<RevenueStats, RevenueError> {
        let start = day_start(now.date_naive());
        self.revenue_between(start, start + Duration::days(1))
    }

    /// Totals for the `days` most recent UTC calendar days, including the
    /// day containing `now`.
    pub fn trailing_days(&self, days: i64, now: DateTime<Utc>) -> Result<RevenueStats, RevenueError> {
        let end = day_start(now.date_naive()) + Duration::days(1);
        self.revenue_between(end - Duration::days(days), end)
    }

    /// Live subscription delivering only purchases made on the given UTC day.
    pub fn subscribe_for_day(&self, day: NaiveDate) -> Result<DayFeedSubscription, RevenueError> {
        Ok(DayFeedSubscription::new(self.feed.subscribe()?, day))
    }
}

fn day_start(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc()
}

#[cfg(test)]
mod tests {
    use renolens_billing::{InMemoryPurchaseFeed, InMemoryPurchaseStore, PurchaseRecord};
    use renolens_core::AccountId;

    use super::*;

    fn service() -> (RevenueService, Arc<InMemoryPurchaseStore>) {
        let store = Arc::new(InMemoryPurchaseStore::new());
        let svc = RevenueService::new(
            Arc::clone(&store) as Arc<dyn PurchaseStore>,
            Arc::new(InMemoryPurchaseFeed::new()),
        );
        (svc, store)
    }

    fn record_at(created_at: DateTime<Utc>, price_cents: i64) -> PurchaseRecord {
        let mut r =
            PurchaseRecord::new(AccountId::new(), "Starter Pack", 100, 0, price_cents, "USD")
                .unwrap();
        r.created_at = created_at;
        r
    }

    #[test]
    fn window_end_is_exclusive() {
        let (svc, store) = service();
        let end = Utc::now();
        let start = end - Duration::hours(1);

        store.append(&record_at(start, 499)).unwrap();
        store.append(&record_at(end, 1299)).unwrap();

        let stats = svc.revenue_between(start, end).unwrap();
        assert_eq!(stats.total_purchases, 1);
        assert_eq!(stats.total_revenue_cents, 499);
    }

    #[test]
    fn today_ignores_yesterday() {
        let (svc, store) = service();
        let now = Utc::now();

        store.append(&record_at(now, 499)).unwrap();
        store.append(&record_at(now - Duration::days(1), 3999)).unwrap();

        let stats = svc.today(now).unwrap();
        assert_eq!(stats.total_purchases, 1);
        assert_eq!(stats.total_revenue_cents, 499);
    }

    #[test]
    fn trailing_days_spans_calendar_days() {
        let (svc, store) = service();
        let now = Utc::now();

        store.append(&record_at(now, 499)).unwrap();
        store.append(&record_at(now - Duration::days(5), 1299)).unwrap();
        store.append(&record_at(now - Duration::days(10), 3999)).unwrap();

        let week = svc.trailing_days(7, now).unwrap();
        assert_eq!(week.total_purchases, 2);
        assert_eq!(week.total_revenue_cents, 1798);

        let month = svc.trailing_days(30, now).unwrap();
        assert_eq!(month.total_purchases, 3);
        assert_eq!(month.total_revenue_cents, 5797);
    }
}
