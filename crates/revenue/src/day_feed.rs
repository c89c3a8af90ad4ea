//! Day-filtered view over the purchase feed.

use std::time::{Duration, Instant};

use chrono::NaiveDate;

use renolens_billing::{FeedSubscription, PurchaseRecord};

/// A purchase feed subscription that only yields records created on one UTC
/// calendar day. Records for other days are consumed and dropped, so
/// relative order among delivered records matches publish order.
pub struct DayFeedSubscription {
    inner: FeedSubscription,
    day: NaiveDate,
}

impl DayFeedSubscription {
    pub(crate) fn new(inner: FeedSubscription, day: NaiveDate) -> Self {
        Self { inner, day }
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    fn matches(&self, record: &PurchaseRecord) -> bool {
        record.created_at.date_naive() == self.day
    }

    /// Next matching record, skipping non-matching ones; `None` once the
    /// publisher is gone.
    pub fn recv(&self) -> Option<PurchaseRecord> {
        loop {
            let record = self.inner.recv()?;
            if self.matches(&record) {
                return Some(record);
            }
        }
    }

    /// Next matching record already in the queue, if any.
    pub fn try_recv(&self) -> Option<PurchaseRecord> {
        loop {
            let record = self.inner.try_recv()?;
            if self.matches(&record) {
                return Some(record);
            }
        }
    }

    /// Like [`recv`](Self::recv) but gives up after `timeout`. Skipped
    /// records do not extend the deadline.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<PurchaseRecord> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.checked_duration_since(Instant::now())?;
            let record = self.inner.recv_timeout(remaining)?;
            if self.matches(&record) {
                return Some(record);
            }
        }
    }
}
