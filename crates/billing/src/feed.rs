//! In-process fan-out of newly recorded purchases.
//!
//! Subscribers receive every record published after their subscription was
//! created, in publish order. Delivery is best-effort relative to the audit
//! trail: the store append is authoritative, the feed is for live views.

use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

use thiserror::Error;

use crate::purchase::PurchaseRecord;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("purchase feed lock poisoned")]
    Poisoned,
}

/// Consumer half of a feed subscription. Dropping it unsubscribes; the
/// publisher prunes the dead sender on its next publish.
pub struct FeedSubscription {
    receiver: Receiver<PurchaseRecord>,
}

impl FeedSubscription {
    pub fn recv(&self) -> Option<PurchaseRecord> {
        self.receiver.recv().ok()
    }

    pub fn try_recv(&self) -> Option<PurchaseRecord> {
        match self.receiver.try_recv() {
            Ok(record) => Some(record),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<PurchaseRecord> {
        match self.receiver.recv_timeout(timeout) {
            Ok(record) => Some(record),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

pub trait PurchaseFeed: Send + Sync {
    fn publish(&self, record: &PurchaseRecord) -> Result<(), FeedError>;
    fn subscribe(&self) -> Result<FeedSubscription, FeedError>;
}

/// Channel-backed feed: one unbounded channel per subscriber, disconnected
/// subscribers dropped during publish.
#[derive(Default)]
pub struct InMemoryPurchaseFeed {
    subscribers: Mutex<Vec<Sender<PurchaseRecord>>>,
}

impl InMemoryPurchaseFeed {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PurchaseFeed for InMemoryPurchaseFeed {
    fn publish(&self, record: &PurchaseRecord) -> Result<(), FeedError> {
        let mut subscribers = self.subscribers.lock().map_err(|_| FeedError::Poisoned)?;
        subscribers.retain(|tx| tx.send(record.clone()).is_ok());
        Ok(())
    }

    fn subscribe(&self) -> Result<FeedSubscription, FeedError> {
        let (tx, rx) = mpsc::channel();
        let mut subscribers = self.subscribers.lock().map_err(|_| FeedError::Poisoned)?;
        subscribers.push(tx);
        Ok(FeedSubscription { receiver: rx })
    }
}

#[cfg(test)]
mod tests {
    use renolens_core::AccountId;

    use super::*;

    fn record(name: &str) -> PurchaseRecord {
        PurchaseRecord::new(AccountId::new(), name, 100, 0, 499, "USD").unwrap()
    }

    #[test]
    fn subscribers_see_publishes_in_order() {
        let feed = InMemoryPurchaseFeed::new();
        let sub = feed.subscribe().unwrap();

        feed.publish(&record("first")).unwrap();
        feed.publish(&record("second")).unwrap();

        assert_eq!(sub.try_recv().unwrap().package_name, "first");
        assert_eq!(sub.try_recv().unwrap().package_name, "second");
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn subscription_only_sees_later_publishes() {
        let feed = InMemoryPurchaseFeed::new();
        feed.publish(&record("before")).unwrap();

        let sub = feed.subscribe().unwrap();
        feed.publish(&record("after")).unwrap();

        assert_eq!(sub.try_recv().unwrap().package_name, "after");
        assert!(sub.try_recv().is_none());
    }

    #[test]
    fn dropped_subscriber_does_not_break_publish() {
        let feed = InMemoryPurchaseFeed::new();
        let kept = feed.subscribe().unwrap();
        drop(feed.subscribe().unwrap());

        feed.publish(&record("still delivered")).unwrap();
        assert!(kept.try_recv().is_some());
    }
}
