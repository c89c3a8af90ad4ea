//! `renolens-billing` — token purchases.
//!
//! Records immutable purchase events, credits the ledger, and fans new
//! records out to subscribers (the admin dashboard's live feed). A purchase
//! record plus its ledger credit form one logical transaction; when the
//! credit fails after the record is written, the record survives as the
//! audit trail and the credit is parked for bounded reconciliation.

pub mod catalog;
pub mod feed;
pub mod memory;
pub mod purchase;
pub mod recorder;
pub mod store;

pub use catalog::{TOKEN_PACKAGES, TokenPackage, package_by_id};
pub use feed::{FeedError, FeedSubscription, InMemoryPurchaseFeed, PurchaseFeed};
pub use memory::InMemoryPurchaseStore;
pub use purchase::{DEFAULT_CURRENCY, PurchaseRecord, PurchaseStatus};
pub use recorder::{MAX_CREDIT_ATTEMPTS, PurchaseError, PurchaseReceipt, PurchaseRecorder};
pub use store::{PurchaseStore, PurchaseStoreError};
