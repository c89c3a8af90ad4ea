//! `renolens-revenue` — read-side aggregation over the purchase trail.
//!
//! Pure reads: nothing here mutates records or balances. Windowed totals for
//! the admin dashboard, plus a day-filtered live view over the purchase feed.

pub mod day_feed;
pub mod service;
pub mod stats;

pub use day_feed::DayFeedSubscription;
pub use service::{RevenueError, RevenueService};
pub use stats::RevenueStats;
