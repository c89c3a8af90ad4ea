use serde::Serialize;

use renolens_billing::PurchaseRecord;

/// Totals over a set of purchase records. Revenue stays in integer cents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RevenueStats {
    pub total_revenue_cents: i64,
    pub total_purchases: u64,
    pub total_tokens_sold: i64,
}

impl RevenueStats {
    pub fn aggregate<'a>(records: impl IntoIterator<Item = &'a PurchaseRecord>) -> Self {
        let mut stats = Self::default();
        for record in records {
            stats.total_revenue_cents += record.price_cents;
            stats.total_purchases += 1;
            stats.total_tokens_sold += record.total_tokens;
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use renolens_core::AccountId;

    use super::*;

    #[test]
    fn aggregate_sums_cents_counts_and_tokens() {
        let records = [
            PurchaseRecord::new(AccountId::new(), "Starter Pack", 100, 0, 499, "USD").unwrap(),
            PurchaseRecord::new(AccountId::new(), "Pro Pack", 300, 50, 1299, "USD").unwrap(),
            PurchaseRecord::new(AccountId::new(), "Premium Pack", 1000, 200, 3999, "USD").unwrap(),
        ];

        let stats = RevenueStats::aggregate(&records);
        assert_eq!(stats.total_revenue_cents, 5797);
        assert_eq!(stats.total_purchases, 3);
        assert_eq!(stats.total_tokens_sold, 1650);
    }

    #[test]
    fn empty_window_is_all_zeroes() {
        assert_eq!(RevenueStats::aggregate([]), RevenueStats::default());
    }
}
