//! Token package catalog.
//!
//! This core does not validate checkout pricing against the catalog; the
//! catalog is the source the checkout UI reads and the convenience input to
//! [`PurchaseRecorder::buy_package`].
//!
//! [`PurchaseRecorder::buy_package`]: crate::recorder::PurchaseRecorder::buy_package

use serde::Serialize;

/// A purchasable token bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TokenPackage {
    pub id: &'static str,
    pub name: &'static str,
    pub base_tokens: i64,
    pub bonus_tokens: i64,
    /// Price in cents.
    pub price_cents: i64,
    pub popular: bool,
}

impl TokenPackage {
    pub fn total_tokens(&self) -> i64 {
        self.base_tokens + self.bonus_tokens
    }
}

pub const TOKEN_PACKAGES: [TokenPackage; 3] = [
    TokenPackage {
        id: "starter",
        name: "Starter Pack",
        base_tokens: 100,
        bonus_tokens: 0,
        price_cents: 499,
        popular: false,
    },
    TokenPackage {
        id: "pro",
        name: "Pro Pack",
        base_tokens: 300,
        bonus_tokens: 50,
        price_cents: 1299,
        popular: true,
    },
    TokenPackage {
        id: "premium",
        name: "Premium Pack",
        base_tokens: 1000,
        bonus_tokens: 200,
        price_cents: 3999,
        popular: false,
    },
];

pub fn package_by_id(id: &str) -> Option<&'static TokenPackage> {
    TOKEN_PACKAGES.iter().find(|p| p.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packages_are_resolvable_by_id() {
        let pro = package_by_id("pro").unwrap();
        assert_eq!(pro.total_tokens(), 350);
        assert_eq!(pro.price_cents, 1299);
        assert!(package_by_id("enterprise").is_none());
    }
}
