use renolens_auth::{Role, is_operator};
use renolens_core::AccountId;

/// Authenticated identity for a request, derived from the bearer token by
/// the auth middleware. Present on every protected route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountContext {
    account_id: AccountId,
    roles: Vec<Role>,
}

impl AccountContext {
    pub fn new(account_id: AccountId, roles: Vec<Role>) -> Self {
        Self { account_id, roles }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    pub fn is_operator(&self) -> bool {
        is_operator(&self.roles)
    }
}

/// The raw bearer token, kept so the generation executor can re-verify it
/// against the account the request claims to act for.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);
