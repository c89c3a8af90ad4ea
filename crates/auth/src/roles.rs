use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Role identifier carried in bearer claims.
///
/// Roles are opaque strings at this layer. The only role this system acts on
/// is [`OPERATOR`], which gates the admin read surface; granting it is an
/// external concern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(Cow<'static, str>);

/// Role required for revenue queries and the purchase stream.
pub const OPERATOR: Role = Role(Cow::Borrowed("operator"));

impl Role {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether the given role set includes the operator role.
pub fn is_operator(roles: &[Role]) -> bool {
    roles.iter().any(|r| *r == OPERATOR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_check_matches_exact_role() {
        assert!(is_operator(&[Role::new("operator")]));
        assert!(!is_operator(&[Role::new("user"), Role::new("Operator")]));
        assert!(!is_operator(&[]));
    }
}
