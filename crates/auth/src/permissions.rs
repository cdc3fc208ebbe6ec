use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// A named capability, e.g. "moderation.products" or "catalog.manage_own".
///
/// Permissions stay opaque strings rather than an enum so the policy map in
/// the API layer can grow verbs without touching this crate. The admin role
/// carries the single wildcard `"*"` instead of an enumeration of every
/// moderation verb.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_detection() {
        assert!(Permission::new("*").is_wildcard());
        assert!(!Permission::new("moderation.products").is_wildcard());
    }
}
