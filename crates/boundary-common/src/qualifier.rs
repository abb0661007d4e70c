//! Qualifier derivation
//!
//! The qualifier namespaces every bootstrap resource for one tenant and
//! application. It is the first five bytes of an MD5 digest over
//! `tenant ++ application`, hex encoded. The environment is not part of the
//! input, so staging and production of the same application share one
//! qualifier.
//!
//! There is no separator between the two fields: `("ab", "c")` and
//! `("a", "bc")` derive the same qualifier. Callers always pass the same two
//! logical fields, and existing deployments depend on this exact encoding.

use std::fmt;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Number of digest bytes kept in a qualifier
const QUALIFIER_BYTES: usize = 5;

/// Length of a qualifier in hex characters
pub const QUALIFIER_LEN: usize = QUALIFIER_BYTES * 2;

/// Short deterministic identifier for a tenant/application pair
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Qualifier(String);

impl Qualifier {
    /// Derive the qualifier for a tenant/application pair.
    ///
    /// Never fails; empty inputs yield a degenerate but stable value.
    pub fn derive(tenant: &str, application: &str) -> Self {
        let mut hasher = Md5::new();
        hasher.update(tenant.as_bytes());
        hasher.update(application.as_bytes());
        let digest = hasher.finalize();
        Self(hex::encode(&digest[..QUALIFIER_BYTES]))
    }

    /// Wrap an externally supplied qualifier (e.g. the `QUALIFIER` override).
    pub fn from_raw(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The qualifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Qualifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_known_value() {
        assert_eq!(Qualifier::derive("acme", "widgets").as_str(), "35e2023292");
        assert_eq!(
            Qualifier::derive("openenterprise", "superapp4000").as_str(),
            "703ff7a19f"
        );
    }

    #[test]
    fn is_ten_lowercase_hex_chars() {
        let q = Qualifier::derive("Tenant", "App");
        assert_eq!(q.as_str().len(), QUALIFIER_LEN);
        assert!(q
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn is_deterministic() {
        let first = Qualifier::derive("acme", "widgets");
        for _ in 0..10 {
            assert_eq!(Qualifier::derive("acme", "widgets"), first);
        }
    }

    #[test]
    fn differs_across_pairs() {
        let a = Qualifier::derive("acme", "widgets");
        let b = Qualifier::derive("acme", "gadgets");
        let c = Qualifier::derive("globex", "widgets");
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn empty_inputs_are_accepted() {
        assert_eq!(Qualifier::derive("", "").as_str(), "d41d8cd98f");
    }

    #[test]
    fn unseparated_inputs_collide() {
        assert_eq!(Qualifier::derive("ab", "c"), Qualifier::derive("a", "bc"));
    }

    #[test]
    fn displays_as_raw_token() {
        let q = Qualifier::from_raw("hnb659fds");
        assert_eq!(q.to_string(), "hnb659fds");
        assert_eq!(serde_json::to_string(&q).unwrap(), "\"hnb659fds\"");
    }
}
