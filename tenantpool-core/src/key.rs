use std::fmt;

/// Tenant used by the registry when none is configured.
pub const DEFAULT_TENANT: &str = "cflow";

/// Key identifying a pool: one pool per tenant and role.
///
/// No validation happens here. An empty tenant is a caller error that shows
/// up later as an odd pool name, not as a rejected key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PoolKey {
    tenant: String,
    read_only: bool,
}

impl PoolKey {
    pub fn new(tenant: impl Into<String>, read_only: bool) -> Self {
        Self {
            tenant: tenant.into(),
            read_only,
        }
    }

    /// Key for the writable pool of `tenant`.
    pub fn primary(tenant: impl Into<String>) -> Self {
        Self::new(tenant, false)
    }

    /// Key for the replica pool of `tenant`.
    pub fn read_only(tenant: impl Into<String>) -> Self {
        Self::new(tenant, true)
    }

    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }
}

impl fmt::Display for PoolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.read_only {
            write!(f, "{} (read-only)", self.tenant)
        } else {
            write!(f, "{}", self.tenant)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::hash_map::DefaultHasher;
    use std::collections::HashSet;
    use std::hash::{Hash, Hasher};

    fn hash_of(key: &PoolKey) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn roles_are_distinct_keys() {
        let mut set = HashSet::new();
        set.insert(PoolKey::primary("acme"));
        set.insert(PoolKey::read_only("acme"));
        set.insert(PoolKey::new("acme", false));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn display_marks_read_only() {
        assert_eq!(PoolKey::primary("acme").to_string(), "acme");
        assert_eq!(PoolKey::read_only("acme").to_string(), "acme (read-only)");
    }

    proptest! {
        #[test]
        fn equal_keys_hash_identically(tenant in "[a-z]{1,12}", read_only in any::<bool>()) {
            let a = PoolKey::new(tenant.clone(), read_only);
            let b = PoolKey::new(tenant, read_only);
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(hash_of(&a), hash_of(&b));
        }

        #[test]
        fn equality_requires_both_fields(
            t1 in "[a-z]{1,8}",
            t2 in "[a-z]{1,8}",
            r1 in any::<bool>(),
            r2 in any::<bool>(),
        ) {
            let a = PoolKey::new(t1.clone(), r1);
            let b = PoolKey::new(t2.clone(), r2);
            prop_assert_eq!(a == b, t1 == t2 && r1 == r2);
        }
    }
}
