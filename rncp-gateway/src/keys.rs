//! Cache key definitions
//!
//! One cache entry per (resource kind, external user id).

use std::fmt;

/// Kind of cached upstream resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Merged projects, cursus and events of a user
    UserData,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::UserData => "user_data",
        }
    }
}

/// Cache key for one resource of one upstream user
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: ResourceKind,
    pub user_id: u64,
}

impl CacheKey {
    pub fn new(kind: ResourceKind, user_id: u64) -> Self {
        Self { kind, user_id }
    }

    pub fn user_data(user_id: u64) -> Self {
        Self::new(ResourceKind::UserData, user_id)
    }

    /// Convert to storage key string
    /// Format: kind:user_id
    pub fn to_storage_key(&self) -> String {
        format!("{}:{}", self.kind.as_str(), self.user_id)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_storage_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_key() {
        assert_eq!(CacheKey::user_data(42).to_storage_key(), "user_data:42");
        assert_eq!(CacheKey::user_data(7).to_string(), "user_data:7");
        assert_ne!(CacheKey::user_data(1), CacheKey::user_data(2));
    }
}
