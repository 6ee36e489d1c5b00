/// Account store seam
///
/// The server's single shared mutable resource is a key-value store holding
/// account hashes, magic-link mappings, and token indexes. The trait keeps
/// the operation surface small: everything the managers need is a hash read,
/// an atomic multi-op write, a TTL'd string write, and an atomic
/// get-and-delete for one-time tokens.

mod memory;
mod redis;

pub use memory::MemoryStore;
pub use redis::RedisStore;

use crate::error::ApiResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

/// A single mutation inside an atomic batch
#[derive(Debug, Clone)]
pub enum StoreOp {
    /// Set fields on a hash, creating it if absent
    HashSet {
        key: String,
        fields: Vec<(String, String)>,
    },
    /// Delete fields from a hash
    HashDel { key: String, fields: Vec<String> },
    /// Set a string value with no expiry
    Set { key: String, value: String },
    /// Set a string value with a TTL
    SetEx {
        key: String,
        value: String,
        ttl: Duration,
    },
    /// Delete a key outright
    Del { key: String },
}

/// Key-value store behind the account, session, and sync managers
///
/// Implementations must make `take` a single atomic lookup-and-delete and
/// `apply` an all-or-nothing batch; both guarantees are load-bearing for
/// one-time magic links and for index writes that must commit with the
/// primary record.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read every field of a hash; empty map if the key is absent
    async fn hash_get_all(&self, key: &str) -> ApiResult<HashMap<String, String>>;

    /// Read a string value
    async fn get(&self, key: &str) -> ApiResult<Option<String>>;

    /// Write a string value with a TTL
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> ApiResult<()>;

    /// Atomically read and delete a string value
    ///
    /// Under concurrent callers at most one observes the value.
    async fn take(&self, key: &str) -> ApiResult<Option<String>>;

    /// Delete a key
    async fn del(&self, key: &str) -> ApiResult<()>;

    /// Apply a batch of mutations atomically
    async fn apply(&self, ops: Vec<StoreOp>) -> ApiResult<()>;

    /// Liveness check
    async fn ping(&self) -> ApiResult<()>;
}

/// Key layout shared by every store implementation
///
/// All keys carry the configured prefix; accounts are hashes, everything else
/// is a plain string value.
#[derive(Debug, Clone)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Account record hash, keyed by normalized email
    pub fn account(&self, email: &str) -> String {
        format!("{}u:{}", self.prefix, email)
    }

    /// Magic-link token mapping (token -> email), TTL-bound
    pub fn magic(&self, token: &str) -> String {
        format!("{}magic:{}", self.prefix, token)
    }

    /// Session token secondary index (token -> email)
    pub fn session(&self, token: &str) -> String {
        format!("{}session:{}", self.prefix, token)
    }

    /// Entitlement token secondary index (token -> email)
    pub fn access(&self, token: &str) -> String {
        format!("{}access:{}", self.prefix, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyspace_layout() {
        let keys = KeySpace::new("lumen:");
        assert_eq!(keys.account("a@x.com"), "lumen:u:a@x.com");
        assert_eq!(keys.magic("abc"), "lumen:magic:abc");
        assert_eq!(keys.session("abc"), "lumen:session:abc");
        assert_eq!(keys.access("abc"), "lumen:access:abc");
    }
}
