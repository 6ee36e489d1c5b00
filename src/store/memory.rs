/// In-memory account store
///
/// Backs tests and Redis-less dev runs. A single mutex makes `take` and
/// `apply` trivially atomic; TTLs are enforced lazily on read.
use super::{KvStore, StoreOp};
use crate::error::ApiResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
enum Value {
    Str(String),
    Hash(HashMap<String, String>),
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(deadline) if now >= deadline)
    }
}

/// In-memory store over a single lock
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn apply_op(entries: &mut HashMap<String, Entry>, op: StoreOp, now: Instant) {
        match op {
            StoreOp::HashSet { key, fields } => {
                let entry = entries
                    .entry(key)
                    .and_modify(|e| {
                        if e.is_expired(now) || !matches!(e.value, Value::Hash(_)) {
                            e.value = Value::Hash(HashMap::new());
                            e.expires_at = None;
                        }
                    })
                    .or_insert_with(|| Entry {
                        value: Value::Hash(HashMap::new()),
                        expires_at: None,
                    });
                if let Value::Hash(map) = &mut entry.value {
                    map.extend(fields);
                }
            }
            StoreOp::HashDel { key, fields } => {
                if let Some(entry) = entries.get_mut(&key) {
                    if let Value::Hash(map) = &mut entry.value {
                        for field in &fields {
                            map.remove(field);
                        }
                    }
                }
            }
            StoreOp::Set { key, value } => {
                entries.insert(
                    key,
                    Entry {
                        value: Value::Str(value),
                        expires_at: None,
                    },
                );
            }
            StoreOp::SetEx { key, value, ttl } => {
                entries.insert(
                    key,
                    Entry {
                        value: Value::Str(value),
                        expires_at: Some(now + ttl),
                    },
                );
            }
            StoreOp::Del { key } => {
                entries.remove(&key);
            }
        }
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn hash_get_all(&self, key: &str) -> ApiResult<HashMap<String, String>> {
        let entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if !entry.is_expired(Instant::now()) => match &entry.value {
                Value::Hash(map) => Ok(map.clone()),
                Value::Str(_) => Ok(HashMap::new()),
            },
            _ => Ok(HashMap::new()),
        }
    }

    async fn get(&self, key: &str) -> ApiResult<Option<String>> {
        let entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if !entry.is_expired(Instant::now()) => match &entry.value {
                Value::Str(s) => Ok(Some(s.clone())),
                Value::Hash(_) => Ok(None),
            },
            _ => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> ApiResult<()> {
        let mut entries = self.entries.lock().await;
        Self::apply_op(
            &mut entries,
            StoreOp::SetEx {
                key: key.to_string(),
                value: value.to_string(),
                ttl,
            },
            Instant::now(),
        );
        Ok(())
    }

    async fn take(&self, key: &str) -> ApiResult<Option<String>> {
        let mut entries = self.entries.lock().await;
        match entries.remove(key) {
            Some(entry) if !entry.is_expired(Instant::now()) => match entry.value {
                Value::Str(s) => Ok(Some(s)),
                Value::Hash(_) => Ok(None),
            },
            _ => Ok(None),
        }
    }

    async fn del(&self, key: &str) -> ApiResult<()> {
        let mut entries = self.entries.lock().await;
        entries.remove(key);
        Ok(())
    }

    async fn apply(&self, ops: Vec<StoreOp>) -> ApiResult<()> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        for op in ops {
            Self::apply_op(&mut entries, op, now);
        }
        Ok(())
    }

    async fn ping(&self) -> ApiResult<()> {
        Ok(())
    }
}
