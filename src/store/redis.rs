/// Redis-backed account store
///
/// One `ConnectionManager` shared across handlers; every operation is one or
/// two round trips. Atomic batches use MULTI/EXEC pipelines and one-time
/// token consumption uses GETDEL.
use super::{KvStore, StoreOp};
use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info};

/// Redis store client
#[derive(Clone)]
pub struct RedisStore {
    connection: ConnectionManager,
}

impl RedisStore {
    /// Connect to Redis
    pub async fn connect(redis_url: &str) -> ApiResult<Self> {
        info!("Connecting to Redis at {}", redis_url);

        let client = Client::open(redis_url).map_err(|e| {
            error!("Failed to create Redis client: {}", e);
            ApiError::from(e)
        })?;

        let connection = ConnectionManager::new(client).await.map_err(|e| {
            error!("Failed to connect to Redis: {}", e);
            ApiError::from(e)
        })?;

        info!("✓ Redis connection established");

        Ok(Self { connection })
    }
}

#[async_trait]
impl KvStore for RedisStore {
    async fn hash_get_all(&self, key: &str) -> ApiResult<HashMap<String, String>> {
        debug!("Store HGETALL: {}", key);
        let mut conn = self.connection.clone();
        let fields: HashMap<String, String> = conn.hgetall(key).await?;
        Ok(fields)
    }

    async fn get(&self, key: &str) -> ApiResult<Option<String>> {
        debug!("Store GET: {}", key);
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> ApiResult<()> {
        debug!("Store SETEX: {} (TTL: {}s)", key, ttl.as_secs());
        let mut conn = self.connection.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs()).await?;
        Ok(())
    }

    async fn take(&self, key: &str) -> ApiResult<Option<String>> {
        debug!("Store GETDEL: {}", key);
        let mut conn = self.connection.clone();
        let value: Option<String> = conn.get_del(key).await?;
        Ok(value)
    }

    async fn del(&self, key: &str) -> ApiResult<()> {
        debug!("Store DEL: {}", key);
        let mut conn = self.connection.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn apply(&self, ops: Vec<StoreOp>) -> ApiResult<()> {
        debug!("Store atomic batch of {} ops", ops.len());
        let mut pipe = redis::pipe();
        pipe.atomic();

        for op in &ops {
            match op {
                StoreOp::HashSet { key, fields } => {
                    let pairs: Vec<(&str, &str)> = fields
                        .iter()
                        .map(|(f, v)| (f.as_str(), v.as_str()))
                        .collect();
                    pipe.hset_multiple(key, &pairs).ignore();
                }
                StoreOp::HashDel { key, fields } => {
                    for field in fields {
                        pipe.hdel(key, field).ignore();
                    }
                }
                StoreOp::Set { key, value } => {
                    pipe.set(key, value).ignore();
                }
                StoreOp::SetEx { key, value, ttl } => {
                    pipe.set_ex(key, value, ttl.as_secs()).ignore();
                }
                StoreOp::Del { key } => {
                    pipe.del(key).ignore();
                }
            }
        }

        let mut conn = self.connection.clone();
        pipe.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    async fn ping(&self) -> ApiResult<()> {
        let mut conn = self.connection.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        if pong != "PONG" {
            return Err(ApiError::Internal(
                "Unexpected Redis PING response".to_string(),
            ));
        }
        Ok(())
    }
}
