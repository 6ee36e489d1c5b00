/// Snapshot sync: server-side pull/push plus the client reconciliation policy
///
/// The server holds one serialized snapshot per account and never merges:
/// push overwrites, pull returns it verbatim. Reconciliation happens on the
/// device (`reconcile`).

mod reconcile;
mod snapshot;

pub use reconcile::{reconcile, Reconciliation};
pub use snapshot::Snapshot;

use crate::{
    account::fields,
    config::ServerConfig,
    error::{ApiError, ApiResult},
    metrics,
    store::{KeySpace, KvStore, StoreOp},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// How a push was initiated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncType {
    /// First upload from a device holding pre-premium local data
    Initial,
    Update,
}

/// Stored snapshot with server-side envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    pub data: Snapshot,
    pub first_name: String,
    /// Snapshot modification timestamp, ms
    pub timestamp: i64,
    pub last_sync: String,
}

/// Push acknowledgement
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResponse {
    pub success: bool,
    pub timestamp: i64,
    pub synced: String,
}

/// Manager for the per-account snapshot
pub struct SyncManager {
    store: Arc<dyn KvStore>,
    keys: KeySpace,
}

impl SyncManager {
    pub fn new(store: Arc<dyn KvStore>, config: Arc<ServerConfig>) -> Self {
        let keys = KeySpace::new(config.store.key_prefix.clone());
        Self { store, keys }
    }

    /// Return the stored snapshot verbatim; `None` when the account has
    /// never pushed
    pub async fn pull(&self, email: &str) -> ApiResult<Option<PullResponse>> {
        let map = self.store.hash_get_all(&self.keys.account(email)).await?;
        if map.is_empty() {
            return Err(ApiError::NotFound("Account not found".to_string()));
        }

        let first_name = map.get(fields::FIRST_NAME).cloned().unwrap_or_default();
        let raw = match map.get(fields::APP_DATA) {
            Some(raw) => raw,
            None => {
                debug!(email = %email, "Pull on never-synced account");
                return Ok(None);
            }
        };

        let data: Snapshot = serde_json::from_str(raw)
            .map_err(|e| ApiError::Internal(format!("Corrupt stored snapshot: {}", e)))?;
        let timestamp = map
            .get(fields::APP_DATA_MODIFIED)
            .and_then(|v| v.parse().ok())
            .unwrap_or(data.modified);

        metrics::SYNC_OPS_TOTAL.with_label_values(&["pull"]).inc();

        Ok(Some(PullResponse {
            data,
            first_name,
            timestamp,
            last_sync: Utc::now().to_rfc3339(),
        }))
    }

    /// Unconditionally overwrite the server snapshot
    ///
    /// No merge: the caller has already reconciled and this side won. The
    /// snapshot and its embedded timestamp land in one atomic batch with the
    /// activity stamp.
    pub async fn push(
        &self,
        email: &str,
        snapshot: &Snapshot,
        first_name: Option<&str>,
        sync_type: SyncType,
    ) -> ApiResult<PushResponse> {
        let raw = serde_json::to_string(snapshot)
            .map_err(|e| ApiError::Internal(format!("Snapshot serialization failed: {}", e)))?;

        let now = Utc::now().timestamp_millis();
        let mut account_fields = vec![
            (fields::APP_DATA.to_string(), raw),
            (
                fields::APP_DATA_MODIFIED.to_string(),
                snapshot.modified.to_string(),
            ),
            (fields::LAST_ACTIVE.to_string(), now.to_string()),
        ];
        if let Some(name) = first_name {
            account_fields.push((fields::FIRST_NAME.to_string(), name.to_string()));
        }
        if sync_type == SyncType::Initial {
            account_fields.push((fields::SYNCED_FROM_LOCAL.to_string(), now.to_string()));
        }

        self.store
            .apply(vec![StoreOp::HashSet {
                key: self.keys.account(email),
                fields: account_fields,
            }])
            .await?;

        info!(
            email = %email,
            tasks = snapshot.tasks.len(),
            modified = snapshot.modified,
            "Snapshot pushed"
        );
        metrics::SYNC_OPS_TOTAL.with_label_values(&["push"]).inc();

        Ok(PushResponse {
            success: true,
            timestamp: now,
            synced: Utc::now().to_rfc3339(),
        })
    }
}
