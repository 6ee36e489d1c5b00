/// Account and session lifecycle
///
/// Owns every mutation of the account hash except `app_data` (which belongs
/// to the sync layer): magic-link issuance and redemption, session
/// validation with sliding renewal, and entitlement revocation.
use crate::{
    account::{
        fields, AccountRecord, SessionBundle, SessionView, UserView,
    },
    config::ServerConfig,
    error::{ApiError, ApiResult},
    metrics::{self, outcomes},
    store::{KeySpace, KvStore, StoreOp},
    token,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// A freshly minted magic link, pending out-of-band delivery
#[derive(Debug, Clone)]
pub struct IssuedMagicLink {
    pub email: String,
    pub first_name: String,
    pub token: String,
    pub ttl: Duration,
}

/// Result of a successful revocation
#[derive(Debug, Clone)]
pub struct Revocation {
    pub email: String,
    pub revoked_devices: u32,
    pub revoked_at: String,
}

/// Manager for account auth state
pub struct AccountManager {
    store: Arc<dyn KvStore>,
    keys: KeySpace,
    config: Arc<ServerConfig>,
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

fn rfc3339(ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(ms)
        .map(|t| t.to_rfc3339())
        .unwrap_or_default()
}

impl AccountManager {
    pub fn new(store: Arc<dyn KvStore>, config: Arc<ServerConfig>) -> Self {
        let keys = KeySpace::new(config.store.key_prefix.clone());
        Self { store, keys, config }
    }

    /// Read an account record by normalized email
    async fn load_account(&self, email: &str) -> ApiResult<Option<AccountRecord>> {
        let map = self.store.hash_get_all(&self.keys.account(email)).await?;
        Ok(AccountRecord::from_fields(email, map))
    }

    /// Issue a one-time login token for an account
    ///
    /// Fails NotFound for unknown accounts, Forbidden for inactive or revoked
    /// ones, and Conflict when another device was active inside the lookback
    /// window and still holds the session. The Conflict is policy, not a
    /// technical limit: it is what makes whole-snapshot sync safe.
    pub async fn request_magic_link(&self, email: &str) -> ApiResult<IssuedMagicLink> {
        let email = token::normalize_email(email);

        let account = match self.load_account(&email).await? {
            Some(account) => account,
            None => {
                metrics::MAGIC_LINKS_TOTAL
                    .with_label_values(&[outcomes::NOT_FOUND])
                    .inc();
                return Err(ApiError::NotFound("Premium account not found".to_string()));
            }
        };

        if !account.is_entitled() {
            metrics::MAGIC_LINKS_TOTAL
                .with_label_values(&[outcomes::FORBIDDEN])
                .inc();
            return Err(ApiError::Forbidden("Premium access not active".to_string()));
        }

        let now = now_ms();
        let lookback_start = now - self.config.auth.conflict_lookback_days * MS_PER_DAY;
        if account.session_token.is_some() && account.last_active > lookback_start {
            warn!(email = %email, "Magic link refused: another session is live");
            metrics::MAGIC_LINKS_TOTAL
                .with_label_values(&[outcomes::CONFLICT])
                .inc();
            return Err(ApiError::Conflict {
                last_active: rfc3339(account.last_active),
            });
        }

        let magic_token = token::generate_token();
        let ttl = Duration::from_secs(self.config.auth.magic_link_ttl_secs);
        self.store
            .set_ex(&self.keys.magic(&magic_token), &email, ttl)
            .await?;

        info!(email = %email, ttl_secs = ttl.as_secs(), "Magic link issued");
        metrics::MAGIC_LINKS_TOTAL
            .with_label_values(&[outcomes::OK])
            .inc();

        Ok(IssuedMagicLink {
            email,
            first_name: account.first_name,
            token: magic_token,
            ttl,
        })
    }

    /// Exchange a magic-link token for a session, exactly once
    ///
    /// The token lookup is an atomic get-and-delete: of two concurrent
    /// redeemers, at most one sees the mapping. On success the new session
    /// token supersedes any prior one, with the superseded index entry
    /// removed in the same batch that installs the new session.
    pub async fn redeem_magic_link(&self, magic_token: &str) -> ApiResult<SessionBundle> {
        let email = match self.store.take(&self.keys.magic(magic_token)).await? {
            Some(email) => email,
            None => {
                metrics::REDEMPTIONS_TOTAL
                    .with_label_values(&[outcomes::NOT_FOUND])
                    .inc();
                return Err(ApiError::NotFound(
                    "Invalid or expired magic link".to_string(),
                ));
            }
        };

        let account = self
            .load_account(&email)
            .await?
            .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

        if !account.is_entitled() {
            metrics::REDEMPTIONS_TOTAL
                .with_label_values(&[outcomes::FORBIDDEN])
                .inc();
            return Err(ApiError::Forbidden("Premium access not active".to_string()));
        }
        // is_entitled guarantees the token is present
        let access_token = account.access_token.clone().unwrap_or_default();

        let now = now_ms();
        let expires = now + self.config.auth.session_window_days * MS_PER_DAY;
        let session_token = token::generate_token();
        // Index entries outlive the longest possible session, then age out
        let index_ttl = Duration::from_secs(
            ((self.config.auth.session_window_days + self.config.auth.renewal_window_days)
                * 24
                * 60
                * 60) as u64,
        );

        let mut ops = vec![StoreOp::HashSet {
            key: self.keys.account(&email),
            fields: vec![
                (fields::SESSION_TOKEN.to_string(), session_token.clone()),
                (fields::SESSION_ISSUED_AT.to_string(), now.to_string()),
                (fields::SESSION_EXPIRES.to_string(), expires.to_string()),
                (fields::LAST_ACTIVE.to_string(), now.to_string()),
                (
                    fields::LOGIN_COUNT.to_string(),
                    (account.login_count + 1).to_string(),
                ),
            ],
        }];
        if let Some(old_token) = &account.session_token {
            ops.push(StoreOp::Del {
                key: self.keys.session(old_token),
            });
        }
        ops.push(StoreOp::SetEx {
            key: self.keys.session(&session_token),
            value: email.clone(),
            ttl: index_ttl,
        });
        // Re-assert the entitlement index so accounts provisioned before the
        // index existed converge on first login
        ops.push(StoreOp::Set {
            key: self.keys.access(&access_token),
            value: email.clone(),
        });
        self.store.apply(ops).await?;

        info!(email = %email, login_count = account.login_count + 1, "Magic link redeemed");
        metrics::REDEMPTIONS_TOTAL
            .with_label_values(&[outcomes::OK])
            .inc();

        Ok(SessionBundle {
            email,
            token: access_token,
            session_token,
            created: now,
            last_active: now,
            expires,
            first_name: account.first_name,
            tier: account.tier,
            payment_type: account.payment_type,
            synced_from_local: account.synced_from_local,
        })
    }

    /// Resolve a bearer session token to an authenticated account
    ///
    /// Entitlement liveness is re-checked on every call, so revocation cuts
    /// off live sessions at their next request. A validation landing inside
    /// the renewal window slides the expiry forward by a fresh session
    /// window; a validation past expiry is terminal.
    pub async fn validate_session(&self, bearer: &str) -> ApiResult<(UserView, SessionView)> {
        let email = match self.store.get(&self.keys.session(bearer)).await? {
            Some(email) => email,
            None => {
                metrics::SESSION_VALIDATIONS_TOTAL
                    .with_label_values(&[outcomes::NOT_FOUND])
                    .inc();
                return Err(ApiError::NotFound("Session not found".to_string()));
            }
        };

        let account = self
            .load_account(&email)
            .await?
            .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

        // A superseded token can outlive its index TTL race; the account
        // record is the source of truth
        if account.session_token.as_deref() != Some(bearer) {
            metrics::SESSION_VALIDATIONS_TOTAL
                .with_label_values(&[outcomes::NOT_FOUND])
                .inc();
            return Err(ApiError::NotFound("Session not found".to_string()));
        }

        if !account.is_entitled() {
            metrics::SESSION_VALIDATIONS_TOTAL
                .with_label_values(&[outcomes::NOT_FOUND])
                .inc();
            return Err(ApiError::NotFound("Access revoked".to_string()));
        }

        let now = now_ms();
        let issued_at = account.session_issued_at.unwrap_or(account.last_active);
        let expires = account
            .session_expires
            .unwrap_or(issued_at + self.config.auth.session_window_days * MS_PER_DAY);

        if now > expires {
            metrics::SESSION_VALIDATIONS_TOTAL
                .with_label_values(&[outcomes::EXPIRED])
                .inc();
            return Err(ApiError::Expired);
        }

        let renewal_trigger = expires - self.config.auth.renewal_window_days * MS_PER_DAY;
        let renewed = now >= renewal_trigger;
        let effective_expires = if renewed {
            now + self.config.auth.session_window_days * MS_PER_DAY
        } else {
            expires
        };

        let mut account_fields = vec![(fields::LAST_ACTIVE.to_string(), now.to_string())];
        let mut ops = Vec::new();
        if renewed {
            account_fields.push((
                fields::SESSION_EXPIRES.to_string(),
                effective_expires.to_string(),
            ));
            // Keep the index alive alongside the renewed window
            ops.push(StoreOp::SetEx {
                key: self.keys.session(bearer),
                value: email.clone(),
                ttl: Duration::from_secs(
                    ((self.config.auth.session_window_days
                        + self.config.auth.renewal_window_days)
                        * 24
                        * 60
                        * 60) as u64,
                ),
            });
            info!(email = %email, "Session renewed");
        }
        ops.push(StoreOp::HashSet {
            key: self.keys.account(&email),
            fields: account_fields,
        });
        self.store.apply(ops).await?;

        metrics::SESSION_VALIDATIONS_TOTAL
            .with_label_values(&[if renewed { outcomes::RENEWED } else { outcomes::OK }])
            .inc();

        Ok((
            UserView {
                email: account.email,
                first_name: account.first_name,
                tier: account.tier,
                payment_type: account.payment_type,
                last_active: now,
                expires: effective_expires,
                synced_from_local: account.synced_from_local,
            },
            SessionView {
                created: issued_at,
                last_active: now,
                expires: effective_expires,
                renewed,
            },
        ))
    }

    /// Resolve a bearer entitlement token to its account
    ///
    /// Used by the sync surface, which authenticates with the entitlement
    /// token rather than the per-device session token.
    pub async fn resolve_entitlement(&self, access_token: &str) -> ApiResult<AccountRecord> {
        let email = self
            .store
            .get(&self.keys.access(access_token))
            .await?
            .ok_or_else(|| ApiError::Forbidden("Invalid access token".to_string()))?;

        let account = self
            .load_account(&email)
            .await?
            .ok_or_else(|| ApiError::Forbidden("Invalid access token".to_string()))?;

        // Guard against a stale index surviving a token rotation
        if account.access_token.as_deref() != Some(access_token) || !account.is_entitled() {
            return Err(ApiError::Forbidden("Invalid access token".to_string()));
        }

        Ok(account)
    }

    /// Kill this customer's entitlement everywhere
    ///
    /// Deletes only the `access_token` field; the session token and app data
    /// stay in place so a re-provisioned account picks up where it left off.
    pub async fn revoke_access(&self, access_token: &str) -> ApiResult<Revocation> {
        let account = match self.resolve_entitlement(access_token).await {
            Ok(account) => account,
            Err(e) => {
                metrics::REVOCATIONS_TOTAL
                    .with_label_values(&[outcomes::FORBIDDEN])
                    .inc();
                return Err(e);
            }
        };

        let now = now_ms();
        self.store
            .apply(vec![
                StoreOp::HashDel {
                    key: self.keys.account(&account.email),
                    fields: vec![fields::ACCESS_TOKEN.to_string()],
                },
                StoreOp::HashSet {
                    key: self.keys.account(&account.email),
                    fields: vec![
                        (fields::LAST_ACTIVE.to_string(), now.to_string()),
                        (fields::ACCESS_REVOKED.to_string(), now.to_string()),
                    ],
                },
                StoreOp::Del {
                    key: self.keys.access(access_token),
                },
            ])
            .await?;

        info!(email = %account.email, "Entitlement revoked globally");
        metrics::REVOCATIONS_TOTAL
            .with_label_values(&[outcomes::OK])
            .inc();

        Ok(Revocation {
            email: account.email,
            revoked_devices: account.session_token.is_some() as u32,
            revoked_at: rfc3339(now),
        })
    }
}
