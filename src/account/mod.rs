/// Account records and wire types
///
/// Handles the premium account hash stored per user plus the JSON shapes the
/// auth endpoints speak.

mod manager;

pub use manager::AccountManager;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

/// Gate for all premium functionality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Inactive,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "active" => AccountStatus::Active,
            _ => AccountStatus::Inactive,
        }
    }
}

/// Purchase tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Foundation,
    EarlyAdopter,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Foundation => "foundation",
            Tier::EarlyAdopter => "early_adopter",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "foundation" => Tier::Foundation,
            _ => Tier::EarlyAdopter,
        }
    }
}

/// How the account paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
    Lifetime,
    Subscription,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Lifetime => "lifetime",
            PaymentType::Subscription => "subscription",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "subscription" => PaymentType::Subscription,
            _ => PaymentType::Lifetime,
        }
    }
}

/// Store field names for the account hash
///
/// The payment webhook (out of scope) creates the row with `status`, `tier`,
/// `payment_type`, `access_token`, and `first_name`; everything else is
/// written by this server.
pub mod fields {
    pub const EMAIL: &str = "email";
    pub const STATUS: &str = "status";
    pub const TIER: &str = "tier";
    pub const PAYMENT_TYPE: &str = "payment_type";
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const SESSION_TOKEN: &str = "session_token";
    pub const SESSION_ISSUED_AT: &str = "session_issued_at";
    pub const SESSION_EXPIRES: &str = "session_expires";
    pub const LAST_ACTIVE: &str = "last_active";
    pub const LOGIN_COUNT: &str = "login_count";
    pub const FIRST_NAME: &str = "first_name";
    pub const APP_DATA: &str = "app_data";
    pub const APP_DATA_MODIFIED: &str = "app_data_modified";
    pub const ACCESS_REVOKED: &str = "access_revoked";
    pub const SYNCED_FROM_LOCAL: &str = "synced_from_local";
}

/// A premium account as read from the store
#[derive(Debug, Clone)]
pub struct AccountRecord {
    pub email: String,
    pub status: AccountStatus,
    pub tier: Tier,
    pub payment_type: PaymentType,
    /// Entitlement secret; absence means revoked
    pub access_token: Option<String>,
    /// Bearer secret for the single live session
    pub session_token: Option<String>,
    pub session_issued_at: Option<i64>,
    pub session_expires: Option<i64>,
    /// Milliseconds since epoch
    pub last_active: i64,
    pub login_count: u64,
    pub first_name: String,
    /// Serialized snapshot; the server never looks inside
    pub app_data: Option<String>,
    /// Embedded snapshot modification timestamp, ms
    pub app_data_modified: Option<i64>,
    pub access_revoked: Option<i64>,
    pub synced_from_local: Option<i64>,
}

fn parse_ms(map: &HashMap<String, String>, field: &str) -> Option<i64> {
    map.get(field).and_then(|v| v.parse().ok())
}

impl AccountRecord {
    /// Build a record from a store hash; `None` when the hash is absent
    pub fn from_fields(email: &str, map: HashMap<String, String>) -> Option<Self> {
        if map.is_empty() {
            return None;
        }

        Some(Self {
            email: map
                .get(fields::EMAIL)
                .cloned()
                .unwrap_or_else(|| email.to_string()),
            status: AccountStatus::parse(map.get(fields::STATUS).map(String::as_str).unwrap_or("")),
            tier: Tier::parse(map.get(fields::TIER).map(String::as_str).unwrap_or("")),
            payment_type: PaymentType::parse(
                map.get(fields::PAYMENT_TYPE).map(String::as_str).unwrap_or(""),
            ),
            access_token: map.get(fields::ACCESS_TOKEN).cloned(),
            session_token: map.get(fields::SESSION_TOKEN).cloned(),
            session_issued_at: parse_ms(&map, fields::SESSION_ISSUED_AT),
            session_expires: parse_ms(&map, fields::SESSION_EXPIRES),
            last_active: parse_ms(&map, fields::LAST_ACTIVE).unwrap_or(0),
            login_count: map
                .get(fields::LOGIN_COUNT)
                .and_then(|v| v.parse().ok())
                .unwrap_or(0),
            first_name: map.get(fields::FIRST_NAME).cloned().unwrap_or_default(),
            app_data: map.get(fields::APP_DATA).cloned(),
            app_data_modified: parse_ms(&map, fields::APP_DATA_MODIFIED),
            access_revoked: parse_ms(&map, fields::ACCESS_REVOKED),
            synced_from_local: parse_ms(&map, fields::SYNCED_FROM_LOCAL),
        })
    }

    /// Whether the account may be issued sessions or magic links
    ///
    /// Requires both active status and a live entitlement; a revoked account
    /// keeps `status=active` but has no `access_token`.
    pub fn is_entitled(&self) -> bool {
        self.status == AccountStatus::Active && self.access_token.is_some()
    }
}

/// Magic link request body
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MagicLinkRequest {
    #[validate(email)]
    pub email: String,
}

/// Magic link response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MagicLinkResponse {
    pub success: bool,
    pub message: String,
    /// Only present in dev mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev_link: Option<String>,
}

/// The session a freshly redeemed magic link hands to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionBundle {
    pub email: String,
    /// Entitlement token, from the payment webhook
    pub token: String,
    /// Bearer credential for this device
    pub session_token: String,
    /// Issued-at, ms
    pub created: i64,
    pub last_active: i64,
    /// Absolute expiry, ms
    pub expires: i64,
    pub first_name: String,
    pub tier: Tier,
    pub payment_type: PaymentType,
    pub synced_from_local: Option<i64>,
}

/// Verify-magic-link response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub session: SessionBundle,
    pub message: String,
}

/// Public account fields returned by validate-session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub email: String,
    pub first_name: String,
    pub tier: Tier,
    pub payment_type: PaymentType,
    pub last_active: i64,
    pub expires: i64,
    pub synced_from_local: Option<i64>,
}

/// Validate-session response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateResponse {
    pub valid: bool,
    pub user: UserView,
}

/// Session view alongside the account on successful validation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionView {
    pub created: i64,
    pub last_active: i64,
    pub expires: i64,
    /// Whether this validation slid the expiry forward
    pub renewed: bool,
}

/// Revoke-access response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeResponse {
    pub success: bool,
    pub message: String,
    pub email: String,
    pub revoked_devices: u32,
    pub revoked_at: String,
}
