#![allow(dead_code)]
/// Shared test fixtures
///
/// Provisioning normally happens in the payment webhook, outside this
/// server; these helpers play that role against the in-memory store.
use lumen_sync::{
    config::ServerConfig,
    context::AppContext,
    store::{KeySpace, StoreOp},
};

pub const ACCESS_TOKEN: &str = "feedfacecafebeeffeedfacecafebeeffeedfacecafebeeffeedfacecafebeef";

/// Context over a fresh in-memory store
pub fn test_context() -> AppContext {
    AppContext::in_memory(ServerConfig::for_tests()).unwrap()
}

pub fn keyspace(ctx: &AppContext) -> KeySpace {
    KeySpace::new(ctx.config.store.key_prefix.clone())
}

/// Create an account row the way the payment webhook does
pub async fn provision(ctx: &AppContext, email: &str, status: &str, access_token: Option<&str>) {
    let keys = keyspace(ctx);
    let mut fields = vec![
        ("email".to_string(), email.to_string()),
        ("status".to_string(), status.to_string()),
        ("tier".to_string(), "early_adopter".to_string()),
        ("payment_type".to_string(), "lifetime".to_string()),
        ("first_name".to_string(), "Ada".to_string()),
    ];
    let mut ops = Vec::new();
    if let Some(token) = access_token {
        fields.push(("access_token".to_string(), token.to_string()));
        // The webhook writes the entitlement index next to the account row
        ops.push(StoreOp::Set {
            key: keys.access(token),
            value: email.to_string(),
        });
    }
    ops.push(StoreOp::HashSet {
        key: keys.account(email),
        fields,
    });
    ctx.store.apply(ops).await.unwrap();
}

/// Overwrite account hash fields directly (e.g. to move time around)
pub async fn set_fields(ctx: &AppContext, email: &str, fields: &[(&str, String)]) {
    let keys = keyspace(ctx);
    ctx.store
        .apply(vec![StoreOp::HashSet {
            key: keys.account(email),
            fields: fields
                .iter()
                .map(|(f, v)| (f.to_string(), v.clone()))
                .collect(),
        }])
        .await
        .unwrap();
}

/// Read one account hash field
pub async fn get_field(ctx: &AppContext, email: &str, field: &str) -> Option<String> {
    let keys = keyspace(ctx);
    ctx.store
        .hash_get_all(&keys.account(email))
        .await
        .unwrap()
        .get(field)
        .cloned()
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

pub const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;
