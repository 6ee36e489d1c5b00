/// /sync endpoints
///
/// Pull and push are keyed by a privacy-preserving hash of the account
/// identifier; the raw address never appears in a query string. Both
/// authenticate with the bearer entitlement token.
use crate::{
    auth::EntitlementAuth,
    context::AppContext,
    error::{ApiError, ApiResult},
    sync::{PullResponse, PushResponse, Snapshot, SyncType},
    token,
};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

/// Build sync routes
pub fn routes() -> Router<AppContext> {
    Router::new().route("/sync", get(pull).post(push))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PullParams {
    account_hash: Option<String>,
}

/// Verify a supplied account hash against the authenticated account
fn check_account_hash(supplied: &str, email: &str) -> ApiResult<()> {
    if supplied != token::account_hash(email) {
        return Err(ApiError::Forbidden(
            "Account hash does not match credentials".to_string(),
        ));
    }
    Ok(())
}

/// Return the stored snapshot verbatim
///
/// An account that has never pushed gets an empty snapshot rather than an
/// error, so a fresh device can start from nothing.
async fn pull(
    State(ctx): State<AppContext>,
    auth: EntitlementAuth,
    Query(params): Query<PullParams>,
) -> ApiResult<Json<PullResponse>> {
    let hash = params
        .account_hash
        .as_deref()
        .ok_or_else(|| ApiError::Validation("accountHash query parameter required".to_string()))?;
    check_account_hash(hash, &auth.account.email)?;

    let response = match ctx.sync.pull(&auth.account.email).await? {
        Some(response) => response,
        None => PullResponse {
            data: Snapshot::empty(),
            first_name: auth.account.first_name,
            timestamp: 0,
            last_sync: Utc::now().to_rfc3339(),
        },
    };

    Ok(Json(response))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PushRequest {
    account_hash: Option<String>,
    data: Snapshot,
    first_name: Option<String>,
    sync_type: Option<SyncType>,
}

/// Overwrite the server snapshot with the caller's copy
async fn push(
    State(ctx): State<AppContext>,
    auth: EntitlementAuth,
    Json(req): Json<PushRequest>,
) -> ApiResult<Json<PushResponse>> {
    // Identity is the bearer token; the body hash is a cross-check when sent
    if let Some(hash) = req.account_hash.as_deref() {
        check_account_hash(hash, &auth.account.email)?;
    }

    let response = ctx
        .sync
        .push(
            &auth.account.email,
            &req.data,
            req.first_name.as_deref(),
            req.sync_type.unwrap_or(SyncType::Update),
        )
        .await?;

    Ok(Json(response))
}
