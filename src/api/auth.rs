/// /auth/* endpoints
use crate::{
    account::{MagicLinkRequest, MagicLinkResponse, RevokeResponse, ValidateResponse, VerifyResponse},
    auth::extract_bearer_token,
    context::AppContext,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

/// Build auth routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/auth/magic-link", post(request_magic_link))
        .route("/auth/verify-magic-link", get(verify_magic_link))
        .route("/auth/validate-session", get(validate_session))
        .route("/auth/revoke-access", post(revoke_access))
}

/// Request a one-time login link
///
/// 200 even when email delivery fails: the token is already persisted and
/// the link is valid.
async fn request_magic_link(
    State(ctx): State<AppContext>,
    Json(req): Json<MagicLinkRequest>,
) -> ApiResult<Json<MagicLinkResponse>> {
    req.validate()
        .map_err(|e| ApiError::Validation(format!("Invalid email: {}", e)))?;

    let issued = ctx.accounts.request_magic_link(&req.email).await?;
    let magic_link = format!(
        "{}/auth/verify?token={}",
        ctx.public_url(),
        issued.token
    );

    let message = match ctx
        .mailer
        .send_magic_link_email(
            &issued.email,
            &issued.first_name,
            &magic_link,
            issued.ttl.as_secs() / 60,
        )
        .await
    {
        Ok(()) => "Magic link sent to your email".to_string(),
        Err(e) => {
            // Out-of-band delivery failure never fails the request
            tracing::warn!("Failed to send magic link email: {}", e);
            "Magic link generated (email delivery may be delayed)".to_string()
        }
    };

    Ok(Json(MagicLinkResponse {
        success: true,
        message,
        dev_link: ctx.config.service.dev_mode.then_some(magic_link),
    }))
}

#[derive(Debug, Deserialize)]
struct VerifyParams {
    token: Option<String>,
}

/// Exchange a magic-link token for a session
async fn verify_magic_link(
    State(ctx): State<AppContext>,
    Query(params): Query<VerifyParams>,
) -> ApiResult<Json<VerifyResponse>> {
    let token = params
        .token
        .ok_or_else(|| ApiError::Validation("Magic link token required".to_string()))?;

    let session = ctx.accounts.redeem_magic_link(&token).await?;

    Ok(Json(VerifyResponse {
        success: true,
        session,
        message: "Successfully authenticated".to_string(),
    }))
}

/// Resolve the bearer session token to its account
///
/// Failure bodies carry `valid: false` alongside the error; clients branch
/// on that field without inspecting status codes.
async fn validate_session(State(ctx): State<AppContext>, headers: HeaderMap) -> Response {
    let result = async {
        let token = extract_bearer_token(&headers)
            .ok_or_else(|| ApiError::Authentication("Missing authorization header".to_string()))?;
        ctx.accounts.validate_session(&token).await
    }
    .await;

    match result {
        Ok((user, _session)) => Json(ValidateResponse { valid: true, user }).into_response(),
        Err(err @ (ApiError::NotFound(_) | ApiError::Expired | ApiError::Authentication(_))) => {
            let status = match err {
                ApiError::NotFound(_) => StatusCode::NOT_FOUND,
                _ => StatusCode::UNAUTHORIZED,
            };
            (
                status,
                Json(json!({ "valid": false, "error": err.to_string() })),
            )
                .into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// Kill this customer's entitlement on every device
async fn revoke_access(
    State(ctx): State<AppContext>,
    headers: HeaderMap,
) -> ApiResult<Json<RevokeResponse>> {
    let token = extract_bearer_token(&headers)
        .ok_or_else(|| ApiError::Authentication("Missing authorization header".to_string()))?;

    let revocation = ctx.accounts.revoke_access(&token).await?;

    Ok(Json(RevokeResponse {
        success: true,
        message: "Access revoked on all devices".to_string(),
        email: revocation.email,
        revoked_devices: revocation.revoked_devices,
        revoked_at: revocation.revoked_at,
    }))
}
