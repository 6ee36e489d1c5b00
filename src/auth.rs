/// Authentication extractors
///
/// Handlers that need an authenticated caller declare an extractor argument;
/// the context is threaded explicitly per request, never held in a
/// process-wide singleton.
use crate::{account::AccountRecord, context::AppContext, error::ApiError};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};

/// Pull the bearer value out of the Authorization header
///
/// Tokens are opaque hex strings; nothing here parses them.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Authenticated entitlement - resolves the bearer as an access token
///
/// Used by revocation and sync, which target the customer rather than one
/// device. Session-token validation lives in the validate-session handler,
/// whose error body shape is part of the endpoint contract.
#[derive(Debug, Clone)]
pub struct EntitlementAuth {
    pub account: AccountRecord,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppContext> for EntitlementAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Authentication("Missing authorization header".to_string()))?;

        let account = state.accounts.resolve_entitlement(&token).await?;

        Ok(EntitlementAuth { account, token })
    }
}
