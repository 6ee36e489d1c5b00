/// HTTP-level contract tests over the assembled router
///
/// The status codes and failure body shapes here are what shipped clients
/// branch on, so they are pinned end to end rather than at the manager.
mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use common::{provision, set_fields, test_context, ACCESS_TOKEN, MS_PER_DAY};
use lumen_sync::{context::AppContext, server::build_router, token};
use tower::ServiceExt;

fn get_with_bearer(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Log in through the manager and hand back the session bearer
async fn establish_session(ctx: &AppContext, email: &str) -> String {
    provision(ctx, email, "active", Some(ACCESS_TOKEN)).await;
    let issued = ctx.accounts.request_magic_link(email).await.unwrap();
    let session = ctx.accounts.redeem_magic_link(&issued.token).await.unwrap();
    session.session_token
}

#[tokio::test]
async fn test_validate_session_ok_body_carries_valid_and_user() {
    let ctx = test_context();
    let bearer = establish_session(&ctx, "a@x.com").await;
    let app = build_router(ctx);

    let response = app
        .oneshot(get_with_bearer("/auth/validate-session", Some(&bearer)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["valid"], true);
    assert_eq!(body["user"]["email"], "a@x.com");
    assert_eq!(body["user"]["firstName"], "Ada");
}

#[tokio::test]
async fn test_validate_session_unknown_token_is_404_with_valid_false() {
    let ctx = test_context();
    provision(&ctx, "a@x.com", "active", Some(ACCESS_TOKEN)).await;
    let app = build_router(ctx);

    let response = app
        .oneshot(get_with_bearer("/auth/validate-session", Some("deadbeef")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["valid"], false);
    assert!(body["error"].as_str().unwrap().contains("Session not found"));
}

#[tokio::test]
async fn test_validate_session_missing_header_is_401_with_valid_false() {
    let ctx = test_context();
    let app = build_router(ctx);

    let response = app
        .oneshot(get_with_bearer("/auth/validate-session", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["valid"], false);
}

#[tokio::test]
async fn test_validate_session_expired_is_401_not_404() {
    let ctx = test_context();
    let bearer = establish_session(&ctx, "a@x.com").await;
    let past = common::now_ms() - MS_PER_DAY;
    set_fields(&ctx, "a@x.com", &[("session_expires", past.to_string())]).await;
    let app = build_router(ctx);

    let response = app
        .oneshot(get_with_bearer("/auth/validate-session", Some(&bearer)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["valid"], false);
    assert!(body["error"].as_str().unwrap().contains("expired"));
}

#[tokio::test]
async fn test_validate_session_after_revocation_is_404_with_valid_false() {
    let ctx = test_context();
    let bearer = establish_session(&ctx, "a@x.com").await;
    ctx.accounts.revoke_access(ACCESS_TOKEN).await.unwrap();
    let app = build_router(ctx);

    let response = app
        .oneshot(get_with_bearer("/auth/validate-session", Some(&bearer)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["valid"], false);
    assert!(body["error"].as_str().unwrap().contains("Access revoked"));
}

#[tokio::test]
async fn test_pull_requires_matching_account_hash() {
    let ctx = test_context();
    provision(&ctx, "a@x.com", "active", Some(ACCESS_TOKEN)).await;
    let app = build_router(ctx);

    // No hash at all
    let response = app
        .clone()
        .oneshot(get_with_bearer("/sync", Some(ACCESS_TOKEN)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Hash for a different account
    let wrong = token::account_hash("b@x.com");
    let response = app
        .clone()
        .oneshot(get_with_bearer(
            &format!("/sync?accountHash={}", wrong),
            Some(ACCESS_TOKEN),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Matching hash, never-synced account gets the empty snapshot
    let right = token::account_hash("a@x.com");
    let response = app
        .oneshot(get_with_bearer(
            &format!("/sync?accountHash={}", right),
            Some(ACCESS_TOKEN),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["timestamp"], 0);
    assert_eq!(body["firstName"], "Ada");
}
