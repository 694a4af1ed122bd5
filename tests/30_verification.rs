mod common;

use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{context, send, signup, TestContext};
use contacts_api::database::UserStore;

async fn signed_up_code(ctx: &TestContext, email: &str) -> Result<String> {
    let (status, body) = signup(&ctx.app, email, "secret1").await?;
    anyhow::ensure!(status == StatusCode::CREATED, "signup failed: {}", body);
    body["user"]["verificationToken"]
        .as_str()
        .map(str::to_string)
        .context("signup response has no verification token")
}

#[tokio::test]
async fn unknown_code_is_404() -> Result<()> {
    let ctx = context();

    let (status, body) = send(&ctx.app, Method::GET, "/api/users/verify/nope", None, None).await?;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
    Ok(())
}

#[tokio::test]
async fn verifying_clears_the_code_and_cannot_repeat() -> Result<()> {
    let ctx = context();
    let code = signed_up_code(&ctx, "v@x.com").await?;
    let uri = format!("/api/users/verify/{}", code);

    let (status, body) = send(&ctx.app, Method::GET, &uri, None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Verification successful");

    let user = ctx.store.find_by_email("v@x.com").await?.context("user stored")?;
    assert!(user.verified);
    assert_eq!(user.verification_token, None);

    let (status, _) = send(&ctx.app, Method::GET, &uri, None, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn resend_issues_a_new_code() -> Result<()> {
    let ctx = context();
    let old_code = signed_up_code(&ctx, "again@x.com").await?;
    ctx.mailer.wait_for(1, Duration::from_secs(2)).await;

    let (status, body) =
        send(&ctx.app, Method::POST, "/api/users/verify", None, Some(json!({ "email": "again@x.com" }))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Verification email sent");

    let user = ctx.store.find_by_email("again@x.com").await?.context("user stored")?;
    let new_code = user.verification_token.context("still unverified")?;
    assert_ne!(new_code, old_code);

    let sent = ctx.mailer.wait_for(2, Duration::from_secs(2)).await;
    assert_eq!(sent.len(), 2);
    assert!(sent[1].html.contains(&new_code));

    // The superseded code no longer verifies anything
    let (status, _) = send(&ctx.app, Method::GET, &format!("/api/users/verify/{}", old_code), None, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&ctx.app, Method::GET, &format!("/api/users/verify/{}", new_code), None, None).await?;
    assert_eq!(status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn resend_after_verification_is_400() -> Result<()> {
    let ctx = context();
    let code = signed_up_code(&ctx, "done@x.com").await?;
    send(&ctx.app, Method::GET, &format!("/api/users/verify/{}", code), None, None).await?;

    let (status, body) =
        send(&ctx.app, Method::POST, "/api/users/verify", None, Some(json!({ "email": "done@x.com" }))).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Verification has already been passed");
    Ok(())
}

#[tokio::test]
async fn resend_validates_and_reports_unknown_users() -> Result<()> {
    let ctx = context();

    let (status, body) = send(&ctx.app, Method::POST, "/api/users/verify", None, Some(json!({}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "missing required email field");

    let (status, body) =
        send(&ctx.app, Method::POST, "/api/users/verify", None, Some(json!({ "email": "who@x.com" }))).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
    Ok(())
}
