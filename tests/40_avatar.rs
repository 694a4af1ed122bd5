mod common;

use anyhow::{Context, Result};
use axum::http::{Method, StatusCode};

use common::{context, png_bytes, send, signed_in_user, upload_avatar};
use contacts_api::database::UserStore;

#[tokio::test]
async fn upload_replaces_the_avatar_url() -> Result<()> {
    let ctx = context();
    let token = signed_in_user(&ctx.app, "pic@x.com").await?;
    let user = ctx.store.find_by_email("pic@x.com").await?.context("user stored")?;

    let (status, body) = upload_avatar(&ctx.app, Some(&token), "avatar", "me.png", &png_bytes(40, 30)).await?;

    assert_eq!(status, StatusCode::OK);
    let expected = format!("/avatars/{}_me.png", user.id);
    assert_eq!(body["avatarUrl"], expected.as_str());

    let stored = ctx.store.find_by_email("pic@x.com").await?.context("user stored")?;
    assert_eq!(stored.avatar_url, expected);
    assert_eq!(ctx.avatars.processed().await.len(), 1);
    Ok(())
}

#[tokio::test]
async fn upload_requires_a_session() -> Result<()> {
    let ctx = context();

    let (status, body) = upload_avatar(&ctx.app, None, "avatar", "me.png", &png_bytes(10, 10)).await?;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authorized");
    assert!(ctx.avatars.processed().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn upload_without_the_avatar_field_is_400() -> Result<()> {
    let ctx = context();
    let token = signed_in_user(&ctx.app, "nofile@x.com").await?;

    let (status, body) = upload_avatar(&ctx.app, Some(&token), "picture", "me.png", &png_bytes(10, 10)).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "missing required avatar file");
    Ok(())
}

#[tokio::test]
async fn non_image_upload_is_400_and_keeps_the_old_avatar() -> Result<()> {
    let ctx = context();
    let token = signed_in_user(&ctx.app, "txt@x.com").await?;
    let before = ctx.store.find_by_email("txt@x.com").await?.context("user stored")?;

    let (status, _) = upload_avatar(&ctx.app, Some(&token), "avatar", "notes.txt", b"plain text").await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let after = ctx.store.find_by_email("txt@x.com").await?.context("user stored")?;
    assert_eq!(after.avatar_url, before.avatar_url);
    Ok(())
}

#[tokio::test]
async fn json_body_is_not_an_upload() -> Result<()> {
    let ctx = context();
    let token = signed_in_user(&ctx.app, "json@x.com").await?;

    let (status, _) = send(&ctx.app, Method::PATCH, "/api/users/avatar", Some(&token), Some(serde_json::json!({}))).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}
