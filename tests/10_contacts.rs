mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{contact, context, create_contact, send, send_raw, signed_in_user};

#[tokio::test]
async fn create_returns_201_with_generated_id() -> Result<()> {
    let ctx = context();

    let (status, body) = send(&ctx.app, Method::POST, "/api/contacts", None, Some(contact("A", "a@x.com", "123"))).await?;

    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert_eq!(body["name"], "A");
    assert_eq!(body["email"], "a@x.com");
    assert_eq!(body["phone"], "123");
    assert_eq!(body["favorite"], false);
    Ok(())
}

#[tokio::test]
async fn missing_fields_are_rejected_before_the_store() -> Result<()> {
    let ctx = context();
    let existing = create_contact(&ctx.app, "Kept").await?;
    let id = existing["id"].as_str().unwrap_or_default();

    let incomplete = [
        json!({ "email": "a@x.com", "phone": "123" }),
        json!({ "name": "A", "phone": "123" }),
        json!({ "name": "A", "email": "a@x.com" }),
        json!({}),
    ];

    for payload in incomplete {
        let (status, body) = send(&ctx.app, Method::POST, "/api/contacts", None, Some(payload.clone())).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "POST {}", payload);
        assert!(body["message"].as_str().is_some_and(|m| m.starts_with("missing required")));

        let uri = format!("/api/contacts/{}", id);
        let (status, _) = send(&ctx.app, Method::PUT, &uri, None, Some(payload.clone())).await?;
        assert_eq!(status, StatusCode::BAD_REQUEST, "PUT {}", payload);
    }

    assert_eq!(ctx.store.contact_count().await, 1);
    let (_, unchanged) = send(&ctx.app, Method::GET, &format!("/api/contacts/{}", id), None, None).await?;
    assert_eq!(unchanged, existing);
    Ok(())
}

#[tokio::test]
async fn list_returns_contacts_in_creation_order() -> Result<()> {
    let ctx = context();
    create_contact(&ctx.app, "First").await?;
    create_contact(&ctx.app, "Second").await?;

    let (status, body) = send(&ctx.app, Method::GET, "/api/contacts", None, None).await?;

    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body
        .as_array()
        .map(|items| items.iter().filter_map(|c| c["name"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(names, ["First", "Second"]);
    Ok(())
}

#[tokio::test]
async fn fetching_twice_returns_identical_fields() -> Result<()> {
    let ctx = context();
    let created = create_contact(&ctx.app, "Same").await?;
    let uri = format!("/api/contacts/{}", created["id"].as_str().unwrap_or_default());

    let (first_status, first) = send(&ctx.app, Method::GET, &uri, None, None).await?;
    let (second_status, second) = send(&ctx.app, Method::GET, &uri, None, None).await?;

    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(first, second);
    assert_eq!(first, created);
    Ok(())
}

#[tokio::test]
async fn update_replaces_fields() -> Result<()> {
    let ctx = context();
    let created = create_contact(&ctx.app, "Old").await?;
    let uri = format!("/api/contacts/{}", created["id"].as_str().unwrap_or_default());

    let (status, body) = send(&ctx.app, Method::PUT, &uri, None, Some(contact("New", "new@x.com", "999"))).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], created["id"]);
    assert_eq!(body["name"], "New");
    assert_eq!(body["phone"], "999");
    Ok(())
}

#[tokio::test]
async fn unknown_ids_are_404() -> Result<()> {
    let ctx = context();
    let missing = "/api/contacts/6f1c2a5e-0000-4000-8000-000000000000";

    let (status, body) = send(&ctx.app, Method::GET, missing, None, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not found");

    let (status, _) = send(&ctx.app, Method::PUT, missing, None, Some(contact("A", "a@x.com", "1"))).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Not even a well-formed id
    let (status, _) = send(&ctx.app, Method::GET, "/api/contacts/not-an-id", None, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn delete_returns_the_contact_then_404() -> Result<()> {
    let ctx = context();
    let created = create_contact(&ctx.app, "Gone").await?;
    let uri = format!("/api/contacts/{}", created["id"].as_str().unwrap_or_default());

    let (status, body) = send(&ctx.app, Method::DELETE, &uri, None, None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, created);

    let (status, _) = send(&ctx.app, Method::DELETE, &uri, None, None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(ctx.store.contact_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn favorite_requires_a_session() -> Result<()> {
    let ctx = context();
    let created = create_contact(&ctx.app, "Fav").await?;
    let uri = format!("/api/contacts/{}/favorite", created["id"].as_str().unwrap_or_default());

    let (status, body) = send(&ctx.app, Method::PATCH, &uri, None, Some(json!({ "favorite": true }))).await?;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authorized");

    let token = signed_in_user(&ctx.app, "fan@x.com").await?;
    let (status, body) = send(&ctx.app, Method::PATCH, &uri, Some(&token), Some(json!({ "favorite": true }))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["favorite"], true);
    Ok(())
}

#[tokio::test]
async fn favorite_validates_before_authorizing() -> Result<()> {
    let ctx = context();
    let created = create_contact(&ctx.app, "Fav").await?;
    let uri = format!("/api/contacts/{}/favorite", created["id"].as_str().unwrap_or_default());

    let (status, body) = send(&ctx.app, Method::PATCH, &uri, None, Some(json!({}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "missing required favorite field");

    let token = signed_in_user(&ctx.app, "fan@x.com").await?;
    let (status, _) = send(&ctx.app, Method::PATCH, &uri, Some(&token), Some(json!({ "favorite": "yes" }))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = "/api/contacts/6f1c2a5e-0000-4000-8000-000000000000/favorite";
    let (status, _) = send(&ctx.app, Method::PATCH, missing, Some(&token), Some(json!({ "favorite": true }))).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn malformed_json_is_400() -> Result<()> {
    let ctx = context();

    let (status, body) = send_raw(&ctx.app, Method::POST, "/api/contacts", "application/json", b"{\"name\":".to_vec()).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_JSON");
    assert!(body["message"].is_string());
    assert_eq!(ctx.store.contact_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn unknown_keys_are_rejected() -> Result<()> {
    let ctx = context();
    let mut payload = contact("A", "a@x.com", "123");
    payload["favorite"] = json!(true);

    let (status, body) = send(&ctx.app, Method::POST, "/api/contacts", None, Some(payload)).await?;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "\"favorite\" is not allowed");
    Ok(())
}
