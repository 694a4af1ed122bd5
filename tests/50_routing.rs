mod common;

use anyhow::Result;
use axum::http::{Method, StatusCode};
use serde_json::json;

use common::{context, send};

#[tokio::test]
async fn health_endpoint_responds() -> Result<()> {
    let ctx = context();

    let (status, body) = send(&ctx.app, Method::GET, "/health", None, None).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
    Ok(())
}

#[tokio::test]
async fn unknown_routes_are_404_with_message() -> Result<()> {
    let ctx = context();

    for uri in ["/", "/api", "/api/nothing/here"] {
        let (status, body) = send(&ctx.app, Method::GET, uri, None, None).await?;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        assert_eq!(body, json!({ "message": "Not found" }));
    }
    Ok(())
}

#[tokio::test]
async fn every_failure_carries_a_message() -> Result<()> {
    let ctx = context();

    let failures = [
        (Method::POST, "/api/contacts", Some(json!({}))),
        (Method::GET, "/api/contacts/00000000-0000-0000-0000-000000000000", None),
        (Method::GET, "/api/users/current", None),
        (Method::POST, "/api/users/login", Some(json!({ "email": "x@x.com", "password": "secret1" }))),
        (Method::POST, "/api/contacts/00000000-0000-0000-0000-000000000000", None),
        (Method::DELETE, "/api/users/login", None),
        (Method::GET, "/avatars/missing.png", None),
    ];

    for (method, uri, body) in failures {
        let (status, response) = send(&ctx.app, method.clone(), uri, None, body).await?;
        assert!(status.is_client_error(), "{} {} -> {}", method, uri, status);
        assert!(response["message"].is_string(), "{} {} -> {}", method, uri, response);
    }
    Ok(())
}

#[tokio::test]
async fn unsupported_methods_and_missing_avatars_are_json_404() -> Result<()> {
    let ctx = context();

    let requests = [
        (Method::POST, "/api/contacts/00000000-0000-0000-0000-000000000000"),
        (Method::DELETE, "/api/users/login"),
        (Method::PUT, "/api/users/verify"),
        (Method::POST, "/health"),
        (Method::GET, "/avatars/missing.png"),
        (Method::POST, "/avatars/missing.png"),
    ];

    for (method, uri) in requests {
        let (status, body) = send(&ctx.app, method.clone(), uri, None, None).await?;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, uri);
        assert_eq!(body, json!({ "message": "Not found" }), "{} {}", method, uri);
    }
    Ok(())
}
