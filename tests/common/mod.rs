#![allow(dead_code)]

use std::io::Cursor;

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

pub use contacts_api::testing::TestContext;
use contacts_api::testing::test_config;

const BODY_LIMIT: usize = 1024 * 1024;
const BOUNDARY: &str = "contacts-api-test-boundary";

/// Fresh router over empty in-memory stores, with test logging routed through the harness
pub fn context() -> TestContext {
    init_tracing();
    tracing::debug!("building test context");
    TestContext::with_config(test_config())
}

/// Router whose stores fail every call
pub fn unavailable_context() -> TestContext {
    init_tracing();
    TestContext::with_unavailable_store()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("contacts_api=debug"))
        .with_test_writer()
        .try_init();
}

/// Drive one request through the router in-process
pub async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Result<(StatusCode, Value)> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body)?))?,
        None => builder.body(Body::empty())?,
    };

    dispatch(app, request).await
}

/// Send a raw body with the given content type
pub async fn send_raw(app: &Router, method: Method, uri: &str, content_type: &str, body: Vec<u8>) -> Result<(StatusCode, Value)> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))?;
    dispatch(app, request).await
}

pub async fn upload_avatar(
    app: &Router,
    token: Option<&str>,
    field: &str,
    file_name: &str,
    bytes: &[u8],
) -> Result<(StatusCode, Value)> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n", field, file_name).as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    let mut builder = Request::builder()
        .method(Method::PATCH)
        .uri("/api/users/avatar")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY));
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }

    dispatch(app, builder.body(Body::from(body))?).await
}

async fn dispatch(app: &Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app.clone().oneshot(request).await.context("router call failed")?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), BODY_LIMIT).await?;

    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).with_context(|| format!("non-JSON body: {}", String::from_utf8_lossy(&bytes)))?
    };
    Ok((status, body))
}

pub fn contact(name: &str, email: &str, phone: &str) -> Value {
    json!({ "name": name, "email": email, "phone": phone })
}

pub async fn create_contact(app: &Router, name: &str) -> Result<Value> {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/contacts",
        None,
        Some(contact(name, &format!("{}@x.com", name.to_lowercase()), "123")),
    )
    .await?;
    anyhow::ensure!(status == StatusCode::CREATED, "create failed: {} {}", status, body);
    Ok(body)
}

pub async fn signup(app: &Router, email: &str, password: &str) -> Result<(StatusCode, Value)> {
    send(app, Method::POST, "/api/users/signup", None, Some(json!({ "email": email, "password": password }))).await
}

pub async fn login(app: &Router, email: &str, password: &str) -> Result<(StatusCode, Value)> {
    send(app, Method::POST, "/api/users/login", None, Some(json!({ "email": email, "password": password }))).await
}

/// Sign up and log in, returning the session token
pub async fn signed_in_user(app: &Router, email: &str) -> Result<String> {
    let (status, body) = signup(app, email, "secret1").await?;
    anyhow::ensure!(status == StatusCode::CREATED, "signup failed: {} {}", status, body);

    let (status, body) = login(app, email, "secret1").await?;
    anyhow::ensure!(status == StatusCode::OK, "login failed: {} {}", status, body);
    body["token"].as_str().map(str::to_string).context("login response has no token")
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .expect("encode test png");
    buf
}
