use std::convert::Infallible;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};

/// Bearer credential presented with a request, if any.
///
/// Extraction never rejects: whether a token is required is decided by the
/// pipeline's authorize step, which runs only after the payload validated.
#[derive(Debug, Clone)]
pub struct BearerToken(pub Result<String, String>);

impl BearerToken {
    pub fn missing() -> Self {
        Self(Err("Missing Authorization header".to_string()))
    }

    pub fn token(&self) -> Option<&str> {
        self.0.as_deref().ok()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(extract_jwt_from_headers(&parts.headers)))
    }
}

/// Extract JWT token from Authorization header
pub fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}
