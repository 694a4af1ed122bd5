//! Mutation pipeline shared by every endpoint.
//!
//! Each endpoint is an [`Operation`] declaration plus one store call. [`Operation::run`]
//! always executes the same steps in the same order:
//!
//! 1. parse the request body into JSON
//! 2. validate it against the operation's [`Shape`]; nothing below runs on failure
//! 3. authorize the bearer token when the operation requires a session
//! 4. commit: the handler's store call
//! 5. respond: map the outcome to a status code or an [`ApiError`]

pub mod operations;

use std::future::Future;

use axum::{extract::rejection::JsonRejection, http::StatusCode, Json};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

pub use operations::*;

use crate::app::AppState;
use crate::database::models::User;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, BearerToken};
use crate::validation::{validate, Shape, ValidationResult};

pub const NOT_AUTHORIZED: &str = "Not authorized";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Requires a bearer token that matches the one stored for its subject
    Session,
}

#[derive(Debug)]
pub struct Operation {
    pub name: &'static str,
    pub shape: Option<Shape>,
    pub access: Access,
    pub success: StatusCode,
    /// Message used when the store reports no such resource
    pub not_found: &'static str,
}

/// Raw request inputs, before any pipeline step has looked at them
pub struct Request {
    bearer: BearerToken,
    body: Option<Result<Json<Value>, JsonRejection>>,
}

impl Request {
    pub fn new() -> Self {
        Self {
            bearer: BearerToken::missing(),
            body: None,
        }
    }

    pub fn json(body: Result<Json<Value>, JsonRejection>) -> Self {
        Self {
            bearer: BearerToken::missing(),
            body: Some(body),
        }
    }

    pub fn with_bearer(mut self, bearer: BearerToken) -> Self {
        self.bearer = bearer;
        self
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

/// What the commit step receives once parse, validate and authorize have passed
pub struct Admitted<P> {
    pub state: AppState,
    pub payload: P,
    /// The authenticated user, present for [`Access::Session`] operations
    pub session: Option<User>,
}

/// Unwrap the session user of an admitted request
pub fn signed_in(session: Option<User>) -> Result<User, ApiError> {
    session.ok_or_else(|| ApiError::unauthorized(NOT_AUTHORIZED))
}

impl Operation {
    /// Run the full pipeline. `commit` performs the operation's store call and returns
    /// `Ok(None)` when the addressed resource does not exist.
    pub async fn run<P, T, F, Fut>(&self, state: AppState, request: Request, commit: F) -> ApiResult<T>
    where
        P: DeserializeOwned,
        T: Serialize,
        F: FnOnce(Admitted<P>) -> Fut,
        Fut: Future<Output = Result<Option<T>, ApiError>>,
    {
        tracing::debug!(operation = self.name, "Pipeline starting");

        let payload = match self.admit(request.body) {
            Ok(payload) => payload,
            Err(e) => return self.fail(e),
        };

        let session = match self.authorize(&state, &request.bearer).await {
            Ok(session) => session,
            Err(e) => return self.fail(e),
        };

        let outcome = commit(Admitted { state, payload, session }).await;
        self.respond(outcome)
    }

    /// Parse and validate, then convert the validated JSON into the typed payload
    fn admit<P: DeserializeOwned>(&self, body: Option<Result<Json<Value>, JsonRejection>>) -> Result<P, ApiError> {
        let value = match (self.shape, body) {
            (Some(shape), Some(body)) => {
                let Json(value) = body.map_err(|rejection| ApiError::invalid_json(rejection.body_text()))?;
                match validate(shape, &value) {
                    ValidationResult::Valid => value,
                    invalid => {
                        tracing::debug!(operation = self.name, shape = shape.name(), "Payload rejected: {:?}", invalid);
                        return Err(ApiError::from(invalid));
                    }
                }
            }
            (Some(shape), None) => {
                return Err(ApiError::bad_request(format!("{} request body is required", shape.name())));
            }
            (None, _) => Value::Null,
        };

        serde_json::from_value(value).map_err(|e| ApiError::bad_request(e.to_string()))
    }

    async fn authorize(&self, state: &AppState, bearer: &BearerToken) -> Result<Option<User>, ApiError> {
        if self.access == Access::Public {
            return Ok(None);
        }

        let token = bearer.0.as_deref().map_err(|reason| {
            tracing::debug!(operation = self.name, "No usable bearer token: {}", reason);
            ApiError::unauthorized(NOT_AUTHORIZED)
        })?;

        let subject = state.credentials.verify_token(token).map_err(|e| {
            tracing::debug!(operation = self.name, "Bearer token rejected: {}", e);
            ApiError::unauthorized(NOT_AUTHORIZED)
        })?;

        // A signed token is only live while it is the one stored for its subject
        match state.users.find_by_id(subject).await? {
            Some(user) if user.token.as_deref() == Some(token) => Ok(Some(user)),
            _ => {
                tracing::debug!(operation = self.name, %subject, "Bearer token is not the active session");
                Err(ApiError::unauthorized(NOT_AUTHORIZED))
            }
        }
    }

    fn respond<T: Serialize>(&self, outcome: Result<Option<T>, ApiError>) -> ApiResult<T> {
        match outcome {
            Ok(Some(value)) => {
                tracing::debug!(operation = self.name, status = self.success.as_u16(), "Pipeline complete");
                Ok(ApiResponse::with_status(value, self.success))
            }
            Ok(None) => self.fail(ApiError::not_found(self.not_found)),
            Err(e) => self.fail(e),
        }
    }

    fn fail<T: Serialize>(&self, error: ApiError) -> ApiResult<T> {
        tracing::debug!(
            operation = self.name,
            status = error.status_code(),
            code = error.error_code(),
            "Pipeline halted"
        );
        Err(error)
    }
}
