use std::any::Any;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    handler::HandlerWithoutStateExt,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, patch, post},
    Router,
};
use serde_json::json;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::auth::CredentialManager;
use crate::avatar::AvatarProcessor;
use crate::config::AppConfig;
use crate::database::{ContactStore, UserStore};
use crate::handlers::{protected, public};
use crate::notify::Notifier;

/// Process-wide dependencies, built once at startup and cloned into every request
#[derive(Clone)]
pub struct AppState {
    pub contacts: Arc<dyn ContactStore>,
    pub users: Arc<dyn UserStore>,
    pub credentials: Arc<CredentialManager>,
    pub notifier: Notifier,
    pub avatars: Arc<dyn AvatarProcessor>,
    pub config: Arc<AppConfig>,
}

pub fn app(state: AppState) -> Router {
    let avatar_dir = state.config.avatars.dir.clone();
    let avatar_path = state.config.avatars.public_path.clone();
    let body_limit = state.config.api.max_request_size_bytes;
    // Request logging off demotes per-request spans to debug rather than removing them
    let request_level = if state.config.api.enable_request_logging { Level::INFO } else { Level::DEBUG };

    Router::new()
        .route("/health", get(health).fallback(not_found))
        .merge(contact_routes())
        .merge(user_routes())
        .with_state(state)
        .nest_service(
            &avatar_path,
            ServeDir::new(avatar_dir)
                .call_fallback_on_method_not_allowed(true)
                .not_found_service(not_found.into_service()),
        )
        .fallback(not_found)
        // Global middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(request_level))
                .on_response(DefaultOnResponse::new().level(request_level)),
        )
}

// Each path answers unsupported methods with the JSON 404 instead of an empty 405
fn contact_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/contacts",
            get(public::list_contacts).post(public::create_contact).fallback(not_found),
        )
        .route(
            "/api/contacts/:id",
            get(public::get_contact)
                .put(public::update_contact)
                .delete(public::delete_contact)
                .fallback(not_found),
        )
        .route("/api/contacts/:id/favorite", patch(protected::set_favorite).fallback(not_found))
}

fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", patch(protected::update_subscription).fallback(not_found))
        .route("/api/users/signup", post(public::signup).fallback(not_found))
        .route("/api/users/login", post(public::login).fallback(not_found))
        .route("/api/users/logout", get(protected::logout).fallback(not_found))
        .route("/api/users/current", get(protected::current_user).fallback(not_found))
        .route("/api/users/avatar", patch(protected::update_avatar).fallback(not_found))
        .route("/api/users/verify", post(public::resend_verification).fallback(not_found))
        .route("/api/users/verify/:token", get(public::verify_email).fallback(not_found))
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "message": "Not found" })))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "Internal server error".to_string()
    };

    tracing::error!("Handler panicked: {}", message);
    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "message": message }))).into_response()
}
