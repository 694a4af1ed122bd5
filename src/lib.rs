pub mod app;
pub mod auth;
pub mod avatar;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod notify;
pub mod pipeline;
pub mod validation;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use app::{app, AppState};
