// handlers/mod.rs - Route handlers grouped by access tier
//
// Public (no session) and Protected (bearer token matching the stored session).
// Every handler is a pipeline::Operation plus the single store call it commits.
pub mod public;
pub mod protected;

use serde::Serialize;

/// `{ "message": ... }` confirmation body
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

impl MessageResponse {
    pub fn new(message: &'static str) -> Self {
        Self { message }
    }
}
