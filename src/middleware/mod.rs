pub mod auth;
pub mod response;

pub use auth::{extract_jwt_from_headers, BearerToken};
pub use response::{ApiResponse, ApiResult};
