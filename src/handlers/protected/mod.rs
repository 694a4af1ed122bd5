// handlers/protected/mod.rs - Protected handlers (session token required)
//
// The bearer token must verify and must equal the token stored for its user;
// a logged-out or superseded token is rejected with 401.

pub mod contacts;
pub mod users;

pub use contacts::set_favorite;
pub use users::{current_user, logout, update_avatar, update_subscription};
