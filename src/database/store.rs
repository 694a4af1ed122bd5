use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use super::models::{Contact, ContactUpsert, NewUser, Subscription, User};

/// Faults raised by a resource store. "No such id" is not an error: lookups return `None`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Duplicate value for unique field: {0}")]
    Duplicate(&'static str),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Corrupt row: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Sqlx(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => StoreError::Duplicate("email"),
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Sqlx(err),
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Contact collection. Ids are opaque strings at this boundary; an id the store
/// cannot parse simply does not exist.
#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn list(&self) -> StoreResult<Vec<Contact>>;

    async fn find(&self, id: &str) -> StoreResult<Option<Contact>>;

    async fn create(&self, contact: ContactUpsert) -> StoreResult<Contact>;

    async fn update(&self, id: &str, contact: ContactUpsert) -> StoreResult<Option<Contact>>;

    async fn set_favorite(&self, id: &str, favorite: bool) -> StoreResult<Option<Contact>>;

    async fn delete(&self, id: &str) -> StoreResult<Option<Contact>>;
}

/// User collection. Every method is a single atomic store operation.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new unverified user; `Duplicate("email")` when the email is taken.
    async fn create(&self, user: NewUser) -> StoreResult<User>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Replace (or clear, with `None`) the single active session token.
    async fn set_token(&self, id: Uuid, token: Option<String>) -> StoreResult<Option<User>>;

    async fn set_subscription(&self, id: Uuid, subscription: Subscription) -> StoreResult<Option<User>>;

    async fn set_avatar_url(&self, id: Uuid, avatar_url: String) -> StoreResult<Option<User>>;

    /// Consume a verification code: mark the owner verified and clear the code.
    async fn verify_email(&self, verification_token: &str) -> StoreResult<Option<User>>;

    /// Store a fresh verification code, only while the user is still unverified.
    async fn reissue_verification(&self, id: Uuid, verification_token: String) -> StoreResult<Option<User>>;
}
