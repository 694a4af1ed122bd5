use async_trait::async_trait;
use sqlx::{postgres::PgRow, PgPool, Row};
use uuid::Uuid;

use super::models::{Contact, ContactUpsert, NewUser, Subscription, User};
use super::store::{ContactStore, StoreError, StoreResult, UserStore};

const CONTACT_COLUMNS: &str = "id, name, email, phone, favorite";
const USER_COLUMNS: &str = "id, email, password_hash, subscription, token, avatar_url, verified, verification_token";

/// Postgres-backed resource store for both collections
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_user(&self, sql: &str, id: Uuid) -> StoreResult<Option<User>> {
        let row = sqlx::query(sql).bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(user_from_row).transpose()
    }
}

fn parse_id(id: &str) -> Option<Uuid> {
    Uuid::parse_str(id).ok()
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    let subscription: String = row.try_get("subscription")?;
    Ok(User {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        subscription: subscription.parse::<Subscription>().map_err(StoreError::Corrupt)?,
        token: row.try_get("token")?,
        avatar_url: row.try_get("avatar_url")?,
        verified: row.try_get("verified")?,
        verification_token: row.try_get("verification_token")?,
    })
}

#[async_trait]
impl ContactStore for PgStore {
    async fn list(&self) -> StoreResult<Vec<Contact>> {
        let sql = format!("SELECT {} FROM contacts ORDER BY created_at, id", CONTACT_COLUMNS);
        Ok(sqlx::query_as::<_, Contact>(&sql).fetch_all(&self.pool).await?)
    }

    async fn find(&self, id: &str) -> StoreResult<Option<Contact>> {
        let Some(id) = parse_id(id) else { return Ok(None) };
        let sql = format!("SELECT {} FROM contacts WHERE id = $1", CONTACT_COLUMNS);
        Ok(sqlx::query_as::<_, Contact>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn create(&self, contact: ContactUpsert) -> StoreResult<Contact> {
        let sql = format!(
            "INSERT INTO contacts (id, name, email, phone) VALUES ($1, $2, $3, $4) RETURNING {}",
            CONTACT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Contact>(&sql)
            .bind(Uuid::new_v4())
            .bind(contact.name)
            .bind(contact.email)
            .bind(contact.phone)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn update(&self, id: &str, contact: ContactUpsert) -> StoreResult<Option<Contact>> {
        let Some(id) = parse_id(id) else { return Ok(None) };
        let sql = format!(
            "UPDATE contacts SET name = $2, email = $3, phone = $4 WHERE id = $1 RETURNING {}",
            CONTACT_COLUMNS
        );
        Ok(sqlx::query_as::<_, Contact>(&sql)
            .bind(id)
            .bind(contact.name)
            .bind(contact.email)
            .bind(contact.phone)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn set_favorite(&self, id: &str, favorite: bool) -> StoreResult<Option<Contact>> {
        let Some(id) = parse_id(id) else { return Ok(None) };
        let sql = format!("UPDATE contacts SET favorite = $2 WHERE id = $1 RETURNING {}", CONTACT_COLUMNS);
        Ok(sqlx::query_as::<_, Contact>(&sql)
            .bind(id)
            .bind(favorite)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete(&self, id: &str) -> StoreResult<Option<Contact>> {
        let Some(id) = parse_id(id) else { return Ok(None) };
        let sql = format!("DELETE FROM contacts WHERE id = $1 RETURNING {}", CONTACT_COLUMNS);
        Ok(sqlx::query_as::<_, Contact>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let sql = format!(
            "INSERT INTO users (id, email, password_hash, avatar_url, verification_token)
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4())
            .bind(user.email)
            .bind(user.password_hash)
            .bind(user.avatar_url)
            .bind(user.verification_token)
            .fetch_one(&self.pool)
            .await?;
        user_from_row(&row)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        self.fetch_user(&sql, id).await
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);
        let row = sqlx::query(&sql).bind(email).fetch_optional(&self.pool).await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn set_token(&self, id: Uuid, token: Option<String>) -> StoreResult<Option<User>> {
        let sql = format!("UPDATE users SET token = $2 WHERE id = $1 RETURNING {}", USER_COLUMNS);
        let row = sqlx::query(&sql).bind(id).bind(token).fetch_optional(&self.pool).await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn set_subscription(&self, id: Uuid, subscription: Subscription) -> StoreResult<Option<User>> {
        let sql = format!("UPDATE users SET subscription = $2 WHERE id = $1 RETURNING {}", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(subscription.as_str())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn set_avatar_url(&self, id: Uuid, avatar_url: String) -> StoreResult<Option<User>> {
        let sql = format!("UPDATE users SET avatar_url = $2 WHERE id = $1 RETURNING {}", USER_COLUMNS);
        let row = sqlx::query(&sql).bind(id).bind(avatar_url).fetch_optional(&self.pool).await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn verify_email(&self, verification_token: &str) -> StoreResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET verified = TRUE, verification_token = NULL
             WHERE verification_token = $1 RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(verification_token)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn reissue_verification(&self, id: Uuid, verification_token: String) -> StoreResult<Option<User>> {
        let sql = format!(
            "UPDATE users SET verification_token = $2
             WHERE id = $1 AND verified = FALSE RETURNING {}",
            USER_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(verification_token)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }
}
