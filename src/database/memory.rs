use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::models::{Contact, ContactUpsert, NewUser, Subscription, User};
use super::store::{ContactStore, StoreError, StoreResult, UserStore};

/// In-process store with the same single-call semantics as [`super::PgStore`].
/// Records are kept in insertion order so listings are stable.
#[derive(Clone, Default)]
pub struct MemoryStore {
    contacts: Arc<RwLock<Vec<Contact>>>,
    users: Arc<RwLock<Vec<User>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored contacts, for asserting that rejected requests wrote nothing
    pub async fn contact_count(&self) -> usize {
        self.contacts.read().await.len()
    }

    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    async fn update_user<F>(&self, id: Uuid, apply: F) -> StoreResult<Option<User>>
    where
        F: FnOnce(&mut User) -> bool + Send,
    {
        let mut users = self.users.write().await;
        Ok(users
            .iter_mut()
            .find(|u| u.id == id)
            .and_then(|user| apply(user).then(|| user.clone())))
    }

    async fn update_contact<F>(&self, id: &str, apply: F) -> StoreResult<Option<Contact>>
    where
        F: FnOnce(&mut Contact) + Send,
    {
        let Ok(id) = Uuid::parse_str(id) else { return Ok(None) };
        let mut contacts = self.contacts.write().await;
        Ok(contacts.iter_mut().find(|c| c.id == id).map(|contact| {
            apply(contact);
            contact.clone()
        }))
    }
}

#[async_trait]
impl ContactStore for MemoryStore {
    async fn list(&self) -> StoreResult<Vec<Contact>> {
        Ok(self.contacts.read().await.clone())
    }

    async fn find(&self, id: &str) -> StoreResult<Option<Contact>> {
        let Ok(id) = Uuid::parse_str(id) else { return Ok(None) };
        Ok(self.contacts.read().await.iter().find(|c| c.id == id).cloned())
    }

    async fn create(&self, contact: ContactUpsert) -> StoreResult<Contact> {
        let contact = Contact {
            id: Uuid::new_v4(),
            name: contact.name,
            email: contact.email,
            phone: contact.phone,
            favorite: false,
        };
        self.contacts.write().await.push(contact.clone());
        Ok(contact)
    }

    async fn update(&self, id: &str, upsert: ContactUpsert) -> StoreResult<Option<Contact>> {
        self.update_contact(id, move |contact| {
            contact.name = upsert.name;
            contact.email = upsert.email;
            contact.phone = upsert.phone;
        })
        .await
    }

    async fn set_favorite(&self, id: &str, favorite: bool) -> StoreResult<Option<Contact>> {
        self.update_contact(id, move |contact| contact.favorite = favorite).await
    }

    async fn delete(&self, id: &str) -> StoreResult<Option<Contact>> {
        let Ok(id) = Uuid::parse_str(id) else { return Ok(None) };
        let mut contacts = self.contacts.write().await;
        Ok(contacts
            .iter()
            .position(|c| c.id == id)
            .map(|index| contacts.remove(index)))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate("email"));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            subscription: Subscription::default(),
            token: None,
            avatar_url: user.avatar_url,
            verified: false,
            verification_token: Some(user.verification_token),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.iter().find(|u| u.email == email).cloned())
    }

    async fn set_token(&self, id: Uuid, token: Option<String>) -> StoreResult<Option<User>> {
        self.update_user(id, move |user| {
            user.token = token;
            true
        })
        .await
    }

    async fn set_subscription(&self, id: Uuid, subscription: Subscription) -> StoreResult<Option<User>> {
        self.update_user(id, move |user| {
            user.subscription = subscription;
            true
        })
        .await
    }

    async fn set_avatar_url(&self, id: Uuid, avatar_url: String) -> StoreResult<Option<User>> {
        self.update_user(id, move |user| {
            user.avatar_url = avatar_url;
            true
        })
        .await
    }

    async fn verify_email(&self, verification_token: &str) -> StoreResult<Option<User>> {
        let mut users = self.users.write().await;
        Ok(users
            .iter_mut()
            .find(|u| u.verification_token.as_deref() == Some(verification_token))
            .map(|user| {
                user.verified = true;
                user.verification_token = None;
                user.clone()
            }))
    }

    async fn reissue_verification(&self, id: Uuid, verification_token: String) -> StoreResult<Option<User>> {
        self.update_user(id, move |user| {
            if user.verified {
                return false;
            }
            user.verification_token = Some(verification_token);
            true
        })
        .await
    }
}
