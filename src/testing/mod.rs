//! In-process test harness: the real router over in-memory collaborators.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use tokio::sync::{Mutex, Notify};
use uuid::Uuid;

use crate::app::{app, AppState};
use crate::auth::CredentialManager;
use crate::avatar::{avatar_file_name, AvatarError, AvatarProcessor, Upload};
use crate::config::AppConfig;
use crate::database::models::{Contact, ContactUpsert, NewUser, Subscription, User};
use crate::database::{ContactStore, MemoryStore, StoreError, StoreResult, UserStore};
use crate::notify::{Email, MailError, Mailer, Notifier, RetryPolicy};

/// Router plus handles on every collaborator it was built with
pub struct TestContext {
    pub app: Router,
    pub state: AppState,
    pub store: MemoryStore,
    pub mailer: Arc<RecordingMailer>,
    pub avatars: Arc<MemoryAvatarProcessor>,
}

impl TestContext {
    /// Must be called inside a tokio runtime: it starts the notification worker
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let store = MemoryStore::new();
        Self::build(config, store.clone(), Arc::new(store.clone()), Arc::new(store))
    }

    /// Every store call fails as if the database were down; `store` stays empty
    pub fn with_unavailable_store() -> Self {
        let unavailable = Arc::new(UnavailableStore::default());
        Self::build(test_config(), MemoryStore::new(), unavailable.clone(), unavailable)
    }

    fn build(
        config: AppConfig,
        store: MemoryStore,
        contacts: Arc<dyn ContactStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        let mailer = Arc::new(RecordingMailer::default());
        let avatars = Arc::new(MemoryAvatarProcessor::new(&config.avatars.public_path));
        let credentials = CredentialManager::new(&config.security).expect("test security config is valid");
        let (notifier, _worker) = Notifier::spawn(
            mailer.clone(),
            config.notify.queue_capacity,
            RetryPolicy::from(&config.notify),
        );

        let state = AppState {
            contacts,
            users,
            credentials: Arc::new(credentials),
            notifier,
            avatars: avatars.clone(),
            config: Arc::new(config),
        };

        Self {
            app: app(state.clone()),
            state,
            store,
            mailer,
            avatars,
        }
    }
}

/// Development preset with a fixed secret, cheap hashing and no retry delay
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.security.jwt_secret = "test-secret".to_string();
    config.security.hash_memory_kib = 1024;
    config.security.hash_iterations = 1;
    config.mail.smtp_username = "noreply@contacts.test".to_string();
    config.mail.from_address = "noreply@contacts.test".to_string();
    config.notify.max_attempts = 2;
    config.notify.backoff_ms = 0;
    config
}

/// Mailer that keeps every delivered email and can be switched into an outage
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<Email>>,
    failing: AtomicBool,
    delivered: Notify,
}

impl RecordingMailer {
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn sent(&self) -> Vec<Email> {
        self.sent.lock().await.clone()
    }

    /// Wait until at least `count` emails were delivered, or `timeout` passes
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<Email> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let notified = self.delivered.notified();
            {
                let sent = self.sent.lock().await;
                if sent.len() >= count {
                    return sent.clone();
                }
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.sent().await;
            }
        }
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(MailError::Unavailable("simulated outage".to_string()));
        }
        self.sent.lock().await.push(email.clone());
        self.delivered.notify_waiters();
        Ok(())
    }
}

/// Avatar processor that checks the upload decodes but keeps nothing on disk
pub struct MemoryAvatarProcessor {
    public_path: String,
    processed: Mutex<Vec<(Uuid, String)>>,
}

impl MemoryAvatarProcessor {
    pub fn new(public_path: &str) -> Self {
        Self {
            public_path: public_path.trim_end_matches('/').to_string(),
            processed: Mutex::new(Vec::new()),
        }
    }

    pub async fn processed(&self) -> Vec<(Uuid, String)> {
        self.processed.lock().await.clone()
    }
}

#[async_trait]
impl AvatarProcessor for MemoryAvatarProcessor {
    async fn process(&self, owner: Uuid, upload: Upload) -> Result<String, AvatarError> {
        image::load_from_memory(&upload.bytes)?;
        let file_name = avatar_file_name(owner, &upload.file_name);
        self.processed.lock().await.push((owner, file_name.clone()));
        Ok(format!("{}/{}", self.public_path, file_name))
    }
}

/// Store whose every call reports the database as unreachable, with a cause
/// that must never reach a client
#[derive(Default)]
pub struct UnavailableStore;

pub const UNAVAILABLE_CAUSE: &str = "connection refused: db.internal:5432";

fn unavailable<T>() -> StoreResult<T> {
    Err(StoreError::Unavailable(UNAVAILABLE_CAUSE.to_string()))
}

#[async_trait]
impl ContactStore for UnavailableStore {
    async fn list(&self) -> StoreResult<Vec<Contact>> {
        unavailable()
    }

    async fn find(&self, _id: &str) -> StoreResult<Option<Contact>> {
        unavailable()
    }

    async fn create(&self, _contact: ContactUpsert) -> StoreResult<Contact> {
        unavailable()
    }

    async fn update(&self, _id: &str, _contact: ContactUpsert) -> StoreResult<Option<Contact>> {
        unavailable()
    }

    async fn set_favorite(&self, _id: &str, _favorite: bool) -> StoreResult<Option<Contact>> {
        unavailable()
    }

    async fn delete(&self, _id: &str) -> StoreResult<Option<Contact>> {
        unavailable()
    }
}

#[async_trait]
impl UserStore for UnavailableStore {
    async fn create(&self, _user: NewUser) -> StoreResult<User> {
        unavailable()
    }

    async fn find_by_id(&self, _id: Uuid) -> StoreResult<Option<User>> {
        unavailable()
    }

    async fn find_by_email(&self, _email: &str) -> StoreResult<Option<User>> {
        unavailable()
    }

    async fn set_token(&self, _id: Uuid, _token: Option<String>) -> StoreResult<Option<User>> {
        unavailable()
    }

    async fn set_subscription(&self, _id: Uuid, _subscription: Subscription) -> StoreResult<Option<User>> {
        unavailable()
    }

    async fn set_avatar_url(&self, _id: Uuid, _avatar_url: String) -> StoreResult<Option<User>> {
        unavailable()
    }

    async fn verify_email(&self, _verification_token: &str) -> StoreResult<Option<User>> {
        unavailable()
    }

    async fn reissue_verification(&self, _id: Uuid, _verification_token: String) -> StoreResult<Option<User>> {
        unavailable()
    }
}
