use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Startup configuration faults. Any of these aborts the process before it binds.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
    pub mail: MailConfig,
    pub notify: NotifyConfig,
    pub avatars: AvatarConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Public origin used when building links sent by email
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub enable_request_logging: bool,
    pub max_request_size_bytes: usize,
}

#[derive(Debug, Clone)]
pub struct SecurityConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub hash_memory_kib: u32,
    pub hash_iterations: u32,
    pub hash_parallelism: u32,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_address: String,
}

#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub queue_capacity: usize,
    pub max_attempts: u32,
    pub backoff_ms: u64,
}

impl NotifyConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

#[derive(Debug, Clone)]
pub struct AvatarConfig {
    pub dir: PathBuf,
    /// URL prefix the avatar directory is served under
    pub public_path: String,
    pub size: u32,
}

impl AppConfig {
    /// Load configuration once at startup: environment preset, tunable overrides,
    /// then the secrets and connection strings that have no sensible default.
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        };

        config.with_env_overrides()?.with_required_env()
    }

    fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        // Server
        if let Ok(v) = env::var("PORT") {
            self.server.port = parse("PORT", &v)?;
        }
        self.server.base_url = match env::var("APP_BASE_URL") {
            Ok(v) => {
                url::Url::parse(&v).map_err(|_| ConfigError::Invalid { name: "APP_BASE_URL", value: v.clone() })?;
                v.trim_end_matches('/').to_string()
            }
            Err(_) => format!("http://localhost:{}", self.server.port),
        };

        // Database overrides
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // API overrides
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.api.enable_request_logging = v.parse().unwrap_or(self.api.enable_request_logging);
        }
        if let Ok(v) = env::var("API_MAX_REQUEST_SIZE_BYTES") {
            self.api.max_request_size_bytes = v.parse().unwrap_or(self.api.max_request_size_bytes);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = parse_expiry_hours(&v)?;
        }
        if let Ok(v) = env::var("SECURITY_HASH_MEMORY_KIB") {
            self.security.hash_memory_kib = v.parse().unwrap_or(self.security.hash_memory_kib);
        }
        if let Ok(v) = env::var("SECURITY_HASH_ITERATIONS") {
            self.security.hash_iterations = v.parse().unwrap_or(self.security.hash_iterations);
        }

        // Mail transport
        if let Ok(v) = env::var("SMTP_HOST") {
            self.mail.smtp_host = v;
        }
        if let Ok(v) = env::var("SMTP_PORT") {
            self.mail.smtp_port = parse("SMTP_PORT", &v)?;
        }

        // Notification queue
        if let Ok(v) = env::var("NOTIFY_QUEUE_CAPACITY") {
            self.notify.queue_capacity = v.parse().unwrap_or(self.notify.queue_capacity);
        }
        if let Ok(v) = env::var("NOTIFY_MAX_ATTEMPTS") {
            self.notify.max_attempts = v.parse().unwrap_or(self.notify.max_attempts);
        }
        if let Ok(v) = env::var("NOTIFY_BACKOFF_MS") {
            self.notify.backoff_ms = v.parse().unwrap_or(self.notify.backoff_ms);
        }

        if let Ok(v) = env::var("AVATAR_DIR") {
            self.avatars.dir = PathBuf::from(v);
        }

        Ok(self)
    }

    /// Apply a `--port` flag. A base URL that was derived from the old port follows it.
    pub fn with_port(mut self, port: Option<u16>) -> Self {
        if let Some(port) = port {
            let derived = format!("http://localhost:{}", self.server.port);
            if self.server.base_url == derived {
                self.server.base_url = format!("http://localhost:{}", port);
            }
            self.server.port = port;
        }
        self
    }

    fn with_required_env(mut self) -> Result<Self, ConfigError> {
        let database_url = first_of(&["DATABASE_URL", "DB_HOST"]).ok_or(ConfigError::Missing("DATABASE_URL"))?;
        url::Url::parse(&database_url)
            .map_err(|_| ConfigError::Invalid { name: "DATABASE_URL", value: "<redacted>".to_string() })?;
        self.database.url = database_url;

        self.security.jwt_secret = first_of(&["SECRET_KEY", "JWT_SECRET"]).ok_or(ConfigError::Missing("SECRET_KEY"))?;

        self.mail.smtp_username =
            first_of(&["SMTP_USERNAME", "GMAIL_EMAIL"]).ok_or(ConfigError::Missing("SMTP_USERNAME"))?;
        self.mail.smtp_password =
            first_of(&["SMTP_PASSWORD", "GMAIL_PASSWORD"]).ok_or(ConfigError::Missing("SMTP_PASSWORD"))?;
        self.mail.from_address = env::var("MAIL_FROM").unwrap_or_else(|_| self.mail.smtp_username.clone());

        Ok(self)
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                base_url: "http://localhost:3000".to_string(),
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 10,
                connection_timeout: 30,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 10 * 1024 * 1024, // 10MB
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 23,
                hash_memory_kib: 19 * 1024,
                hash_iterations: 2,
                hash_parallelism: 1,
            },
            mail: MailConfig::gmail_defaults(),
            notify: NotifyConfig {
                queue_capacity: 64,
                max_attempts: 3,
                backoff_ms: 500,
            },
            avatars: AvatarConfig::defaults(),
        }
    }

    pub fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 20,
                connection_timeout: 10,
            },
            api: ApiConfig {
                enable_request_logging: true,
                max_request_size_bytes: 5 * 1024 * 1024, // 5MB
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 23,
                hash_memory_kib: 19 * 1024,
                hash_iterations: 2,
                hash_parallelism: 1,
            },
            notify: NotifyConfig {
                queue_capacity: 256,
                max_attempts: 5,
                backoff_ms: 1_000,
            },
            ..Self::development()
        }
    }

    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 50,
                connection_timeout: 5,
            },
            api: ApiConfig {
                enable_request_logging: false,
                max_request_size_bytes: 2 * 1024 * 1024, // 2MB
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
                hash_memory_kib: 64 * 1024,
                hash_iterations: 3,
                hash_parallelism: 1,
            },
            notify: NotifyConfig {
                queue_capacity: 1024,
                max_attempts: 5,
                backoff_ms: 2_000,
            },
            ..Self::development()
        }
    }
}

impl MailConfig {
    fn gmail_defaults() -> Self {
        Self {
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 465,
            smtp_username: String::new(),
            smtp_password: String::new(),
            from_address: String::new(),
        }
    }
}

impl AvatarConfig {
    fn defaults() -> Self {
        Self {
            dir: PathBuf::from("public/avatars"),
            public_path: "/avatars".to_string(),
            size: 250,
        }
    }
}

fn first_of(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

fn parse<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}

/// Upper bound on session lifetime: one year
pub const MAX_JWT_EXPIRY_HOURS: u64 = 24 * 365;

fn parse_expiry_hours(value: &str) -> Result<u64, ConfigError> {
    let hours: u64 = parse("SECURITY_JWT_EXPIRY_HOURS", value)?;
    if hours == 0 || hours > MAX_JWT_EXPIRY_HOURS {
        return Err(ConfigError::Invalid {
            name: "SECURITY_JWT_EXPIRY_HOURS",
            value: value.to_string(),
        });
    }
    Ok(hours)
}
