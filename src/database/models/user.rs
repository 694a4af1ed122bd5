use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Subscription tiers, stored as their lowercase name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subscription {
    #[default]
    Starter,
    Pro,
    Business,
}

impl Subscription {
    pub const ALL: [&'static str; 3] = ["starter", "pro", "business"];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subscription::Starter => "starter",
            Subscription::Pro => "pro",
            Subscription::Business => "business",
        }
    }
}

impl FromStr for Subscription {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "starter" => Ok(Subscription::Starter),
            "pro" => Ok(Subscription::Pro),
            "business" => Ok(Subscription::Business),
            other => Err(format!("unknown subscription tier '{}'", other)),
        }
    }
}

impl fmt::Display for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored user document. The password hash is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub subscription: Subscription,
    #[serde(skip_serializing)]
    pub token: Option<String>,
    pub avatar_url: String,
    pub verified: bool,
    pub verification_token: Option<String>,
}

/// Everything the store needs to insert a freshly signed-up user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub avatar_url: String,
    pub verification_token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubscriptionUpdate {
    pub subscription: Subscription,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerificationRequest {
    pub email: String,
}

/// Public projection returned by current-user and subscription endpoints
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub email: String,
    pub subscription: Subscription,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            subscription: user.subscription,
        }
    }
}

/// Signup projection: includes the verification code so clients can build their own links
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupUser {
    pub email: String,
    pub subscription: Subscription,
    pub avatar_url: String,
    pub verification_token: Option<String>,
}

impl From<&User> for SignupUser {
    fn from(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            subscription: user.subscription,
            avatar_url: user.avatar_url.clone(),
            verification_token: user.verification_token.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@x.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            subscription: Subscription::Pro,
            token: Some("session".to_string()),
            avatar_url: "https://www.gravatar.com/avatar/abc".to_string(),
            verified: false,
            verification_token: Some("code".to_string()),
        }
    }

    #[test]
    fn password_hash_and_session_token_are_never_serialized() {
        let value = serde_json::to_value(sample()).unwrap();
        assert!(value.get("passwordHash").is_none());
        assert!(value.get("password_hash").is_none());
        assert!(value.get("token").is_none());
        assert_eq!(value["subscription"], "pro");
        assert_eq!(value["verificationToken"], "code");
    }

    #[test]
    fn subscription_round_trips_through_its_name() {
        for name in Subscription::ALL {
            assert_eq!(name.parse::<Subscription>().unwrap().as_str(), name);
        }
        assert!("gold".parse::<Subscription>().is_err());
    }
}
