pub mod contact;
pub mod user;

pub use contact::{Contact, ContactUpsert, FavoriteUpdate};
pub use user::{Credentials, NewUser, SignupUser, Subscription, SubscriptionUpdate, User, UserSummary, VerificationRequest};
