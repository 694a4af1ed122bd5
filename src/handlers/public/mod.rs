// handlers/public/mod.rs - Public handlers (no session required)
//
// Contact CRUD, account creation, login and email verification.

pub mod contacts;
pub mod users;

pub use contacts::{create_contact, delete_contact, get_contact, list_contacts, update_contact};
pub use users::{login, resend_verification, signup, verify_email};
