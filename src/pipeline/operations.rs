use axum::http::StatusCode;

use super::{Access, Operation};
use crate::validation::Shape;

const fn op(name: &'static str, shape: Option<Shape>, access: Access, success: StatusCode) -> Operation {
    Operation {
        name,
        shape,
        access,
        success,
        not_found: "Not found",
    }
}

// Contacts
pub const LIST_CONTACTS: Operation = op("contacts.list", None, Access::Public, StatusCode::OK);
pub const GET_CONTACT: Operation = op("contacts.get", None, Access::Public, StatusCode::OK);
pub const CREATE_CONTACT: Operation = op("contacts.create", Some(Shape::ContactUpsert), Access::Public, StatusCode::CREATED);
pub const UPDATE_CONTACT: Operation = op("contacts.update", Some(Shape::ContactUpsert), Access::Public, StatusCode::OK);
pub const DELETE_CONTACT: Operation = op("contacts.delete", None, Access::Public, StatusCode::OK);
pub const SET_FAVORITE: Operation = op("contacts.favorite", Some(Shape::FavoriteUpdate), Access::Session, StatusCode::OK);

// Users
pub const SIGNUP: Operation = op("users.signup", Some(Shape::Signup), Access::Public, StatusCode::CREATED);
pub const LOGIN: Operation = op("users.login", Some(Shape::Signup), Access::Public, StatusCode::OK);
pub const LOGOUT: Operation = op("users.logout", None, Access::Session, StatusCode::NO_CONTENT);
pub const CURRENT_USER: Operation = op("users.current", None, Access::Session, StatusCode::OK);
pub const UPDATE_SUBSCRIPTION: Operation =
    op("users.subscription", Some(Shape::SubscriptionUpdate), Access::Session, StatusCode::OK);
pub const UPDATE_AVATAR: Operation = op("users.avatar", None, Access::Session, StatusCode::OK);

pub const VERIFY_EMAIL: Operation = Operation {
    not_found: "User not found",
    ..op("users.verify", None, Access::Public, StatusCode::OK)
};
pub const RESEND_VERIFICATION: Operation = Operation {
    not_found: "User not found",
    ..op("users.verify.resend", Some(Shape::VerificationRequest), Access::Public, StatusCode::OK)
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_operations_match_the_protected_routes() {
        let protected: Vec<&str> = [
            &LIST_CONTACTS, &GET_CONTACT, &CREATE_CONTACT, &UPDATE_CONTACT, &DELETE_CONTACT, &SET_FAVORITE,
            &SIGNUP, &LOGIN, &LOGOUT, &CURRENT_USER, &UPDATE_SUBSCRIPTION, &UPDATE_AVATAR, &VERIFY_EMAIL,
            &RESEND_VERIFICATION,
        ]
        .into_iter()
        .filter(|op| op.access == Access::Session)
        .map(|op| op.name)
        .collect();

        assert_eq!(
            protected,
            ["contacts.favorite", "users.logout", "users.current", "users.subscription", "users.avatar"]
        );
    }

    #[test]
    fn creates_answer_201() {
        assert_eq!(CREATE_CONTACT.success, StatusCode::CREATED);
        assert_eq!(SIGNUP.success, StatusCode::CREATED);
        assert_eq!(LOGOUT.success, StatusCode::NO_CONTENT);
    }
}
