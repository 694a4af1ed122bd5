//! Declarative payload shapes and the pure validator that checks JSON bodies against them.
//!
//! Validation runs before any store call. A shape lists every accepted key; keys that are
//! not declared are rejected, matching the strict object schemas clients were built against.

use std::collections::HashMap;

use serde_json::Value;

use crate::database::models::Subscription;

/// Top-level domains accepted in signup emails
const ALLOWED_TLDS: &[&str] = &["com", "net"];

/// Named payload shapes, one per mutating endpoint family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    ContactUpsert,
    FavoriteUpdate,
    Signup,
    SubscriptionUpdate,
    VerificationRequest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    String,
    Boolean,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Email,
    Length { min: usize, max: usize },
    OneOf(&'static [&'static str]),
}

#[derive(Debug)]
pub struct Field {
    pub name: &'static str,
    pub kind: Kind,
    pub required: bool,
    pub constraints: &'static [Constraint],
}

impl Field {
    const fn required(name: &'static str, kind: Kind, constraints: &'static [Constraint]) -> Self {
        Self { name, kind, required: true, constraints }
    }
}

#[derive(Debug)]
pub struct ShapeDef {
    pub name: &'static str,
    pub fields: &'static [Field],
}

static CONTACT_UPSERT: ShapeDef = ShapeDef {
    name: "ContactUpsert",
    fields: &[
        Field::required("name", Kind::String, &[]),
        Field::required("email", Kind::String, &[]),
        Field::required("phone", Kind::String, &[]),
    ],
};

static FAVORITE_UPDATE: ShapeDef = ShapeDef {
    name: "FavoriteUpdate",
    fields: &[Field::required("favorite", Kind::Boolean, &[])],
};

static SIGNUP: ShapeDef = ShapeDef {
    name: "Signup",
    fields: &[
        Field::required("email", Kind::String, &[Constraint::Email]),
        Field::required("password", Kind::String, &[Constraint::Length { min: 6, max: 16 }]),
    ],
};

// An empty subscription update has nothing to mutate, so the tier is required.
static SUBSCRIPTION_UPDATE: ShapeDef = ShapeDef {
    name: "SubscriptionUpdate",
    fields: &[Field::required("subscription", Kind::String, &[Constraint::OneOf(&Subscription::ALL)])],
};

static VERIFICATION_REQUEST: ShapeDef = ShapeDef {
    name: "VerificationRequest",
    fields: &[Field::required("email", Kind::String, &[Constraint::Email])],
};

impl Shape {
    pub fn definition(&self) -> &'static ShapeDef {
        match self {
            Shape::ContactUpsert => &CONTACT_UPSERT,
            Shape::FavoriteUpdate => &FAVORITE_UPDATE,
            Shape::Signup => &SIGNUP,
            Shape::SubscriptionUpdate => &SUBSCRIPTION_UPDATE,
            Shape::VerificationRequest => &VERIFICATION_REQUEST,
        }
    }

    pub fn name(&self) -> &'static str {
        self.definition().name
    }
}

/// One field-level reason a payload was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(Vec<FieldError>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Headline message for the response body: the first reason found
    pub fn summary(&self) -> Option<&str> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Invalid(errors) => errors.first().map(|e| e.message.as_str()),
        }
    }

    pub fn field_errors(&self) -> HashMap<String, String> {
        match self {
            ValidationResult::Valid => HashMap::new(),
            ValidationResult::Invalid(errors) => {
                let mut map = HashMap::new();
                for error in errors {
                    map.entry(error.field.clone()).or_insert_with(|| error.message.clone());
                }
                map
            }
        }
    }
}

/// Validate `payload` against `shape`. Pure: no I/O, same input gives the same result.
pub fn validate(shape: Shape, payload: &Value) -> ValidationResult {
    let def = shape.definition();

    let Some(object) = payload.as_object() else {
        return ValidationResult::Invalid(vec![FieldError::new("body", "Request body must be a JSON object")]);
    };

    let mut errors = Vec::new();

    for field in def.fields {
        match object.get(field.name) {
            None | Some(Value::Null) => {
                if field.required {
                    errors.push(FieldError::new(field.name, format!("missing required {} field", field.name)));
                }
            }
            Some(value) => check_field(field, value, &mut errors),
        }
    }

    for key in object.keys() {
        if !def.fields.iter().any(|f| f.name == key) {
            errors.push(FieldError::new(key.as_str(), format!("\"{}\" is not allowed", key)));
        }
    }

    if errors.is_empty() {
        ValidationResult::Valid
    } else {
        ValidationResult::Invalid(errors)
    }
}

fn check_field(field: &Field, value: &Value, errors: &mut Vec<FieldError>) {
    match field.kind {
        Kind::Boolean => {
            if !value.is_boolean() {
                errors.push(FieldError::new(field.name, format!("{} must be a boolean", field.name)));
            }
        }
        Kind::String => {
            let Some(text) = value.as_str() else {
                errors.push(FieldError::new(field.name, format!("{} must be a string", field.name)));
                return;
            };
            if text.is_empty() {
                errors.push(FieldError::new(field.name, format!("{} is not allowed to be empty", field.name)));
                return;
            }
            for constraint in field.constraints {
                if let Some(message) = check_constraint(field, constraint, text) {
                    errors.push(FieldError::new(field.name, message));
                    break;
                }
            }
        }
    }
}

fn check_constraint(field: &Field, constraint: &Constraint, text: &str) -> Option<String> {
    match constraint {
        Constraint::Email => (!is_valid_email(text)).then(|| "Invalid email format".to_string()),
        Constraint::Length { min, max } => {
            let len = text.chars().count();
            let label = capitalize(field.name);
            if len < *min {
                Some(format!("{} must be at least {} characters long", label, min))
            } else if len > *max {
                Some(format!("{} cannot be longer than {} characters", label, max))
            } else {
                None
            }
        }
        Constraint::OneOf(allowed) => (!allowed.contains(&text))
            .then(|| format!("{} must be one of [{}]", field.name, allowed.join(", "))),
    }
}

/// `local@domain.tld` with at least two domain segments and an allowed TLD
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || local.len() > 64 || domain.contains('@') {
        return false;
    }
    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }
    let local_ok = local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~.-".contains(c));
    if !local_ok {
        return false;
    }

    let segments: Vec<&str> = domain.split('.').collect();
    if segments.len() < 2 {
        return false;
    }
    let segments_ok = segments.iter().all(|s| {
        !s.is_empty()
            && !s.starts_with('-')
            && !s.ends_with('-')
            && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });

    let tld = segments.last().map(|s| s.to_ascii_lowercase()).unwrap_or_default();
    segments_ok && ALLOWED_TLDS.contains(&tld.as_str())
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
