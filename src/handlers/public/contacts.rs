// handlers/public/contacts.rs - /api/contacts CRUD

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::Value;

use crate::app::AppState;
use crate::database::models::{Contact, ContactUpsert};
use crate::middleware::ApiResult;
use crate::pipeline::{Admitted, Request, CREATE_CONTACT, DELETE_CONTACT, GET_CONTACT, LIST_CONTACTS, UPDATE_CONTACT};

/// GET /api/contacts - every contact in creation order
pub async fn list_contacts(State(state): State<AppState>) -> ApiResult<Vec<Contact>> {
    LIST_CONTACTS
        .run(state, Request::new(), |Admitted { state, .. }: Admitted<()>| async move {
            Ok(Some(state.contacts.list().await?))
        })
        .await
}

/// GET /api/contacts/:id
pub async fn get_contact(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Contact> {
    GET_CONTACT
        .run(state, Request::new(), |Admitted { state, .. }: Admitted<()>| async move {
            Ok(state.contacts.find(&id).await?)
        })
        .await
}

/// POST /api/contacts - body: `{name, email, phone}`
pub async fn create_contact(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Contact> {
    CREATE_CONTACT
        .run(state, Request::json(body), |Admitted { state, payload, .. }: Admitted<ContactUpsert>| async move {
            let contact = state.contacts.create(payload).await?;
            tracing::info!(id = %contact.id, "Contact created");
            Ok(Some(contact))
        })
        .await
}

/// PUT /api/contacts/:id - full replacement of name, email and phone
pub async fn update_contact(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Contact> {
    UPDATE_CONTACT
        .run(state, Request::json(body), |Admitted { state, payload, .. }: Admitted<ContactUpsert>| async move {
            Ok(state.contacts.update(&id, payload).await?)
        })
        .await
}

/// DELETE /api/contacts/:id - responds with the deleted contact
pub async fn delete_contact(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Contact> {
    DELETE_CONTACT
        .run(state, Request::new(), |Admitted { state, .. }: Admitted<()>| async move {
            let deleted = state.contacts.delete(&id).await?;
            if let Some(contact) = &deleted {
                tracing::info!(id = %contact.id, "Contact deleted");
            }
            Ok(deleted)
        })
        .await
}
