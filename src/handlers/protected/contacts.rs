use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde_json::Value;

use crate::app::AppState;
use crate::database::models::{Contact, FavoriteUpdate};
use crate::middleware::{ApiResult, BearerToken};
use crate::pipeline::{Admitted, Request, SET_FAVORITE};

/// PATCH /api/contacts/:id/favorite - body: `{favorite: bool}`
pub async fn set_favorite(
    State(state): State<AppState>,
    Path(id): Path<String>,
    bearer: BearerToken,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Contact> {
    let request = Request::json(body).with_bearer(bearer);
    SET_FAVORITE
        .run(state, request, |Admitted { state, payload, .. }: Admitted<FavoriteUpdate>| async move {
            Ok(state.contacts.set_favorite(&id, payload.favorite).await?)
        })
        .await
}
