use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::app::AppState;
use crate::avatar::Upload;
use crate::database::models::{SubscriptionUpdate, UserSummary};
use crate::error::ApiError;
use crate::middleware::{ApiResult, BearerToken};
use crate::pipeline::{signed_in, Admitted, Request, CURRENT_USER, LOGOUT, UPDATE_AVATAR, UPDATE_SUBSCRIPTION};

/// Multipart field carrying the avatar image
const AVATAR_FIELD: &str = "avatar";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvatarResponse {
    pub avatar_url: String,
}

/// GET /api/users/logout - clears the stored token; 204
pub async fn logout(State(state): State<AppState>, bearer: BearerToken) -> ApiResult<()> {
    LOGOUT
        .run(state, Request::new().with_bearer(bearer), |Admitted { state, session, .. }: Admitted<()>| async move {
            let user = signed_in(session)?;
            state.users.set_token(user.id, None).await?;
            tracing::info!(user_id = %user.id, "User logged out");
            Ok(Some(()))
        })
        .await
}

/// GET /api/users/current
pub async fn current_user(State(state): State<AppState>, bearer: BearerToken) -> ApiResult<UserSummary> {
    CURRENT_USER
        .run(state, Request::new().with_bearer(bearer), |Admitted { session, .. }: Admitted<()>| async move {
            let user = signed_in(session)?;
            Ok(Some(UserSummary::from(&user)))
        })
        .await
}

/// PATCH /api/users - body: `{subscription: "starter" | "pro" | "business"}`
pub async fn update_subscription(
    State(state): State<AppState>,
    bearer: BearerToken,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<UserSummary> {
    let request = Request::json(body).with_bearer(bearer);
    UPDATE_SUBSCRIPTION
        .run(state, request, |Admitted { state, payload, session }: Admitted<SubscriptionUpdate>| async move {
            let user = signed_in(session)?;
            let updated = state.users.set_subscription(user.id, payload.subscription).await?;
            Ok(updated.as_ref().map(UserSummary::from))
        })
        .await
}

/// PATCH /api/users/avatar - multipart upload, field `avatar`
///
/// The image is decoded and stored only after the session is authorized.
pub async fn update_avatar(
    State(state): State<AppState>,
    bearer: BearerToken,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<AvatarResponse> {
    let upload = match read_upload(multipart).await {
        Ok(upload) => upload,
        Err(e) => {
            tracing::debug!(operation = UPDATE_AVATAR.name, "Upload rejected: {}", e);
            return Err(e);
        }
    };

    UPDATE_AVATAR
        .run(state, Request::new().with_bearer(bearer), |Admitted { state, session, .. }: Admitted<()>| async move {
            let user = signed_in(session)?;
            let avatar_url = state.avatars.process(user.id, upload).await?;
            let updated = state.users.set_avatar_url(user.id, avatar_url).await?;
            Ok(updated.map(|user| AvatarResponse { avatar_url: user.avatar_url }))
        })
        .await
}

async fn read_upload(multipart: Result<Multipart, MultipartRejection>) -> Result<Upload, ApiError> {
    let mut multipart = multipart.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(e.body_text()))?
    {
        if field.name() != Some(AVATAR_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or("avatar").to_string();
        let bytes = field.bytes().await.map_err(|e| ApiError::bad_request(e.body_text()))?;
        if bytes.is_empty() {
            return Err(ApiError::bad_request("Uploaded avatar file is empty"));
        }

        return Ok(Upload { file_name, bytes: bytes.to_vec() });
    }

    Err(ApiError::bad_request("missing required avatar file"))
}
