// handlers/public/users.rs - signup, login and email verification

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::app::AppState;
use crate::database::models::{Credentials, NewUser, SignupUser, UserSummary, VerificationRequest};
use crate::error::{ApiError, WRONG_CREDENTIALS};
use crate::handlers::MessageResponse;
use crate::middleware::ApiResult;
use crate::notify::Email;
use crate::pipeline::{Admitted, Request, LOGIN, RESEND_VERIFICATION, SIGNUP, VERIFY_EMAIL};

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub user: SignupUser,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserSummary,
}

/**
 * POST /api/users/signup - create an unverified account
 *
 * Stores the Argon2 hash (never the password), assigns a Gravatar avatar and a
 * one-time verification code, then queues the verification email. Email delivery
 * is best-effort: the account exists whether or not the message goes out.
 *
 * 201 `{ "user": { "email", "subscription", "avatarUrl", "verificationToken" } }`
 * 409 when the email is already registered
 */
pub async fn signup(State(state): State<AppState>, body: Result<Json<Value>, JsonRejection>) -> ApiResult<SignupResponse> {
    SIGNUP
        .run(state, Request::json(body), |Admitted { state, payload, .. }: Admitted<Credentials>| async move {
            let password_hash = state.credentials.hash(&payload.password).await?;
            let code = state.credentials.issue_one_time_code();

            let user = state
                .users
                .create(NewUser {
                    avatar_url: gravatar_url(&payload.email),
                    email: payload.email,
                    password_hash,
                    verification_token: code.clone(),
                })
                .await?;

            tracing::info!(user_id = %user.id, "User signed up");
            state
                .notifier
                .dispatch(Email::verification(&user.email, &code, &state.config.server.base_url));

            Ok(Some(SignupResponse { user: SignupUser::from(&user) }))
        })
        .await
}

/**
 * POST /api/users/login - exchange credentials for a session token
 *
 * The new token replaces any previous one, so only the latest login stays valid.
 * Unknown email and wrong password produce the same 401 body.
 */
pub async fn login(State(state): State<AppState>, body: Result<Json<Value>, JsonRejection>) -> ApiResult<LoginResponse> {
    LOGIN
        .run(state, Request::json(body), |Admitted { state, payload, .. }: Admitted<Credentials>| async move {
            let Some(user) = state.users.find_by_email(&payload.email).await? else {
                state.credentials.verify_absent(&payload.password).await;
                tracing::debug!("Login rejected: unknown email");
                return Err(ApiError::unauthorized(WRONG_CREDENTIALS));
            };

            if !state.credentials.verify(&payload.password, &user.password_hash).await {
                tracing::debug!(user_id = %user.id, "Login rejected: password mismatch");
                return Err(ApiError::unauthorized(WRONG_CREDENTIALS));
            }

            let token = state.credentials.issue_token(user.id)?;
            let user = state
                .users
                .set_token(user.id, Some(token.clone()))
                .await?
                .ok_or_else(|| ApiError::unauthorized(WRONG_CREDENTIALS))?;

            Ok(Some(LoginResponse { token, user: UserSummary::from(&user) }))
        })
        .await
}

/// GET /api/users/verify/:token - consume a verification code
pub async fn verify_email(State(state): State<AppState>, Path(code): Path<String>) -> ApiResult<MessageResponse> {
    VERIFY_EMAIL
        .run(state, Request::new(), |Admitted { state, .. }: Admitted<()>| async move {
            let verified = state.users.verify_email(&code).await?;
            if let Some(user) = &verified {
                tracing::info!(user_id = %user.id, "Email verified");
            }
            Ok(verified.map(|_| MessageResponse::new("Verification successful")))
        })
        .await
}

/// POST /api/users/verify - issue a fresh code to an unverified account and mail it again
pub async fn resend_verification(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> ApiResult<MessageResponse> {
    RESEND_VERIFICATION
        .run(state, Request::json(body), |Admitted { state, payload, .. }: Admitted<VerificationRequest>| async move {
            let Some(user) = state.users.find_by_email(&payload.email).await? else {
                return Ok(None);
            };
            if user.verified {
                return Err(ApiError::bad_request("Verification has already been passed"));
            }

            let code = state.credentials.issue_one_time_code();
            let Some(user) = state.users.reissue_verification(user.id, code.clone()).await? else {
                // Verified between the lookup and the update
                return Err(ApiError::bad_request("Verification has already been passed"));
            };

            state
                .notifier
                .dispatch(Email::verification(&user.email, &code, &state.config.server.base_url));
            Ok(Some(MessageResponse::new("Verification email sent")))
        })
        .await
}

/// Identicon Gravatar for the address, used until the user uploads an avatar
pub fn gravatar_url(email: &str) -> String {
    let digest = Sha256::digest(email.trim().to_lowercase().as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("https://www.gravatar.com/avatar/{}?s=250&d=identicon", hex)
}
