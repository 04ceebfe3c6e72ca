use axum::{
    Json,
    extract::{Extension, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    analytics::Event,
    database::{UserRepository, VerificationTokenRepository},
    email,
    error::{AppError, AuthError, StoreError, ValidationError},
    models::{NewUser, VerificationToken},
    session::{OptionalSession, Session},
    utils::{
        hash_password, success_to_api_response, token_digest, validate_username, verify_password,
    },
};

use super::model::{
    CreateUserRequest, LoginRequest, LoginResponse, ProvidersResponse, RefreshTokenResponse,
    SendVerificationRequest, SignupRequest, SignupResponse, VerifyEmailQuery,
};

const VERIFICATION_TTL_HOURS: i64 = 24;

fn internal(context: &str, e: impl std::fmt::Display) -> AppError {
    AppError::Internal(format!("{context}: {e}"))
}

#[axum::debug_handler]
pub async fn signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let username = req.username.trim().to_lowercase();
    if !validate_username(&username) {
        return Err(ValidationError::InvalidUsername.into());
    }
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ValidationError::Required("email").into());
    }
    if req.password.is_empty() {
        return Err(ValidationError::Required("password").into());
    }

    if state.store.find_user_by_email(&email).await?.is_some()
        || state.store.find_user_by_username(&username).await?.is_some()
    {
        return Err(AuthError::UserExists.into());
    }

    let hashed = hash_password(&req.password).map_err(|e| internal("Failed to hash password", e))?;
    let mut new_user = NewUser::new(Uuid::new_v4().to_string(), &email, &username);
    new_user.hashed_password = Some(hashed);

    let user = match state.store.create_user(new_user).await {
        Ok(user) => user,
        Err(StoreError::Conflict(_)) => return Err(AuthError::UserExists.into()),
        Err(e) => return Err(e.into()),
    };
    tracing::info!("Created user {} ({})", user.username, user.id);

    send_verification_mail(&state, &user.email, &user.username).await;

    let (_, token) = Session::issue(&user.id, Some(&user.username), Some(&user.email), false, &state.config)
        .map_err(|e| internal("Failed to issue token", e))?;

    state.analytics.capture(
        Event::SignupCompleted,
        &user.id,
        json!({ "method": "credentials", "username": user.username }),
    );

    Ok((
        StatusCode::OK,
        success_to_api_response(SignupResponse {
            token,
            redirect: format!("/{}", user.username),
            username: user.username,
            show_welcome: true,
            email_verified: false,
        }),
    ))
}

/// Stores a fresh token and mails its link. Failures are logged; signup goes on.
async fn send_verification_mail(state: &AppState, email: &str, username: &str) {
    let raw = Uuid::new_v4().to_string();
    let token = VerificationToken {
        identifier: email.to_string(),
        token: token_digest(&raw),
        expires: Utc::now() + Duration::hours(VERIFICATION_TTL_HOURS),
    };
    if let Err(e) = state.store.create_verification_token(&token).await {
        tracing::error!("Failed to store verification token for {}: {}", email, e);
        return;
    }

    let url = format!("{}/api/auth/verify-email?token={}", state.config.site_url, raw);
    if let Err(e) = state.mailer.send_verification(email, username, &url).await {
        tracing::warn!("Verification email to {} not sent: {}", email, e);
    }
}

#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let email = req.email.trim().to_lowercase();
    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    // Accounts created through an OAuth provider have no password.
    let hash = user
        .hashed_password
        .as_deref()
        .ok_or(AuthError::InvalidCredentials)?;
    if !verify_password(&req.password, hash).map_err(|e| internal("Failed to verify password", e))? {
        return Err(AuthError::InvalidCredentials.into());
    }

    let (_, token) = Session::issue(
        &user.id,
        Some(&user.username),
        Some(&user.email),
        user.email_verified.is_some(),
        &state.config,
    )
    .map_err(|e| internal("Failed to issue token", e))?;

    state
        .analytics
        .capture(Event::LoginCompleted, &user.id, json!({ "method": "credentials" }));

    Ok((
        StatusCode::OK,
        success_to_api_response(LoginResponse {
            token,
            redirect: format!("/{}", user.username),
            username: user.username,
        }),
    ))
}

#[axum::debug_handler]
pub async fn refresh_token(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let (refreshed, token) = session
        .refreshed(&state.config)
        .map_err(|e| internal("Failed to refresh token", e))?;

    Ok((
        StatusCode::OK,
        success_to_api_response(RefreshTokenResponse {
            token,
            expires_at: refreshed.expires_at,
        }),
    ))
}

/// Sends a signed-in visitor to their own page.
pub async fn session_redirect(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
) -> Redirect {
    let Some(session) = session else {
        return Redirect::to("/login");
    };
    if let Some(username) = &session.username {
        return Redirect::to(&format!("/{}", username));
    }

    match state.store.find_user_by_id(&session.user_id).await {
        Ok(Some(user)) => Redirect::to(&format!("/{}", user.username)),
        Ok(None) => Redirect::to("/login?error=no_username"),
        Err(e) => {
            tracing::error!("Session redirect lookup failed for {}: {}", session.user_id, e);
            Redirect::to("/login")
        }
    }
}

/// Consumes a one-time verification token.
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> Response {
    let Some(raw) = query.token.filter(|t| !t.is_empty()) else {
        return (StatusCode::BAD_REQUEST, AuthError::MissingToken.to_string()).into_response();
    };
    let digest = token_digest(&raw);

    let token = match state.store.find_verification_token(&digest).await {
        Ok(Some(token)) => token,
        Ok(None) => {
            return (StatusCode::BAD_REQUEST, AuthError::InvalidToken.to_string()).into_response();
        }
        Err(e) => {
            tracing::error!("Verification lookup failed: {}", e);
            return (StatusCode::BAD_REQUEST, AuthError::InvalidToken.to_string()).into_response();
        }
    };

    let now = Utc::now();
    if token.is_expired(now) {
        return (StatusCode::BAD_REQUEST, AuthError::TokenExpired.to_string()).into_response();
    }

    if let Err(e) = state.store.mark_email_verified(&token.identifier, now).await {
        tracing::error!("Error verifying {}: {}", token.identifier, e);
        return (StatusCode::INTERNAL_SERVER_ERROR, "Error verifying email").into_response();
    }

    if let Err(e) = state.store.delete_verification_token(&digest).await {
        tracing::warn!("Used verification token was not deleted: {}", e);
    }
    tracing::info!("Verified email {}", token.identifier);

    Redirect::to("/login?verified=true").into_response()
}

/// Inserts the user row for an OAuth sign-in using the pending username.
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Response {
    let new_user = NewUser::new(req.id, &req.email, &req.username);
    if let Err(e) = new_user.validate() {
        tracing::warn!("Rejected provider sign-in for {:?}: {}", new_user.username, e);
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": e.to_string() }))).into_response();
    }

    match state.store.create_user(new_user).await {
        Ok(user) => {
            tracing::info!("Created user {} from provider sign-in", user.username);
            state
                .analytics
                .capture(Event::SignupCompleted, &user.id, json!({ "method": "oauth" }));
            Json(json!({ "success": true })).into_response()
        }
        Err(e) => {
            tracing::error!("Error creating user: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

pub async fn send_verification(
    State(state): State<AppState>,
    Json(req): Json<SendVerificationRequest>,
) -> Response {
    match state
        .mailer
        .send_verification(&req.to, &req.username, &req.verification_url)
        .await
    {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            tracing::error!("Failed to send verification email: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

pub async fn test_email(State(state): State<AppState>) -> Response {
    tracing::info!(
        "Testing email delivery, api key present: {}",
        state.mailer.is_configured()
    );
    match state.mailer.send(&email::test_email()).await {
        Ok(result) => Json(json!({ "success": true, "result": result })).into_response(),
        Err(e) => {
            tracing::error!("Test email error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

pub async fn providers(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        success_to_api_response(ProvidersResponse {
            credentials: true,
            oauth: state.config.oauth_providers(),
        }),
    )
}
