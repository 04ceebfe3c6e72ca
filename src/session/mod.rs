//! Per-request session values and profile ownership.
//!
//! A `Session` is decoded from the bearer token once per request and never
//! mutated; signing in or refreshing issues a new token and thus a new value.

mod ownership;

use std::convert::Infallible;

use axum::{
    RequestPartsExt,
    extract::FromRequestParts,
    http::request::Parts,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use serde::Serialize;

use crate::AppState;
use crate::config::Config;
use crate::utils::{Claims, fresh_claims, generate_token, verify_token};

pub use ownership::{Ownership, is_own_profile, resolve_ownership};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub user_id: String,
    pub username: Option<String>,
    pub email: Option<String>,
    pub email_verified: bool,
    pub expires_at: i64,
}

impl From<Claims> for Session {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            username: claims.username.map(|u| u.to_lowercase()),
            email: claims.email,
            email_verified: claims.email_verified,
            expires_at: claims.exp,
        }
    }
}

impl Session {
    /// Issues a token for a freshly signed-in user and the session it encodes.
    pub fn issue(
        user_id: &str,
        username: Option<&str>,
        email: Option<&str>,
        email_verified: bool,
        config: &Config,
    ) -> Result<(Session, String), jsonwebtoken::errors::Error> {
        let claims = fresh_claims(user_id, username, email, email_verified, config);
        let token = generate_token(&claims, config)?;
        Ok((Session::from(claims), token))
    }

    /// A new session with the same identity and a renewed expiry.
    pub fn refreshed(&self, config: &Config) -> Result<(Session, String), jsonwebtoken::errors::Error> {
        Session::issue(
            &self.user_id,
            self.username.as_deref(),
            self.email.as_deref(),
            self.email_verified,
            config,
        )
    }

    pub fn from_token(token: &str, config: &Config) -> Option<Session> {
        match verify_token(token, config) {
            Ok(claims) => Some(Session::from(claims)),
            Err(e) => {
                tracing::debug!("Rejected session token: {}", e);
                None
            }
        }
    }
}

/// Reads the bearer token of a request, if any, into a `Session`.
pub async fn session_from_parts(parts: &mut Parts, config: &Config) -> Option<Session> {
    if let Some(session) = parts.extensions.get::<Session>() {
        return Some(session.clone());
    }
    let TypedHeader(Authorization(bearer)) = parts
        .extract::<TypedHeader<Authorization<Bearer>>>()
        .await
        .ok()?;
    Session::from_token(bearer.token(), config)
}

/// Extractor for routes that render for anyone but behave differently for a
/// signed-in viewer.
pub struct OptionalSession(pub Option<Session>);

impl FromRequestParts<AppState> for OptionalSession {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(OptionalSession(session_from_parts(parts, &state.config).await))
    }
}
