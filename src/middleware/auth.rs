use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::{
    AppState,
    error::{AppError, AuthError},
    session::session_from_parts,
};

/// Rejects requests without a valid bearer token and makes the decoded
/// `Session` available to handlers as an extension.
pub async fn require_session(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let Some(session) = session_from_parts(&mut parts, &state.config).await else {
        tracing::debug!("No session for {} {}", parts.method, parts.uri.path());
        return Err(AuthError::MissingSession.into());
    };

    parts.extensions.insert(session);
    Ok(next.run(Request::from_parts(parts, body)).await)
}
