use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{AppState, session::session_from_parts};

const PROTECTED_PREFIXES: [&str; 2] = ["/dashboard", "/settings"];
const UNGATED_PREFIXES: [&str; 2] = ["/api", "/favicon.ico"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Pass,
    Redirect(&'static str),
}

/// Page-level access rule.
///
/// Profile pages (a single path segment) are public. Anything under a
/// protected prefix needs a session. The API answers for itself.
pub fn gate(path: &str, has_session: bool) -> GateDecision {
    if UNGATED_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return GateDecision::Pass;
    }
    if path.split('/').filter(|s| !s.is_empty()).count() == 1 {
        return GateDecision::Pass;
    }
    if !has_session && PROTECTED_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return GateDecision::Redirect("/login");
    }
    GateDecision::Pass
}

pub async fn gate_pages(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let (mut parts, body) = req.into_parts();
    let path = parts.uri.path().to_string();

    // Only look at the token when the decision depends on it.
    let has_session = match gate(&path, false) {
        GateDecision::Pass => true,
        GateDecision::Redirect(_) => session_from_parts(&mut parts, &state.config).await.is_some(),
    };

    match gate(&path, has_session) {
        GateDecision::Pass => next.run(Request::from_parts(parts, body)).await,
        GateDecision::Redirect(to) => {
            tracing::debug!("Redirecting anonymous request for {} to {}", path, to);
            Redirect::to(to).into_response()
        }
    }
}
