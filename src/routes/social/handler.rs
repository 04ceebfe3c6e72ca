use axum::{
    Json,
    extract::{Extension, State},
};
use serde_json::json;

use crate::{
    AppState,
    analytics::Event,
    command::CommandResult,
    database::SocialLinkRepository,
    models::SocialLink,
    session::Session,
    social::SocialLinkSet,
};

use super::model::SaveSocialLinksRequest;

/// Replaces the owner's social links with the filled slots of the form.
/// An unchanged form is answered with the stored links and writes nothing.
pub async fn save_social_links(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    Json(req): Json<SaveSocialLinksRequest>,
) -> CommandResult<Vec<SocialLink>> {
    let set = match SocialLinkSet::from_slots(req.slots) {
        Ok(set) => set,
        Err(e) => return CommandResult::Rejected(e),
    };

    let saved = match state.store.list_social_links(&session.user_id).await {
        Ok(saved) => saved,
        Err(e) => {
            tracing::error!("Failed to load social links for {}: {}", session.user_id, e);
            return CommandResult::failed(e);
        }
    };
    if !set.has_changes(&saved) {
        return CommandResult::Applied(saved);
    }

    let result = set.save(state.store.as_ref(), &session.user_id).await;
    if let CommandResult::Applied(links) = &result {
        if links.len() > saved.len() {
            state.analytics.capture(
                Event::SocialLinkAdded,
                &session.user_id,
                json!({ "count": links.len() }),
            );
        }
    }
    result
}
