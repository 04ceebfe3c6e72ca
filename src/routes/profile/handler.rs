use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use crate::{
    AppState,
    analytics::Event,
    command::CommandResult,
    database::{SocialLinkRepository, UserRepository},
    error::{AppError, ValidationError},
    favicon::{enrich_projects, enrich_social_links},
    models::{Profile, ProfileUpdate},
    page_icon::page_icon,
    projects::ProjectCollection,
    session::{Ownership, OptionalSession, Session, resolve_ownership},
    utils::{success_to_api_response, validate_username},
};

use super::model::{AvailabilityResponse, DraftResponse, ProfileView};

/// Public profile page data, with edit rights worked out for the viewer.
pub async fn view_profile(
    State(state): State<AppState>,
    OptionalSession(session): OptionalSession,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let username = username.to_lowercase();
    let user = state
        .store
        .find_user_by_username(&username)
        .await?
        .ok_or(AppError::NotFound)?;

    let store = state.store.as_ref();
    let (ownership, collection, social_links) = tokio::join!(
        resolve_ownership(session.as_ref(), &username, store),
        ProjectCollection::load(store, &user.id),
        store.list_social_links(&user.id),
    );

    let ownership = ownership.unwrap_or_else(|e| {
        tracing::error!("Ownership check failed for {}: {}", username, e);
        Ownership::anonymous()
    });
    let projects_error = collection.load_error().map(str::to_string);
    let mut projects = collection.into_items();
    let mut social_links = social_links.unwrap_or_else(|e| {
        tracing::error!("Failed to load social links for {}: {}", username, e);
        Vec::new()
    });

    tokio::join!(
        enrich_projects(&state.resolver, &mut projects),
        enrich_social_links(&state.resolver, &mut social_links),
    );

    let my_superfolio = match (&ownership.viewer_username, ownership.is_own_profile) {
        (Some(viewer), false) => Some(format!("/{}", viewer)),
        _ => None,
    };

    state.analytics.capture(
        Event::ProfileViewed,
        session.as_ref().map_or("anonymous", |s| s.user_id.as_str()),
        json!({ "username": username, "is_own_profile": ownership.is_own_profile }),
    );

    Ok((
        StatusCode::OK,
        success_to_api_response(ProfileView {
            page_icon: page_icon(user.avatar_url.as_deref()),
            profile: Profile::from(user),
            projects,
            social_links,
            ownership,
            my_superfolio,
            projects_error,
        }),
    ))
}

pub async fn username_availability(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let username = username.trim().to_lowercase();
    let valid = validate_username(&username);
    let available = valid && state.store.find_user_by_username(&username).await?.is_none();

    Ok((
        StatusCode::OK,
        success_to_api_response(AvailabilityResponse {
            username,
            valid,
            available,
        }),
    ))
}

/// Immediate save of the owner's profile fields.
pub async fn update_profile(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    Json(update): Json<ProfileUpdate>,
) -> CommandResult<Profile> {
    if update.is_empty() {
        return CommandResult::Rejected(ValidationError::Required("name, bio or avatar"));
    }

    match state.store.update_profile(&session.user_id, &update).await {
        Ok(user) => {
            state.analytics.capture(
                Event::ProfileEdited,
                &session.user_id,
                json!({ "fields": update.fields() }),
            );
            CommandResult::Applied(Profile::from(user))
        }
        Err(e) => {
            tracing::error!("Failed to update profile of {}: {}", session.user_id, e);
            CommandResult::failed(e)
        }
    }
}

/// Queues a debounced save and returns straight away.
pub async fn save_draft(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    Json(update): Json<ProfileUpdate>,
) -> CommandResult<DraftResponse> {
    let fields = update.fields();
    match state.autosave.schedule(&session.user_id, update) {
        Some(saver) => CommandResult::Applied(DraftResponse {
            saving: saver.is_saving(),
            fields,
        }),
        None => CommandResult::failed("auto-save is not running"),
    }
}
