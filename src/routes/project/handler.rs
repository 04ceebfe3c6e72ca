use axum::{
    Json,
    extract::{Extension, Path, State},
};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::{
    AppState,
    analytics::Event,
    command::CommandResult,
    favicon::LinkMetadataResolver,
    models::{NewProject, Project, ProjectUpdate},
    projects::ProjectCollection,
    session::Session,
};

use super::model::{AddProjectRequest, ReorderRequest};

/// Uses the icon the client sent, else resolves one for `link`.
async fn icon_for(
    resolver: &LinkMetadataResolver,
    link: Option<&str>,
    given: Option<String>,
) -> Option<String> {
    if let Some(icon) = given.filter(|i| !i.trim().is_empty()) {
        return Some(icon);
    }
    let link = link.map(str::trim).filter(|l| !l.is_empty())?;
    Some(resolver.resolve_icon(link).await).filter(|icon| !icon.is_empty())
}

async fn title_for(resolver: &LinkMetadataResolver, link: &str, given: Option<String>) -> String {
    match given.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
        Some(title) => title,
        None => resolver.page_title(link).await,
    }
}

pub async fn add_project(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    Json(req): Json<AddProjectRequest>,
) -> CommandResult<Project> {
    if let Err(e) = req.links.validate() {
        return CommandResult::Rejected(e);
    }

    let resolver = state.resolver.as_ref();
    let (project_favicon, github_favicon, other_favicon, title) = tokio::join!(
        icon_for(resolver, Some(&req.links.project_link), req.project_favicon),
        icon_for(resolver, req.links.github_link.as_deref(), req.github_favicon),
        icon_for(resolver, req.links.other_link.as_deref(), req.other_favicon),
        title_for(resolver, &req.links.project_link, req.title),
    );

    let new = NewProject {
        links: req.links,
        title,
        description: req.description,
        project_favicon: project_favicon.unwrap_or_default(),
        github_favicon,
        other_favicon,
        resolution_pending: false,
    };

    let mut collection = ProjectCollection::load(state.store.as_ref(), &session.user_id).await;
    let result = collection.add(new).await;
    if let CommandResult::Applied(project) = &result {
        state.analytics.capture(
            Event::ProjectAdded,
            &session.user_id,
            json!({ "project_id": project.id, "has_github": project.github_link.is_some() }),
        );
    }
    result
}

pub async fn edit_project(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut update): Json<ProjectUpdate>,
) -> CommandResult<Project> {
    // A changed link without an icon gets a fresh one.
    if update.project_favicon.is_none() {
        if let Some(link) = update.project_link.clone() {
            update.project_favicon = icon_for(&state.resolver, Some(&link), None).await;
        }
    }
    if update.github_favicon.is_none() {
        if let Some(link) = update.github_link.clone() {
            let icon = icon_for(&state.resolver, Some(&link), None).await;
            update.github_favicon = Some(icon.unwrap_or_default());
        }
    }
    if update.other_favicon.is_none() {
        if let Some(link) = update.other_link.clone() {
            let icon = icon_for(&state.resolver, Some(&link), None).await;
            update.other_favicon = Some(icon.unwrap_or_default());
        }
    }

    let mut collection = ProjectCollection::load(state.store.as_ref(), &session.user_id).await;
    let result = collection.edit(id, update).await;
    if result.is_applied() {
        state
            .analytics
            .capture(Event::ProjectEdited, &session.user_id, json!({ "project_id": id }));
    }
    result
}

pub async fn delete_project(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> CommandResult<Value> {
    let mut collection = ProjectCollection::load(state.store.as_ref(), &session.user_id).await;
    let result = collection.delete(id).await;
    if result.is_applied() {
        state
            .analytics
            .capture(Event::ProjectDeleted, &session.user_id, json!({ "project_id": id }));
    }
    result.map(|()| json!({ "id": id }))
}

/// Applies a new order and answers with the renumbered list.
pub async fn reorder_projects(
    Extension(session): Extension<Session>,
    State(state): State<AppState>,
    Json(req): Json<ReorderRequest>,
) -> CommandResult<Vec<Project>> {
    let mut collection = ProjectCollection::load(state.store.as_ref(), &session.user_id).await;
    let result = match req {
        ReorderRequest::Ids { ids } => collection.reorder(&ids).await,
        ReorderRequest::Move { from, to } => collection.move_item(from, to).await,
    };
    result.map(|()| collection.into_items())
}
