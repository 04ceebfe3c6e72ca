use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use crate::{
    AppState, cache::IconCacheOperations, favicon::fallback_icon, utils::success_to_api_response,
};

use super::model::{IconResponse, LinkQuery, PreviewResponse, TitleResponse};

/// Icon lookup through the Redis cache. A cache outage only costs the lookup.
///
/// Only icons a strategy actually found are cached; the generic fallback is
/// answered but retried on the next request.
pub async fn cached_icon(state: &AppState, url: &str) -> String {
    match IconCacheOperations::get_icon(&state.redis, url).await {
        Ok(Some(icon)) => return icon,
        Ok(None) => {}
        Err(e) => tracing::warn!("Icon cache unavailable: {}", e),
    }

    let Some(icon) = state.resolver.find_icon(url).await else {
        return fallback_icon(url);
    };
    if let Err(e) =
        IconCacheOperations::cache_icon(&state.redis, url, &icon, state.config.icon_cache_secs).await
    {
        tracing::warn!("Failed to cache icon for {}: {}", url, e);
    }
    icon
}

pub async fn link_icon(
    State(state): State<AppState>,
    Query(query): Query<LinkQuery>,
) -> impl IntoResponse {
    let icon = cached_icon(&state, &query.url).await;
    (
        StatusCode::OK,
        success_to_api_response(IconResponse {
            url: query.url,
            icon,
        }),
    )
}

pub async fn link_preview(
    State(state): State<AppState>,
    Query(query): Query<LinkQuery>,
) -> impl IntoResponse {
    let preview = state.resolver.resolve_preview(&query.url).await;
    (
        StatusCode::OK,
        success_to_api_response(PreviewResponse {
            url: query.url,
            preview,
        }),
    )
}

pub async fn link_title(
    State(state): State<AppState>,
    Query(query): Query<LinkQuery>,
) -> impl IntoResponse {
    let title = state.resolver.page_title(&query.url).await;
    (
        StatusCode::OK,
        success_to_api_response(TitleResponse {
            url: query.url,
            title,
        }),
    )
}
