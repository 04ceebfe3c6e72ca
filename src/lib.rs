use std::sync::Arc;

use axum::{
    Router,
    routing::{get, patch, post, put},
};
use redis::Client as RedisClient;

use analytics::Analytics;
use autosave::AutoSaveHub;
use config::Config;
use database::Store;
use email::Mailer;
use favicon::LinkMetadataResolver;

pub mod analytics;
pub mod autosave;
pub mod cache;
pub mod command;
pub mod config;
pub mod database;
pub mod email;
pub mod error;
pub mod favicon;
pub mod middleware;
pub mod models;
pub mod page_icon;
pub mod projects;
pub mod routes;
pub mod session;
pub mod social;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub config: Config,
    pub redis: Arc<RedisClient>,
    pub resolver: Arc<LinkMetadataResolver>,
    pub mailer: Mailer,
    pub analytics: Analytics,
    pub autosave: AutoSaveHub,
}

impl AppState {
    /// Wires the optional services (email, analytics, auto-save) from `config`.
    pub fn new(
        store: Arc<dyn Store>,
        config: Config,
        redis: Arc<RedisClient>,
        resolver: Arc<LinkMetadataResolver>,
    ) -> Self {
        if config.resend_api_key.is_none() {
            tracing::warn!("RESEND_API_KEY not set, emails will not be sent");
        }
        if config.posthog_key.is_none() {
            tracing::info!("POSTHOG_KEY not set, analytics disabled");
        }

        Self {
            mailer: Mailer::new(config.resend_api_key.clone()),
            analytics: Analytics::new(config.posthog_key.clone(), config.posthog_host.clone()),
            autosave: AutoSaveHub::new(store.clone(), config.autosave_debounce()),
            store,
            config,
            redis,
            resolver,
        }
    }
}

/// The application router, without the rate limiter and CORS layers `main` adds.
pub fn app(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/auth/signup", post(routes::auth::signup))
        .route("/api/auth/login", post(routes::auth::login))
        .route("/api/auth/session-redirect", get(routes::auth::session_redirect))
        .route("/api/auth/verify-email", get(routes::auth::verify_email))
        .route("/api/auth/providers", get(routes::auth::providers))
        .route("/api/create-user", post(routes::auth::create_user))
        .route("/api/send-verification", post(routes::auth::send_verification))
        .route("/api/test-email", get(routes::auth::test_email))
        .route(
            "/api/usernames/{username}/availability",
            get(routes::profile::username_availability),
        )
        .route("/api/link-metadata/icon", get(routes::link::link_icon))
        .route("/api/link-metadata/preview", get(routes::link::link_preview))
        .route("/api/link-metadata/title", get(routes::link::link_title))
        .route("/{username}", get(routes::profile::view_profile));

    let protected_routes = Router::new()
        .route("/api/auth/refresh", post(routes::auth::refresh_token))
        .route("/api/profile", put(routes::profile::update_profile))
        .route("/api/profile/draft", patch(routes::profile::save_draft))
        .route("/api/projects", post(routes::project::add_project))
        .route("/api/projects/order", put(routes::project::reorder_projects))
        .route(
            "/api/projects/{id}",
            put(routes::project::edit_project).delete(routes::project::delete_project),
        )
        .route("/api/social-links", put(routes::social::save_social_links))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_session,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(|| async { error::AppError::NotFound })
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::gate_pages,
        ))
        .layer(axum::middleware::from_fn(middleware::log_errors))
        .with_state(state)
}
