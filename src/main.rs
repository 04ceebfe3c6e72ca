use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use superfolio::{
    AppState, app,
    config::Config,
    database::PgStore,
    favicon::{HttpFetcher, LinkMetadataResolver},
    middleware::{RateLimiter, rate_limit},
};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const FETCH_TIMEOUT: Duration = Duration::from_secs(8);

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'superfolio';").await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
    let redis = Arc::new(redis_client);

    let fetcher = HttpFetcher::new(FETCH_TIMEOUT).expect("Failed to build HTTP client");
    let resolver = Arc::new(LinkMetadataResolver::new(Arc::new(fetcher)));

    let state = AppState::new(Arc::new(PgStore::new(pool)), config.clone(), redis.clone(), resolver);
    tracing::info!("OAuth providers: {:?}", config.oauth_providers());

    let rate_limiter = Arc::new(RateLimiter::new(redis, &config));
    let router = app(state).layer(axum::middleware::from_fn_with_state(rate_limiter, rate_limit));

    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding permissive CORS layer for development");
        router.layer(CorsLayer::permissive())
    };

    #[cfg(not(debug_assertions))]
    let router = {
        tracing::info!("Running in production mode, CORS restricted to {}", config.site_url);
        match config.site_url.parse::<axum::http::HeaderValue>() {
            Ok(origin) => router.layer(CorsLayer::new().allow_origin(origin)),
            Err(_) => router,
        }
    };

    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
