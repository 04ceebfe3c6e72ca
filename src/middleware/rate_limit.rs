use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use redis::AsyncCommands;

use crate::{
    config::Config,
    utils::{error_codes, error_to_api_response},
};

/// Fixed-window request counter per client address, kept in Redis.
#[derive(Clone)]
pub struct RateLimiter {
    redis: Arc<redis::Client>,
    window_secs: u64,
    max_requests: u32,
}

/// Client address: `x-real-ip`, then the first `x-forwarded-for` entry, then the socket.
pub fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').map(str::trim).find(|ip| !ip.is_empty()))
                .map(str::to_string)
        })
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

impl RateLimiter {
    pub fn new(redis: Arc<redis::Client>, config: &Config) -> Self {
        Self {
            redis,
            window_secs: config.rate_limit_window().as_secs(),
            max_requests: config.rate_limit_requests,
        }
    }

    /// Counts one request for `ip` and reports whether it is within budget.
    pub async fn allow(&self, ip: &str) -> redis::RedisResult<bool> {
        let key = format!("superfolio:rate_limit:{}", ip);
        let mut conn = self.redis.get_multiplexed_async_connection().await?;

        let count: u32 = conn.incr(&key, 1).await?;
        if count == 1 {
            let _: () = conn.expire(&key, self.window_secs as i64).await?;
        }
        Ok(count <= self.max_requests)
    }

    pub async fn check_rate_limit(&self, req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
        let remote = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0);
        let ip = client_ip(req.headers(), remote);

        let allowed = self.allow(&ip).await.map_err(|e| {
            tracing::error!("Rate limiter unavailable: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

        if !allowed {
            tracing::info!("Rate limit reached for {}", ip);
            return Ok((
                StatusCode::TOO_MANY_REQUESTS,
                error_to_api_response::<()>(
                    error_codes::RATE_LIMIT,
                    format!("Too many requests, retry in {} seconds", self.window_secs),
                ),
            )
                .into_response());
        }

        Ok(next.run(req).await)
    }
}

pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    limiter.check_rate_limit(req, next).await
}
