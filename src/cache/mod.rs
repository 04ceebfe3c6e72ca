//! Redis cache for resolved link icons.

use std::sync::Arc;

use redis::{AsyncCommands, Client as RedisClient};

const ICON_PREFIX: &str = "superfolio:icon:";

pub fn icon_key(url: &str) -> String {
    format!("{}{}", ICON_PREFIX, crate::utils::token_digest(url.trim()))
}

pub struct IconCacheOperations;

impl IconCacheOperations {
    pub async fn get_icon(redis: &Arc<RedisClient>, url: &str) -> Result<Option<String>, redis::RedisError> {
        let mut conn = redis.get_multiplexed_async_connection().await?;
        conn.get(icon_key(url)).await
    }

    pub async fn cache_icon(
        redis: &Arc<RedisClient>,
        url: &str,
        icon: &str,
        ttl_secs: u64,
    ) -> Result<(), redis::RedisError> {
        if icon.is_empty() || ttl_secs == 0 {
            return Ok(());
        }
        let mut conn = redis.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(icon_key(url), icon, ttl_secs).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icon_keys_ignore_surrounding_whitespace() {
        assert_eq!(icon_key(" https://ada.dev "), icon_key("https://ada.dev"));
        assert_ne!(icon_key("https://ada.dev"), icon_key("https://ada.dev/x"));
        assert!(icon_key("https://ada.dev").starts_with(ICON_PREFIX));
    }
}
