use chrono::{DateTime, Utc};
use sqlx::FromRow;

/// One-time email verification token. `token` holds the digest, not the raw value.
#[derive(Debug, Clone, FromRow)]
pub struct VerificationToken {
    pub identifier: String,
    pub token: String,
    pub expires: DateTime<Utc>,
}

impl VerificationToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires < now
    }
}
