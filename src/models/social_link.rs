use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Every saved social link carries this platform tag.
pub const DEFAULT_PLATFORM: &str = "website";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SocialLink {
    pub id: Uuid,
    pub user_id: String,
    pub url: String,
    pub favicon: String,
    pub platform: String,
    pub created_at: DateTime<Utc>,
}

/// One of the editable slots of the social link form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialSlot {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub favicon: String,
}

impl SocialSlot {
    pub fn is_filled(&self) -> bool {
        !self.url.trim().is_empty() && !self.favicon.trim().is_empty()
    }
}

impl From<&SocialLink> for SocialSlot {
    fn from(link: &SocialLink) -> Self {
        Self {
            url: link.url.clone(),
            favicon: link.favicon.clone(),
        }
    }
}
