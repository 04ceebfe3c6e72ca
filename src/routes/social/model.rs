use serde::Deserialize;

use crate::models::SocialSlot;

#[derive(Debug, Deserialize)]
pub struct SaveSocialLinksRequest {
    pub slots: Vec<SocialSlot>,
}
