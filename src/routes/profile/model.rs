use serde::Serialize;

use crate::models::{Profile, Project, SocialLink};
use crate::session::Ownership;

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub profile: Profile,
    pub projects: Vec<Project>,
    pub social_links: Vec<SocialLink>,
    pub ownership: Ownership,
    /// Link to the viewer's own page when they are signed in as someone else.
    pub my_superfolio: Option<String>,
    pub page_icon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projects_error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub username: String,
    pub valid: bool,
    pub available: bool,
}

#[derive(Debug, Serialize)]
pub struct DraftResponse {
    pub saving: bool,
    pub fields: Vec<&'static str>,
}
