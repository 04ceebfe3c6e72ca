use serde::{Deserialize, Serialize};

use crate::favicon::LinkPreview;

#[derive(Debug, Deserialize)]
pub struct LinkQuery {
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct IconResponse {
    pub url: String,
    pub icon: String,
}

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
    pub url: String,
    pub preview: Option<LinkPreview>,
}

#[derive(Debug, Serialize)]
pub struct TitleResponse {
    pub url: String,
    pub title: String,
}
