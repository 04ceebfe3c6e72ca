use serde::Deserialize;
use uuid::Uuid;

use crate::models::LinkTriple;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddProjectRequest {
    #[serde(flatten)]
    pub links: LinkTriple,
    #[serde(default)]
    pub description: String,
    /// Overrides the title taken from the page.
    #[serde(default)]
    pub title: Option<String>,
    /// Icons the client already resolved; missing ones are looked up here.
    #[serde(default)]
    pub project_favicon: Option<String>,
    #[serde(default)]
    pub github_favicon: Option<String>,
    #[serde(default)]
    pub other_favicon: Option<String>,
}

/// Either the complete new order, or one drag-and-drop move.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ReorderRequest {
    Ids { ids: Vec<Uuid> },
    Move { from: usize, to: usize },
}
