use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::utils::is_valid_url;

pub const MAX_DESCRIPTION_CHARS: usize = 195;

/// A project entry on a user's page. Rows are displayed by ascending `position`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub user_id: String,
    pub title: String,
    pub description: String,
    #[sqlx(rename = "link")]
    pub project_link: String,
    pub github_link: Option<String>,
    pub other_link: Option<String>,
    #[sqlx(rename = "image_url")]
    pub project_favicon: String,
    pub github_favicon: Option<String>,
    pub other_favicon: Option<String>,
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The three links a project may carry, as submitted by the owner.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkTriple {
    pub project_link: String,
    #[serde(default)]
    pub github_link: Option<String>,
    #[serde(default)]
    pub other_link: Option<String>,
}

impl LinkTriple {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.project_link.trim().is_empty() {
            return Err(ValidationError::Required("projectLink"));
        }
        check_url("projectLink", &self.project_link)?;
        if let Some(link) = non_empty(&self.github_link) {
            check_url("githubLink", link)?;
        }
        if let Some(link) = non_empty(&self.other_link) {
            check_url("otherLink", link)?;
        }
        Ok(())
    }
}

/// A project ready to be inserted: links validated, icons and title resolved.
#[derive(Debug, Clone)]
pub struct NewProject {
    pub links: LinkTriple,
    pub title: String,
    pub description: String,
    pub project_favicon: String,
    pub github_favicon: Option<String>,
    pub other_favicon: Option<String>,
    /// Set while any of the three icon lookups has not come back yet.
    pub resolution_pending: bool,
}

impl NewProject {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.resolution_pending {
            return Err(ValidationError::ResolutionPending);
        }
        self.links.validate()?;
        if self.project_favicon.is_empty() {
            return Err(ValidationError::Required("projectFavicon"));
        }
        check_description(&self.description)
    }

    pub fn into_project(self, id: Uuid, user_id: &str, now: DateTime<Utc>) -> Project {
        Project {
            id,
            user_id: user_id.to_string(),
            title: self.title,
            description: self.description,
            project_link: self.links.project_link,
            github_link: self.links.github_link.filter(|l| !l.is_empty()),
            other_link: self.links.other_link.filter(|l| !l.is_empty()),
            project_favicon: self.project_favicon,
            github_favicon: self.github_favicon.filter(|l| !l.is_empty()),
            other_favicon: self.other_favicon.filter(|l| !l.is_empty()),
            position: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Field-level edit of a project. An empty string clears an optional link.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub project_link: Option<String>,
    pub github_link: Option<String>,
    pub other_link: Option<String>,
    pub project_favicon: Option<String>,
    pub github_favicon: Option<String>,
    pub other_favicon: Option<String>,
}

impl ProjectUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(ValidationError::Required("title"));
            }
        }
        if let Some(link) = &self.project_link {
            check_url("projectLink", link)?;
        }
        if let Some(favicon) = &self.project_favicon {
            if favicon.is_empty() {
                return Err(ValidationError::Required("projectFavicon"));
            }
        }
        if let Some(link) = non_empty(&self.github_link) {
            check_url("githubLink", link)?;
        }
        if let Some(link) = non_empty(&self.other_link) {
            check_url("otherLink", link)?;
        }
        if let Some(description) = &self.description {
            check_description(description)?;
        }
        Ok(())
    }

    /// Applies every set field; `position` is never touched.
    pub fn apply_to(&self, project: &mut Project) {
        fn optional(value: &str) -> Option<String> {
            (!value.is_empty()).then(|| value.to_string())
        }
        if let Some(title) = &self.title {
            project.title = title.trim().to_string();
        }
        if let Some(description) = &self.description {
            project.description = description.clone();
        }
        if let Some(link) = &self.project_link {
            project.project_link = link.clone();
        }
        if let Some(favicon) = &self.project_favicon {
            project.project_favicon = favicon.clone();
        }
        if let Some(link) = &self.github_link {
            project.github_link = optional(link);
        }
        if let Some(link) = &self.other_link {
            project.other_link = optional(link);
        }
        if let Some(favicon) = &self.github_favicon {
            project.github_favicon = optional(favicon);
        }
        if let Some(favicon) = &self.other_favicon {
            project.other_favicon = optional(favicon);
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

fn check_url(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if is_valid_url(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
        })
    }
}

fn check_description(description: &str) -> Result<(), ValidationError> {
    if description.chars().count() > MAX_DESCRIPTION_CHARS {
        Err(ValidationError::DescriptionTooLong {
            max: MAX_DESCRIPTION_CHARS,
        })
    } else {
        Ok(())
    }
}
