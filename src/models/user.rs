use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::error::ValidationError;
use crate::utils::validate_username;

/// A row of the `users` table. `username` is the public routing key and never changes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(skip_serializing)]
    pub hashed_password: Option<String>,
    #[serde(skip_serializing)]
    pub email_verified: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub email: String,
    pub username: String,
    pub hashed_password: Option<String>,
}

impl NewUser {
    pub fn new(id: impl Into<String>, email: &str, username: &str) -> Self {
        Self {
            id: id.into(),
            email: email.trim().to_lowercase(),
            username: username.trim().to_lowercase(),
            hashed_password: None,
        }
    }

    /// The username must fit the routing pattern and the email must not be blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !validate_username(&self.username) {
            return Err(ValidationError::InvalidUsername);
        }
        if self.email.is_empty() {
            return Err(ValidationError::Required("email"));
        }
        Ok(())
    }
}

/// Partial update of the owner-editable profile fields.
///
/// `None` leaves a field untouched; an empty string clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.bio.is_none() && self.avatar.is_none()
    }

    /// Folds a later update into this one; fields set later win.
    pub fn merge(&mut self, later: ProfileUpdate) {
        if later.name.is_some() {
            self.name = later.name;
        }
        if later.bio.is_some() {
            self.bio = later.bio;
        }
        if later.avatar.is_some() {
            self.avatar = later.avatar;
        }
    }

    pub fn fields(&self) -> Vec<&'static str> {
        [
            ("name", self.name.is_some()),
            ("bio", self.bio.is_some()),
            ("avatar", self.avatar.is_some()),
        ]
        .into_iter()
        .filter_map(|(field, set)| set.then_some(field))
        .collect()
    }

    pub fn apply_to(&self, user: &mut User) {
        fn cleared(value: &str) -> Option<String> {
            (!value.is_empty()).then(|| value.to_string())
        }
        if let Some(name) = &self.name {
            user.name = cleared(name);
        }
        if let Some(bio) = &self.bio {
            user.bio = cleared(bio);
        }
        if let Some(avatar) = &self.avatar {
            user.avatar_url = cleared(avatar);
        }
    }
}

/// Public shape of a user, as rendered on a profile page.
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub username: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
}

impl From<User> for Profile {
    fn from(user: User) -> Self {
        Self {
            username: user.username,
            name: user.name,
            bio: user.bio,
            avatar_url: user.avatar_url,
            email_verified: user.email_verified.is_some(),
        }
    }
}
