//! Persistence seams. Handlers and domain code only see these traits; `PgStore`
//! is the production implementation and `MemoryStore` backs the tests.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{
    NewUser, Project, ProfileUpdate, SocialLink, SocialSlot, User, VerificationToken,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    /// Case-insensitive: `"Foo"` and `"foo"` name the same user.
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Fails with `StoreError::Conflict` when the id, email or username is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<User, StoreError>;

    /// Returns the number of users whose email matched.
    async fn mark_email_verified(&self, email: &str, at: DateTime<Utc>) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Projects of one owner, ascending `position`, newest first on ties.
    async fn list_projects(&self, user_id: &str) -> Result<Vec<Project>, StoreError>;

    /// Shifts every project of the owner down by one and inserts `project` at
    /// position 0, in one transaction.
    async fn insert_project_at_front(&self, project: &Project) -> Result<Project, StoreError>;

    /// Writes every editable column of `project`; position is left as stored.
    async fn update_project(&self, project: &Project) -> Result<Project, StoreError>;

    async fn delete_project(&self, user_id: &str, id: Uuid) -> Result<(), StoreError>;

    /// Applies all `(id, position)` pairs atomically.
    async fn set_positions(&self, user_id: &str, order: &[(Uuid, i32)]) -> Result<(), StoreError>;
}

#[async_trait]
pub trait SocialLinkRepository: Send + Sync {
    async fn list_social_links(&self, user_id: &str) -> Result<Vec<SocialLink>, StoreError>;

    /// Deletes every link of the owner and inserts `links`, in one transaction.
    async fn replace_social_links(
        &self,
        user_id: &str,
        links: &[SocialSlot],
    ) -> Result<Vec<SocialLink>, StoreError>;
}

#[async_trait]
pub trait VerificationTokenRepository: Send + Sync {
    async fn create_verification_token(&self, token: &VerificationToken) -> Result<(), StoreError>;

    async fn find_verification_token(
        &self,
        digest: &str,
    ) -> Result<Option<VerificationToken>, StoreError>;

    async fn delete_verification_token(&self, digest: &str) -> Result<(), StoreError>;
}

pub trait Store:
    UserRepository + ProjectRepository + SocialLinkRepository + VerificationTokenRepository
{
}

impl<T> Store for T where
    T: UserRepository + ProjectRepository + SocialLinkRepository + VerificationTokenRepository
{
}
