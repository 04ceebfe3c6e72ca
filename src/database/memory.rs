use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::{ProjectRepository, SocialLinkRepository, UserRepository, VerificationTokenRepository};
use crate::error::StoreError;
use crate::models::{
    DEFAULT_PLATFORM, NewUser, Project, ProfileUpdate, SocialLink, SocialSlot, User,
    VerificationToken,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    projects: Vec<Project>,
    social_links: Vec<SocialLink>,
    tokens: HashMap<String, VerificationToken>,
}

/// Process-local store with the same contract as `PgStore`.
///
/// Reads and writes can be made to fail on demand, and every successful write is counted.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every write returns a database error and changes nothing.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// While set, every read returns a database error.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn write<T>(&self, op: impl FnOnce(&mut Tables) -> Result<T, StoreError>) -> Result<T, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let mut tables = self.tables.lock().map_err(|_| StoreError::Database(sqlx::Error::PoolClosed))?;
        let result = op(&mut tables)?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(result)
    }

    fn read<T>(&self, op: impl FnOnce(&Tables) -> T) -> Result<T, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let tables = self.tables.lock().map_err(|_| StoreError::Database(sqlx::Error::PoolClosed))?;
        Ok(op(&tables))
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.read(|t| t.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let username = username.to_lowercase();
        self.read(|t| t.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let email = email.to_lowercase();
        self.read(|t| t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        user.validate()?;
        self.write(|t| {
            let email = user.email.to_lowercase();
            let username = user.username.to_lowercase();
            if t.users
                .iter()
                .any(|u| u.id == user.id || u.email == email || u.username == username)
            {
                return Err(StoreError::Conflict(format!("user {username} already exists")));
            }
            let now = Utc::now();
            let created = User {
                id: user.id,
                email,
                username,
                name: None,
                bio: None,
                avatar_url: None,
                hashed_password: user.hashed_password,
                email_verified: None,
                created_at: now,
                updated_at: now,
            };
            t.users.push(created.clone());
            Ok(created)
        })
    }

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<User, StoreError> {
        self.write(|t| {
            let user = t
                .users
                .iter_mut()
                .find(|u| u.id == id)
                .ok_or(StoreError::NotFound)?;
            update.apply_to(user);
            user.updated_at = Utc::now();
            Ok(user.clone())
        })
    }

    async fn mark_email_verified(&self, email: &str, at: DateTime<Utc>) -> Result<u64, StoreError> {
        let email = email.to_lowercase();
        self.write(|t| {
            let mut count = 0;
            for user in t.users.iter_mut().filter(|u| u.email == email) {
                user.email_verified = Some(at);
                count += 1;
            }
            Ok(count)
        })
    }
}

#[async_trait]
impl ProjectRepository for MemoryStore {
    async fn list_projects(&self, user_id: &str) -> Result<Vec<Project>, StoreError> {
        self.read(|t| {
            let mut projects: Vec<Project> = t
                .projects
                .iter()
                .filter(|p| p.user_id == user_id)
                .cloned()
                .collect();
            projects.sort_by(|a, b| {
                a.position
                    .cmp(&b.position)
                    .then_with(|| b.created_at.cmp(&a.created_at))
            });
            projects
        })
    }

    async fn insert_project_at_front(&self, project: &Project) -> Result<Project, StoreError> {
        self.write(|t| {
            if t.projects.iter().any(|p| p.id == project.id) {
                return Err(StoreError::Conflict(format!("project {} exists", project.id)));
            }
            for existing in t.projects.iter_mut().filter(|p| p.user_id == project.user_id) {
                existing.position += 1;
            }
            let mut inserted = project.clone();
            inserted.position = 0;
            t.projects.push(inserted.clone());
            Ok(inserted)
        })
    }

    async fn update_project(&self, project: &Project) -> Result<Project, StoreError> {
        self.write(|t| {
            let stored = t
                .projects
                .iter_mut()
                .find(|p| p.id == project.id && p.user_id == project.user_id)
                .ok_or(StoreError::NotFound)?;
            let position = stored.position;
            *stored = project.clone();
            stored.position = position;
            stored.updated_at = Utc::now();
            Ok(stored.clone())
        })
    }

    async fn delete_project(&self, user_id: &str, id: Uuid) -> Result<(), StoreError> {
        self.write(|t| {
            let before = t.projects.len();
            t.projects.retain(|p| !(p.id == id && p.user_id == user_id));
            if t.projects.len() == before {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
    }

    async fn set_positions(&self, user_id: &str, order: &[(Uuid, i32)]) -> Result<(), StoreError> {
        self.write(|t| {
            for (id, position) in order {
                if let Some(project) = t
                    .projects
                    .iter_mut()
                    .find(|p| p.id == *id && p.user_id == user_id)
                {
                    project.position = *position;
                }
            }
            Ok(())
        })
    }
}

#[async_trait]
impl SocialLinkRepository for MemoryStore {
    async fn list_social_links(&self, user_id: &str) -> Result<Vec<SocialLink>, StoreError> {
        self.read(|t| {
            t.social_links
                .iter()
                .filter(|l| l.user_id == user_id)
                .cloned()
                .collect()
        })
    }

    async fn replace_social_links(
        &self,
        user_id: &str,
        links: &[SocialSlot],
    ) -> Result<Vec<SocialLink>, StoreError> {
        self.write(|t| {
            t.social_links.retain(|l| l.user_id != user_id);
            let base = Utc::now();
            let saved: Vec<SocialLink> = links
                .iter()
                .enumerate()
                .map(|(index, slot)| SocialLink {
                    id: Uuid::new_v4(),
                    user_id: user_id.to_string(),
                    url: slot.url.clone(),
                    favicon: slot.favicon.clone(),
                    platform: DEFAULT_PLATFORM.to_string(),
                    created_at: base + Duration::milliseconds(index as i64),
                })
                .collect();
            t.social_links.extend(saved.iter().cloned());
            Ok(saved)
        })
    }
}

#[async_trait]
impl VerificationTokenRepository for MemoryStore {
    async fn create_verification_token(&self, token: &VerificationToken) -> Result<(), StoreError> {
        self.write(|t| {
            t.tokens.insert(token.token.clone(), token.clone());
            Ok(())
        })
    }

    async fn find_verification_token(
        &self,
        digest: &str,
    ) -> Result<Option<VerificationToken>, StoreError> {
        self.read(|t| t.tokens.get(digest).cloned())
    }

    async fn delete_verification_token(&self, digest: &str) -> Result<(), StoreError> {
        self.write(|t| {
            t.tokens.remove(digest);
            Ok(())
        })
    }
}
