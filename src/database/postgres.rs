use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{ProjectRepository, SocialLinkRepository, UserRepository, VerificationTokenRepository};
use crate::error::StoreError;
use crate::models::{
    DEFAULT_PLATFORM, NewUser, Project, ProfileUpdate, SocialLink, SocialSlot, User,
    VerificationToken,
};

const USER_COLUMNS: &str = "id, email, username, name, bio, avatar_url, hashed_password, \
     email_verified, created_at, updated_at";

const PROJECT_COLUMNS: &str = "id, user_id, title, description, link, github_link, other_link, \
     image_url, github_favicon, other_favicon, position, created_at, updated_at";

const SOCIAL_LINK_COLUMNS: &str = "id, user_id, url, favicon, platform, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = lower($1)"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = lower($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        user.validate()?;
        let result = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, username, hashed_password, created_at, updated_at)
            VALUES ($1, lower($2), lower($3), $4, NOW(), NOW())
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&user.id)
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.hashed_password)
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(created) => {
                tracing::info!("Created user: {}", created.username);
                Ok(created)
            }
            Err(e) => {
                tracing::error!("Failed to create user {}: {:?}", user.username, e);
                Err(StoreError::from_insert(e))
            }
        }
    }

    async fn update_profile(&self, id: &str, update: &ProfileUpdate) -> Result<User, StoreError> {
        // NULL keeps the column, '' clears it.
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET name = CASE WHEN $2::text IS NULL THEN name ELSE NULLIF($2, '') END,
                bio = CASE WHEN $3::text IS NULL THEN bio ELSE NULLIF($3, '') END,
                avatar_url = CASE WHEN $4::text IS NULL THEN avatar_url ELSE NULLIF($4, '') END,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&update.name)
        .bind(&update.bio)
        .bind(&update.avatar)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or(StoreError::NotFound)
    }

    async fn mark_email_verified(&self, email: &str, at: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE users SET email_verified = $2, updated_at = NOW() WHERE email = lower($1)",
        )
        .bind(email)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ProjectRepository for PgStore {
    async fn list_projects(&self, user_id: &str) -> Result<Vec<Project>, StoreError> {
        let projects = sqlx::query_as::<_, Project>(&format!(
            r#"
            SELECT {PROJECT_COLUMNS}
            FROM projects
            WHERE user_id = $1
            ORDER BY position ASC, created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(projects)
    }

    async fn insert_project_at_front(&self, project: &Project) -> Result<Project, StoreError> {
        let mut tx = self.pool.begin().await?;
        lock_project_order(&mut tx, &project.user_id).await?;

        sqlx::query("UPDATE projects SET position = position + 1 WHERE user_id = $1")
            .bind(&project.user_id)
            .execute(&mut *tx)
            .await?;

        let inserted = sqlx::query_as::<_, Project>(&format!(
            r#"
            INSERT INTO projects (
                id, user_id, title, description, link, github_link, other_link,
                image_url, github_favicon, other_favicon, position, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, 0, $11, $11)
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(project.id)
        .bind(&project.user_id)
        .bind(&project.title)
        .bind(&project.description)
        .bind(&project.project_link)
        .bind(&project.github_link)
        .bind(&project.other_link)
        .bind(&project.project_favicon)
        .bind(&project.github_favicon)
        .bind(&project.other_favicon)
        .bind(project.created_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(inserted)
    }

    async fn update_project(&self, project: &Project) -> Result<Project, StoreError> {
        let updated = sqlx::query_as::<_, Project>(&format!(
            r#"
            UPDATE projects
            SET title = $3, description = $4, link = $5, github_link = $6, other_link = $7,
                image_url = $8, github_favicon = $9, other_favicon = $10, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {PROJECT_COLUMNS}
            "#
        ))
        .bind(project.id)
        .bind(&project.user_id)
        .bind(&project.title)
        .bind(&project.description)
        .bind(&project.project_link)
        .bind(&project.github_link)
        .bind(&project.other_link)
        .bind(&project.project_favicon)
        .bind(&project.github_favicon)
        .bind(&project.other_favicon)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or(StoreError::NotFound)
    }

    async fn delete_project(&self, user_id: &str, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn set_positions(&self, user_id: &str, order: &[(Uuid, i32)]) -> Result<(), StoreError> {
        let (ids, positions): (Vec<Uuid>, Vec<i32>) = order.iter().copied().unzip();

        let mut tx = self.pool.begin().await?;
        lock_project_order(&mut tx, user_id).await?;

        // One statement, so the whole renumbering lands or none of it does.
        sqlx::query(
            r#"
            UPDATE projects AS p
            SET position = o.position, updated_at = NOW()
            FROM UNNEST($2::uuid[], $3::int4[]) AS o(id, position)
            WHERE p.id = o.id AND p.user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(ids)
        .bind(positions)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// Serializes writers of one owner's ordering until the transaction ends, so
/// concurrent front inserts each see the rows the others committed.
async fn lock_project_order(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
        .bind(format!("projects:{user_id}"))
        .execute(&mut **tx)
        .await?;
    Ok(())
}

#[async_trait]
impl SocialLinkRepository for PgStore {
    async fn list_social_links(&self, user_id: &str) -> Result<Vec<SocialLink>, StoreError> {
        let links = sqlx::query_as::<_, SocialLink>(&format!(
            "SELECT {SOCIAL_LINK_COLUMNS} FROM social_links WHERE user_id = $1 ORDER BY created_at ASC, id ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(links)
    }

    async fn replace_social_links(
        &self,
        user_id: &str,
        links: &[SocialSlot],
    ) -> Result<Vec<SocialLink>, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM social_links WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let mut saved = Vec::with_capacity(links.len());
        // created_at is offset per slot so the slot order survives a reload.
        let base = Utc::now();
        for (index, link) in links.iter().enumerate() {
            let row = sqlx::query_as::<_, SocialLink>(&format!(
                r#"
                INSERT INTO social_links (id, user_id, url, favicon, platform, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                RETURNING {SOCIAL_LINK_COLUMNS}
                "#
            ))
            .bind(Uuid::new_v4())
            .bind(user_id)
            .bind(&link.url)
            .bind(&link.favicon)
            .bind(DEFAULT_PLATFORM)
            .bind(base + chrono::Duration::milliseconds(index as i64))
            .fetch_one(&mut *tx)
            .await?;
            saved.push(row);
        }

        tx.commit().await?;
        Ok(saved)
    }
}

#[async_trait]
impl VerificationTokenRepository for PgStore {
    async fn create_verification_token(&self, token: &VerificationToken) -> Result<(), StoreError> {
        sqlx::query("INSERT INTO verification_tokens (identifier, token, expires) VALUES ($1, $2, $3)")
            .bind(&token.identifier)
            .bind(&token.token)
            .bind(token.expires)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_verification_token(
        &self,
        digest: &str,
    ) -> Result<Option<VerificationToken>, StoreError> {
        let token = sqlx::query_as::<_, VerificationToken>(
            "SELECT identifier, token, expires FROM verification_tokens WHERE token = $1",
        )
        .bind(digest)
        .fetch_optional(&self.pool)
        .await?;

        Ok(token)
    }

    async fn delete_verification_token(&self, digest: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM verification_tokens WHERE token = $1")
            .bind(digest)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
