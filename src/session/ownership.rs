use serde::Serialize;

use super::Session;
use crate::database::UserRepository;
use crate::error::StoreError;
use crate::models::NewUser;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ownership {
    pub is_own_profile: bool,
    pub viewer_username: Option<String>,
}

impl Ownership {
    pub fn anonymous() -> Self {
        Self {
            is_own_profile: false,
            viewer_username: None,
        }
    }
}

pub fn is_own_profile(viewer_username: &str, route_username: &str) -> bool {
    viewer_username.to_lowercase() == route_username.to_lowercase()
}

/// Works out whether the session's user owns the profile at `route_username`.
///
/// A session can exist before its user row does (the OAuth callback path); the
/// row is created from the session's email and username before deciding.
pub async fn resolve_ownership<S>(
    session: Option<&Session>,
    route_username: &str,
    store: &S,
) -> Result<Ownership, StoreError>
where
    S: UserRepository + ?Sized,
{
    let Some(session) = session else {
        return Ok(Ownership::anonymous());
    };

    let viewer_username = match store.find_user_by_id(&session.user_id).await? {
        Some(user) => Some(user.username),
        None => create_missing_user(session, store).await?,
    };

    Ok(Ownership {
        is_own_profile: viewer_username
            .as_deref()
            .is_some_and(|viewer| is_own_profile(viewer, route_username)),
        viewer_username,
    })
}

async fn create_missing_user<S>(session: &Session, store: &S) -> Result<Option<String>, StoreError>
where
    S: UserRepository + ?Sized,
{
    let (Some(email), Some(username)) = (&session.email, &session.username) else {
        tracing::warn!(
            "Session {} has no user row and lacks email or username",
            session.user_id
        );
        return Ok(None);
    };

    let new_user = NewUser::new(session.user_id.as_str(), email, username);
    if let Err(e) = new_user.validate() {
        tracing::warn!("Session {} carries an unusable identity: {}", session.user_id, e);
        return Ok(None);
    }

    match store.create_user(new_user).await {
        Ok(user) => {
            tracing::info!("Created missing user row for session {}", session.user_id);
            Ok(Some(user.username))
        }
        Err(StoreError::Conflict(reason)) => {
            tracing::warn!(
                "Could not create user row for session {}: {}",
                session.user_id,
                reason
            );
            Ok(None)
        }
        Err(e) => Err(e),
    }
}
