//! Debounced profile saves.
//!
//! Rapid partial updates for one user are coalesced and written once the user
//! has been quiet for the debounce interval. Later fields win over earlier
//! ones. A failed write is logged and not retried. A coordinator that has seen
//! nothing for the idle timeout stops, and the hub starts a new one on demand.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::database::Store;
use crate::models::ProfileUpdate;

pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(300);

/// Debounce coordinator for one user's profile fields.
pub struct AutoSaver {
    tx: mpsc::UnboundedSender<ProfileUpdate>,
    saving: Arc<watch::Sender<bool>>,
}

impl AutoSaver {
    pub fn spawn(store: Arc<dyn Store>, user_id: String, debounce: Duration) -> Self {
        Self::spawn_with_idle(store, user_id, debounce, DEFAULT_IDLE_TIMEOUT)
    }

    pub fn spawn_with_idle(
        store: Arc<dyn Store>,
        user_id: String,
        debounce: Duration,
        idle: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let saving = Arc::new(watch::Sender::new(false));
        tokio::spawn(run(store, user_id, debounce, idle, rx, saving.clone()));
        Self { tx, saving }
    }

    /// Queues a partial update. Returns false if the coordinator has stopped.
    pub fn schedule(&self, update: ProfileUpdate) -> bool {
        if update.is_empty() {
            return true;
        }
        self.saving.send_replace(true);
        if self.tx.send(update).is_ok() {
            return true;
        }
        self.saving.send_replace(false);
        false
    }

    /// True while an update waits out the debounce or is being written.
    pub fn is_saving(&self) -> bool {
        *self.saving.borrow()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

async fn run(
    store: Arc<dyn Store>,
    user_id: String,
    debounce: Duration,
    idle: Duration,
    mut rx: mpsc::UnboundedReceiver<ProfileUpdate>,
    saving: Arc<watch::Sender<bool>>,
) {
    loop {
        let mut pending = match tokio::time::timeout(idle, rx.recv()).await {
            Ok(Some(first)) => first,
            Ok(None) => return,
            Err(_) => {
                // Refuse new updates, then write whatever slipped in before the close.
                rx.close();
                let mut late: Option<ProfileUpdate> = None;
                while let Ok(next) = rx.try_recv() {
                    match late.as_mut() {
                        Some(update) => update.merge(next),
                        None => late = Some(next),
                    }
                }
                if let Some(update) = late {
                    flush(store.as_ref(), &user_id, &update).await;
                }
                saving.send_replace(false);
                tracing::debug!("Auto-save for {} idle, stopping", user_id);
                return;
            }
        };

        let closed = loop {
            match tokio::time::timeout(debounce, rx.recv()).await {
                Ok(Some(next)) => pending.merge(next),
                Ok(None) => break true,
                Err(_) => break false,
            }
        };
        flush(store.as_ref(), &user_id, &pending).await;
        if closed {
            saving.send_replace(false);
            return;
        }
        if rx.is_empty() {
            saving.send_replace(false);
        }
    }
}

async fn flush(store: &dyn Store, user_id: &str, update: &ProfileUpdate) {
    match store.update_profile(user_id, update).await {
        Ok(_) => tracing::debug!("Auto-saved {:?} for {}", update.fields(), user_id),
        Err(e) => tracing::error!("Auto-save failed for {}: {}", user_id, e),
    }
}

/// One live `AutoSaver` per user, created on first use and dropped once it stops.
#[derive(Clone)]
pub struct AutoSaveHub {
    store: Arc<dyn Store>,
    debounce: Duration,
    idle: Duration,
    savers: Arc<Mutex<HashMap<String, Arc<AutoSaver>>>>,
}

impl AutoSaveHub {
    pub fn new(store: Arc<dyn Store>, debounce: Duration) -> Self {
        Self {
            store,
            debounce,
            idle: DEFAULT_IDLE_TIMEOUT,
            savers: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_idle_timeout(mut self, idle: Duration) -> Self {
        self.idle = idle;
        self
    }

    pub fn saver(&self, user_id: &str) -> Arc<AutoSaver> {
        let mut savers = match self.savers.lock() {
            Ok(savers) => savers,
            Err(poisoned) => poisoned.into_inner(),
        };
        savers.retain(|_, saver| !saver.is_closed());
        if let Some(saver) = savers.get(user_id) {
            return saver.clone();
        }
        let saver = Arc::new(AutoSaver::spawn_with_idle(
            self.store.clone(),
            user_id.to_string(),
            self.debounce,
            self.idle,
        ));
        savers.insert(user_id.to_string(), saver.clone());
        saver
    }

    /// Queues `update` and returns the coordinator that took it, or `None` if
    /// no coordinator would.
    pub fn schedule(&self, user_id: &str, update: ProfileUpdate) -> Option<Arc<AutoSaver>> {
        // A saver can stop between lookup and send; the second lookup replaces it.
        for _ in 0..2 {
            let saver = self.saver(user_id);
            if saver.schedule(update.clone()) {
                return Some(saver);
            }
        }
        None
    }

    #[cfg(test)]
    fn live_savers(&self) -> usize {
        self.savers
            .lock()
            .map(|savers| savers.values().filter(|s| !s.is_closed()).count())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{MemoryStore, UserRepository};
    use crate::models::NewUser;

    async fn store_with_user() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store
            .create_user(NewUser::new("u1", "ada@example.com", "ada-dev"))
            .await
            .unwrap();
        store
    }

    fn name(value: &str) -> ProfileUpdate {
        ProfileUpdate {
            name: Some(value.into()),
            ..Default::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_edits_coalesce_into_one_write() {
        let store = store_with_user().await;
        let writes = store.write_count();
        let saver = AutoSaver::spawn(store.clone(), "u1".into(), Duration::from_millis(800));

        for partial in ["A", "Ad", "Ada"] {
            assert!(saver.schedule(name(partial)));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        saver.schedule(ProfileUpdate {
            bio: Some("Builds things".into()),
            ..Default::default()
        });
        assert_eq!(store.write_count(), writes);
        assert!(saver.is_saving());

        tokio::time::sleep(Duration::from_millis(1000)).await;

        assert_eq!(store.write_count(), writes + 1);
        let user = store.find_user_by_id("u1").await.unwrap().unwrap();
        assert_eq!(user.name.as_deref(), Some("Ada"));
        assert_eq!(user.bio.as_deref(), Some("Builds things"));
        assert!(!saver.is_saving());
    }

    #[tokio::test(start_paused = true)]
    async fn quiet_gaps_produce_separate_writes() {
        let store = store_with_user().await;
        let writes = store.write_count();
        let saver = AutoSaver::spawn(store.clone(), "u1".into(), Duration::from_millis(500));

        saver.schedule(name("first"));
        tokio::time::sleep(Duration::from_millis(700)).await;
        saver.schedule(name("second"));
        tokio::time::sleep(Duration::from_millis(700)).await;

        assert_eq!(store.write_count(), writes + 2);
        let user = store.find_user_by_id("u1").await.unwrap().unwrap();
        assert_eq!(user.name.as_deref(), Some("second"));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_is_not_retried() {
        let store = store_with_user().await;
        let saver = AutoSaver::spawn(store.clone(), "u1".into(), Duration::from_millis(500));

        store.fail_writes(true);
        saver.schedule(name("lost"));
        tokio::time::sleep(Duration::from_millis(700)).await;
        store.fail_writes(false);
        tokio::time::sleep(Duration::from_millis(2000)).await;

        let user = store.find_user_by_id("u1").await.unwrap().unwrap();
        assert_eq!(user.name, None);
        assert!(!saver.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn hub_reuses_one_saver_per_user() {
        let store = store_with_user().await;
        let hub = AutoSaveHub::new(store.clone(), Duration::from_millis(500));
        assert!(Arc::ptr_eq(&hub.saver("u1"), &hub.saver("u1")));
        assert!(!Arc::ptr_eq(&hub.saver("u1"), &hub.saver("u2")));

        let saver = hub.schedule("u1", name("via hub")).unwrap();
        assert!(saver.is_saving());
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert!(!saver.is_saving());
        let user = store.find_user_by_id("u1").await.unwrap().unwrap();
        assert_eq!(user.name.as_deref(), Some("via hub"));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_savers_stop_and_leave_the_hub() {
        let store = store_with_user().await;
        let hub = AutoSaveHub::new(store.clone(), Duration::from_millis(500))
            .with_idle_timeout(Duration::from_secs(60));

        let first = hub.schedule("u1", name("before idle")).unwrap();
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(hub.live_savers(), 1);

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert!(first.is_closed());
        assert_eq!(hub.live_savers(), 0);

        let second = hub.schedule("u1", name("after idle")).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        tokio::time::sleep(Duration::from_millis(700)).await;
        let user = store.find_user_by_id("u1").await.unwrap().unwrap();
        assert_eq!(user.name.as_deref(), Some("after idle"));
        assert_eq!(hub.savers.lock().unwrap().len(), 1);
    }
}
