use crate::command::CommandResult;
use crate::database::SocialLinkRepository;
use crate::error::ValidationError;
use crate::models::{SocialLink, SocialSlot};
use crate::utils::is_valid_url;

pub const SOCIAL_SLOTS: usize = 5;

/// The five-slot social link form of one user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SocialLinkSet {
    slots: [SocialSlot; SOCIAL_SLOTS],
}

impl SocialLinkSet {
    pub fn from_saved(links: &[SocialLink]) -> Self {
        let mut set = Self::default();
        for (slot, link) in set.slots.iter_mut().zip(links) {
            *slot = SocialSlot::from(link);
        }
        set
    }

    /// Builds the form from submitted slots; more than five is refused.
    pub fn from_slots(slots: Vec<SocialSlot>) -> Result<Self, ValidationError> {
        if slots.len() > SOCIAL_SLOTS {
            return Err(ValidationError::TooManySlots { max: SOCIAL_SLOTS });
        }
        let mut set = Self::default();
        for (target, slot) in set.slots.iter_mut().zip(slots) {
            *target = slot;
        }
        Ok(set)
    }

    pub fn slots(&self) -> &[SocialSlot] {
        &self.slots
    }

    pub fn set_slot(&mut self, index: usize, slot: SocialSlot) -> Result<(), ValidationError> {
        let target = self
            .slots
            .get_mut(index)
            .ok_or(ValidationError::IndexOutOfRange(index))?;
        *target = slot;
        Ok(())
    }

    /// Slots that would be persisted: both url and favicon present.
    pub fn filled(&self) -> Vec<SocialSlot> {
        self.slots.iter().filter(|s| s.is_filled()).cloned().collect()
    }

    /// Whether saving would change what is stored. Only gates the save action.
    pub fn has_changes(&self, saved: &[SocialLink]) -> bool {
        let filled = self.filled();
        filled.len() != saved.len()
            || filled
                .iter()
                .zip(saved)
                .any(|(slot, link)| slot.url != link.url || slot.favicon != link.favicon)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for slot in self.slots.iter().filter(|s| s.is_filled()) {
            if !is_valid_url(slot.url.trim()) {
                return Err(ValidationError::InvalidUrl {
                    field: "url",
                    value: slot.url.clone(),
                });
            }
        }
        Ok(())
    }

    /// Replaces every stored link of `user_id` with the filled slots.
    pub async fn save<S>(&self, store: &S, user_id: &str) -> CommandResult<Vec<SocialLink>>
    where
        S: SocialLinkRepository + ?Sized,
    {
        if let Err(e) = self.validate() {
            return CommandResult::Rejected(e);
        }
        let filled: Vec<SocialSlot> = self
            .filled()
            .into_iter()
            .map(|s| SocialSlot {
                url: s.url.trim().to_string(),
                favicon: s.favicon.trim().to_string(),
            })
            .collect();

        match store.replace_social_links(user_id, &filled).await {
            Ok(saved) => CommandResult::Applied(saved),
            Err(e) => {
                tracing::error!("Failed to save social links for {}: {}", user_id, e);
                CommandResult::failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    fn slot(url: &str, favicon: &str) -> SocialSlot {
        SocialSlot {
            url: url.into(),
            favicon: favicon.into(),
        }
    }

    #[tokio::test]
    async fn save_replaces_everything_with_filled_slots() {
        let store = MemoryStore::new();
        let first = SocialLinkSet::from_slots(vec![
            slot("https://a.dev", "a.png"),
            slot("https://b.dev", "b.png"),
            slot("https://c.dev", "c.png"),
            slot("https://d.dev", "d.png"),
        ])
        .unwrap();
        assert_eq!(first.save(&store, "u1").await.applied().unwrap().len(), 4);

        let second = SocialLinkSet::from_slots(vec![
            slot("https://x.dev", "x.png"),
            slot("", "orphan.png"),
            slot("https://no-icon.dev", ""),
            slot("https://y.dev", "y.png"),
        ])
        .unwrap();
        let saved = second.save(&store, "u1").await.applied().unwrap();

        assert_eq!(saved.len(), 2);
        let stored = store.list_social_links("u1").await.unwrap();
        let urls: Vec<&str> = stored.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://x.dev", "https://y.dev"]);
        assert!(stored.iter().all(|l| l.platform == "website"));
    }

    #[test]
    fn more_than_five_slots_is_refused() {
        let slots = vec![slot("https://a.dev", "a.png"); 6];
        assert_eq!(
            SocialLinkSet::from_slots(slots),
            Err(ValidationError::TooManySlots { max: 5 })
        );
    }

    #[tokio::test]
    async fn has_changes_compares_filled_slots_with_saved_rows() {
        let store = MemoryStore::new();
        let set = SocialLinkSet::from_slots(vec![slot("https://a.dev", "a.png")]).unwrap();
        assert!(set.has_changes(&[]));

        let saved = set.save(&store, "u1").await.applied().unwrap();
        let mut reloaded = SocialLinkSet::from_saved(&saved);
        assert!(!reloaded.has_changes(&saved));

        reloaded.set_slot(3, slot("https://b.dev", "")).unwrap();
        assert!(!reloaded.has_changes(&saved));
        reloaded.set_slot(0, slot("https://a.dev", "other.png")).unwrap();
        assert!(reloaded.has_changes(&saved));
        assert!(reloaded.set_slot(5, SocialSlot::default()).is_err());
    }

    #[tokio::test]
    async fn malformed_url_rejects_the_whole_save() {
        let store = MemoryStore::new();
        let set = SocialLinkSet::from_slots(vec![slot("not-a-url", "x.png")]).unwrap();
        assert!(matches!(
            set.save(&store, "u1").await,
            CommandResult::Rejected(ValidationError::InvalidUrl { .. })
        ));
        assert_eq!(store.write_count(), 0);
    }
}
