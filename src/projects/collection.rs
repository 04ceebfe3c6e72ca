use chrono::Utc;
use uuid::Uuid;

use crate::command::CommandResult;
use crate::database::ProjectRepository;
use crate::error::{StoreError, ValidationError};
use crate::models::{NewProject, Project, ProjectUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionState {
    Loading,
    Ready,
}

/// Working copy of one owner's projects, kept in display order, together with
/// the store it persists to.
///
/// Commands update the working copy first and then persist. When persisting
/// fails the working copy is left as it is and the command reports `Failed`,
/// so the caller decides whether to `refresh` or keep the local view.
pub struct ProjectCollection<'a, S: ProjectRepository + ?Sized> {
    store: &'a S,
    user_id: String,
    state: CollectionState,
    items: Vec<Project>,
    load_error: Option<String>,
}

impl<'a, S: ProjectRepository + ?Sized> ProjectCollection<'a, S> {
    pub fn new(store: &'a S, user_id: &str) -> Self {
        Self {
            store,
            user_id: user_id.to_string(),
            state: CollectionState::Loading,
            items: Vec::new(),
            load_error: None,
        }
    }

    pub async fn load(store: &'a S, user_id: &str) -> Self {
        let mut collection = Self::new(store, user_id);
        collection.refresh().await;
        collection
    }

    /// Refetches the list. The collection is `Ready` afterwards even if the
    /// fetch failed; the failure is kept in `load_error`.
    pub async fn refresh(&mut self) {
        self.state = CollectionState::Loading;
        match self.store.list_projects(&self.user_id).await {
            Ok(projects) => {
                self.items = projects;
                self.load_error = None;
            }
            Err(e) => {
                tracing::error!("Failed to load projects for {}: {}", self.user_id, e);
                self.load_error = Some(e.to_string());
            }
        }
        self.state = CollectionState::Ready;
    }

    pub fn state(&self) -> CollectionState {
        self.state
    }

    pub fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub fn items(&self) -> &[Project] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Project> {
        self.items
    }

    /// Inserts a project at the front. Every existing project moves down one place.
    ///
    /// On `Failed` the new project stays at the front of the working copy.
    pub async fn add(&mut self, new: NewProject) -> CommandResult<Project> {
        if let Some(unloaded) = self.unloaded() {
            return unloaded;
        }
        if let Err(e) = new.validate() {
            return CommandResult::Rejected(e);
        }

        let project = new.into_project(Uuid::new_v4(), &self.user_id, Utc::now());
        for existing in &mut self.items {
            existing.position += 1;
        }
        self.items.insert(0, project.clone());

        match self.store.insert_project_at_front(&project).await {
            Ok(saved) => {
                self.items[0] = saved.clone();
                CommandResult::Applied(saved)
            }
            Err(e) => {
                tracing::error!("Failed to save project {}: {}", project.id, e);
                CommandResult::failed(e)
            }
        }
    }

    /// Applies a field-level edit, keeping the project's position.
    ///
    /// On `Failed` the working copy holds the edited project.
    pub async fn edit(&mut self, id: Uuid, update: ProjectUpdate) -> CommandResult<Project> {
        if let Some(unloaded) = self.unloaded() {
            return unloaded;
        }
        if let Err(e) = update.validate() {
            return CommandResult::Rejected(e);
        }
        let Some(index) = self.index_of(id) else {
            return CommandResult::Rejected(ValidationError::UnknownProject(id));
        };

        update.apply_to(&mut self.items[index]);
        let edited = self.items[index].clone();

        match self.store.update_project(&edited).await {
            Ok(saved) => {
                self.items[index] = saved.clone();
                CommandResult::Applied(saved)
            }
            Err(e) => {
                tracing::error!("Failed to update project {}: {}", id, e);
                CommandResult::failed(e)
            }
        }
    }

    /// Deletes the stored row, then drops the project from the working copy.
    /// Remaining positions are not renumbered.
    ///
    /// On `Failed` the working copy is unchanged.
    pub async fn delete(&mut self, id: Uuid) -> CommandResult<()> {
        if let Some(unloaded) = self.unloaded() {
            return unloaded;
        }
        if self.index_of(id).is_none() {
            return CommandResult::Rejected(ValidationError::UnknownProject(id));
        }

        match self.store.delete_project(&self.user_id, id).await {
            Ok(()) | Err(StoreError::NotFound) => {
                self.items.retain(|p| p.id != id);
                CommandResult::Applied(())
            }
            Err(e) => {
                tracing::error!("Failed to delete project {}: {}", id, e);
                CommandResult::failed(e)
            }
        }
    }

    /// Drag-and-drop move of the item at `from` to `to`, then a full renumbering.
    ///
    /// On `Failed` the working copy keeps the new order.
    pub async fn move_item(&mut self, from: usize, to: usize) -> CommandResult<()> {
        if let Some(unloaded) = self.unloaded() {
            return unloaded;
        }
        let len = self.items.len();
        if from >= len {
            return CommandResult::Rejected(ValidationError::IndexOutOfRange(from));
        }
        if to >= len {
            return CommandResult::Rejected(ValidationError::IndexOutOfRange(to));
        }
        if from == to {
            return CommandResult::Applied(());
        }

        move_in_list(&mut self.items, from, to);
        self.persist_order().await
    }

    /// Puts the projects in the order of `ids`, which must name every project once.
    ///
    /// On `Failed` the working copy keeps the new order.
    pub async fn reorder(&mut self, ids: &[Uuid]) -> CommandResult<()> {
        if let Some(unloaded) = self.unloaded() {
            return unloaded;
        }
        if ids.len() != self.items.len() {
            return CommandResult::Rejected(ValidationError::OrderMismatch);
        }
        if self.items.iter().map(|p| p.id).eq(ids.iter().copied()) {
            return CommandResult::Applied(());
        }

        let mut remaining = self.items.clone();
        let mut ordered = Vec::with_capacity(remaining.len());
        for id in ids {
            match remaining.iter().position(|p| p.id == *id) {
                Some(index) => ordered.push(remaining.swap_remove(index)),
                // Unknown or duplicated id; the working copy is still untouched.
                None => return CommandResult::Rejected(ValidationError::OrderMismatch),
            }
        }
        self.items = ordered;
        self.persist_order().await
    }

    async fn persist_order(&mut self) -> CommandResult<()> {
        for (index, project) in self.items.iter_mut().enumerate() {
            project.position = index as i32;
        }
        let order: Vec<(Uuid, i32)> = self.items.iter().map(|p| (p.id, p.position)).collect();

        match self.store.set_positions(&self.user_id, &order).await {
            Ok(()) => CommandResult::Applied(()),
            Err(e) => {
                tracing::error!("Failed to persist project order for {}: {}", self.user_id, e);
                CommandResult::failed(e)
            }
        }
    }

    /// A list that failed to load cannot be edited: its working copy is empty,
    /// not the stored list.
    fn unloaded<T>(&self) -> Option<CommandResult<T>> {
        self.load_error
            .as_ref()
            .map(|e| CommandResult::failed(format!("projects could not be loaded: {e}")))
    }

    fn index_of(&self, id: Uuid) -> Option<usize> {
        self.items.iter().position(|p| p.id == id)
    }
}

/// Moves the element at `from` so it ends up at index `to`.
pub fn move_in_list<T>(items: &mut Vec<T>, from: usize, to: usize) {
    if from == to || from >= items.len() || to >= items.len() {
        return;
    }
    let item = items.remove(from);
    items.insert(to, item);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::models::LinkTriple;

    fn draft(link: &str) -> NewProject {
        NewProject {
            links: LinkTriple {
                project_link: link.to_string(),
                github_link: None,
                other_link: None,
            },
            title: link.to_string(),
            description: String::new(),
            project_favicon: format!("{link}/favicon.png"),
            github_favicon: None,
            other_favicon: None,
            resolution_pending: false,
        }
    }

    async fn seeded(store: &MemoryStore, count: usize) -> Vec<Uuid> {
        let mut collection = ProjectCollection::new(store, "owner");
        let mut ids = Vec::new();
        for i in 0..count {
            let project = collection
                .add(draft(&format!("https://p{i}.dev")))
                .await
                .applied()
                .unwrap();
            ids.push(project.id);
        }
        ids
    }

    fn positions(items: &[Project]) -> Vec<(Uuid, i32)> {
        items.iter().map(|p| (p.id, p.position)).collect()
    }

    #[test]
    fn move_in_list_shifts_neighbours() {
        let mut items = vec!['a', 'b', 'c', 'd'];
        move_in_list(&mut items, 0, 2);
        assert_eq!(items, vec!['b', 'c', 'a', 'd']);
        move_in_list(&mut items, 3, 0);
        assert_eq!(items, vec!['d', 'b', 'c', 'a']);
        move_in_list(&mut items, 1, 1);
        assert_eq!(items, vec!['d', 'b', 'c', 'a']);
    }

    #[tokio::test]
    async fn load_ends_ready_with_items_in_position_order() {
        let store = MemoryStore::new();
        let ids = seeded(&store, 3).await;

        let collection = ProjectCollection::load(&store, "owner").await;
        assert_eq!(collection.state(), CollectionState::Ready);
        assert!(collection.load_error().is_none());
        let loaded: Vec<Uuid> = collection.items().iter().map(|p| p.id).collect();
        assert_eq!(loaded, ids.into_iter().rev().collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn add_inserts_at_zero_and_shifts_everyone_else() {
        let store = MemoryStore::new();
        seeded(&store, 3).await;
        let mut collection = ProjectCollection::load(&store, "owner").await;
        let before = positions(collection.items());

        let added = collection
            .add(draft("https://github.com/x/y"))
            .await
            .applied()
            .unwrap();

        assert_eq!(added.position, 0);
        assert_eq!(collection.items().len(), before.len() + 1);
        assert_eq!(collection.items()[0].id, added.id);
        for (id, position) in before {
            let now = collection.items().iter().find(|p| p.id == id).unwrap();
            assert_eq!(now.position, position + 1);
        }

        let persisted = store.list_projects("owner").await.unwrap();
        assert_eq!(positions(&persisted), positions(collection.items()));
    }

    #[tokio::test]
    async fn add_rejects_invalid_input_without_touching_anything() {
        let store = MemoryStore::new();
        let mut collection = ProjectCollection::load(&store, "owner").await;

        let mut pending = draft("https://ada.dev");
        pending.resolution_pending = true;
        assert_eq!(
            collection.add(pending).await,
            CommandResult::Rejected(ValidationError::ResolutionPending)
        );
        assert!(matches!(
            collection.add(draft("not a url")).await,
            CommandResult::Rejected(ValidationError::InvalidUrl { .. })
        ));
        assert!(collection.items().is_empty());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn failed_add_keeps_the_optimistic_entry() {
        let store = MemoryStore::new();
        let mut collection = ProjectCollection::load(&store, "owner").await;
        store.fail_writes(true);

        let result = collection.add(draft("https://ada.dev")).await;
        assert!(matches!(result, CommandResult::Failed { .. }));
        assert_eq!(collection.items().len(), 1);
        assert!(store.list_projects("owner").await.unwrap().is_empty());

        store.fail_writes(false);
        collection.refresh().await;
        assert!(collection.items().is_empty());
    }

    #[tokio::test]
    async fn edit_preserves_position() {
        let store = MemoryStore::new();
        let ids = seeded(&store, 3).await;
        let mut collection = ProjectCollection::load(&store, "owner").await;
        let target = ids[0];
        let position = collection.items().iter().find(|p| p.id == target).unwrap().position;

        let edited = collection
            .edit(
                target,
                ProjectUpdate {
                    title: Some("Renamed".into()),
                    description: Some("new words".into()),
                    ..Default::default()
                },
            )
            .await
            .applied()
            .unwrap();

        assert_eq!(edited.title, "Renamed");
        assert_eq!(edited.position, position);
        let stored = store.list_projects("owner").await.unwrap();
        let stored = stored.iter().find(|p| p.id == target).unwrap();
        assert_eq!(stored.description, "new words");
        assert_eq!(stored.position, position);
    }

    #[tokio::test]
    async fn delete_leaves_gaps_in_positions() {
        let store = MemoryStore::new();
        seeded(&store, 3).await;
        let mut collection = ProjectCollection::load(&store, "owner").await;
        let middle = collection.items()[1].id;

        assert!(collection.delete(middle).await.is_applied());
        let remaining: Vec<i32> = collection.items().iter().map(|p| p.position).collect();
        assert_eq!(remaining, vec![0, 2]);
        assert_eq!(store.list_projects("owner").await.unwrap().len(), 2);

        assert_eq!(
            collection.delete(middle).await,
            CommandResult::Rejected(ValidationError::UnknownProject(middle))
        );
    }

    #[tokio::test]
    async fn failed_delete_keeps_the_working_copy() {
        let store = MemoryStore::new();
        seeded(&store, 2).await;
        let mut collection = ProjectCollection::load(&store, "owner").await;
        let first = collection.items()[0].id;

        store.fail_writes(true);
        assert!(matches!(
            collection.delete(first).await,
            CommandResult::Failed { .. }
        ));
        assert_eq!(collection.items().len(), 2);
    }

    #[tokio::test]
    async fn move_renumbers_the_whole_collection() {
        let store = MemoryStore::new();
        seeded(&store, 4).await;
        let mut collection = ProjectCollection::load(&store, "owner").await;
        let order: Vec<Uuid> = collection.items().iter().map(|p| p.id).collect();

        assert!(collection.move_item(0, 3).await.is_applied());

        let expected = vec![order[1], order[2], order[3], order[0]];
        let now: Vec<Uuid> = collection.items().iter().map(|p| p.id).collect();
        assert_eq!(now, expected);
        let persisted = store.list_projects("owner").await.unwrap();
        assert_eq!(
            positions(&persisted),
            expected.iter().enumerate().map(|(i, id)| (*id, i as i32)).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn moving_onto_the_same_index_writes_nothing() {
        let store = MemoryStore::new();
        seeded(&store, 3).await;
        let mut collection = ProjectCollection::load(&store, "owner").await;
        let middle = collection.items()[1].id;
        assert!(collection.delete(middle).await.is_applied());
        let before = positions(collection.items());
        let writes = store.write_count();

        assert!(collection.move_item(1, 1).await.is_applied());
        let current: Vec<Uuid> = collection.items().iter().map(|p| p.id).collect();
        assert!(collection.reorder(&current).await.is_applied());

        assert_eq!(positions(collection.items()), before);
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn reorder_rejects_foreign_or_missing_ids() {
        let store = MemoryStore::new();
        let ids = seeded(&store, 3).await;
        let mut collection = ProjectCollection::load(&store, "owner").await;
        let before = positions(collection.items());

        assert_eq!(
            collection.reorder(&ids[..2]).await,
            CommandResult::Rejected(ValidationError::OrderMismatch)
        );
        assert_eq!(
            collection.reorder(&[ids[0], ids[1], Uuid::new_v4()]).await,
            CommandResult::Rejected(ValidationError::OrderMismatch)
        );
        assert_eq!(
            collection.reorder(&[ids[0], ids[0], ids[1]]).await,
            CommandResult::Rejected(ValidationError::OrderMismatch)
        );
        assert_eq!(positions(collection.items()), before);

        assert!(collection.reorder(&ids).await.is_applied());
        let now: Vec<Uuid> = collection.items().iter().map(|p| p.id).collect();
        assert_eq!(now, ids);
    }

    #[tokio::test]
    async fn failed_reorder_keeps_the_new_local_order() {
        let store = MemoryStore::new();
        seeded(&store, 2).await;
        let mut collection = ProjectCollection::load(&store, "owner").await;
        let order: Vec<Uuid> = collection.items().iter().map(|p| p.id).collect();

        store.fail_writes(true);
        assert!(matches!(
            collection.move_item(1, 0).await,
            CommandResult::Failed { .. }
        ));
        assert_eq!(collection.items()[0].id, order[1]);

        store.fail_writes(false);
        let persisted: Vec<Uuid> = store
            .list_projects("owner")
            .await
            .unwrap()
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(persisted, order);
    }

    #[tokio::test]
    async fn rejected_reorder_keeps_tied_positions_in_place() {
        let store = MemoryStore::new();
        let ids = seeded(&store, 3).await;
        let tied: Vec<(Uuid, i32)> = ids.iter().map(|id| (*id, 0)).collect();
        store.set_positions("owner", &tied).await.unwrap();

        let mut collection = ProjectCollection::load(&store, "owner").await;
        let before: Vec<Uuid> = collection.items().iter().map(|p| p.id).collect();
        let mut shuffled = before.clone();
        shuffled.swap(0, 2);
        shuffled[1] = Uuid::new_v4();

        assert_eq!(
            collection.reorder(&shuffled).await,
            CommandResult::Rejected(ValidationError::OrderMismatch)
        );
        let after: Vec<Uuid> = collection.items().iter().map(|p| p.id).collect();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn commands_on_an_unloaded_list_fail_instead_of_rejecting() {
        let store = MemoryStore::new();
        let ids = seeded(&store, 2).await;

        store.fail_reads(true);
        let mut collection = ProjectCollection::load(&store, "owner").await;
        store.fail_reads(false);
        assert!(collection.load_error().is_some());
        let writes = store.write_count();

        assert!(matches!(
            collection.edit(ids[0], ProjectUpdate::default()).await,
            CommandResult::Failed { .. }
        ));
        assert!(matches!(collection.delete(ids[0]).await, CommandResult::Failed { .. }));
        assert!(matches!(collection.reorder(&ids).await, CommandResult::Failed { .. }));
        assert!(matches!(collection.move_item(0, 1).await, CommandResult::Failed { .. }));
        assert!(matches!(
            collection.add(draft("https://late.dev")).await,
            CommandResult::Failed { .. }
        ));
        assert_eq!(store.write_count(), writes);
        assert_eq!(store.list_projects("owner").await.unwrap().len(), 2);
    }
}
