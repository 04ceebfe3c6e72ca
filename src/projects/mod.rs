mod collection;

pub use collection::{CollectionState, ProjectCollection, move_in_list};
