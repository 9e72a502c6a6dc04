//! The persistence seam used by the engine.
//!
//! The core only needs CRUD plus predicate filtering and an explicit,
//! fallible save. [`crate::db::Database`] is the SQLite implementation.

use std::fmt;

use anyhow::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Top-level record kinds. Menu items and milestones are owned by their
/// stall / quest and travel inside the owner's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Area,
    Stall,
    Quest,
    UserProgress,
}

impl EntityKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Area => "area",
            EntityKind::Stall => "stall",
            EntityKind::Quest => "quest",
            EntityKind::UserProgress => "user_progress",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait Entity: Serialize + DeserializeOwned + Clone {
    const KIND: EntityKind;

    fn id(&self) -> Uuid;
}

pub type Predicate<'a, E> = &'a dyn Fn(&E) -> bool;

pub trait EntityStore {
    /// All records of kind `E`, in insertion order, optionally filtered.
    fn fetch<E: Entity>(&self, predicate: Option<Predicate<'_, E>>) -> Result<Vec<E>>;

    fn fetch_count<E: Entity>(&self, predicate: Option<Predicate<'_, E>>) -> Result<usize> {
        Ok(self.fetch(predicate)?.len())
    }

    fn fetch_by_id<E: Entity>(&self, id: Uuid) -> Result<Option<E>> {
        let by_id = |e: &E| e.id() == id;
        Ok(self.fetch::<E>(Some(&by_id))?.into_iter().next())
    }

    /// Insert or replace the record with the same id. Staged until [`save`](Self::save).
    fn insert<E: Entity>(&mut self, entity: &E) -> Result<()>;

    /// Returns `false` when no record had that id.
    fn delete<E: Entity>(&mut self, id: Uuid) -> Result<bool>;

    fn save(&mut self) -> Result<()>;
}
