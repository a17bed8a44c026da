//! # Note Store
//!
//! The canonical collection of notes keyed by id. The engine only talks to the
//! store through the [`NoteStore`] trait:
//!
//! - export and publish runs read a snapshot (`get` / `get_all`),
//! - import runs write once, through `merge`, after the pod has finished.
//!
//! ## Implementations
//!
//! - [`memory::InMemoryStore`]: `RwLock`-guarded map, used in tests and embedding.
//! - [`fs::FileStore`]: a single `notes.json` file, replaced atomically
//!   (write to a temp file, then rename).
//!
//! ## Merge semantics
//!
//! `merge` applies a whole batch or nothing. Readers running concurrently see
//! either the state before the merge or the state after it. Within one batch,
//! the last note with a given id wins and every earlier duplicate is reported
//! as a collision.

use crate::error::{PodError, Result};
use crate::model::Note;
use std::collections::BTreeMap;

pub mod fs;
pub mod memory;

/// What a merge changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub inserted: usize,
    pub updated: usize,
    /// One entry per duplicate occurrence of an id within the batch.
    pub collisions: Vec<String>,
}

/// Accessor interface for the note store.
///
/// Methods take `&self`; implementations guard their own state so independent
/// runs can share one store across threads.
pub trait NoteStore {
    /// Get one note, failing with [`PodError::NoteNotFound`] when absent.
    fn get(&self, id: &str) -> Result<Note>;

    /// All notes, ordered by id.
    fn get_all(&self) -> Result<Vec<Note>>;

    /// Merge a batch of notes atomically, last write wins.
    fn merge(&self, notes: Vec<Note>) -> Result<MergeReport>;

    fn len(&self) -> Result<usize> {
        Ok(self.get_all()?.len())
    }

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Collapse a batch to one note per id, keeping the last, and list collisions.
pub(crate) fn dedupe_batch(notes: Vec<Note>) -> (BTreeMap<String, Note>, Vec<String>) {
    let mut latest = BTreeMap::new();
    let mut collisions = Vec::new();
    for note in notes {
        if let Some(previous) = latest.insert(note.id.clone(), note) {
            collisions.push(previous.id);
        }
    }
    (latest, collisions)
}

/// Apply a deduplicated batch to `target`, counting inserts and updates.
pub(crate) fn apply_batch(
    target: &mut BTreeMap<String, Note>,
    batch: BTreeMap<String, Note>,
    collisions: Vec<String>,
) -> MergeReport {
    let mut report = MergeReport {
        collisions,
        ..MergeReport::default()
    };
    for (id, note) in batch {
        if target.insert(id, note).is_some() {
            report.updated += 1;
        } else {
            report.inserted += 1;
        }
    }
    report
}

pub(crate) fn poisoned() -> PodError {
    PodError::Store("note store lock poisoned".to_string())
}
