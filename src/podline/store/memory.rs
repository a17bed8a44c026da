use super::{apply_batch, dedupe_batch, poisoned, MergeReport, NoteStore};
use crate::error::{PodError, Result};
use crate::model::Note;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-memory note store.
/// Does NOT persist data.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    notes: RwLock<BTreeMap<String, Note>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notes(notes: impl IntoIterator<Item = Note>) -> Self {
        Self {
            notes: RwLock::new(notes.into_iter().map(|n| (n.id.clone(), n)).collect()),
        }
    }
}

impl NoteStore for InMemoryStore {
    fn get(&self, id: &str) -> Result<Note> {
        let notes = self.notes.read().map_err(|_| poisoned())?;
        notes
            .get(id)
            .cloned()
            .ok_or_else(|| PodError::NoteNotFound(id.to_string()))
    }

    fn get_all(&self) -> Result<Vec<Note>> {
        let notes = self.notes.read().map_err(|_| poisoned())?;
        Ok(notes.values().cloned().collect())
    }

    fn merge(&self, batch: Vec<Note>) -> Result<MergeReport> {
        let (batch, collisions) = dedupe_batch(batch);
        let mut notes = self.notes.write().map_err(|_| poisoned())?;
        Ok(apply_batch(&mut notes, batch, collisions))
    }

    fn len(&self) -> Result<usize> {
        Ok(self.notes.read().map_err(|_| poisoned())?.len())
    }
}

// --- Test Fixtures ---

#[cfg(any(test, feature = "test_utils"))]
pub mod fixtures {
    use super::*;

    pub struct StoreFixture {
        pub store: InMemoryStore,
    }

    impl Default for StoreFixture {
        fn default() -> Self {
            Self::new()
        }
    }

    impl StoreFixture {
        pub fn new() -> Self {
            Self {
                store: InMemoryStore::new(),
            }
        }

        /// `count` notes `note-1..=count` under the `fixture` hierarchy.
        pub fn with_notes(self, count: usize) -> Self {
            let notes = (1..=count).map(|i| {
                Note::new(
                    format!("note-{}", i),
                    format!("fixture.note-{}", i),
                    format!("Content for note {}", i),
                )
            });
            self.store.merge(notes.collect()).unwrap();
            self
        }

        pub fn with_note(self, id: &str, fname: &str, body: &str) -> Self {
            self.store.merge(vec![Note::new(id, fname, body)]).unwrap();
            self
        }
    }
}
