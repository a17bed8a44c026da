use super::{apply_batch, dedupe_batch, poisoned, MergeReport, NoteStore};
use crate::error::{PodError, Result};
use crate::model::Note;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use uuid::Uuid;

const NOTES_FILE: &str = "notes.json";

/// Note store persisted as `notes.json` under a root directory.
///
/// The guard serializes writers within one process; the file itself is always
/// replaced with a rename, so a reader never sees a half-written file.
pub struct FileStore {
    root: PathBuf,
    guard: RwLock<()>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            guard: RwLock::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn notes_file(&self) -> PathBuf {
        self.root.join(NOTES_FILE)
    }

    fn load(&self) -> Result<BTreeMap<String, Note>> {
        let path = self.notes_file();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = fs::read_to_string(&path).map_err(|e| store_io(&path, e))?;
        let notes: Vec<Note> = serde_json::from_str(&content).map_err(|e| {
            PodError::Store(format!("corrupt note store {}: {}", path.display(), e))
        })?;
        Ok(notes.into_iter().map(|n| (n.id.clone(), n)).collect())
    }

    fn save(&self, notes: &BTreeMap<String, Note>) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(|e| store_io(&self.root, e))?;
        }
        let ordered: Vec<&Note> = notes.values().collect();
        let content = serde_json::to_string_pretty(&ordered)?;

        let tmp_file = self.root.join(format!(".notes-{}.tmp", Uuid::new_v4()));
        fs::write(&tmp_file, content).map_err(|e| store_io(&tmp_file, e))?;
        fs::rename(&tmp_file, self.notes_file()).map_err(|e| store_io(&tmp_file, e))?;
        Ok(())
    }
}

fn store_io(path: &Path, err: std::io::Error) -> PodError {
    PodError::Store(format!("{}: {}", path.display(), err))
}

impl NoteStore for FileStore {
    fn get(&self, id: &str) -> Result<Note> {
        let _read = self.guard.read().map_err(|_| poisoned())?;
        self.load()?
            .remove(id)
            .ok_or_else(|| PodError::NoteNotFound(id.to_string()))
    }

    fn get_all(&self) -> Result<Vec<Note>> {
        let _read = self.guard.read().map_err(|_| poisoned())?;
        Ok(self.load()?.into_values().collect())
    }

    fn merge(&self, batch: Vec<Note>) -> Result<MergeReport> {
        let (batch, collisions) = dedupe_batch(batch);
        let _write = self.guard.write().map_err(|_| poisoned())?;
        let mut notes = self.load()?;
        let report = apply_batch(&mut notes, batch, collisions);
        self.save(&notes)?;
        tracing::debug!(
            store = %self.root.display(),
            inserted = report.inserted,
            updated = report.updated,
            "merged notes"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_empty_store_without_file() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path().join("store"));
        assert!(store.get_all().unwrap().is_empty());
        assert!(matches!(store.get("x"), Err(PodError::NoteNotFound(_))));
    }

    #[test]
    fn test_merge_persists_across_instances() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store
            .merge(vec![Note::new("b", "beta", "B"), Note::new("a", "alpha", "A")])
            .unwrap();

        let reopened = FileStore::new(dir.path());
        let ids: Vec<_> = reopened
            .get_all()
            .unwrap()
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(reopened.get("b").unwrap().body, "B");
    }

    #[test]
    fn test_merge_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.merge(vec![Note::new("a", "a", "")]).unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, vec![NOTES_FILE]);
    }

    #[test]
    fn test_corrupt_file_is_a_store_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(NOTES_FILE), "{not json").unwrap();
        let err = FileStore::new(dir.path()).get_all().unwrap_err();
        assert!(matches!(err, PodError::Store(_)));
        assert!(err.is_fatal());
    }
}
