//! # API Facade
//!
//! The single entry point for UIs. It pairs an [`Engine`] with a note store and
//! forwards to them:
//!
//! - **Catalog**: `pods`, `describe`
//! - **Runs**: `run` takes a boundary [`PodRequest`]
//! - **Store**: `notes`
//!
//! Like the engine, the facade does no I/O of its own beyond what pods and the
//! store do, and returns data structures, never formatted strings.
//!
//! `PodlineApi<S: NoteStore>` is generic over the store:
//! - Production: `PodlineApi<FileStore>`
//! - Testing: `PodlineApi<InMemoryStore>`

use crate::engine::{Engine, PodRequest};
use crate::error::Result;
use crate::model::{Note, PodKind};
use crate::pod::{ExecContext, PodResult};
use crate::registry::{PodDescriptor, PodRegistry};
use crate::store::NoteStore;
use std::sync::Arc;

pub struct PodlineApi<S: NoteStore> {
    engine: Engine,
    store: S,
}

impl<S: NoteStore> PodlineApi<S> {
    pub fn new(engine: Engine, store: S) -> Self {
        Self { engine, store }
    }

    /// Facade over the built-in pod catalog.
    pub fn with_builtin_pods(store: S) -> Result<Self> {
        let registry = PodRegistry::builtin()?;
        Ok(Self::new(Engine::new(Arc::new(registry)), store))
    }

    /// Registered pods, optionally of one kind, in registration order.
    pub fn pods(&self, kind: Option<PodKind>) -> Vec<&PodDescriptor> {
        match kind {
            Some(kind) => self.engine.registry().list(kind),
            None => self.engine.registry().all().collect(),
        }
    }

    pub fn describe(&self, kind: PodKind, id: &str) -> Result<&PodDescriptor> {
        self.engine.registry().resolve(id, kind)
    }

    pub fn run(&self, request: &PodRequest, exec: ExecContext) -> Result<PodResult> {
        self.engine.dispatch(request, &self.store, exec)
    }

    pub fn notes(&self) -> Result<Vec<Note>> {
        self.store.get_all()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}
