//! # Pod Contract
//!
//! A pod is a unit of work that moves notes in one direction relative to the
//! note store. There are three capability variants:
//!
//! | Kind | Input | Output |
//! |------|-------|--------|
//! | Import | external source | notes merged into the store by the engine |
//! | Export | selected notes | raw data written to a sink |
//! | Publish | selected notes | rendered output (HTML, site JSON, ...) |
//!
//! All three share the [`Pod`] base: `prepare` receives the validated config
//! before `execute` is ever called. The engine holds pods as a [`PodInstance`]
//! and dispatches on its variant.
//!
//! ## Failure semantics
//!
//! Inside `execute`, errors where [`PodError::is_fatal`] is false are recorded
//! against the item and the run continues. A fatal error aborts the run; it
//! becomes the only entry in `PodResult::errors`. Pods check the
//! [`ExecContext`] between items so cancellation and deadlines take effect
//! without tearing an item in half.
//!
//! ## Idempotence
//!
//! Given the same config and the same store snapshot, `execute` must produce an
//! equivalent result, so callers can retry safely.

pub mod context;
pub mod result;

use crate::error::{PodError, Result};
use crate::model::{Note, PodKind};
use crate::validate::PodConfig;

pub use context::{CancelToken, ExecContext};
pub use result::{ItemOutcome, PodResult, ResultBuilder, ResultError};

/// Capabilities shared by every pod.
pub trait Pod: Send {
    /// Receive the validated config. Called exactly once, before `execute`.
    fn prepare(&mut self, config: &PodConfig) -> Result<()>;
}

/// Reads an external source and produces notes for the store.
pub trait ImportPod: Pod {
    fn execute(&self, ctx: &ExecContext) -> Result<ImportBatch>;
}

/// Writes selected notes to an external sink.
pub trait ExportPod: Pod {
    fn execute(&self, notes: &[Note], ctx: &ExecContext) -> Result<PodResult>;
}

/// Renders selected notes for presentation.
pub trait PublishPod: Pod {
    fn execute(&self, notes: &[Note], ctx: &ExecContext) -> Result<PodResult>;
}

/// A constructed pod, tagged by kind.
pub enum PodInstance {
    Import(Box<dyn ImportPod>),
    Export(Box<dyn ExportPod>),
    Publish(Box<dyn PublishPod>),
}

impl PodInstance {
    pub fn kind(&self) -> PodKind {
        match self {
            PodInstance::Import(_) => PodKind::Import,
            PodInstance::Export(_) => PodKind::Export,
            PodInstance::Publish(_) => PodKind::Publish,
        }
    }

    pub fn prepare(&mut self, config: &PodConfig) -> Result<()> {
        match self {
            PodInstance::Import(pod) => pod.prepare(config),
            PodInstance::Export(pod) => pod.prepare(config),
            PodInstance::Publish(pod) => pod.prepare(config),
        }
    }
}

/// Notes produced by an import pod, plus the outcome of every source item.
///
/// The engine merges `notes` into the store; nothing is written when `execute`
/// returns an error.
#[derive(Debug, Default)]
pub struct ImportBatch {
    notes: Vec<Note>,
    outcomes: ResultBuilder,
}

impl ImportBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a produced note, recorded as a successful item under its id.
    pub fn push(&mut self, note: Note) {
        self.outcomes.success(note.id.clone());
        self.notes.push(note);
    }

    /// Record the parse result of one source item under `item`.
    ///
    /// Returns the error only when it is fatal.
    pub fn record(&mut self, item: &str, outcome: Result<Note>) -> Result<()> {
        match outcome {
            Ok(note) => {
                self.push(note);
                Ok(())
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                self.outcomes.failure(item, &err);
                Ok(())
            }
        }
    }

    /// See [`ResultBuilder::checkpoint`].
    pub fn checkpoint(&mut self, ctx: &ExecContext) -> bool {
        self.outcomes.checkpoint(ctx)
    }

    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn is_interrupted(&self) -> bool {
        self.outcomes.is_interrupted()
    }

    pub(crate) fn into_parts(self) -> (Vec<Note>, ResultBuilder) {
        (self.notes, self.outcomes)
    }
}

/// Access state set by `prepare`; using a pod before `prepare` is a fatal bug.
pub fn prepared<'a, T>(state: &'a Option<T>, pod: &str) -> Result<&'a T> {
    state
        .as_ref()
        .ok_or_else(|| PodError::execution(format!("pod `{}` executed before prepare", pod)))
}
