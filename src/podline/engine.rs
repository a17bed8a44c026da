//! # Execution Engine
//!
//! Runs one pod invocation to completion:
//!
//! 1. **Resolve** the descriptor; an unknown pod fails with `NotFound` before
//!    the config is looked at.
//! 2. **Validate** the raw config against the descriptor's schema; every field
//!    problem is reported in one `ConfigValidation` error.
//! 3. **Instantiate** the pod and **prepare** it; a prepare failure is returned
//!    and `execute` never runs.
//! 4. **Execute**: import pods take no input, export and publish pods take the
//!    selected notes.
//! 5. Return the `PodResult`. The engine never retries.
//!
//! Errors from steps 1-3 and from note selection are returned as `Err`, before
//! any side effect. A fatal error raised by `execute` is reported inside the
//! result as its only error.
//!
//! ## Import side effects
//!
//! The notes an import pod produced are merged into the store in one atomic
//! call, once `execute` has returned. Duplicate ids within the batch resolve
//! last-write-wins and each duplicate adds a `collision` warning. When
//! `execute` fails, nothing is merged.
//!
//! ## Selection
//!
//! Export and publish pods get an explicit id list from the [`RunContext`], or
//! every note when none was given. The notes are read from a single store
//! snapshot; the pod owns its copy.

use crate::error::{PodError, Result};
use crate::model::{Note, PodKind};
use crate::pod::{ExecContext, ImportPod, PodInstance, PodResult, ResultError};
use crate::registry::PodRegistry;
use crate::store::NoteStore;
use crate::validate::{validate, RawConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Which notes an export or publish run receives.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    All,
    Ids(Vec<String>),
}

impl Selection {
    /// `None` or an empty list select everything.
    pub fn from_ids(ids: Option<Vec<String>>) -> Self {
        match ids {
            Some(ids) if !ids.is_empty() => Selection::Ids(ids),
            _ => Selection::All,
        }
    }
}

/// Everything a run needs besides the pod and its config.
pub struct RunContext<'a, S: NoteStore + ?Sized> {
    pub store: &'a S,
    pub selection: Selection,
    pub exec: ExecContext,
}

impl<'a, S: NoteStore + ?Sized> RunContext<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            selection: Selection::All,
            exec: ExecContext::new(),
        }
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_exec(mut self, exec: ExecContext) -> Self {
        self.exec = exec;
        self
    }
}

/// Boundary request format submitted by a CLI or API layer.
///
/// ```json
/// { "kind": "export", "podId": "json", "config": { "target": "/out" }, "notes": ["note-1"] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodRequest {
    pub kind: PodKind,
    pub pod_id: String,
    #[serde(default)]
    pub config: RawConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct Engine {
    registry: Arc<PodRegistry>,
}

impl Engine {
    pub fn new(registry: Arc<PodRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &PodRegistry {
        &self.registry
    }

    pub fn run<S: NoteStore + ?Sized>(
        &self,
        kind: PodKind,
        id: &str,
        raw: &RawConfig,
        ctx: &RunContext<'_, S>,
    ) -> Result<PodResult> {
        let span = tracing::info_span!("pod_run", run_id = %ctx.exec.run_id(), %kind, pod = id);
        let _enter = span.enter();

        let descriptor = self.registry.resolve(id, kind)?;
        let config = validate(&descriptor.config_schema, raw)?;
        let mut pod = self.registry.instantiate(id, kind)?;
        pod.prepare(&config).map_err(|err| match err {
            PodError::Prepare { .. } => err,
            other => PodError::Prepare {
                pod: id.to_string(),
                message: other.to_string(),
            },
        })?;
        tracing::debug!(fields = config.len(), "pod prepared");

        let result = match pod {
            PodInstance::Import(pod) => {
                if ctx.selection != Selection::All {
                    tracing::debug!("note selection ignored for import");
                }
                run_import(pod.as_ref(), ctx)
            }
            PodInstance::Export(pod) => {
                let notes = select_notes(ctx)?;
                pod.execute(&notes, &ctx.exec)
                    .unwrap_or_else(|err| PodResult::fatal(&err))
            }
            PodInstance::Publish(pod) => {
                let notes = select_notes(ctx)?;
                pod.execute(&notes, &ctx.exec)
                    .unwrap_or_else(|err| PodResult::fatal(&err))
            }
        };

        if result.succeeded() {
            tracing::info!(items = result.item_results().len(), "pod run succeeded");
        } else {
            tracing::warn!(
                items = result.item_results().len(),
                failed = result.failed_count(),
                errors = result.errors().len(),
                "pod run did not succeed"
            );
        }
        Ok(result)
    }

    /// Run a boundary request.
    pub fn dispatch<S: NoteStore + ?Sized>(
        &self,
        request: &PodRequest,
        store: &S,
        exec: ExecContext,
    ) -> Result<PodResult> {
        let ctx = RunContext::new(store)
            .with_selection(Selection::from_ids(request.notes.clone()))
            .with_exec(exec);
        self.run(request.kind, &request.pod_id, &request.config, &ctx)
    }
}

fn run_import<S: NoteStore + ?Sized>(pod: &dyn ImportPod, ctx: &RunContext<'_, S>) -> PodResult {
    let batch = match pod.execute(&ctx.exec) {
        Ok(batch) => batch,
        Err(err) => {
            tracing::error!(error = %err, "import aborted, nothing merged");
            return PodResult::fatal(&err);
        }
    };

    let (notes, mut outcomes) = batch.into_parts();
    if notes.is_empty() {
        return outcomes.finish();
    }

    match ctx.store.merge(notes) {
        Ok(report) => {
            tracing::debug!(
                inserted = report.inserted,
                updated = report.updated,
                "import merged"
            );
            for id in &report.collisions {
                tracing::warn!(note = %id, "duplicate note id in import, last write wins");
                outcomes.warning(ResultError::collision(id));
            }
            outcomes.finish()
        }
        Err(err) => {
            tracing::error!(error = %err, "merge failed");
            PodResult::fatal(&err)
        }
    }
}

/// Selected notes from one store snapshot, in selection order.
fn select_notes<S: NoteStore + ?Sized>(ctx: &RunContext<'_, S>) -> Result<Vec<Note>> {
    let snapshot = ctx.store.get_all()?;
    match &ctx.selection {
        Selection::All => Ok(snapshot),
        Selection::Ids(ids) => {
            let by_id: HashMap<&str, &Note> =
                snapshot.iter().map(|n| (n.id.as_str(), n)).collect();
            ids.iter()
                .map(|id| {
                    by_id
                        .get(id.as_str())
                        .map(|note| (*note).clone())
                        .ok_or_else(|| PodError::NoteNotFound(id.clone()))
                })
                .collect()
        }
    }
}
