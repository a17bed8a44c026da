use crate::error::{PodError, Result};
use crate::pod::context::ExecContext;
use serde::Serialize;

/// Outcome of one processed unit (usually one note).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemOutcome {
    pub item: String,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// One entry of [`PodResult::errors`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
}

impl ResultError {
    pub fn from_error(err: &PodError, item: Option<&str>) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
            item: item.map(str::to_string),
        }
    }

    /// Warning for a note id produced more than once in one import run.
    pub fn collision(id: &str) -> Self {
        Self {
            code: "collision".to_string(),
            message: format!("note `{}` was produced more than once; last write wins", id),
            item: Some(id.to_string()),
        }
    }
}

/// Aggregate outcome of one pod run.
///
/// `succeeded` is derived, never set: it is true iff every item succeeded and
/// no error was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodResult {
    succeeded: bool,
    item_results: Vec<ItemOutcome>,
    errors: Vec<ResultError>,
}

impl PodResult {
    pub fn new(item_results: Vec<ItemOutcome>, errors: Vec<ResultError>) -> Self {
        let succeeded = errors.is_empty() && item_results.iter().all(|o| o.succeeded);
        Self {
            succeeded,
            item_results,
            errors,
        }
    }

    /// Result of a run with nothing to process.
    pub fn empty() -> Self {
        Self::new(Vec::new(), Vec::new())
    }

    /// Result of a run aborted by a fatal error before any item was recorded.
    pub fn fatal(err: &PodError) -> Self {
        Self::new(Vec::new(), vec![ResultError::from_error(err, None)])
    }

    pub fn succeeded(&self) -> bool {
        self.succeeded
    }

    pub fn item_results(&self) -> &[ItemOutcome] {
        &self.item_results
    }

    pub fn errors(&self) -> &[ResultError] {
        &self.errors
    }

    pub fn succeeded_count(&self) -> usize {
        self.item_results.iter().filter(|o| o.succeeded).count()
    }

    pub fn failed_count(&self) -> usize {
        self.item_results.len() - self.succeeded_count()
    }
}

/// Accumulates item outcomes while a pod works through its items.
///
/// ```ignore
/// let mut out = ResultBuilder::new();
/// for note in notes {
///     if out.checkpoint(ctx) {
///         break;
///     }
///     if let Err(fatal) = out.record(&note.id, self.write(note)) {
///         return Ok(out.abort(&fatal));
///     }
/// }
/// Ok(out.finish())
/// ```
#[derive(Debug, Default)]
pub struct ResultBuilder {
    items: Vec<ItemOutcome>,
    errors: Vec<ResultError>,
    interrupted: Option<ResultError>,
}

impl ResultBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn success(&mut self, item: impl Into<String>) {
        self.items.push(ItemOutcome {
            item: item.into(),
            succeeded: true,
            detail: None,
        });
    }

    pub fn success_with(&mut self, item: impl Into<String>, detail: impl Into<String>) {
        self.items.push(ItemOutcome {
            item: item.into(),
            succeeded: true,
            detail: Some(detail.into()),
        });
    }

    /// Record a non-fatal failure for one item.
    pub fn failure(&mut self, item: impl Into<String>, err: &PodError) {
        let item = item.into();
        self.errors.push(ResultError::from_error(err, Some(&item)));
        self.items.push(ItemOutcome {
            item,
            succeeded: false,
            detail: Some(err.to_string()),
        });
    }

    pub fn warning(&mut self, warning: ResultError) {
        self.errors.push(warning);
    }

    /// Record the outcome of one item step.
    ///
    /// Successes and per-item failures are recorded; a fatal error is handed
    /// back untouched so the caller can abort.
    pub fn record<T>(&mut self, item: &str, outcome: Result<T>) -> Result<Option<T>> {
        match outcome {
            Ok(value) => {
                self.success(item);
                Ok(Some(value))
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                self.failure(item, &err);
                Ok(None)
            }
        }
    }

    /// Check the context between items. Returns `true` when the run must stop;
    /// the interruption is then recorded after the committed outcomes.
    pub fn checkpoint(&mut self, ctx: &ExecContext) -> bool {
        match ctx.checkpoint() {
            Ok(()) => false,
            Err(err) => {
                self.interrupt(&err);
                true
            }
        }
    }

    pub fn interrupt(&mut self, err: &PodError) {
        self.interrupted = Some(ResultError::from_error(err, None));
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.is_some()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn finish(self) -> PodResult {
        let mut errors = self.errors;
        errors.extend(self.interrupted);
        PodResult::new(self.items, errors)
    }

    /// Abort on a fatal error: keep the outcomes so far, report only the fatal error.
    pub fn abort(self, err: &PodError) -> PodResult {
        PodResult::new(self.items, vec![ResultError::from_error(err, None)])
    }
}
