use podline::error::FieldError;
use podline::pod::{ExportPod, Pod, ResultBuilder};
use podline::schema::{FieldSpec, FieldType, Schema};
use podline::store::memory::InMemoryStore;
use podline::store::NoteStore;
use podline::validate::{PodConfig, RawConfig};
use podline::{
    Engine, ExecContext, Note, PodError, PodKind, PodRegistry, PodResult, RunContext, Selection,
};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;

fn builtin_engine() -> Engine {
    Engine::new(Arc::new(PodRegistry::builtin().unwrap()))
}

fn raw(value: Value) -> RawConfig {
    value.as_object().cloned().unwrap()
}

fn write_json(path: &Path, value: Value) {
    std::fs::write(path, serde_json::to_string(&value).unwrap()).unwrap();
}

#[test]
fn test_resolve_returns_exact_id_and_kind() {
    let registry = PodRegistry::builtin().unwrap();
    for descriptor in registry.all() {
        let resolved = registry.resolve(descriptor.id, descriptor.kind).unwrap();
        assert_eq!(resolved.id, descriptor.id);
        assert_eq!(resolved.kind, descriptor.kind);

        for other in PodKind::ALL.into_iter().filter(|k| *k != descriptor.kind) {
            let registered = registry.list(other).iter().any(|d| d.id == descriptor.id);
            if !registered {
                assert!(matches!(
                    registry.resolve(descriptor.id, other),
                    Err(PodError::NotFound { .. })
                ));
            }
        }
    }
    assert!(registry.resolve("graphviz", PodKind::Import).is_err());
}

#[test]
fn test_missing_required_fields_are_reported_together() {
    let engine = builtin_engine();
    let store = InMemoryStore::new();
    let ctx = RunContext::new(&store);

    let err = engine
        .run(PodKind::Export, "json", &RawConfig::new(), &ctx)
        .unwrap_err();
    assert_eq!(
        err.field_errors(),
        &[FieldError::MissingField {
            field: "target".to_string()
        }]
    );

    let err = engine
        .run(
            PodKind::Export,
            "json",
            &raw(json!({"pretty": "very"})),
            &ctx,
        )
        .unwrap_err();
    let fields: Vec<&str> = err.field_errors().iter().map(FieldError::field).collect();
    assert_eq!(fields, vec!["target", "pretty"]);
    assert!(matches!(err, PodError::ConfigValidation(_)));
}

#[test]
fn test_unknown_pod_fails_before_validation() {
    let engine = builtin_engine();
    let store = InMemoryStore::new();
    let err = engine
        .run(
            PodKind::Import,
            "does-not-exist",
            &RawConfig::new(),
            &RunContext::new(&store),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        PodError::NotFound {
            kind: PodKind::Import,
            ..
        }
    ));
}

#[test]
fn test_empty_store_export_succeeds_without_writing() {
    let engine = builtin_engine();
    let store = InMemoryStore::new();
    let result = engine
        .run(
            PodKind::Export,
            "json",
            &raw(json!({"target": "/out"})),
            &RunContext::new(&store),
        )
        .unwrap();
    assert!(result.succeeded());
    assert!(result.item_results().is_empty());
    assert!(result.errors().is_empty());
    assert!(!Path::new("/out").exists());
}

#[test]
fn test_import_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("notes.json");
    write_json(
        &src,
        json!([
            {"id": "a", "fname": "projects", "body": "All projects"},
            {"id": "b", "fname": "projects.podline", "title": "Podline", "body": "Pods"},
        ]),
    );

    let engine = builtin_engine();
    let store = InMemoryStore::new();
    let config = raw(json!({"src": src}));
    let ctx = RunContext::new(&store);

    let first = engine.run(PodKind::Import, "json", &config, &ctx).unwrap();
    let after_first = store.get_all().unwrap();
    let second = engine.run(PodKind::Import, "json", &config, &ctx).unwrap();

    assert!(first.succeeded());
    assert_eq!(first, second);
    assert_eq!(store.get_all().unwrap(), after_first);
    assert_eq!(after_first.len(), 2);
    assert_eq!(store.get("a").unwrap().title, "Projects");
}

#[test]
fn test_item_failures_are_aggregated() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("notes.json");
    let items: Vec<Value> = (1..=10)
        .map(|i| {
            if i % 3 == 0 {
                // no fname
                json!({"id": format!("note-{}", i), "body": "broken"})
            } else {
                json!({"id": format!("note-{}", i), "fname": format!("n{}", i)})
            }
        })
        .collect();
    write_json(&src, Value::Array(items));

    let engine = builtin_engine();
    let store = InMemoryStore::new();
    let result = engine
        .run(
            PodKind::Import,
            "json",
            &raw(json!({"src": src})),
            &RunContext::new(&store),
        )
        .unwrap();

    assert!(!result.succeeded());
    assert_eq!(result.item_results().len(), 10);
    assert_eq!(result.succeeded_count(), 7);
    assert_eq!(result.errors().len(), 3);
    assert_eq!(result.errors()[0].item.as_deref(), Some("note-3"));
    assert_eq!(store.len().unwrap(), 7);
}

#[test]
fn test_duplicate_id_in_one_import_is_one_note_and_one_warning() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("notes.json");
    write_json(
        &src,
        json!([
            {"id": "note-1", "fname": "first", "body": "from the first source"},
            {"id": "note-1", "fname": "second", "body": "from the second source"},
        ]),
    );

    let engine = builtin_engine();
    let store = InMemoryStore::new();
    let result = engine
        .run(
            PodKind::Import,
            "json",
            &raw(json!({"src": src})),
            &RunContext::new(&store),
        )
        .unwrap();

    assert_eq!(store.len().unwrap(), 1);
    assert_eq!(store.get("note-1").unwrap().body, "from the second source");
    assert_eq!(result.errors().len(), 1);
    assert_eq!(result.errors()[0].code, "collision");
    assert_eq!(result.errors()[0].item.as_deref(), Some("note-1"));
    assert!(!result.succeeded());
}

#[test]
fn test_failed_import_merges_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("notes.json");
    std::fs::write(&src, "{ not an array").unwrap();

    let engine = builtin_engine();
    let store = InMemoryStore::with_notes([Note::new("kept", "kept", "")]);
    let result = engine
        .run(
            PodKind::Import,
            "json",
            &raw(json!({"src": src})),
            &RunContext::new(&store),
        )
        .unwrap();

    assert!(!result.succeeded());
    assert_eq!(result.errors().len(), 1);
    assert_eq!(result.errors()[0].code, "execution");
    assert_eq!(store.len().unwrap(), 1);
}

#[test]
fn test_selected_note_must_exist() {
    let engine = builtin_engine();
    let store = InMemoryStore::with_notes([Note::new("a", "a", "")]);
    let ctx = RunContext::new(&store).with_selection(Selection::Ids(vec!["missing".into()]));
    let err = engine
        .run(PodKind::Export, "json", &raw(json!({"target": "/out"})), &ctx)
        .unwrap_err();
    assert!(matches!(err, PodError::NoteNotFound(id) if id == "missing"));
}

/// Export pod that cancels its own run after two items, standing in for a
/// caller cancelling mid-run.
struct CancelAfterTwo;

impl Pod for CancelAfterTwo {
    fn prepare(&mut self, _config: &PodConfig) -> podline::Result<()> {
        Ok(())
    }
}

impl ExportPod for CancelAfterTwo {
    fn execute(&self, notes: &[Note], ctx: &ExecContext) -> podline::Result<PodResult> {
        let mut out = ResultBuilder::new();
        for (i, note) in notes.iter().enumerate() {
            if out.checkpoint(ctx) {
                break;
            }
            out.success(&note.id);
            if i == 1 {
                ctx.cancel_token().cancel();
            }
        }
        Ok(out.finish())
    }
}

fn cancel_after_two() -> Box<dyn ExportPod> {
    Box::new(CancelAfterTwo)
}

const TWO_REQUIRED: &[FieldSpec] = &[
    FieldSpec::required("target", FieldType::Path),
    FieldSpec::required("token", FieldType::String),
    FieldSpec::optional("limit", FieldType::Integer),
];

#[test]
fn test_every_missing_required_field_is_listed() {
    let mut registry = PodRegistry::new();
    registry
        .register_export(
            "remote",
            "Two required fields",
            Schema::new(TWO_REQUIRED),
            cancel_after_two,
        )
        .unwrap();
    let engine = Engine::new(Arc::new(registry));
    let store = InMemoryStore::new();

    let err = engine
        .run(
            PodKind::Export,
            "remote",
            &raw(json!({"limit": "ten", "unknown": 1})),
            &RunContext::new(&store),
        )
        .unwrap_err();
    let fields: Vec<&str> = err.field_errors().iter().map(FieldError::field).collect();
    assert_eq!(fields, vec!["target", "token", "limit"]);
}

#[test]
fn test_cancellation_keeps_committed_items() {
    let mut registry = PodRegistry::new();
    registry
        .register_export("cancelling", "Cancels itself", Schema::EMPTY, cancel_after_two)
        .unwrap();
    let engine = Engine::new(Arc::new(registry));
    let store = InMemoryStore::with_notes((1..=5).map(|i| Note::new(format!("n{}", i), "n", "")));

    let result = engine
        .run(
            PodKind::Export,
            "cancelling",
            &RawConfig::new(),
            &RunContext::new(&store),
        )
        .unwrap();

    assert!(!result.succeeded());
    assert_eq!(result.item_results().len(), 2);
    assert!(result.item_results().iter().all(|o| o.succeeded));
    assert_eq!(result.errors().len(), 1);
    assert_eq!(result.errors()[0].code, "cancelled");
}

#[test]
fn test_elapsed_deadline_stops_before_first_item() {
    let dir = tempfile::tempdir().unwrap();
    let engine = builtin_engine();
    let store = InMemoryStore::with_notes([Note::new("a", "a", "")]);
    let ctx = RunContext::new(&store)
        .with_exec(ExecContext::new().with_deadline(std::time::Instant::now()));

    let result = engine
        .run(
            PodKind::Export,
            "markdown",
            &raw(json!({"target": dir.path().join("out")})),
            &ctx,
        )
        .unwrap();
    assert!(result.item_results().is_empty());
    assert_eq!(result.errors()[0].code, "deadline_exceeded");
}

#[test]
fn test_concurrent_runs_share_engine_and_store() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("import.json");
    let imported: Vec<Value> = (0..20)
        .map(|i| json!({"id": format!("new-{}", i), "fname": format!("new.n{}", i)}))
        .collect();
    write_json(&src, Value::Array(imported));

    let engine = builtin_engine();
    let store = InMemoryStore::with_notes((0..5).map(|i| Note::new(format!("old-{}", i), "old", "")));

    let results: Vec<PodResult> = std::thread::scope(|scope| {
        let import = scope.spawn(|| {
            engine
                .run(
                    PodKind::Import,
                    "json",
                    &raw(json!({"src": src})),
                    &RunContext::new(&store),
                )
                .unwrap()
        });
        let exports: Vec<_> = (0..4)
            .map(|i| {
                let target = dir.path().join(format!("export-{}.json", i));
                let engine = &engine;
                let store = &store;
                scope.spawn(move || {
                    engine
                        .run(
                            PodKind::Export,
                            "json",
                            &raw(json!({"target": target})),
                            &RunContext::new(store),
                        )
                        .unwrap()
                })
            })
            .collect();

        let mut results = vec![import.join().unwrap()];
        results.extend(exports.into_iter().map(|h| h.join().unwrap()));
        results
    });

    assert!(results.iter().all(PodResult::succeeded));
    for export in &results[1..] {
        let seen = export.item_results().len();
        assert!(seen == 5 || seen == 25, "partial merge visible: {}", seen);
    }
    assert_eq!(store.len().unwrap(), 25);
}
