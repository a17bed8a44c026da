use flate2::read::GzDecoder;
use podline::api::PodlineApi;
use podline::store::memory::InMemoryStore;
use podline::{ExecContext, Note, PodKind, PodRequest, PodResult};
use serde_json::{json, Value};
use std::fs;
use std::io::Read;
use std::path::Path;

fn request(kind: PodKind, pod_id: &str, config: Value) -> PodRequest {
    PodRequest {
        kind,
        pod_id: pod_id.to_string(),
        config: config.as_object().cloned().unwrap(),
        notes: None,
    }
}

fn run(api: &PodlineApi<InMemoryStore>, request: &PodRequest) -> PodResult {
    api.run(request, ExecContext::new()).unwrap()
}

/// A small vault: a root note, a child linking back to it, and a note whose
/// front matter is broken.
fn write_vault(dir: &Path) {
    fs::write(
        dir.join("projects.md"),
        "---\nid: p1\ntitle: Projects\ntags: [work]\ncreated: 2024-05-01T10:00:00Z\n---\n\nEverything in flight.\n",
    )
    .unwrap();
    fs::write(
        dir.join("projects.podline.md"),
        "---\nid: p2\n---\n# Podline\n\nBack to [projects](projects.md).\n",
    )
    .unwrap();
    fs::write(
        dir.join("broken.md"),
        "---\nid: p3\ncreated: yesterday\n---\nbody\n",
    )
    .unwrap();
    fs::write(dir.join("ignored.txt"), "not markdown").unwrap();
}

fn imported_api(vault: &Path) -> PodlineApi<InMemoryStore> {
    let api = PodlineApi::with_builtin_pods(InMemoryStore::new()).unwrap();
    let result = run(
        &api,
        &request(PodKind::Import, "markdown", json!({"src": vault})),
    );
    assert_eq!(result.item_results().len(), 3);
    assert_eq!(result.succeeded_count(), 2);
    assert_eq!(result.errors().len(), 1);
    assert_eq!(result.errors()[0].item.as_deref(), Some("broken.md"));
    api
}

#[test]
fn test_markdown_import_reads_front_matter() {
    let vault = tempfile::tempdir().unwrap();
    write_vault(vault.path());
    let api = imported_api(vault.path());

    let notes = api.notes().unwrap();
    let ids: Vec<&str> = notes.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["p1", "p2"]);

    let projects = &notes[0];
    assert_eq!(projects.fname, "projects");
    assert_eq!(projects.title, "Projects");
    assert_eq!(projects.body, "Everything in flight.\n");
    assert_eq!(projects.front_matter.get("tags"), Some(&json!(["work"])));
    assert!(projects.created.is_some());

    let child = &notes[1];
    assert_eq!(child.fname, "projects.podline");
    assert_eq!(child.title, "Podline");
}

#[test]
fn test_markdown_export_reimports() {
    let vault = tempfile::tempdir().unwrap();
    write_vault(vault.path());
    let api = imported_api(vault.path());

    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("vault");
    let result = run(
        &api,
        &request(PodKind::Export, "markdown", json!({"target": target})),
    );
    assert!(result.succeeded());
    assert!(target.join("projects.md").is_file());
    assert!(target.join("projects.podline.md").is_file());

    let copy = PodlineApi::with_builtin_pods(InMemoryStore::new()).unwrap();
    let reimport = run(
        &copy,
        &request(PodKind::Import, "markdown", json!({"src": target})),
    );
    assert!(reimport.succeeded());
    let original = api.notes().unwrap();
    let copied = copy.notes().unwrap();
    assert_eq!(copied.len(), original.len());
    for (a, b) in original.iter().zip(&copied) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.fname, b.fname);
        assert_eq!(a.title, b.title);
        assert_eq!(a.front_matter, b.front_matter);
        assert_eq!(a.created, b.created);
    }
}

#[test]
fn test_html_site_links_notes() {
    let vault = tempfile::tempdir().unwrap();
    write_vault(vault.path());
    let api = imported_api(vault.path());

    let out = tempfile::tempdir().unwrap();
    let site = out.path().join("site");
    let result = run(
        &api,
        &request(
            PodKind::Publish,
            "html",
            json!({"target": site, "site_title": "Field Notes"}),
        ),
    );
    assert!(result.succeeded());

    let index = fs::read_to_string(site.join("index.html")).unwrap();
    assert!(index.contains("Field Notes"));
    assert!(index.contains("p1.html"));

    let child = fs::read_to_string(site.join("p2.html")).unwrap();
    assert!(child.contains("href=\"p1.html\""));
    let parent = fs::read_to_string(site.join("p1.html")).unwrap();
    assert!(parent.contains("p2.html"));
}

#[test]
fn test_html_pages_do_not_overwrite_each_other() {
    let api = PodlineApi::with_builtin_pods(InMemoryStore::with_notes([
        Note::new("index", "home", "HOME-BODY"),
        Note::new("a/b", "x", "FIRST-BODY"),
        Note::new("a_b", "y", "SECOND-BODY"),
    ]))
    .unwrap();
    let out = tempfile::tempdir().unwrap();
    let site = out.path().join("site");
    let result = run(
        &api,
        &request(PodKind::Publish, "html", json!({"target": site})),
    );
    assert!(result.succeeded());
    assert_eq!(result.item_results().len(), 3);

    let bodies: Vec<String> = fs::read_dir(&site)
        .unwrap()
        .map(|entry| fs::read_to_string(entry.unwrap().path()).unwrap())
        .collect();
    assert_eq!(bodies.len(), 4);
    for body in ["HOME-BODY", "FIRST-BODY", "SECOND-BODY"] {
        assert_eq!(bodies.iter().filter(|page| page.contains(body)).count(), 1);
    }
    let index = fs::read_to_string(site.join("index.html")).unwrap();
    assert!(!index.contains("HOME-BODY"));
}

#[test]
fn test_selected_notes_only() {
    let api = PodlineApi::with_builtin_pods(InMemoryStore::with_notes([
        Note::new("a", "a", "first"),
        Note::new("b", "a.b", "second"),
        Note::new("c", "c", "third"),
    ]))
    .unwrap();
    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("notes.json");

    let mut req = request(PodKind::Export, "json", json!({"target": target}));
    req.notes = Some(vec!["c".to_string(), "a".to_string()]);
    let result = run(&api, &req);
    assert!(result.succeeded());

    let written: Vec<Note> = serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
    let ids: Vec<&str> = written.iter().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["c", "a"]);
}

#[test]
fn test_json_publish_carries_hierarchy() {
    let api = PodlineApi::with_builtin_pods(InMemoryStore::with_notes([
        Note::new("a", "a", ""),
        Note::new("b", "a.b", ""),
        Note::new("c", "a.b.c", ""),
        Note::new("d", "d", ""),
    ]))
    .unwrap();
    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("site.json");
    assert!(run(
        &api,
        &request(PodKind::Publish, "json", json!({"target": target}))
    )
    .succeeded());

    let published: Value = serde_json::from_str(&fs::read_to_string(&target).unwrap()).unwrap();
    assert_eq!(published["roots"], json!(["a", "d"]));
    assert_eq!(published["children"]["a"], json!(["b"]));
    assert_eq!(published["children"]["b"], json!(["c"]));
    assert_eq!(published["notes"]["c"]["fname"], json!("a.b.c"));
}

#[test]
fn test_markdown_publish_combines_notes() {
    let api = PodlineApi::with_builtin_pods(InMemoryStore::with_notes([
        Note::new("a", "alpha", "# Heading\n\nSee [beta](beta.md)."),
        Note::new("b", "beta", "Plain."),
    ]))
    .unwrap();
    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("book.md");
    let result = run(
        &api,
        &request(
            PodKind::Publish,
            "markdown",
            json!({"target": target, "title": "Book"}),
        ),
    );
    assert!(result.succeeded());

    let doc = fs::read_to_string(&target).unwrap();
    assert!(doc.starts_with("# Book"));
    assert!(doc.contains("## Alpha"));
    assert!(doc.contains("### Heading"));
    assert!(doc.contains("#b"));
}

#[test]
fn test_graphviz_export() {
    let api = PodlineApi::with_builtin_pods(InMemoryStore::with_notes([
        Note::new("a", "a", ""),
        Note::new("b", "a.b", ""),
    ]))
    .unwrap();
    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("graph.dot");
    let result = run(
        &api,
        &request(
            PodKind::Export,
            "graphviz",
            json!({"target": target, "direction": "TB"}),
        ),
    );
    assert!(result.succeeded());
    let dot = fs::read_to_string(&target).unwrap();
    assert!(dot.contains("rankdir=TB;"));
    assert!(dot.contains("\"a\" -> \"b\";"));

    let err = api
        .run(
            &request(
                PodKind::Export,
                "graphviz",
                json!({"target": target, "direction": "sideways"}),
            ),
            ExecContext::new(),
        )
        .unwrap_err();
    assert_eq!(err.code(), "prepare");
}

#[test]
fn test_archive_export() {
    let api = PodlineApi::with_builtin_pods(InMemoryStore::with_notes([
        Note::new("a", "a", "first"),
        Note::new("b", "a.b", "second"),
    ]))
    .unwrap();
    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("notes.tar.gz");
    let result = run(
        &api,
        &request(PodKind::Export, "archive", json!({"target": target})),
    );
    assert!(result.succeeded());

    let mut archive = tar::Archive::new(GzDecoder::new(fs::File::open(&target).unwrap()));
    let mut names = Vec::new();
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        names.push(entry.path().unwrap().display().to_string());
        let mut content = String::new();
        entry.read_to_string(&mut content).unwrap();
        assert!(content.starts_with("---\n"));
    }
    assert_eq!(names, vec!["notes/a.md", "notes/a.b.md"]);
}

#[test]
fn test_nextjs_export() {
    let api = PodlineApi::with_builtin_pods(InMemoryStore::with_notes([Note::new(
        "a", "a", "first",
    )]))
    .unwrap();
    let out = tempfile::tempdir().unwrap();
    let target = out.path().join("site-data");
    assert!(run(
        &api,
        &request(PodKind::Export, "nextjs", json!({"target": target}))
    )
    .succeeded());

    let data: Value =
        serde_json::from_str(&fs::read_to_string(target.join("notes.json")).unwrap()).unwrap();
    assert_eq!(data["notes"]["a"]["body"], json!("first"));
}

#[test]
fn test_import_prepare_rejects_missing_source() {
    let api = PodlineApi::with_builtin_pods(InMemoryStore::new()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let err = api
        .run(
            &request(
                PodKind::Import,
                "json",
                json!({"src": dir.path().join("missing.json")}),
            ),
            ExecContext::new(),
        )
        .unwrap_err();
    assert_eq!(err.code(), "prepare");
    assert!(api.notes().unwrap().is_empty());
}
