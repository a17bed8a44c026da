//! # Built-in Pods
//!
//! | Kind | Id | Reads / writes |
//! |------|----|----------------|
//! | import | `json` | JSON array of notes at `src` |
//! | import | `markdown` | markdown files under the `src` directory |
//! | export | `json` | JSON array of notes at `target` |
//! | export | `markdown` | one `{fname}.md` per note under `target` |
//! | export | `graphviz` | DOT graph of the hierarchy at `target` |
//! | export | `archive` | `.tar.gz` of markdown notes at `target` |
//! | export | `nextjs` | `notes.json` for the static site template under `target` |
//! | publish | `json` | id-keyed map plus hierarchy at `target` |
//! | publish | `markdown` | one combined document at `target` |
//! | publish | `html` | one page per note plus `index.html` under `target` |
//!
//! Input pods read from `src`, output pods write to `target`. An output pod
//! given no notes writes nothing and reports an empty result.

pub mod archive;
pub mod graphviz;
pub mod hierarchy;
pub mod html;
pub mod json;
pub mod markdown;
pub mod nextjs;

use crate::error::{PodError, Result};
use crate::model::Note;
use crate::pod::{ExecContext, ResultBuilder};
use crate::registry::{PodRegistry, RegistryError};
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub fn register_builtin(registry: &mut PodRegistry) -> std::result::Result<(), RegistryError> {
    registry.register_import(
        json::ID,
        "Import notes from a JSON array file",
        json::IMPORT_SCHEMA,
        json::JsonImport::boxed,
    )?;
    registry.register_import(
        markdown::ID,
        "Import markdown files with YAML front matter from a directory",
        markdown::IMPORT_SCHEMA,
        markdown::MarkdownImport::boxed,
    )?;

    registry.register_export(
        json::ID,
        "Export notes as a JSON array",
        json::EXPORT_SCHEMA,
        json::JsonExport::boxed,
    )?;
    registry.register_export(
        markdown::ID,
        "Export one markdown file per note",
        markdown::EXPORT_SCHEMA,
        markdown::MarkdownExport::boxed,
    )?;
    registry.register_export(
        graphviz::ID,
        "Export the note hierarchy as a Graphviz DOT file",
        graphviz::SCHEMA,
        graphviz::GraphvizExport::boxed,
    )?;
    registry.register_export(
        archive::ID,
        "Export notes as a gzipped tar of markdown files",
        archive::SCHEMA,
        archive::ArchiveExport::boxed,
    )?;
    registry.register_export(
        nextjs::ID,
        "Export notes.json for the static site template",
        nextjs::SCHEMA,
        nextjs::NextjsExport::boxed,
    )?;

    registry.register_publish(
        json::ID,
        "Publish notes as an id-keyed JSON map with hierarchy",
        json::PUBLISH_SCHEMA,
        json::JsonPublish::boxed,
    )?;
    registry.register_publish(
        markdown::ID,
        "Publish notes as one combined markdown document",
        markdown::PUBLISH_SCHEMA,
        markdown::MarkdownPublish::boxed,
    )?;
    registry.register_publish(
        html::ID,
        "Publish notes as a static HTML site",
        html::SCHEMA,
        html::HtmlPublish::boxed,
    )?;
    Ok(())
}

/// Create an output directory; failure aborts the run.
pub(crate) fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| {
            PodError::execution(format!("cannot create {}: {}", path.display(), e))
        })?;
    }
    Ok(())
}

/// Create the parent directory of an output file.
pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}

/// Write a whole output file; failure aborts the run.
pub(crate) fn write_output(path: &Path, content: &str) -> Result<()> {
    ensure_parent(path)?;
    fs::write(path, content)
        .map_err(|e| PodError::execution(format!("cannot write {}: {}", path.display(), e)))
}

/// Admit notes one at a time until the run is interrupted, recording each as a
/// success. For pods that write all notes as a single output.
pub(crate) fn admit_notes<'a>(
    notes: &'a [Note],
    out: &mut ResultBuilder,
    ctx: &ExecContext,
) -> &'a [Note] {
    let mut admitted = 0;
    for note in notes {
        if out.checkpoint(ctx) {
            break;
        }
        out.success(&note.id);
        admitted += 1;
    }
    &notes[..admitted]
}

/// Note id by fname. When several notes share an fname, the first in
/// selection order owns it for link resolution and parent lookup.
pub(crate) fn fname_index(notes: &[Note]) -> HashMap<&str, &str> {
    let mut index = HashMap::new();
    for note in notes {
        index
            .entry(note.fname.as_str())
            .or_insert(note.id.as_str());
    }
    index
}

pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    let content = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(content)
}

pub(crate) fn sanitize_filename(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}
