//! Markdown pods.
//!
//! Notes on disk are markdown documents with an optional YAML front matter
//! block:
//!
//! ```text
//! ---
//! id: 7f3c
//! title: Daily Log
//! created: 2024-05-01T09:00:00Z
//! tags: [journal]
//! ---
//!
//! Body text.
//! ```
//!
//! `id`, `title`, `created` and `updated` map to note fields; every other key is
//! kept as custom front matter. Without an `id` the fname is used.

use super::{ensure_dir, fname_index, sanitize_filename, write_output};
use crate::error::{PodError, Result};
use crate::model::{title_from_fname, Note};
use crate::pod::{
    prepared, ExecContext, ExportPod, ImportBatch, ImportPod, Pod, PodResult, PublishPod,
    ResultBuilder,
};
use crate::schema::{FieldDefault, FieldSpec, FieldType, Schema};
use crate::validate::PodConfig;
use chrono::{DateTime, TimeZone, Utc};
use pulldown_cmark::{CowStr, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use pulldown_cmark_to_cmark::cmark;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

pub const ID: &str = "markdown";

const IMPORT_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("src", FieldType::Path).describe("Directory to read"),
    FieldSpec::optional("exts", FieldType::StringList)
        .with_default(FieldDefault::List(&[".md"]))
        .describe("File extensions to import"),
    FieldSpec::optional("recursive", FieldType::Bool)
        .with_default(FieldDefault::Bool(false))
        .describe("Descend into subdirectories; directory names become fname segments"),
];
pub const IMPORT_SCHEMA: Schema = Schema::new(IMPORT_FIELDS);

const EXPORT_FIELDS: &[FieldSpec] =
    &[FieldSpec::required("target", FieldType::Path).describe("Output directory")];
pub const EXPORT_SCHEMA: Schema = Schema::new(EXPORT_FIELDS);

const PUBLISH_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("target", FieldType::Path).describe("Output file"),
    FieldSpec::optional("title", FieldType::String)
        .with_default(FieldDefault::Str("Notes"))
        .describe("Document heading"),
];
pub const PUBLISH_SCHEMA: Schema = Schema::new(PUBLISH_FIELDS);

// --- Documents ---

/// Split `---` delimited front matter from the rest of a document.
pub(crate) fn split_front_matter(content: &str) -> (Option<&str>, &str) {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let rest = match content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))
    {
        Some(rest) => rest,
        None => return (None, content),
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            return (Some(&rest[..offset]), &rest[offset + line.len()..]);
        }
        offset += line.len();
    }
    (None, content)
}

/// Body with leading blank lines removed.
fn trim_leading_blank_lines(body: &str) -> &str {
    let mut rest = body;
    while let Some(pos) = rest.find('\n') {
        if rest[..pos].trim().is_empty() {
            rest = &rest[pos + 1..];
        } else {
            break;
        }
    }
    if rest.trim().is_empty() {
        ""
    } else {
        rest
    }
}

/// Parse a markdown document into a note stored under `fname`.
pub fn parse_document(fname: &str, content: &str) -> Result<Note> {
    let (front, body) = split_front_matter(content);
    let mut fields = match front {
        Some(yaml) if !yaml.trim().is_empty() => match serde_yaml::from_str::<Value>(yaml)? {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            _ => return Err(PodError::item("front matter is not a mapping")),
        },
        _ => Map::new(),
    };

    let id = match fields.remove("id") {
        None => fname.to_string(),
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => return Err(PodError::item("front matter `id` must be a string")),
    };
    let title = match fields.remove("title") {
        None => title_from_fname(fname),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    };

    Ok(Note {
        id,
        title,
        fname: fname.to_string(),
        body: trim_leading_blank_lines(body).to_string(),
        created: parse_timestamp("created", fields.remove("created"))?,
        updated: parse_timestamp("updated", fields.remove("updated"))?,
        front_matter: fields.into_iter().collect(),
    })
}

/// RFC 3339 strings or epoch milliseconds.
fn parse_timestamp(field: &str, value: Option<Value>) -> Result<Option<DateTime<Utc>>> {
    let invalid = || PodError::item(format!("front matter `{}` is not a timestamp", field));
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s.trim())
            .map(|d| Some(d.with_timezone(&Utc)))
            .map_err(|_| invalid()),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .map(Some)
            .ok_or_else(invalid),
        Some(_) => Err(invalid()),
    }
}

/// Render a note as a markdown document with front matter.
pub fn render_document(note: &Note) -> Result<String> {
    let mut header = serde_yaml::Mapping::new();
    header.insert(yaml_str("id"), yaml_str(&note.id));
    header.insert(yaml_str("title"), yaml_str(&note.title));
    if let Some(created) = note.created {
        header.insert(yaml_str("created"), yaml_str(&created.to_rfc3339()));
    }
    if let Some(updated) = note.updated {
        header.insert(yaml_str("updated"), yaml_str(&updated.to_rfc3339()));
    }
    for (key, value) in &note.front_matter {
        header.insert(yaml_str(key), serde_yaml::to_value(value)?);
    }

    let mut doc = String::new();
    writeln!(doc, "---")?;
    doc.push_str(&serde_yaml::to_string(&header)?);
    writeln!(doc, "---")?;
    writeln!(doc)?;
    doc.push_str(&note.body);
    if !note.body.is_empty() && !note.body.ends_with('\n') {
        doc.push('\n');
    }
    Ok(doc)
}

fn yaml_str(s: &str) -> serde_yaml::Value {
    serde_yaml::Value::String(s.to_string())
}

/// The fname a relative markdown link points at, if it looks like a note link.
pub(crate) fn linked_fname(dest: &str) -> Option<&str> {
    if dest.is_empty() || dest.starts_with('#') || dest.contains(':') {
        return None;
    }
    let dest = dest.trim_start_matches("./");
    let dest = dest.split('#').next().unwrap_or(dest);
    Some(dest.strip_suffix(".md").unwrap_or(dest))
}

/// Rewrite note links with `resolve` and shift headings down by `shift` levels.
pub(crate) fn rewrite_events<'a, F>(
    content: &'a str,
    shift: u8,
    resolve: F,
) -> impl Iterator<Item = Event<'a>>
where
    F: Fn(&str) -> Option<String>,
{
    Parser::new_ext(content, Options::all()).map(move |event| match event {
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => {
            let dest_url = match resolve(dest_url.as_ref()) {
                Some(rewritten) => CowStr::from(rewritten),
                None => dest_url,
            };
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            })
        }
        Event::Start(Tag::Heading {
            level,
            id,
            classes,
            attrs,
        }) => Event::Start(Tag::Heading {
            level: shift_heading(level, shift),
            id,
            classes,
            attrs,
        }),
        Event::End(TagEnd::Heading(level)) => Event::End(TagEnd::Heading(shift_heading(level, shift))),
        other => other,
    })
}

fn shift_heading(level: HeadingLevel, shift: u8) -> HeadingLevel {
    match (level as u8).saturating_add(shift) {
        0 | 1 => HeadingLevel::H1,
        2 => HeadingLevel::H2,
        3 => HeadingLevel::H3,
        4 => HeadingLevel::H4,
        5 => HeadingLevel::H5,
        _ => HeadingLevel::H6,
    }
}

// --- Import ---

struct ImportSettings {
    src: PathBuf,
    exts: Vec<String>,
    recursive: bool,
}

#[derive(Default)]
pub struct MarkdownImport {
    settings: Option<ImportSettings>,
}

impl MarkdownImport {
    pub fn boxed() -> Box<dyn ImportPod> {
        Box::new(Self::default())
    }
}

impl Pod for MarkdownImport {
    fn prepare(&mut self, config: &PodConfig) -> Result<()> {
        let src = config.require_path(ID, "src")?;
        if !src.is_dir() {
            return Err(PodError::Prepare {
                pod: ID.to_string(),
                message: format!("{} is not a directory", src.display()),
            });
        }
        let exts = config
            .list("exts")
            .unwrap_or_default()
            .iter()
            .map(|ext| {
                let ext = ext.trim().to_ascii_lowercase();
                if ext.starts_with('.') {
                    ext
                } else {
                    format!(".{}", ext)
                }
            })
            .collect();
        self.settings = Some(ImportSettings {
            src,
            exts,
            recursive: config.bool("recursive").unwrap_or(false),
        });
        Ok(())
    }
}

impl ImportPod for MarkdownImport {
    fn execute(&self, ctx: &ExecContext) -> Result<ImportBatch> {
        let settings = prepared(&self.settings, ID)?;
        let mut files = Vec::new();
        collect_files(&settings.src, settings, &mut files).map_err(|e| {
            PodError::execution(format!("cannot list {}: {}", settings.src.display(), e))
        })?;
        files.sort();

        let mut batch = ImportBatch::new();
        for path in files {
            if batch.checkpoint(ctx) {
                break;
            }
            let relative = path.strip_prefix(&settings.src).unwrap_or(&path);
            let label = relative.display().to_string();
            let outcome = fname_for(relative)
                .and_then(|fname| read_document(&path, &fname));
            batch.record(&label, outcome)?;
        }
        Ok(batch)
    }
}

fn collect_files(
    dir: &Path,
    settings: &ImportSettings,
    out: &mut Vec<PathBuf>,
) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if settings.recursive {
                collect_files(&path, settings, out)?;
            }
        } else if has_extension(&path, &settings.exts) {
            out.push(path);
        }
    }
    Ok(())
}

fn has_extension(path: &Path, exts: &[String]) -> bool {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_ascii_lowercase()))
        .is_some_and(|ext| exts.contains(&ext))
}

/// `daily/2024.05.md` -> `daily.2024.05`
fn fname_for(relative: &Path) -> Result<String> {
    let stem = relative
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PodError::item("file has no name"))?;
    let mut segments: Vec<String> = relative
        .parent()
        .into_iter()
        .flat_map(Path::components)
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    segments.push(stem);
    Ok(segments.join("."))
}

fn read_document(path: &Path, fname: &str) -> Result<Note> {
    let content = fs::read_to_string(path)?;
    parse_document(fname, &content)
}

// --- Export ---

#[derive(Default)]
pub struct MarkdownExport {
    target: Option<PathBuf>,
}

impl MarkdownExport {
    pub fn boxed() -> Box<dyn ExportPod> {
        Box::new(Self::default())
    }
}

impl Pod for MarkdownExport {
    fn prepare(&mut self, config: &PodConfig) -> Result<()> {
        self.target = Some(config.require_path(ID, "target")?);
        Ok(())
    }
}

impl ExportPod for MarkdownExport {
    fn execute(&self, notes: &[Note], ctx: &ExecContext) -> Result<PodResult> {
        let target = prepared(&self.target, ID)?;
        if notes.is_empty() {
            return Ok(PodResult::empty());
        }
        ensure_dir(target)?;

        let mut out = ResultBuilder::new();
        let mut written = HashSet::new();
        for note in notes {
            if out.checkpoint(ctx) {
                break;
            }
            let file_name = format!("{}.md", sanitize_filename(&note.fname));
            let outcome = if written.insert(file_name.clone()) {
                render_document(note)
                    .and_then(|doc| fs::write(target.join(&file_name), doc).map_err(PodError::from))
            } else {
                Err(PodError::item(format!(
                    "{} was already written by another note",
                    file_name
                )))
            };
            if let Err(fatal) = out.record(&note.id, outcome) {
                return Ok(out.abort(&fatal));
            }
        }
        Ok(out.finish())
    }
}

// --- Publish ---

struct PublishSettings {
    target: PathBuf,
    title: String,
}

#[derive(Default)]
pub struct MarkdownPublish {
    settings: Option<PublishSettings>,
}

impl MarkdownPublish {
    pub fn boxed() -> Box<dyn PublishPod> {
        Box::new(Self::default())
    }
}

impl Pod for MarkdownPublish {
    fn prepare(&mut self, config: &PodConfig) -> Result<()> {
        self.settings = Some(PublishSettings {
            target: config.require_path(ID, "target")?,
            title: config.str("title").unwrap_or("Notes").to_string(),
        });
        Ok(())
    }
}

impl PublishPod for MarkdownPublish {
    fn execute(&self, notes: &[Note], ctx: &ExecContext) -> Result<PodResult> {
        let settings = prepared(&self.settings, ID)?;
        if notes.is_empty() {
            return Ok(PodResult::empty());
        }

        let anchors = fname_index(notes);

        let mut doc = String::new();
        writeln!(doc, "# {}", settings.title)?;

        let mut out = ResultBuilder::new();
        for note in notes {
            if out.checkpoint(ctx) {
                break;
            }
            match out.record(&note.id, render_section(note, &anchors)) {
                Ok(Some(section)) => {
                    doc.push('\n');
                    doc.push_str(&section);
                }
                Ok(None) => {}
                Err(fatal) => return Ok(out.abort(&fatal)),
            }
        }

        write_output(&settings.target, &doc)?;
        Ok(out.finish())
    }
}

/// One note as an anchored `##` section, body headings pushed down two levels.
fn render_section(note: &Note, anchors: &HashMap<&str, &str>) -> Result<String> {
    let events = rewrite_events(&note.body, 2, |dest| {
        linked_fname(dest)
            .and_then(|fname| anchors.get(fname))
            .map(|id| format!("#{}", id))
    });
    let mut body = String::new();
    cmark(events, &mut body)
        .map_err(|_| PodError::item(format!("cannot render note `{}`", note.id)))?;

    let mut section = String::new();
    writeln!(section, "<a id=\"{}\"></a>", note.id)?;
    writeln!(section)?;
    writeln!(section, "## {}", note.title)?;
    if !body.trim().is_empty() {
        writeln!(section)?;
        writeln!(section, "{}", body.trim_end())?;
    }
    Ok(section)
}
