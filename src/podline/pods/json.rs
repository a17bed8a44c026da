//! JSON pods: import from an array file, export to an array file, publish an
//! id-keyed map with the note hierarchy.

use super::hierarchy::Hierarchy;
use super::{admit_notes, to_json, write_output};
use crate::error::{PodError, Result};
use crate::model::{title_from_fname, Note};
use crate::pod::{
    prepared, ExecContext, ExportPod, ImportBatch, ImportPod, Pod, PodResult, PublishPod,
    ResultBuilder,
};
use crate::schema::{FieldDefault, FieldSpec, FieldType, Schema};
use crate::validate::PodConfig;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

pub const ID: &str = "json";

const IMPORT_FIELDS: &[FieldSpec] =
    &[FieldSpec::required("src", FieldType::Path).describe("JSON file holding an array of notes")];
pub const IMPORT_SCHEMA: Schema = Schema::new(IMPORT_FIELDS);

const EXPORT_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("target", FieldType::Path).describe("Output file"),
    FieldSpec::optional("pretty", FieldType::Bool)
        .with_default(FieldDefault::Bool(true))
        .describe("Indent the output"),
];
pub const EXPORT_SCHEMA: Schema = Schema::new(EXPORT_FIELDS);

const PUBLISH_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("target", FieldType::Path).describe("Output file"),
    FieldSpec::optional("pretty", FieldType::Bool)
        .with_default(FieldDefault::Bool(false))
        .describe("Indent the output"),
];
pub const PUBLISH_SCHEMA: Schema = Schema::new(PUBLISH_FIELDS);

// --- Import ---

#[derive(Default)]
pub struct JsonImport {
    src: Option<PathBuf>,
}

impl JsonImport {
    pub fn boxed() -> Box<dyn ImportPod> {
        Box::new(Self::default())
    }
}

impl Pod for JsonImport {
    fn prepare(&mut self, config: &PodConfig) -> Result<()> {
        let src = config.require_path(ID, "src")?;
        if !src.is_file() {
            return Err(PodError::Prepare {
                pod: ID.to_string(),
                message: format!("{} is not a file", src.display()),
            });
        }
        self.src = Some(src);
        Ok(())
    }
}

impl ImportPod for JsonImport {
    fn execute(&self, ctx: &ExecContext) -> Result<ImportBatch> {
        let src = prepared(&self.src, ID)?;
        let content = fs::read_to_string(src)
            .map_err(|e| PodError::execution(format!("cannot read {}: {}", src.display(), e)))?;
        let items: Vec<Value> = serde_json::from_str(&content).map_err(|e| {
            PodError::execution(format!("{} is not a JSON array: {}", src.display(), e))
        })?;

        let mut batch = ImportBatch::new();
        for (index, item) in items.into_iter().enumerate() {
            if batch.checkpoint(ctx) {
                break;
            }
            let label = item
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{}[{}]", src.display(), index));
            batch.record(&label, parse_note(item))?;
        }
        Ok(batch)
    }
}

fn parse_note(value: Value) -> Result<Note> {
    let mut note: Note = serde_json::from_value(value)?;
    if note.id.trim().is_empty() {
        return Err(PodError::item("note has an empty id"));
    }
    if note.title.is_empty() {
        note.title = title_from_fname(&note.fname);
    }
    Ok(note)
}

// --- Export ---

struct OutputSettings {
    target: PathBuf,
    pretty: bool,
}

impl OutputSettings {
    fn from_config(config: &PodConfig) -> Result<Self> {
        Ok(Self {
            target: config.require_path(ID, "target")?,
            pretty: config.bool("pretty").unwrap_or(false),
        })
    }
}

#[derive(Default)]
pub struct JsonExport {
    settings: Option<OutputSettings>,
}

impl JsonExport {
    pub fn boxed() -> Box<dyn ExportPod> {
        Box::new(Self::default())
    }
}

impl Pod for JsonExport {
    fn prepare(&mut self, config: &PodConfig) -> Result<()> {
        self.settings = Some(OutputSettings::from_config(config)?);
        Ok(())
    }
}

impl ExportPod for JsonExport {
    fn execute(&self, notes: &[Note], ctx: &ExecContext) -> Result<PodResult> {
        let settings = prepared(&self.settings, ID)?;
        if notes.is_empty() {
            return Ok(PodResult::empty());
        }

        let mut out = ResultBuilder::new();
        let admitted = admit_notes(notes, &mut out, ctx);
        write_output(&settings.target, &to_json(admitted, settings.pretty)?)?;
        Ok(out.finish())
    }
}

// --- Publish ---

#[derive(Serialize)]
struct PublishedNotes<'a> {
    notes: BTreeMap<&'a str, &'a Note>,
    children: BTreeMap<&'a str, Vec<&'a str>>,
    roots: Vec<&'a str>,
}

impl<'a> PublishedNotes<'a> {
    fn build(notes: &'a [Note]) -> Self {
        let hierarchy = Hierarchy::build(notes);
        let children = notes
            .iter()
            .map(|n| n.id.as_str())
            .filter(|id| !hierarchy.children(id).is_empty())
            .map(|id| (id, hierarchy.children(id).to_vec()))
            .collect();
        Self {
            notes: notes.iter().map(|n| (n.id.as_str(), n)).collect(),
            children,
            roots: hierarchy.roots().to_vec(),
        }
    }
}

#[derive(Default)]
pub struct JsonPublish {
    settings: Option<OutputSettings>,
}

impl JsonPublish {
    pub fn boxed() -> Box<dyn PublishPod> {
        Box::new(Self::default())
    }
}

impl Pod for JsonPublish {
    fn prepare(&mut self, config: &PodConfig) -> Result<()> {
        self.settings = Some(OutputSettings::from_config(config)?);
        Ok(())
    }
}

impl PublishPod for JsonPublish {
    fn execute(&self, notes: &[Note], ctx: &ExecContext) -> Result<PodResult> {
        let settings = prepared(&self.settings, ID)?;
        if notes.is_empty() {
            return Ok(PodResult::empty());
        }

        let mut out = ResultBuilder::new();
        let admitted = admit_notes(notes, &mut out, ctx);
        let published = PublishedNotes::build(admitted);
        write_output(&settings.target, &to_json(&published, settings.pretty)?)?;
        Ok(out.finish())
    }
}
