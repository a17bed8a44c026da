//! Data export for the static site template: `{target}/notes.json` holding
//! `{"notes": {id: note}}`, the shape the site's note pages load.

use super::{admit_notes, ensure_dir, to_json, write_output};
use crate::error::Result;
use crate::model::Note;
use crate::pod::{prepared, ExecContext, ExportPod, Pod, PodResult, ResultBuilder};
use crate::schema::{FieldDefault, FieldSpec, FieldType, Schema};
use crate::validate::PodConfig;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub const ID: &str = "nextjs";

const FIELDS: &[FieldSpec] = &[
    FieldSpec::required("target", FieldType::Path).describe("Site data directory"),
    FieldSpec::optional("pretty", FieldType::Bool).with_default(FieldDefault::Bool(false)),
];
pub const SCHEMA: Schema = Schema::new(FIELDS);

#[derive(Serialize)]
struct NotesFile<'a> {
    notes: BTreeMap<&'a str, &'a Note>,
}

#[derive(Default)]
pub struct NextjsExport {
    settings: Option<(PathBuf, bool)>,
}

impl NextjsExport {
    pub fn boxed() -> Box<dyn ExportPod> {
        Box::new(Self::default())
    }
}

impl Pod for NextjsExport {
    fn prepare(&mut self, config: &PodConfig) -> Result<()> {
        let target = config.require_path(ID, "target")?;
        self.settings = Some((target, config.bool("pretty").unwrap_or(false)));
        Ok(())
    }
}

impl ExportPod for NextjsExport {
    fn execute(&self, notes: &[Note], ctx: &ExecContext) -> Result<PodResult> {
        let (target, pretty) = prepared(&self.settings, ID)?;
        if notes.is_empty() {
            return Ok(PodResult::empty());
        }
        ensure_dir(target)?;

        let mut out = ResultBuilder::new();
        let file = NotesFile {
            notes: admit_notes(notes, &mut out, ctx)
                .iter()
                .map(|n| (n.id.as_str(), n))
                .collect(),
        };
        write_output(&target.join("notes.json"), &to_json(&file, *pretty)?)?;
        Ok(out.finish())
    }
}
