use super::markdown::render_document;
use super::{ensure_parent, sanitize_filename};
use crate::error::{PodError, Result};
use crate::model::Note;
use crate::pod::{prepared, ExecContext, ExportPod, Pod, PodResult, ResultBuilder};
use crate::schema::{FieldSpec, FieldType, Schema};
use crate::validate::PodConfig;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

pub const ID: &str = "archive";

const FIELDS: &[FieldSpec] =
    &[FieldSpec::required("target", FieldType::Path).describe("Output .tar.gz file")];
pub const SCHEMA: Schema = Schema::new(FIELDS);

/// Gzipped tar of `notes/{fname}.md` documents.
#[derive(Default)]
pub struct ArchiveExport {
    target: Option<PathBuf>,
}

impl ArchiveExport {
    pub fn boxed() -> Box<dyn ExportPod> {
        Box::new(Self::default())
    }
}

impl Pod for ArchiveExport {
    fn prepare(&mut self, config: &PodConfig) -> Result<()> {
        self.target = Some(config.require_path(ID, "target")?);
        Ok(())
    }
}

impl ExportPod for ArchiveExport {
    fn execute(&self, notes: &[Note], ctx: &ExecContext) -> Result<PodResult> {
        let target = prepared(&self.target, ID)?;
        if notes.is_empty() {
            return Ok(PodResult::empty());
        }
        ensure_parent(target)?;
        let file = File::create(target).map_err(|e| {
            PodError::execution(format!("cannot create {}: {}", target.display(), e))
        })?;
        write_archive(file, notes, ctx)
    }
}

fn write_archive<W: Write>(writer: W, notes: &[Note], ctx: &ExecContext) -> Result<PodResult> {
    let enc = GzEncoder::new(writer, Compression::default());
    let mut tar = tar::Builder::new(enc);
    let mut out = ResultBuilder::new();
    let mut entries = HashSet::new();

    for note in notes {
        if out.checkpoint(ctx) {
            break;
        }
        let entry_name = format!("notes/{}.md", sanitize_filename(&note.fname));
        if !entries.insert(entry_name.clone()) {
            out.failure(
                &note.id,
                &PodError::item(format!("{} was already written by another note", entry_name)),
            );
            continue;
        }
        let content = match out.record(&note.id, render_document(note)) {
            Ok(Some(content)) => content,
            Ok(None) => continue,
            Err(fatal) => return Ok(out.abort(&fatal)),
        };

        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        tar.append_data(&mut header, &entry_name, content.as_bytes())
            .map_err(|e| archive_error(&entry_name, e))?;
    }

    tar.into_inner()
        .and_then(|enc| enc.finish())
        .map_err(|e| archive_error("archive", e))?;
    Ok(out.finish())
}

fn archive_error(entry: &str, err: std::io::Error) -> PodError {
    PodError::execution(format!("cannot write {}: {}", entry, err))
}
