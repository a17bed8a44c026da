use super::hierarchy::Hierarchy;
use super::{admit_notes, write_output};
use crate::error::{PodError, Result};
use crate::model::Note;
use crate::pod::{prepared, ExecContext, ExportPod, Pod, PodResult, ResultBuilder};
use crate::schema::{FieldDefault, FieldSpec, FieldType, Schema};
use crate::validate::PodConfig;
use std::fmt::Write as _;
use std::path::PathBuf;

pub const ID: &str = "graphviz";

const DIRECTIONS: [&str; 4] = ["TB", "LR", "BT", "RL"];

const FIELDS: &[FieldSpec] = &[
    FieldSpec::required("target", FieldType::Path).describe("Output .dot file"),
    FieldSpec::optional("direction", FieldType::String)
        .with_default(FieldDefault::Str("LR"))
        .describe("Graph rank direction: TB, LR, BT or RL"),
];
pub const SCHEMA: Schema = Schema::new(FIELDS);

struct Settings {
    target: PathBuf,
    direction: &'static str,
}

/// Writes the fname hierarchy of the selected notes as a DOT digraph.
#[derive(Default)]
pub struct GraphvizExport {
    settings: Option<Settings>,
}

impl GraphvizExport {
    pub fn boxed() -> Box<dyn ExportPod> {
        Box::new(Self::default())
    }
}

impl Pod for GraphvizExport {
    fn prepare(&mut self, config: &PodConfig) -> Result<()> {
        let requested = config.str("direction").unwrap_or("LR").to_ascii_uppercase();
        let direction = DIRECTIONS
            .iter()
            .copied()
            .find(|d| *d == requested)
            .ok_or_else(|| PodError::Prepare {
                pod: ID.to_string(),
                message: format!("unknown direction `{}`", requested),
            })?;
        self.settings = Some(Settings {
            target: config.require_path(ID, "target")?,
            direction,
        });
        Ok(())
    }
}

impl ExportPod for GraphvizExport {
    fn execute(&self, notes: &[Note], ctx: &ExecContext) -> Result<PodResult> {
        let settings = prepared(&self.settings, ID)?;
        if notes.is_empty() {
            return Ok(PodResult::empty());
        }

        let mut out = ResultBuilder::new();
        let admitted = admit_notes(notes, &mut out, ctx);
        write_output(&settings.target, &render_dot(admitted, settings.direction)?)?;
        Ok(out.finish())
    }
}

fn render_dot(notes: &[Note], direction: &str) -> Result<String> {
    let hierarchy = Hierarchy::build(notes);
    let mut dot = String::new();
    writeln!(dot, "digraph notes {{")?;
    writeln!(dot, "  rankdir={};", direction)?;
    writeln!(dot, "  node [shape=box];")?;
    for note in notes {
        writeln!(
            dot,
            "  {} [label={}];",
            quote(&note.id),
            quote(&note.title)
        )?;
    }
    for (parent, child) in hierarchy.edges() {
        writeln!(dot, "  {} -> {};", quote(parent), quote(child))?;
    }
    writeln!(dot, "}}")?;
    Ok(dot)
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
