//! Static HTML site: `index.html` with the note tree, one `{id}.html` per note.
//!
//! Links between notes (`[x](proj.plan.md)`) are rewritten to the target
//! note's page. Each page links to its parent and children.
//!
//! `index.html` is reserved for the site index. A note whose page name would
//! clash with it, or with an earlier note's page (compared case-insensitively),
//! gets a numbered name such as `index-2.html`; links follow the assigned name.

use super::hierarchy::Hierarchy;
use super::markdown::{linked_fname, rewrite_events};
use super::{ensure_dir, fname_index, sanitize_filename, write_output};
use crate::error::{PodError, Result};
use crate::model::Note;
use crate::pod::{prepared, ExecContext, Pod, PodResult, PublishPod, ResultBuilder};
use crate::schema::{FieldDefault, FieldSpec, FieldType, Schema};
use crate::validate::PodConfig;
use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

pub const ID: &str = "html";

const INDEX_PAGE: &str = "index.html";

const FIELDS: &[FieldSpec] = &[
    FieldSpec::required("target", FieldType::Path).describe("Output directory"),
    FieldSpec::optional("site_title", FieldType::String)
        .with_default(FieldDefault::Str("Notes"))
        .describe("Title used on the index page"),
];
pub const SCHEMA: Schema = Schema::new(FIELDS);

struct Settings {
    target: PathBuf,
    site_title: String,
}

#[derive(Default)]
pub struct HtmlPublish {
    settings: Option<Settings>,
}

impl HtmlPublish {
    pub fn boxed() -> Box<dyn PublishPod> {
        Box::new(Self::default())
    }
}

impl Pod for HtmlPublish {
    fn prepare(&mut self, config: &PodConfig) -> Result<()> {
        self.settings = Some(Settings {
            target: config.require_path(ID, "target")?,
            site_title: config.str("site_title").unwrap_or("Notes").to_string(),
        });
        Ok(())
    }
}

impl PublishPod for HtmlPublish {
    fn execute(&self, notes: &[Note], ctx: &ExecContext) -> Result<PodResult> {
        let settings = prepared(&self.settings, ID)?;
        if notes.is_empty() {
            return Ok(PodResult::empty());
        }
        ensure_dir(&settings.target)?;

        let site = Site::new(notes);
        let mut out = ResultBuilder::new();
        for note in notes {
            if out.checkpoint(ctx) {
                break;
            }
            let page = site.page(&note.id);
            let outcome = site.render_page(note).and_then(|html| {
                fs::write(settings.target.join(page), html).map_err(PodError::from)
            });
            match outcome {
                Ok(()) => out.success_with(&note.id, page),
                Err(err) if err.is_fatal() => return Ok(out.abort(&err)),
                Err(err) => out.failure(&note.id, &err),
            }
        }

        let index = site.render_index(&settings.site_title)?;
        write_output(&settings.target.join(INDEX_PAGE), &index)?;
        Ok(out.finish())
    }
}

struct Site<'a> {
    by_id: HashMap<&'a str, &'a Note>,
    by_fname: HashMap<&'a str, &'a str>,
    pages: HashMap<&'a str, String>,
    hierarchy: Hierarchy<'a>,
}

impl<'a> Site<'a> {
    fn new(notes: &'a [Note]) -> Self {
        Self {
            by_id: notes.iter().map(|n| (n.id.as_str(), n)).collect(),
            by_fname: fname_index(notes),
            pages: assign_pages(notes),
            hierarchy: Hierarchy::build(notes),
        }
    }

    fn render_page(&self, note: &Note) -> Result<String> {
        let events = rewrite_events(&note.body, 0, |dest| {
            linked_fname(dest)
                .and_then(|fname| self.by_fname.get(fname))
                .map(|id| self.page(id).to_string())
        });
        let mut body = String::new();
        pulldown_cmark::html::push_html(&mut body, events);

        let mut page = String::new();
        write_head(&mut page, &note.title)?;
        writeln!(page, "<nav><a href=\"{}\">Index</a>", INDEX_PAGE)?;
        if let Some(parent) = self.hierarchy.parent(&note.id) {
            writeln!(page, " &rsaquo; {}", self.link(parent))?;
        }
        writeln!(page, "</nav>")?;
        writeln!(page, "<h1>{}</h1>", escape_html(&note.title))?;
        writeln!(page, "<article>\n{}</article>", body)?;

        let children = self.hierarchy.children(&note.id);
        if !children.is_empty() {
            writeln!(page, "<h2>Children</h2>\n<ul>")?;
            for child in children {
                writeln!(page, "<li>{}</li>", self.link(child))?;
            }
            writeln!(page, "</ul>")?;
        }
        writeln!(page, "</body>\n</html>")?;
        Ok(page)
    }

    fn render_index(&self, site_title: &str) -> Result<String> {
        let mut page = String::new();
        write_head(&mut page, site_title)?;
        writeln!(page, "<h1>{}</h1>", escape_html(site_title))?;
        self.write_tree(&mut page, self.hierarchy.roots())?;
        writeln!(page, "</body>\n</html>")?;
        Ok(page)
    }

    fn write_tree(&self, page: &mut String, ids: &[&str]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        writeln!(page, "<ul>")?;
        for id in ids {
            write!(page, "<li>{}", self.link(id))?;
            self.write_tree(page, self.hierarchy.children(id))?;
            writeln!(page, "</li>")?;
        }
        writeln!(page, "</ul>")?;
        Ok(())
    }

    /// The page file assigned to `id`.
    fn page(&self, id: &str) -> &str {
        self.pages.get(id).map(String::as_str).unwrap_or(INDEX_PAGE)
    }

    fn link(&self, id: &str) -> String {
        let title = self.by_id.get(id).map(|n| n.title.as_str()).unwrap_or(id);
        format!(
            "<a href=\"{}\">{}</a>",
            escape_html(self.page(id)),
            escape_html(title)
        )
    }
}

fn write_head(page: &mut String, title: &str) -> Result<()> {
    writeln!(page, "<!DOCTYPE html>\n<html>\n<head>")?;
    writeln!(page, "<meta charset=\"utf-8\">")?;
    writeln!(page, "<title>{}</title>", escape_html(title))?;
    writeln!(page, "</head>\n<body>")?;
    Ok(())
}

/// One page name per note id, in selection order.
fn assign_pages(notes: &[Note]) -> HashMap<&str, String> {
    let mut taken = HashSet::from([INDEX_PAGE.to_string()]);
    let mut pages = HashMap::new();
    for note in notes {
        if pages.contains_key(note.id.as_str()) {
            continue;
        }
        let stem = sanitize_filename(&note.id);
        let mut name = format!("{}.html", stem);
        let mut suffix = 2;
        while !taken.insert(name.to_lowercase()) {
            name = format!("{}-{}.html", stem, suffix);
            suffix += 1;
        }
        pages.insert(note.id.as_str(), name);
    }
    pages
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
