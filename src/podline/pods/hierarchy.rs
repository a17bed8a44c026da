//! Parent/child relations derived from dotted fnames.
//!
//! A note's parent is the nearest ancestor fname present in the same note set:
//! with only `a` and `a.b.c` selected, `a.b.c` hangs under `a`.

use super::fname_index;
use crate::model::Note;
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Default)]
pub struct Hierarchy<'a> {
    parents: HashMap<&'a str, &'a str>,
    children: BTreeMap<&'a str, Vec<&'a str>>,
    roots: Vec<&'a str>,
}

impl<'a> Hierarchy<'a> {
    pub fn build(notes: &'a [Note]) -> Self {
        let by_fname = fname_index(notes);

        let mut hierarchy = Hierarchy::default();
        for note in notes {
            let id = note.id.as_str();
            match nearest_ancestor(&by_fname, &note.fname) {
                Some(parent) if parent != id => {
                    hierarchy.parents.insert(id, parent);
                    hierarchy.children.entry(parent).or_default().push(id);
                }
                _ => hierarchy.roots.push(id),
            }
        }
        hierarchy
    }

    pub fn parent(&self, id: &str) -> Option<&'a str> {
        self.parents.get(id).copied()
    }

    pub fn children(&self, id: &str) -> &[&'a str] {
        self.children.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn roots(&self) -> &[&'a str] {
        &self.roots
    }

    /// `(parent, child)` pairs, parents in id order.
    pub fn edges(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.children
            .iter()
            .flat_map(|(parent, kids)| kids.iter().map(move |kid| (*parent, *kid)))
    }
}

fn nearest_ancestor<'a>(by_fname: &HashMap<&str, &'a str>, fname: &str) -> Option<&'a str> {
    let mut current = fname;
    while let Some((parent, _)) = current.rsplit_once('.') {
        if let Some(id) = by_fname.get(parent) {
            return Some(*id);
        }
        current = parent;
    }
    None
}
