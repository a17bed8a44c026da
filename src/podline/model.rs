use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Direction of data flow for a pod, relative to the note store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PodKind {
    Import,
    Export,
    Publish,
}

impl PodKind {
    pub const ALL: [PodKind; 3] = [PodKind::Import, PodKind::Export, PodKind::Publish];

    pub fn as_str(self) -> &'static str {
        match self {
            PodKind::Import => "import",
            PodKind::Export => "export",
            PodKind::Publish => "publish",
        }
    }
}

impl fmt::Display for PodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PodKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "import" => Ok(PodKind::Import),
            "export" => Ok(PodKind::Export),
            "publish" => Ok(PodKind::Publish),
            other => Err(format!(
                "unknown pod kind `{}`; expected import|export|publish",
                other
            )),
        }
    }
}

/// A note in the canonical store.
///
/// `fname` is the dot-separated hierarchical path (`project.tasks.today`);
/// the hierarchy is derived from it rather than stored separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub fname: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub front_matter: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

impl Note {
    pub fn new(id: impl Into<String>, fname: impl Into<String>, body: impl Into<String>) -> Self {
        let fname = fname.into();
        Self {
            id: id.into(),
            title: title_from_fname(&fname),
            fname,
            body: body.into(),
            front_matter: BTreeMap::new(),
            created: None,
            updated: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_front_matter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.front_matter.insert(key.into(), value);
        self
    }

    /// Segments of the hierarchical path.
    pub fn path_segments(&self) -> impl Iterator<Item = &str> {
        self.fname.split('.').filter(|s| !s.is_empty())
    }

    /// The fname of the hierarchical parent, `None` for root notes.
    pub fn parent_fname(&self) -> Option<&str> {
        self.fname.rsplit_once('.').map(|(parent, _)| parent)
    }
}

/// Title derived from the last path segment: `notes.daily-log` -> `Daily Log`.
pub fn title_from_fname(fname: &str) -> String {
    let leaf = fname.rsplit('.').next().unwrap_or(fname);
    leaf.split(['-', '_'])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
