//! Pod config schemas.
//!
//! Every pod declares the shape of its configuration as a static table of
//! [`FieldSpec`]s. The validator ([`crate::validate`]) reads the table to turn
//! untrusted input into a typed [`crate::validate::PodConfig`].
//!
//! Schemas are `const`-constructible so a pod's schema lives next to the pod:
//!
//! ```ignore
//! const FIELDS: &[FieldSpec] = &[
//!     FieldSpec::required("target", FieldType::Path),
//!     FieldSpec::optional("pretty", FieldType::Bool).with_default(FieldDefault::Bool(true)),
//! ];
//! pub const SCHEMA: Schema = Schema::new(FIELDS);
//! ```

use std::collections::HashSet;
use std::fmt;

/// The type a config field coerces to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    String,
    Bool,
    Integer,
    /// Filesystem path, given as a non-empty string.
    Path,
    /// List of strings; a bare string is accepted as a one-element list.
    StringList,
    /// Free-form JSON object, passed through to the pod.
    Object,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Bool => "bool",
            FieldType::Integer => "integer",
            FieldType::Path => "path",
            FieldType::StringList => "string list",
            FieldType::Object => "object",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compile-time default for an optional field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldDefault {
    Str(&'static str),
    Bool(bool),
    Int(i64),
    Path(&'static str),
    List(&'static [&'static str]),
}

/// Declaration of a single config field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldType,
    pub required: bool,
    pub default: Option<FieldDefault>,
    /// One-line help shown by `podline describe`.
    pub description: &'static str,
}

impl FieldSpec {
    pub const fn required(name: &'static str, kind: FieldType) -> Self {
        Self {
            name,
            kind,
            required: true,
            default: None,
            description: "",
        }
    }

    pub const fn optional(name: &'static str, kind: FieldType) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
            description: "",
        }
    }

    pub const fn with_default(mut self, default: FieldDefault) -> Self {
        self.default = Some(default);
        self
    }

    pub const fn describe(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }
}

/// Ordered set of field declarations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
    fields: &'static [FieldSpec],
}

impl Schema {
    pub const EMPTY: Schema = Schema::new(&[]);

    pub const fn new(fields: &'static [FieldSpec]) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &'static [FieldSpec] {
        self.fields
    }

    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> {
        self.fields
            .iter()
            .filter(|spec| spec.required)
            .map(|spec| spec.name)
    }

    /// First field name declared more than once, if any.
    pub fn duplicate_field(&self) -> Option<&'static str> {
        let mut seen = HashSet::new();
        self.fields
            .iter()
            .map(|spec| spec.name)
            .find(|name| !seen.insert(*name))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
