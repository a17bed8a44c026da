//! Config validation.
//!
//! Turns a raw, untrusted JSON object into a typed [`PodConfig`]. Validation is
//! total: every missing or mistyped field is collected before failing, so a user
//! can fix all problems in one pass. Fields the schema does not declare are
//! ignored.

use crate::error::{FieldError, PodError, Result};
use crate::schema::{FieldDefault, FieldType, Schema};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Raw config as submitted by a caller.
pub type RawConfig = Map<String, Value>;

/// A validated, typed config value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Str(String),
    Bool(bool),
    Int(i64),
    Path(PathBuf),
    List(Vec<String>),
    Object(Map<String, Value>),
}

/// Validated pod configuration.
///
/// Only [`validate`] constructs one, so holding a `PodConfig` means the schema
/// was satisfied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PodConfig {
    values: BTreeMap<String, ConfigValue>,
}

impl PodConfig {
    pub fn get(&self, name: &str) -> Option<&ConfigValue> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ConfigValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(ConfigValue::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn int(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ConfigValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn path(&self, name: &str) -> Option<&Path> {
        match self.values.get(name) {
            Some(ConfigValue::Path(p)) => Some(p),
            _ => None,
        }
    }

    pub fn list(&self, name: &str) -> Option<&[String]> {
        match self.values.get(name) {
            Some(ConfigValue::List(items)) => Some(items),
            _ => None,
        }
    }

    pub fn object(&self, name: &str) -> Option<&Map<String, Value>> {
        match self.values.get(name) {
            Some(ConfigValue::Object(map)) => Some(map),
            _ => None,
        }
    }

    /// Path field a pod cannot work without; reported as a prepare failure.
    pub fn require_path(&self, pod: &str, name: &str) -> Result<PathBuf> {
        self.path(name)
            .map(Path::to_path_buf)
            .ok_or_else(|| PodError::Prepare {
                pod: pod.to_string(),
                message: format!("`{}` is not set", name),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Validate `raw` against `schema`.
pub fn validate(schema: &Schema, raw: &RawConfig) -> Result<PodConfig> {
    let mut values = BTreeMap::new();
    let mut errors = Vec::new();

    for spec in schema.fields() {
        match raw.get(spec.name).filter(|v| !v.is_null()) {
            Some(value) => match coerce(spec.kind, value) {
                Some(coerced) => {
                    values.insert(spec.name.to_string(), coerced);
                }
                None => errors.push(FieldError::TypeMismatch {
                    field: spec.name.to_string(),
                    expected: spec.kind,
                    found: describe(value).to_string(),
                }),
            },
            None if spec.required => errors.push(FieldError::MissingField {
                field: spec.name.to_string(),
            }),
            None => {
                if let Some(default) = spec.default {
                    values.insert(spec.name.to_string(), from_default(default));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(PodConfig { values })
    } else {
        Err(PodError::ConfigValidation(errors))
    }
}

fn coerce(kind: FieldType, value: &Value) -> Option<ConfigValue> {
    match (kind, value) {
        (FieldType::String, Value::String(s)) => Some(ConfigValue::Str(s.clone())),
        (FieldType::Bool, Value::Bool(b)) => Some(ConfigValue::Bool(*b)),
        (FieldType::Bool, Value::String(s)) => match s.trim() {
            "true" => Some(ConfigValue::Bool(true)),
            "false" => Some(ConfigValue::Bool(false)),
            _ => None,
        },
        (FieldType::Integer, Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(integral))
            .map(ConfigValue::Int),
        (FieldType::Integer, Value::String(s)) => s.trim().parse().ok().map(ConfigValue::Int),
        (FieldType::Path, Value::String(s)) if !s.trim().is_empty() => {
            Some(ConfigValue::Path(PathBuf::from(s.trim())))
        }
        (FieldType::StringList, Value::String(s)) => Some(ConfigValue::List(vec![s.clone()])),
        (FieldType::StringList, Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
            .map(ConfigValue::List),
        (FieldType::Object, Value::Object(map)) => Some(ConfigValue::Object(map.clone())),
        _ => None,
    }
}

/// `10.0` counts as an integer; `10.5` and out-of-range values do not.
fn integral(f: f64) -> Option<i64> {
    let in_range = f >= i64::MIN as f64 && f < i64::MAX as f64;
    (f.fract() == 0.0 && in_range).then_some(f as i64)
}

fn from_default(default: FieldDefault) -> ConfigValue {
    match default {
        FieldDefault::Str(s) => ConfigValue::Str(s.to_string()),
        FieldDefault::Bool(b) => ConfigValue::Bool(b),
        FieldDefault::Int(n) => ConfigValue::Int(n),
        FieldDefault::Path(p) => ConfigValue::Path(PathBuf::from(p)),
        FieldDefault::List(items) => {
            ConfigValue::List(items.iter().map(|s| s.to_string()).collect())
        }
    }
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(s) if s.trim().is_empty() => "empty string",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use serde_json::json;

    const FIELDS: &[FieldSpec] = &[
        FieldSpec::required("src", FieldType::Path),
        FieldSpec::required("vault", FieldType::String),
        FieldSpec::optional("limit", FieldType::Integer).with_default(FieldDefault::Int(50)),
        FieldSpec::optional("dry_run", FieldType::Bool).with_default(FieldDefault::Bool(false)),
        FieldSpec::optional("exts", FieldType::StringList)
            .with_default(FieldDefault::List(&[".md"])),
        FieldSpec::optional("extra", FieldType::Object),
    ];
    const SCHEMA: Schema = Schema::new(FIELDS);

    fn raw(value: Value) -> RawConfig {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_fills_defaults_for_absent_optional_fields() {
        let config = validate(&SCHEMA, &raw(json!({"src": "/in", "vault": "main"}))).unwrap();
        assert_eq!(config.path("src"), Some(Path::new("/in")));
        assert_eq!(config.str("vault"), Some("main"));
        assert_eq!(config.int("limit"), Some(50));
        assert_eq!(config.bool("dry_run"), Some(false));
        assert_eq!(config.list("exts"), Some(&[".md".to_string()][..]));
        assert!(config.object("extra").is_none());
    }

    #[test]
    fn test_reports_every_problem_at_once() {
        let err = validate(&SCHEMA, &raw(json!({"limit": "lots", "dry_run": 3}))).unwrap_err();
        let fields: Vec<_> = err.field_errors().iter().map(|e| e.field()).collect();
        assert_eq!(fields, vec!["src", "vault", "limit", "dry_run"]);
        assert!(matches!(
            err.field_errors()[0],
            FieldError::MissingField { .. }
        ));
        assert!(matches!(
            err.field_errors()[2],
            FieldError::TypeMismatch {
                expected: FieldType::Integer,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_fields_are_ignored() {
        let config = validate(
            &SCHEMA,
            &raw(json!({"src": "/in", "vault": "v", "futureOption": true})),
        )
        .unwrap();
        assert!(config.get("futureOption").is_none());
    }

    #[test]
    fn test_string_coercions() {
        let config = validate(
            &SCHEMA,
            &raw(json!({"src": "/in", "vault": "v", "limit": "10", "dry_run": "true", "exts": ".txt"})),
        )
        .unwrap();
        assert_eq!(config.int("limit"), Some(10));
        assert_eq!(config.bool("dry_run"), Some(true));
        assert_eq!(config.list("exts"), Some(&[".txt".to_string()][..]));
    }

    #[test]
    fn test_integral_floats_are_integers() {
        let base = json!({"src": "/in", "vault": "v"});
        let with_limit = |limit: Value| {
            let mut raw = raw(base.clone());
            raw.insert("limit".to_string(), limit);
            validate(&SCHEMA, &raw)
        };
        assert_eq!(with_limit(json!(10.0)).unwrap().int("limit"), Some(10));
        assert_eq!(with_limit(json!(-3.0)).unwrap().int("limit"), Some(-3));
        for rejected in [json!(10.5), json!(1e300)] {
            let err = with_limit(rejected).unwrap_err();
            assert_eq!(err.field_errors()[0].field(), "limit");
        }
    }

    #[test]
    fn test_null_counts_as_absent() {
        let err = validate(&SCHEMA, &raw(json!({"src": null, "vault": "v"}))).unwrap_err();
        assert_eq!(
            err.field_errors(),
            &[FieldError::MissingField {
                field: "src".into()
            }]
        );
    }

    #[test]
    fn test_empty_path_is_a_type_mismatch() {
        let err = validate(&SCHEMA, &raw(json!({"src": "  ", "vault": "v"}))).unwrap_err();
        assert_eq!(
            err.field_errors(),
            &[FieldError::TypeMismatch {
                field: "src".into(),
                expected: FieldType::Path,
                found: "empty string".into(),
            }]
        );
    }

    #[test]
    fn test_list_with_non_string_item_is_rejected() {
        let err = validate(
            &SCHEMA,
            &raw(json!({"src": "/in", "vault": "v", "exts": [".md", 4]})),
        )
        .unwrap_err();
        assert_eq!(err.field_errors()[0].field(), "exts");
    }

    #[test]
    fn test_require_path_reports_prepare_error() {
        let config = PodConfig::default();
        let err = config.require_path("json", "target").unwrap_err();
        assert!(matches!(err, PodError::Prepare { .. }));
    }
}
