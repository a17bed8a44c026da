use crate::model::PodKind;
use crate::registry::RegistryError;
use crate::schema::FieldType;
use thiserror::Error;

/// One problem found while validating a raw pod config.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("missing required field `{field}`")]
    MissingField { field: String },

    #[error("field `{field}` expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: FieldType,
        found: String,
    },
}

impl FieldError {
    pub fn field(&self) -> &str {
        match self {
            FieldError::MissingField { field } => field,
            FieldError::TypeMismatch { field, .. } => field,
        }
    }
}

#[derive(Error, Debug)]
pub enum PodError {
    #[error("No {kind} pod registered with id `{id}`")]
    NotFound { id: String, kind: PodKind },

    #[error("Invalid pod config: {}", join_field_errors(.0))]
    ConfigValidation(Vec<FieldError>),

    #[error("Pod `{pod}` failed to prepare: {message}")]
    Prepare { pod: String, message: String },

    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("Run cancelled")]
    Cancelled,

    #[error("Deadline exceeded")]
    DeadlineExceeded,

    #[error("{0}")]
    Item(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Front matter error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Render error: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl PodError {
    /// Whether this error aborts a whole run rather than a single item.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            PodError::Item(_)
                | PodError::Io(_)
                | PodError::Serialization(_)
                | PodError::Yaml(_)
                | PodError::Format(_)
                | PodError::Cancelled
                | PodError::DeadlineExceeded
        )
    }

    /// Run interruptions are recorded after the outcomes committed so far.
    pub fn is_interruption(&self) -> bool {
        matches!(self, PodError::Cancelled | PodError::DeadlineExceeded)
    }

    /// Stable machine-readable code, used in serialized results.
    pub fn code(&self) -> &'static str {
        match self {
            PodError::NotFound { .. } => "not_found",
            PodError::ConfigValidation(_) => "config_validation",
            PodError::Prepare { .. } => "prepare",
            PodError::Execution(_) => "execution",
            PodError::NoteNotFound(_) => "note_not_found",
            PodError::Cancelled => "cancelled",
            PodError::DeadlineExceeded => "deadline_exceeded",
            PodError::Item(_) => "item",
            PodError::Io(_) => "io",
            PodError::Serialization(_) => "serialization",
            PodError::Yaml(_) => "yaml",
            PodError::Format(_) => "format",
            PodError::Store(_) => "store",
            PodError::Settings(_) => "settings",
            PodError::Registry(_) => "registry",
        }
    }

    pub fn item(message: impl Into<String>) -> Self {
        PodError::Item(message.into())
    }

    pub fn execution(message: impl Into<String>) -> Self {
        PodError::Execution(message.into())
    }

    /// The field errors of a failed validation, empty for every other error.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            PodError::ConfigValidation(errors) => errors,
            _ => &[],
        }
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub type Result<T> = std::result::Result<T, PodError>;
