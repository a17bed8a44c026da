//! # Pod Registry
//!
//! The catalog of available pods: a static table of descriptor and constructor
//! pairs, built once by [`PodRegistry::builtin`] and handed to the engine.
//!
//! A pod is identified by `(id, kind)`. The same id may appear under several
//! kinds (`json` is an importer, an exporter and a publisher), but never twice
//! under one kind.
//!
//! Registration checks:
//! - ids are non-empty and use lowercase ascii letters, digits, `_` or `-`,
//! - `(id, kind)` is not already taken,
//! - the config schema declares each field name once.

use crate::error::{PodError, Result};
use crate::model::PodKind;
use crate::pod::{ExportPod, ImportPod, PodInstance, PublishPod};
use crate::schema::Schema;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("pod id is invalid: `{0}`")]
    InvalidPodId(String),

    #[error("{kind} pod `{id}` is already registered")]
    DuplicatePod { id: String, kind: PodKind },

    #[error("pod `{pod}` declares config field `{field}` more than once")]
    DuplicateField { pod: String, field: String },
}

/// Static metadata for one registered pod.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PodDescriptor {
    pub id: &'static str,
    pub kind: PodKind,
    pub description: &'static str,
    pub config_schema: Schema,
}

/// Constructor for a pod, tagged by the capability it builds.
#[derive(Clone, Copy)]
pub enum PodFactory {
    Import(fn() -> Box<dyn ImportPod>),
    Export(fn() -> Box<dyn ExportPod>),
    Publish(fn() -> Box<dyn PublishPod>),
}

impl PodFactory {
    pub fn kind(&self) -> PodKind {
        match self {
            PodFactory::Import(_) => PodKind::Import,
            PodFactory::Export(_) => PodKind::Export,
            PodFactory::Publish(_) => PodKind::Publish,
        }
    }

    pub fn build(&self) -> PodInstance {
        match self {
            PodFactory::Import(make) => PodInstance::Import(make()),
            PodFactory::Export(make) => PodInstance::Export(make()),
            PodFactory::Publish(make) => PodInstance::Publish(make()),
        }
    }
}

struct PodEntry {
    descriptor: PodDescriptor,
    factory: PodFactory,
}

#[derive(Default)]
pub struct PodRegistry {
    entries: Vec<PodEntry>,
}

impl PodRegistry {
    /// An empty registry. Use [`PodRegistry::builtin`] for the shipped pods.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry populated with every built-in pod.
    pub fn builtin() -> std::result::Result<Self, RegistryError> {
        let mut registry = Self::new();
        crate::pods::register_builtin(&mut registry)?;
        Ok(registry)
    }

    /// Register a pod; its kind comes from the factory variant.
    pub fn register(
        &mut self,
        id: &'static str,
        description: &'static str,
        config_schema: Schema,
        factory: PodFactory,
    ) -> std::result::Result<&PodDescriptor, RegistryError> {
        let kind = factory.kind();
        if !is_valid_pod_id(id) {
            return Err(RegistryError::InvalidPodId(id.to_string()));
        }
        if self.find(id, kind).is_some() {
            return Err(RegistryError::DuplicatePod {
                id: id.to_string(),
                kind,
            });
        }
        if let Some(field) = config_schema.duplicate_field() {
            return Err(RegistryError::DuplicateField {
                pod: id.to_string(),
                field: field.to_string(),
            });
        }

        self.entries.push(PodEntry {
            descriptor: PodDescriptor {
                id,
                kind,
                description,
                config_schema,
            },
            factory,
        });
        Ok(&self.entries[self.entries.len() - 1].descriptor)
    }

    pub fn register_import(
        &mut self,
        id: &'static str,
        description: &'static str,
        config_schema: Schema,
        make: fn() -> Box<dyn ImportPod>,
    ) -> std::result::Result<&PodDescriptor, RegistryError> {
        self.register(id, description, config_schema, PodFactory::Import(make))
    }

    pub fn register_export(
        &mut self,
        id: &'static str,
        description: &'static str,
        config_schema: Schema,
        make: fn() -> Box<dyn ExportPod>,
    ) -> std::result::Result<&PodDescriptor, RegistryError> {
        self.register(id, description, config_schema, PodFactory::Export(make))
    }

    pub fn register_publish(
        &mut self,
        id: &'static str,
        description: &'static str,
        config_schema: Schema,
        make: fn() -> Box<dyn PublishPod>,
    ) -> std::result::Result<&PodDescriptor, RegistryError> {
        self.register(id, description, config_schema, PodFactory::Publish(make))
    }

    /// Descriptors of one kind, in registration order.
    pub fn list(&self, kind: PodKind) -> Vec<&PodDescriptor> {
        self.entries
            .iter()
            .filter(|e| e.descriptor.kind == kind)
            .map(|e| &e.descriptor)
            .collect()
    }

    pub fn list_import_pods(&self) -> Vec<&PodDescriptor> {
        self.list(PodKind::Import)
    }

    pub fn list_export_pods(&self) -> Vec<&PodDescriptor> {
        self.list(PodKind::Export)
    }

    pub fn list_publish_pods(&self) -> Vec<&PodDescriptor> {
        self.list(PodKind::Publish)
    }

    /// Every descriptor, in registration order.
    pub fn all(&self) -> impl Iterator<Item = &PodDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    pub fn resolve(&self, id: &str, kind: PodKind) -> Result<&PodDescriptor> {
        self.find(id, kind)
            .map(|e| &e.descriptor)
            .ok_or_else(|| PodError::NotFound {
                id: id.to_string(),
                kind,
            })
    }

    /// Build a fresh, unprepared instance of a registered pod.
    pub fn instantiate(&self, id: &str, kind: PodKind) -> Result<PodInstance> {
        self.find(id, kind)
            .map(|e| e.factory.build())
            .ok_or_else(|| PodError::NotFound {
                id: id.to_string(),
                kind,
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn find(&self, id: &str, kind: PodKind) -> Option<&PodEntry> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id && e.descriptor.kind == kind)
    }
}

fn is_valid_pod_id(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}
