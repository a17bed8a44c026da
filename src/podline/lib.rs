//! # Podline Architecture
//!
//! Podline moves notes in and out of a canonical note store through **pods**:
//! small, interchangeable units that import from a source, export to a sink,
//! or publish a rendered site. It is a library first; the `podline` binary is
//! one client of it.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI (main.rs, args.rs)                                     │
//! │  - Parses arguments, prints results, owns exit codes        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Facade (api.rs)                                        │
//! │  - Catalog queries and boundary requests                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Engine (engine.rs)                                         │
//! │  - resolve → validate → prepare → execute → PodResult       │
//! │  - Merges imports, selects notes for export/publish         │
//! └─────────────────────────────────────────────────────────────┘
//!            │                   │                    │
//!            ▼                   ▼                    ▼
//! ┌──────────────────┐ ┌──────────────────┐ ┌──────────────────┐
//! │ Registry         │ │ Pods             │ │ Note Store       │
//! │ (registry.rs)    │ │ (pod/, pods/)    │ │ (store/)         │
//! └──────────────────┘ └──────────────────┘ └──────────────────┘
//! ```
//!
//! ## Key Principle: Registries Are Values
//!
//! The pod catalog is a static table built by [`registry::PodRegistry::builtin`]
//! and passed to the [`engine::Engine`]. There is no global registration, so
//! tests build registries holding exactly the pods they need.
//!
//! ## Key Principle: No Unvalidated Config Reaches a Pod
//!
//! Pods only ever see a [`validate::PodConfig`], which only the validator can
//! construct.
//!
//! ## Module Overview
//!
//! - [`api`]: The facade used by UIs
//! - [`engine`]: Run lifecycle, selection, import merging
//! - [`registry`]: Pod catalog
//! - [`pod`]: Pod traits, run context, results
//! - [`pods`]: Built-in pods (json, markdown, html, graphviz, archive, nextjs)
//! - [`schema`] / [`validate`]: Config schemas and validation
//! - [`store`]: Note store trait and implementations
//! - [`model`]: `Note`, `PodKind`
//! - [`config`]: Application settings
//! - [`logging`]: Subscriber bootstrap
//! - [`error`]: Error types

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod model;
pub mod pod;
pub mod pods;
pub mod registry;
pub mod schema;
pub mod store;
pub mod validate;

pub use engine::{Engine, PodRequest, RunContext, Selection};
pub use error::{PodError, Result};
pub use model::{Note, PodKind};
pub use pod::{ExecContext, PodResult};
pub use registry::{PodDescriptor, PodRegistry};
