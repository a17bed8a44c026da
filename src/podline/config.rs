//! # Configuration
//!
//! Application settings are loaded with [`confique`], layered in priority order:
//!
//! 1. **Environment variables**: `PODLINE_STORE_DIR`, `PODLINE_LOG_LEVEL`.
//! 2. **Config file**: `--config <path>`, or `podline.toml` in the OS config
//!    directory (via `directories`).
//! 3. **Compiled defaults**.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `store_dir` | OS data directory | Where `notes.json` lives |
//! | `log_level` | `info` | Fallback log filter when `PODLINE_LOG` is unset |
//! | `pods` | none | Per-pod default configs keyed `"<kind>.<id>"` |
//!
//! Pod defaults sit under values given on the command line:
//!
//! ```toml
//! [pods."publish.html"]
//! target = "site"
//! site_title = "Field Notes"
//! ```

use crate::error::{PodError, Result};
use crate::model::PodKind;
use crate::validate::RawConfig;
use confique::Config;
use directories::ProjectDirs;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "podline.toml";

#[derive(Config, Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the note store (`notes.json`).
    #[config(env = "PODLINE_STORE_DIR")]
    pub store_dir: Option<PathBuf>,

    /// Log level used when `PODLINE_LOG` is not set.
    #[config(env = "PODLINE_LOG_LEVEL", default = "info")]
    pub log_level: String,

    /// Default configs per pod, keyed "<kind>.<id>".
    pub pods: Option<BTreeMap<String, RawConfig>>,
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "podline", "podline")
}

pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

impl AppConfig {
    /// Load settings. An explicit `path` must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = AppConfig::builder().env();
        match path {
            Some(path) => {
                if !path.is_file() {
                    return Err(PodError::Settings(format!(
                        "config file {} not found",
                        path.display()
                    )));
                }
                builder = builder.file(path);
            }
            None => {
                if let Some(default) = default_config_path() {
                    builder = builder.file(default);
                }
            }
        }
        builder
            .load()
            .map_err(|e| PodError::Settings(e.to_string()))
    }

    /// The note store directory, falling back to the OS data directory.
    pub fn store_dir(&self) -> Result<PathBuf> {
        match &self.store_dir {
            Some(dir) => Ok(dir.clone()),
            None => project_dirs()
                .map(|dirs| dirs.data_dir().to_path_buf())
                .ok_or_else(|| PodError::Settings("cannot determine a data directory".into())),
        }
    }

    /// Configured defaults for one pod, empty when none are set.
    pub fn pod_defaults(&self, kind: PodKind, id: &str) -> RawConfig {
        self.pods
            .as_ref()
            .and_then(|pods| pods.get(&format!("{}.{}", kind, id)))
            .cloned()
            .unwrap_or_default()
    }

    /// Sample `podline.toml` listing every setting.
    pub fn template() -> String {
        confique::toml::template::<AppConfig>(confique::toml::FormatOptions::default())
    }
}

/// Layer `overrides` over `defaults`, key by key.
pub fn merge_raw(mut defaults: RawConfig, overrides: RawConfig) -> RawConfig {
    for (key, value) in overrides {
        defaults.insert(key, value);
    }
    defaults
}
