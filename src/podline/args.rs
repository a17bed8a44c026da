use clap::{Parser, Subcommand};
use podline::PodKind;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Version string; dev builds carry the git hash and commit date.
fn get_version() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("PODLINE_GIT_HASH");
    const GIT_COMMIT_DATE: &str = env!("PODLINE_COMMIT_DATE");

    static VERSION_STRING: OnceLock<String> = OnceLock::new();
    VERSION_STRING.get_or_init(|| {
        if GIT_HASH.is_empty() {
            format!("v{}", VERSION)
        } else {
            format!("v{}\ndev: {} {}", VERSION, GIT_HASH, GIT_COMMIT_DATE)
        }
    })
}

#[derive(Parser, Debug)]
#[command(name = "podline", version = get_version())]
#[command(about = "Import, export and publish notes through pods", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: podline.toml in the OS config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Note store directory (overrides the config file)
    #[arg(long, global = true, value_name = "DIR")]
    pub store: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List registered pods
    #[command(alias = "ls")]
    Pods {
        /// Only pods of this kind (import, export, publish)
        #[arg(short, long)]
        kind: Option<PodKind>,
    },

    /// Show a pod and its config fields
    Describe {
        /// import, export or publish
        kind: PodKind,
        /// Pod id
        id: String,
    },

    /// Run a pod
    Run {
        /// import, export or publish
        kind: PodKind,
        /// Pod id
        id: String,

        /// Config value; VALUE is read as JSON, falling back to a plain string
        #[arg(short, long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,

        /// JSON file with a config object, applied under --set values
        #[arg(long, value_name = "FILE")]
        config_file: Option<PathBuf>,

        /// Note to export or publish (repeatable; default: all notes)
        #[arg(short, long = "note", value_name = "ID")]
        notes: Vec<String>,

        /// Give up after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// List notes in the store
    Notes {
        /// Print notes as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a sample config file
    Config,
}
