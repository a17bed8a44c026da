use clap::Parser;
use colored::*;
use podline::api::PodlineApi;
use podline::config::{merge_raw, AppConfig};
use podline::engine::PodRequest;
use podline::error::{PodError, Result};
use podline::logging;
use podline::pod::{ExecContext, PodResult};
use podline::registry::PodDescriptor;
use podline::schema::{FieldDefault, FieldSpec};
use podline::store::fs::FileStore;
use podline::validate::RawConfig;
use podline::PodKind;
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

mod args;
use args::{Cli, Commands};

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            print_error(&e);
            ExitCode::FAILURE
        }
    }
}

struct AppContext {
    api: PodlineApi<FileStore>,
    config: AppConfig,
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let ctx = init_context(&cli)?;

    match cli.command {
        Commands::Pods { kind } => handle_pods(&ctx, kind),
        Commands::Describe { kind, id } => handle_describe(&ctx, kind, &id),
        Commands::Run {
            kind,
            id,
            set,
            config_file,
            notes,
            timeout,
            json,
        } => {
            let raw = build_config(&ctx, kind, &id, config_file, &set)?;
            let request = PodRequest {
                kind,
                pod_id: id,
                config: raw,
                notes: if notes.is_empty() { None } else { Some(notes) },
            };
            handle_run(&ctx, &request, timeout, json)
        }
        Commands::Notes { json } => handle_notes(&ctx, json),
        Commands::Config => {
            print!("{}", AppConfig::template());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_context(cli: &Cli) -> Result<AppContext> {
    let config = AppConfig::load(cli.config.as_deref())?;
    let level = if cli.verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    logging::init(level)?;

    let store_dir = match &cli.store {
        Some(dir) => dir.clone(),
        None => config.store_dir()?,
    };
    tracing::debug!(store = %store_dir.display(), "using note store");
    let api = PodlineApi::with_builtin_pods(FileStore::new(store_dir))?;
    Ok(AppContext { api, config })
}

/// Config defaults, then the config file, then `--set` values.
fn build_config(
    ctx: &AppContext,
    kind: PodKind,
    id: &str,
    config_file: Option<PathBuf>,
    sets: &[String],
) -> Result<RawConfig> {
    let mut raw = ctx.config.pod_defaults(kind, id);
    if let Some(path) = config_file {
        let content = std::fs::read_to_string(&path).map_err(|e| {
            PodError::Settings(format!("cannot read {}: {}", path.display(), e))
        })?;
        let file: RawConfig = serde_json::from_str(&content).map_err(|e| {
            PodError::Settings(format!("{} is not a JSON object: {}", path.display(), e))
        })?;
        raw = merge_raw(raw, file);
    }
    Ok(merge_raw(raw, parse_sets(sets)?))
}

fn parse_sets(sets: &[String]) -> Result<RawConfig> {
    let mut raw = RawConfig::new();
    for set in sets {
        let (key, value) = set
            .split_once('=')
            .ok_or_else(|| PodError::Settings(format!("expected KEY=VALUE, got `{}`", set)))?;
        let value = serde_json::from_str::<Value>(value)
            .unwrap_or_else(|_| Value::String(value.to_string()));
        raw.insert(key.trim().to_string(), value);
    }
    Ok(raw)
}

fn handle_pods(ctx: &AppContext, kind: Option<PodKind>) -> Result<ExitCode> {
    for descriptor in ctx.api.pods(kind) {
        println!(
            "{:<8} {:<10} {}",
            descriptor.kind.to_string().cyan(),
            descriptor.id.bold(),
            descriptor.description.dimmed()
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn handle_describe(ctx: &AppContext, kind: PodKind, id: &str) -> Result<ExitCode> {
    let descriptor = ctx.api.describe(kind, id)?;
    print_descriptor(descriptor);
    Ok(ExitCode::SUCCESS)
}

fn handle_run(
    ctx: &AppContext,
    request: &PodRequest,
    timeout: Option<u64>,
    json: bool,
) -> Result<ExitCode> {
    let mut exec = ExecContext::new();
    if let Some(secs) = timeout {
        exec = exec.with_timeout(Duration::from_secs(secs));
    }

    let result = ctx.api.run(request, exec)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    Ok(if result.succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn handle_notes(ctx: &AppContext, json: bool) -> Result<ExitCode> {
    let notes = ctx.api.notes()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&notes)?);
        return Ok(ExitCode::SUCCESS);
    }
    if notes.is_empty() {
        println!("{}", "No notes.".dimmed());
    }
    for note in &notes {
        println!(
            "{}  {}  {}",
            note.id.yellow(),
            note.fname.dimmed(),
            note.title.bold()
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn print_descriptor(descriptor: &PodDescriptor) {
    println!(
        "{} {}",
        descriptor.kind.to_string().cyan(),
        descriptor.id.bold()
    );
    println!("{}", descriptor.description);
    if descriptor.config_schema.is_empty() {
        return;
    }
    println!();
    for field in descriptor.config_schema.fields() {
        println!(
            "  {:<12} {:<12} {:<18} {}",
            field.name.bold(),
            field.kind.as_str(),
            field_requirement(field),
            field.description.dimmed()
        );
    }
}

fn field_requirement(field: &FieldSpec) -> String {
    if field.required {
        return "required".to_string();
    }
    match field.default {
        Some(FieldDefault::Str(s)) | Some(FieldDefault::Path(s)) => format!("default {:?}", s),
        Some(FieldDefault::Bool(b)) => format!("default {}", b),
        Some(FieldDefault::Int(n)) => format!("default {}", n),
        Some(FieldDefault::List(items)) => format!("default {:?}", items),
        None => "optional".to_string(),
    }
}

fn print_result(result: &PodResult) {
    for outcome in result.item_results() {
        if outcome.succeeded {
            println!("{} {}", "✓".green(), outcome.item);
        } else {
            println!(
                "{} {}: {}",
                "✗".red(),
                outcome.item,
                outcome.detail.as_deref().unwrap_or("failed").red()
            );
        }
    }

    // Item failures were printed with their item above.
    let failed_items: Vec<&str> = result
        .item_results()
        .iter()
        .filter(|o| !o.succeeded)
        .map(|o| o.item.as_str())
        .collect();
    for error in result.errors() {
        let shown = error.code != "collision"
            && error
                .item
                .as_deref()
                .is_some_and(|item| failed_items.contains(&item));
        if !shown {
            println!("{} {}", format!("[{}]", error.code).yellow(), error.message);
        }
    }

    let summary = format!(
        "{} succeeded, {} failed",
        result.succeeded_count(),
        result.failed_count()
    );
    if result.succeeded() {
        println!("{}", summary.green());
    } else {
        println!("{}", summary.red());
    }
}

fn print_error(err: &PodError) {
    eprintln!("{} {}", "Error:".red().bold(), err);
    for field_error in err.field_errors() {
        eprintln!("  - {}", field_error);
    }
}
