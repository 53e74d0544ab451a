//! gtd-triage
//!
//! Command-line front end for task prioritization, auto-batching and
//! dependency suggestions over a SQLite task store.

use anyhow::{Result, anyhow};
use clap::Parser;
use gtd_triage::cli::import::ImportArgs;
use gtd_triage::cli::{Cli, Command, DependArgs};
use gtd_triage::config::Config;
use gtd_triage::db::import::read_tasks_file;
use gtd_triage::db::{Database, now_ms};
use gtd_triage::error::EngineError;
use gtd_triage::format::{self, OutputFormat};
use gtd_triage::logging::{self, LogTarget};
use gtd_triage::repository::TaskRepository;
use gtd_triage::service::TaskService;
use serde::Serialize;
use serde_json::json;
use std::path::Path;
use tracing::{debug, info};

/// Print `value` as pretty JSON, or the markdown rendering.
fn emit<T: Serialize>(format: OutputFormat, value: &T, markdown: impl FnOnce() -> String) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Markdown => print!("{}", markdown()),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init(&LogTarget::parse(&cli.log), cli.verbose)?;

    let mut config = Config::resolve(cli.config.as_deref().map(Path::new))?;
    if let Some(db_path) = &cli.database {
        config.server.db_path = db_path.into();
    }
    config.ensure_db_dir()?;

    let db = Database::open(&config.server.db_path)?;
    debug!(path = %config.server.db_path.display(), "Opened database");

    let format = cli.format;
    match cli.command {
        Command::Add(args) => {
            let task = db.create_task(args.to_task()?)?;
            emit(format, &task, || format::format_task_markdown(&task))?;
        }
        Command::List { all } => {
            let tasks = db.list_all_tasks(all)?;
            emit(format, &tasks, || format::format_tasks_markdown(&tasks))?;
        }
        Command::Show { id } => {
            let task = db
                .get_task(&id)?
                .ok_or_else(|| EngineError::task_not_found(&id))?;
            emit(format, &task, || format::format_task_markdown(&task))?;
        }
        Command::Status { id, status } => {
            db.update_task_status(&id, status)?;
            emit(format, &json!({ "id": id, "status": status }), || {
                format!("`{}` is now {}\n", id, status)
            })?;
        }
        Command::Depend(args) => run_depend(&db, format, args)?,
        Command::Prioritize(args) => {
            let mut service = TaskService::from_config(db, &config);
            let report = service.prioritize(now_ms(), args.dry_run)?;
            emit(format, &report, || format::format_prioritize_report(&report))?;
        }
        Command::Explain { id } => {
            let task = db
                .get_task(&id)?
                .ok_or_else(|| EngineError::task_not_found(&id))?;
            let mut service = TaskService::from_config(db, &config);
            let breakdown = service.explain(&id, now_ms())?;
            emit(
                format,
                &json!({ "task": task, "score": breakdown.total(), "tier": breakdown.tier(), "breakdown": breakdown }),
                || format::format_breakdown_markdown(&task, &breakdown),
            )?;
        }
        Command::Batch(args) => {
            let mut service = TaskService::from_config(db, &config);
            let report = service.auto_batch(args.dry_run)?;
            emit(format, &report, || format::format_batch_report(&report))?;
        }
        Command::Batches => {
            let batches = db.list_batches()?;
            emit(format, &batches, || format::format_batches_markdown(&batches))?;
        }
        Command::Suggest { id, dedup } => {
            if dedup {
                config.suggestions.dedup = true;
            }
            let mut service = TaskService::from_config(db, &config);
            let ids = service.suggest_dependencies(&id)?;
            emit(format, &json!({ "task_id": id, "suggestions": ids }), || {
                if ids.is_empty() {
                    format!("No suggested dependencies for `{}`\n", id)
                } else {
                    ids.iter().map(|s| format!("- `{}`\n", s)).collect()
                }
            })?;
        }
        Command::Import(args) => run_import(&db, format, args)?,
    }

    Ok(())
}

fn run_depend(db: &Database, format: OutputFormat, args: DependArgs) -> Result<()> {
    if args.remove {
        if !db.remove_dependency(&args.task, &args.on)? {
            return Err(anyhow!("`{}` does not depend on `{}`", args.task, args.on));
        }
    } else {
        db.add_dependency(&args.task, &args.on)?;
    }

    let dependents = db.get_dependents(&args.on)?;
    emit(
        format,
        &json!({ "task_id": args.task, "depends_on": args.on, "removed": args.remove, "dependents": dependents }),
        || {
            let verb = if args.remove { "no longer depends" } else { "depends" };
            format!(
                "`{}` {} on `{}` ({} dependent(s))\n",
                args.task,
                verb,
                args.on,
                dependents.len()
            )
        },
    )
}

fn run_import(db: &Database, format: OutputFormat, args: ImportArgs) -> Result<()> {
    info!(file = %args.file.display(), mode = args.import_mode(), "Importing tasks");
    let tasks = read_tasks_file(&args.file)?;
    let summary = db.import_tasks(&tasks, args.dry_run)?;

    emit(format, &summary, || {
        let mut md = format!(
            "Imported {} new and {} replaced task(s)",
            summary.inserted, summary.replaced
        );
        if args.dry_run {
            md.push_str(" (dry run)");
        }
        md.push('\n');
        for err in &summary.skipped {
            md.push_str(&format!("- skipped: {}\n", err.message));
        }
        for id in &summary.unlinked {
            md.push_str(&format!("- cleared missing batch on `{}`\n", id));
        }
        md
    })
}
