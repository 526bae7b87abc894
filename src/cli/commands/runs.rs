//! `tabflow runs`

use anyhow::Result;
use chrono::Utc;
use std::time::Duration;

use crate::app::{load_pipeline_config, AppConfig};
use crate::cli::args::RunsCommands;
use crate::evaluation::EvaluationReport;
use crate::storage::{self, cleanup_runs, ArtifactStore, CleanupStats, RetentionPolicy, RunHandle};

pub fn execute(app: &AppConfig, command: RunsCommands) -> Result<()> {
    let config = load_pipeline_config(app, false)?;
    let store = ArtifactStore::new(config.artifact_root.clone());

    match command {
        RunsCommands::List => list(&store),
        RunsCommands::Latest => {
            let run = store.latest_run()?;
            println!("{}", run.dir().display());
            Ok(())
        }
        RunsCommands::Clean {
            keep_last,
            older_than,
            dry_run,
        } => clean(&store, keep_last, older_than, dry_run),
    }
}

fn list(store: &ArtifactStore) -> Result<()> {
    let runs = store.list_runs()?;
    if runs.is_empty() {
        println!("No runs under {}", store.root().display());
        return Ok(());
    }
    for run in &runs {
        println!("{}  {}", run.id(), status(run));
    }
    Ok(())
}

/// Accuracy of a completed run, or the last stage that left artifacts
fn status(run: &RunHandle) -> String {
    let paths = run.paths();
    if let Ok(report) = storage::read_yaml::<EvaluationReport>(&paths.evaluation_report()) {
        return format!("complete, accuracy {:.4}", report.accuracy);
    }
    let reached = [
        (paths.model(), "trained"),
        (paths.train_array(), "transformed"),
        (paths.validation_report(), "validated"),
        (paths.raw_data(), "ingested"),
    ]
    .into_iter()
    .find(|(path, _)| path.exists())
    .map_or("empty", |(_, label)| label);
    format!("incomplete ({})", reached)
}

fn clean(
    store: &ArtifactStore,
    keep_last: Option<usize>,
    older_than: Option<Duration>,
    dry_run: bool,
) -> Result<()> {
    let policy = RetentionPolicy {
        keep_last,
        older_than: older_than.map(chrono::Duration::from_std).transpose()?,
        dry_run,
    };
    if policy.is_noop() {
        println!("Nothing to do: pass --keep-last and/or --older-than");
        return Ok(());
    }

    let stats = cleanup_runs(store, &policy, Utc::now())?;
    let verb = if dry_run { "Would remove" } else { "Removed" };
    println!(
        "{} {} of {} runs ({})",
        verb,
        stats.runs_removed(),
        stats.runs_scanned,
        CleanupStats::format_bytes(stats.bytes_reclaimed)
    );
    for id in &stats.removed {
        println!("  {}", id);
    }
    for error in &stats.errors {
        eprintln!("  failed: {}", error);
    }
    Ok(())
}
