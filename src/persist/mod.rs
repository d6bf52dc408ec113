pub mod csv_export;
pub mod d1;
pub mod queries;

use crate::config::Config;
use crate::ingest::CollectionRun;
use crate::persist::d1::D1Client;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Debug, Default)]
pub struct PersistOutcome {
    pub files: Vec<PathBuf>,
    pub remote_tables: Vec<&'static str>,
    pub failures: usize,
}

impl PersistOutcome {
    fn record_failure(&mut self, step: &str, failure: anyhow::Error) {
        let message = format!("{failure:#}");
        error!(error = %message, step, "persistence step failed");
        self.failures += 1;
    }
}

/// File-name stamp: ISO-8601 UTC with `:` and `.` replaced by `-`.
pub fn run_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H-%M-%S-%3fZ").to_string()
}

pub fn app_details_path(result_dir: &Path, stamp: &str) -> PathBuf {
    result_dir.join(format!("app-details-{stamp}.json"))
}

pub fn reviews_path(result_dir: &Path, keywords: &str, stamp: &str) -> PathBuf {
    let label = keywords.trim().replace(['/', '\\'], "-");
    let label = if label.is_empty() { "all" } else { label.as_str() };
    result_dir.join(format!("{label}-app-reviews-{stamp}.json"))
}

pub fn app_csv_path(result_dir: &Path, stamp: &str) -> PathBuf {
    result_dir.join(format!("app_data_{stamp}.csv"))
}

/// Writes the run wherever `save_location` asks. Every step is attempted even when an
/// earlier one failed; failures are logged and counted.
pub fn persist_run(config: &Config, run: &CollectionRun, stamp: &str) -> PersistOutcome {
    let mut outcome = PersistOutcome::default();

    if config.save_location.writes_local() {
        persist_local(config, run, stamp, &mut outcome);
    }
    if config.save_location.writes_remote() {
        persist_remote(config, run, stamp, &mut outcome);
    }

    outcome
}

fn persist_local(config: &Config, run: &CollectionRun, stamp: &str, outcome: &mut PersistOutcome) {
    let apps_path = app_details_path(&config.result_dir, stamp);
    match write_json(&apps_path, &run.apps) {
        Ok(()) => outcome.files.push(apps_path),
        Err(failure) => outcome.record_failure("app details file", failure),
    }

    let reviews_path = reviews_path(&config.result_dir, &config.keywords, stamp);
    match write_json(&reviews_path, &run.reviews) {
        Ok(()) => outcome.files.push(reviews_path),
        Err(failure) => outcome.record_failure("reviews file", failure),
    }
}

fn persist_remote(config: &Config, run: &CollectionRun, stamp: &str, outcome: &mut PersistOutcome) {
    let client = match D1Client::from_config(config) {
        Ok(client) => client,
        Err(failure) => {
            outcome.record_failure("remote client", failure);
            return;
        }
    };

    if let Err(failure) = client.execute_all("schema", &queries::schema_statements()) {
        outcome.record_failure("remote schema", failure);
    }

    let csv_path = app_csv_path(&config.result_dir, stamp);
    let app_rows = csv_export::write_app_csv(&csv_path, &run.apps)
        .and_then(|()| csv_export::read_app_csv(&csv_path));
    match app_rows {
        Ok(rows) => {
            outcome.files.push(csv_path);
            let statements = queries::app_insert_statements(&rows);
            match client.execute_all(queries::APP_TABLE, &statements) {
                Ok(()) => {
                    info!(rows = rows.len(), "app rows submitted");
                    outcome.remote_tables.push(queries::APP_TABLE);
                }
                Err(failure) => outcome.record_failure("remote app rows", failure),
            }
        }
        Err(failure) => outcome.record_failure("app CSV", failure),
    }

    if run.reviews.is_empty() {
        return;
    }

    let statements = queries::review_insert_statements(&run.reviews);
    match client.execute_all(queries::REVIEW_TABLE, &statements) {
        Ok(()) => {
            info!(rows = run.reviews.len(), "review rows submitted");
            outcome.remote_tables.push(queries::REVIEW_TABLE);
        }
        Err(failure) => outcome.record_failure("remote review rows", failure),
    }
}

fn write_json<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create result directory: {}", parent.display()))?;
    }

    let content = serde_json::to_string_pretty(items).context("Failed to serialize records")?;
    fs::write(path, content).with_context(|| format!("Failed to write file: {}", path.display()))?;
    info!(path = %path.display(), records = items.len(), "file written");

    Ok(())
}
