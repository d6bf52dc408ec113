mod cli;
mod config;
mod ingest;
mod persist;
mod report;
mod store;

use crate::cli::{Cli, Commands, ConfigArg, ConfigCommands};
use crate::config::{Config, DISPLAY_KEYS};
use crate::store::itunes::ItunesClient;
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Collect {
            config,
            keywords,
            urls,
            country,
            save,
            result_dir,
        } => {
            let mut config = load_config(&config)?;
            let overrides = [
                ("keywords", keywords),
                ("urls", urls),
                ("country", country),
                ("save_location", save),
                ("result_dir", result_dir.map(|dir| dir.display().to_string())),
            ];
            overrides
                .into_iter()
                .filter_map(|(key, value)| value.map(|value| (key, value)))
                .try_for_each(|(key, value)| config.set_value(key, &value))?;

            handle_collect(&config);
            Ok(())
        }
        Commands::Report {
            config,
            input,
            output,
            template,
        } => handle_report(&load_config(&config)?, &input, output, template.as_deref()),
        Commands::Config { command } => handle_config_command(command),
        Commands::Doctor { config } => handle_doctor(&load_config(&config)?),
    }
}

fn load_config(arg: &ConfigArg) -> Result<Config> {
    Config::resolve(arg.config.as_deref())
}

/// Outermost boundary of a run: a failure here is logged and ends the run.
fn handle_collect(config: &Config) {
    if let Err(failure) = run_ingestion(config) {
        let message = format!("{failure:#}");
        error!(error = %message, "collection run failed");
    }
}

fn run_ingestion(config: &Config) -> Result<()> {
    fs::create_dir_all(&config.result_dir).with_context(|| {
        format!(
            "Failed to create result directory: {}",
            config.result_dir.display()
        )
    })?;

    let stamp = persist::run_stamp(Utc::now());
    let store = ItunesClient::new(config.http_timeout_seconds)?;
    let run = ingest::run_collection(config, &store);

    if run.apps.is_empty() {
        println!(
            "No apps found for your input: keywords '{}', urls '{}'",
            config.keywords, config.urls
        );
        return Ok(());
    }

    let outcome = persist::persist_run(config, &run, &stamp);

    println!(
        "Collection finished: {} apps, {} reviews",
        run.apps.len(),
        run.reviews.len()
    );
    for path in &outcome.files {
        println!("- file: {}", path.display());
    }
    for table in &outcome.remote_tables {
        println!("- remote table: {table}");
    }
    if outcome.failures > 0 {
        warn!(failures = outcome.failures, "some outputs were not saved");
    }

    Ok(())
}

fn handle_report(
    config: &Config,
    input: &Path,
    output: Option<PathBuf>,
    template: Option<&Path>,
) -> Result<()> {
    let output = output.unwrap_or_else(|| {
        report::default_output_path(&config.output_dir, &persist::run_stamp(Utc::now()))
    });

    let view = report::write_report(input, &output, template)?;
    if view.content == report::FALLBACK_CONTENT {
        println!("Report input could not be read as an analysis document; wrote fallback page");
    }
    println!("Report generated: {}", output.display());

    Ok(())
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show { config } => {
            let config = load_config(&config)?;
            for key in DISPLAY_KEYS {
                println!("{key} = {}", config.get_value(key).unwrap_or_default());
            }
            Ok(())
        }
        ConfigCommands::Get { key, config } => {
            let config = load_config(&config)?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_doctor(config: &Config) -> Result<()> {
    let mut issues = Vec::new();

    for (label, dir) in [("result", &config.result_dir), ("output", &config.output_dir)] {
        match fs::create_dir_all(dir) {
            Ok(()) => println!("[OK] {label} dir usable: {}", dir.display()),
            Err(error) => {
                println!("[WARN] {label} dir not usable ({}): {error}", dir.display());
                issues.push(format!("{label} dir"));
            }
        }
    }

    println!("[OK] country: {}", config.country);

    let keywords = config.keyword_list();
    let urls = config.url_list();
    let url_ids = urls
        .iter()
        .filter_map(|url| ingest::resolver::app_id_from_url(url))
        .count();
    if keywords.is_empty() && url_ids == 0 {
        println!("[WARN] no keywords and no usable store URLs configured");
        issues.push("no input".to_string());
    } else {
        println!(
            "[OK] input: {} keyword(s), {} of {} URL(s) usable",
            keywords.len(),
            url_ids,
            urls.len()
        );
    }

    if config.save_location.writes_remote() {
        if config.has_d1_credentials() {
            println!("[OK] remote database credentials configured");
        } else {
            println!("[WARN] save location is {} but D1 credentials are missing", config.save_location);
            issues.push("d1 credentials missing".to_string());
        }
    } else {
        println!("[OK] save location: {}", config.save_location);
    }

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}
