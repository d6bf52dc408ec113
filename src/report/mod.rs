pub mod html;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const FALLBACK_CONTENT: &str = "<p>Failed to load data</p>";
pub const NOT_AVAILABLE: &str = "N/A";

const TIMEFRAME_SLOT: &str = "{{timeframe}}";
const CUSTOM_DATE_SLOT: &str = "{{custom_date}}";
const CONTENT_SLOT: &str = "{{report_content}}";
const DEFAULT_SHELL: &str = include_str!("../../assets/report.html");

/// Values destined for the `timeframe`, `custom_date` and `report-content` elements.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportView {
    pub timeframe: String,
    pub custom_date: String,
    pub content: String,
}

/// Never fails: unreadable input produces [`FALLBACK_CONTENT`].
pub fn render_report(raw: &str) -> ReportView {
    let document = match serde_json::from_str::<Value>(raw) {
        Ok(document) => document,
        Err(error) => {
            warn!(error = %error, "failed to parse report JSON");
            return ReportView {
                timeframe: String::new(),
                custom_date: NOT_AVAILABLE.to_string(),
                content: FALLBACK_CONTENT.to_string(),
            };
        }
    };

    let timeframe = document.get("timeframe").map(text_of).unwrap_or_default();
    let custom_date = document
        .get("custom_range")
        .filter(|value| is_truthy(value))
        .map(text_of)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());

    let content = match document.get("analysis") {
        Some(Value::Object(analysis)) => html::render_analysis(analysis),
        _ => {
            warn!("report JSON has no analysis object");
            FALLBACK_CONTENT.to_string()
        }
    };

    ReportView {
        timeframe,
        custom_date,
        content,
    }
}

/// Fills the shell's placeholders in one pass, so inserted values are never rescanned.
/// Metadata is escaped; `content` is already markup.
pub fn render_page(view: &ReportView, shell: &str) -> Result<String> {
    if let Some(missing) = [TIMEFRAME_SLOT, CUSTOM_DATE_SLOT, CONTENT_SLOT]
        .into_iter()
        .find(|slot| !shell.contains(slot))
    {
        bail!("Report template is missing the {missing} placeholder");
    }

    let timeframe = html::escape(&view.timeframe);
    let custom_date = html::escape(&view.custom_date);
    let slots = [
        (TIMEFRAME_SLOT, timeframe.as_str()),
        (CUSTOM_DATE_SLOT, custom_date.as_str()),
        (CONTENT_SLOT, view.content.as_str()),
    ];

    let mut page = String::with_capacity(shell.len() + view.content.len());
    let mut rest = shell;
    while let Some(start) = rest.find("{{") {
        page.push_str(&rest[..start]);
        let tail = &rest[start..];
        match slots.iter().find(|(slot, _)| tail.starts_with(slot)) {
            Some((slot, value)) => {
                page.push_str(value);
                rest = &tail[slot.len()..];
            }
            None => {
                page.push_str("{{");
                rest = &tail[2..];
            }
        }
    }
    page.push_str(rest);

    Ok(page)
}

pub fn default_output_path(output_dir: &Path, stamp: &str) -> PathBuf {
    output_dir.join(format!("report-{stamp}.html"))
}

pub fn write_report(input: &Path, output: &Path, template: Option<&Path>) -> Result<ReportView> {
    let raw = fs::read_to_string(input)
        .with_context(|| format!("Failed to read report JSON: {}", input.display()))?;

    let shell = match template {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read report template: {}", path.display()))?,
        None => DEFAULT_SHELL.to_string(),
    };

    let view = render_report(&raw);
    let page = render_page(&view, &shell)?;

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create report directory: {}", parent.display()))?;
    }
    fs::write(output, page)
        .with_context(|| format!("Failed to write HTML report: {}", output.display()))?;
    info!(path = %output.display(), "HTML report written");

    Ok(view)
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
