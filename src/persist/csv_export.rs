use crate::ingest::records::AppRecord;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Flat CSV shape of an [`AppRecord`]; related ids are joined with commas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppRow {
    pub platform: String,
    pub country: String,
    #[serde(rename = "type")]
    pub listing_type: String,
    #[serde(rename = "cid")]
    pub category_id: Option<String>,
    #[serde(rename = "cname")]
    pub category_name: Option<String>,
    #[serde(rename = "appname")]
    pub app_name: String,
    pub rank: Option<u32>,
    #[serde(rename = "appid")]
    pub app_id: String,
    pub icon: String,
    pub link: String,
    #[serde(rename = "title")]
    pub description: String,
    #[serde(rename = "updateAt")]
    pub updated_at: String,
    #[serde(rename = "alsoBought")]
    pub also_bought: String,
}

impl From<&AppRecord> for AppRow {
    fn from(record: &AppRecord) -> Self {
        Self {
            platform: record.platform.clone(),
            country: record.country.clone(),
            listing_type: record.listing_type.clone(),
            category_id: record.category_id.clone(),
            category_name: record.category_name.clone(),
            app_name: record.app_name.clone(),
            rank: record.rank,
            app_id: record.app_id.clone(),
            icon: record.icon.clone(),
            link: record.link.clone(),
            description: record.description.clone(),
            updated_at: record.updated_at.clone(),
            also_bought: record.also_bought.join(","),
        }
    }
}

pub fn write_app_csv(path: &Path, apps: &[AppRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;

    apps.iter().map(AppRow::from).try_for_each(|row| {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write CSV row: {}", path.display()))
    })?;

    writer
        .flush()
        .with_context(|| format!("Failed to flush CSV file: {}", path.display()))
}

pub fn read_app_csv(path: &Path) -> Result<Vec<AppRow>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    reader
        .deserialize::<AppRow>()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("Failed to parse CSV file: {}", path.display()))
}
