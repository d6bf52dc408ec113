use crate::config::Config;
use crate::persist::queries::Statement;
use anyhow::{Context, Result, bail};
use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

/// Client for a Cloudflare D1 database's HTTP query endpoint.
pub struct D1Client {
    client: Client,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<QueryMessage>,
}

#[derive(Debug, Deserialize)]
struct QueryMessage {
    code: Option<i64>,
    #[serde(default)]
    message: String,
}

impl D1Client {
    pub fn from_config(config: &Config) -> Result<Self> {
        let (Some(account_id), Some(database_id), Some(api_token)) = (
            config.d1_account_id.as_deref(),
            config.d1_database_id.as_deref(),
            config.d1_api_token.as_deref(),
        ) else {
            bail!(
                "Remote output needs CLOUDFLARE_ACCOUNT_ID, CLOUDFLARE_D1_DATABASE_ID and CLOUDFLARE_API_TOKEN"
            );
        };

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_token}"))
                .context("Failed to build Authorization header")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_seconds))
            .default_headers(headers)
            .build()
            .context("Failed to create D1 HTTP client")?;

        let endpoint = format!(
            "{}/accounts/{account_id}/d1/database/{database_id}/query",
            config.d1_api_base_url.trim_end_matches('/')
        );

        Ok(Self { client, endpoint })
    }

    pub fn execute(&self, statement: &Statement) -> Result<()> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(statement)
            .send()
            .context("D1 query request failed")?;

        let status = response.status();
        let body = response.text().context("Failed to read D1 response body")?;

        if !status.is_success() {
            bail!("D1 API error {}: {}", status, body);
        }

        let parsed: QueryResponse = serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse D1 response: {body}"))?;

        if !parsed.success {
            let messages = parsed
                .errors
                .iter()
                .map(|error| match error.code {
                    Some(code) => format!("[{code}] {}", error.message),
                    None => error.message.clone(),
                })
                .collect::<Vec<_>>()
                .join("; ");
            bail!("D1 query was rejected: {messages}");
        }

        Ok(())
    }

    /// Runs statements in order and stops at the first failure.
    pub fn execute_all(&self, table: &str, statements: &[Statement]) -> Result<()> {
        statements
            .iter()
            .enumerate()
            .try_for_each(|(index, statement)| {
                self.execute(statement)
                    .with_context(|| format!("Batch {} for table {table} failed", index + 1))
            })?;

        info!(table, batches = statements.len(), "data inserted");
        Ok(())
    }
}
