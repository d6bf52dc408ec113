use anyhow::{Context, Result, anyhow, bail};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const DEFAULT_RESULT_DIR: &str = "./result";
const DEFAULT_OUTPUT_DIR: &str = "./output";
const DEFAULT_COUNTRY: &str = "us";
const DEFAULT_KEYWORDS: &str = "bible";
const DEFAULT_D1_API_BASE_URL: &str = "https://api.cloudflare.com/client/v4";
const MIN_HTTP_TIMEOUT_SECONDS: u64 = 5;

/// Environment variables recognized by [`Config::apply_env`], in the order they are applied.
pub const ENV_KEYS: [&str; 13] = [
    "RESULT_FOLDER",
    "OUTPUT_FOLDER",
    "COUNTRY",
    "KEYWORD",
    "URLS",
    "SAVE_LOCATION",
    "CLOUDFLARE_ACCOUNT_ID",
    "D1_APP_DATABASE_ID",
    "CLOUDFLARE_D1_DATABASE_ID",
    "CLOUDFLARE_API_TOKEN",
    "CLOUDFLARE_API_BASE_URL",
    "HTTP_TIMEOUT_SECONDS",
    "MAX_REVIEW_PAGES",
];

/// Keys listed by `config show`.
pub const DISPLAY_KEYS: [&str; 12] = [
    "result_dir",
    "output_dir",
    "country",
    "keywords",
    "urls",
    "save_location",
    "d1_account_id",
    "d1_database_id",
    "d1_api_token",
    "d1_api_base_url",
    "http_timeout_seconds",
    "max_review_pages",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveLocation {
    Local,
    #[serde(alias = "d1")]
    Remote,
    Both,
}

impl SaveLocation {
    pub fn writes_local(self) -> bool {
        matches!(self, Self::Local | Self::Both)
    }

    pub fn writes_remote(self) -> bool {
        matches!(self, Self::Remote | Self::Both)
    }
}

impl FromStr for SaveLocation {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "remote" | "d1" => Ok(Self::Remote),
            "both" => Ok(Self::Both),
            other => bail!("Unsupported save location: {other}. Expected local|remote|both"),
        }
    }
}

impl fmt::Display for SaveLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Local => "local",
            Self::Remote => "remote",
            Self::Both => "both",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub result_dir: PathBuf,
    pub output_dir: PathBuf,
    pub country: String,
    pub keywords: String,
    pub urls: String,
    pub save_location: SaveLocation,
    pub d1_account_id: Option<String>,
    pub d1_database_id: Option<String>,
    pub d1_api_token: Option<String>,
    pub d1_api_base_url: String,
    pub http_timeout_seconds: u64,
    pub max_review_pages: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            result_dir: PathBuf::from(DEFAULT_RESULT_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            country: DEFAULT_COUNTRY.to_string(),
            keywords: DEFAULT_KEYWORDS.to_string(),
            urls: String::new(),
            save_location: SaveLocation::Local,
            d1_account_id: None,
            d1_database_id: None,
            d1_api_token: None,
            d1_api_base_url: DEFAULT_D1_API_BASE_URL.to_string(),
            http_timeout_seconds: 30,
            max_review_pages: None,
        }
    }
}

impl Config {
    /// Defaults, then the optional JSON file, then the process environment.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;

        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config
            .normalize()
            .with_context(|| format!("Invalid value in config file: {}", path.display()))?;

        Ok(config)
    }

    /// Runs deserialized values through the same rules as [`Config::set_value`].
    fn normalize(&mut self) -> Result<()> {
        let fields = [
            ("result_dir", self.result_dir.to_string_lossy().into_owned()),
            ("output_dir", self.output_dir.to_string_lossy().into_owned()),
            ("country", self.country.clone()),
            ("keywords", self.keywords.clone()),
            ("urls", self.urls.clone()),
            ("d1_api_base_url", self.d1_api_base_url.clone()),
            ("http_timeout_seconds", self.http_timeout_seconds.to_string()),
        ];
        fields
            .iter()
            .try_for_each(|(key, value)| self.set_value(key, value))?;

        self.d1_account_id = self.d1_account_id.as_deref().and_then(non_empty);
        self.d1_database_id = self.d1_database_id.as_deref().and_then(non_empty);
        self.d1_api_token = self.d1_api_token.as_deref().and_then(non_empty);
        self.max_review_pages = self.max_review_pages.filter(|pages| *pages > 0);

        Ok(())
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        ENV_KEYS.iter().try_for_each(|key| match lookup(key) {
            Some(value) if !value.trim().is_empty() => self
                .set_value(key, &value)
                .with_context(|| format!("Invalid environment variable {key}")),
            _ => Ok(()),
        })
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_config_key(key) {
            "result_dir" => {
                self.result_dir = expand_home(value.trim());
            }
            "output_dir" => {
                self.output_dir = expand_home(value.trim());
            }
            "country" => {
                let country = value.trim().to_lowercase();
                if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
                    bail!("country must be a two-letter code, got: {value}");
                }
                self.country = country;
            }
            "keywords" => {
                self.keywords = value.trim().to_string();
            }
            "urls" => {
                self.urls = value.trim().to_string();
            }
            "save_location" => {
                self.save_location = value.parse()?;
            }
            "d1_account_id" => {
                self.d1_account_id = non_empty(value);
            }
            "d1_database_id" => {
                self.d1_database_id = non_empty(value);
            }
            "d1_api_token" => {
                self.d1_api_token = non_empty(value);
            }
            "d1_api_base_url" => {
                self.d1_api_base_url = value.trim().trim_end_matches('/').to_string();
            }
            "http_timeout_seconds" => {
                self.http_timeout_seconds = value
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| anyhow!("http_timeout_seconds must be a number"))?
                    .max(MIN_HTTP_TIMEOUT_SECONDS);
            }
            "max_review_pages" => {
                let pages = value
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| anyhow!("max_review_pages must be a number"))?;
                self.max_review_pages = (pages > 0).then_some(pages);
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: result_dir|RESULT_FOLDER, output_dir|OUTPUT_FOLDER, country|COUNTRY, keywords|KEYWORD, urls|URLS, save_location|SAVE_LOCATION, d1_account_id|CLOUDFLARE_ACCOUNT_ID, d1_database_id|CLOUDFLARE_D1_DATABASE_ID, d1_api_token|CLOUDFLARE_API_TOKEN, d1_api_base_url|CLOUDFLARE_API_BASE_URL, http_timeout_seconds|HTTP_TIMEOUT_SECONDS, max_review_pages|MAX_REVIEW_PAGES"
                );
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "result_dir" => Some(self.result_dir.display().to_string()),
            "output_dir" => Some(self.output_dir.display().to_string()),
            "country" => Some(self.country.clone()),
            "keywords" => Some(self.keywords.clone()),
            "urls" => Some(self.urls.clone()),
            "save_location" => Some(self.save_location.to_string()),
            "d1_account_id" => Some(display_optional(self.d1_account_id.as_deref())),
            "d1_database_id" => Some(display_optional(self.d1_database_id.as_deref())),
            "d1_api_token" => Some(
                self.d1_api_token
                    .as_ref()
                    .map(|_| "***set***".to_string())
                    .unwrap_or_else(|| "not_set".to_string()),
            ),
            "d1_api_base_url" => Some(self.d1_api_base_url.clone()),
            "http_timeout_seconds" => Some(self.http_timeout_seconds.to_string()),
            "max_review_pages" => Some(
                self.max_review_pages
                    .map(|pages| pages.to_string())
                    .unwrap_or_else(|| "unbounded".to_string()),
            ),
            _ => None,
        }
    }

    pub fn keyword_list(&self) -> Vec<String> {
        split_list(&self.keywords)
    }

    pub fn url_list(&self) -> Vec<String> {
        split_list(&self.urls)
    }

    pub fn has_d1_credentials(&self) -> bool {
        self.d1_account_id.is_some() && self.d1_database_id.is_some() && self.d1_api_token.is_some()
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "result_dir" | "result.dir" | "RESULT_FOLDER" => "result_dir",
        "output_dir" | "output.dir" | "OUTPUT_FOLDER" => "output_dir",
        "country" | "COUNTRY" => "country",
        "keywords" | "keyword" | "KEYWORD" => "keywords",
        "urls" | "URLS" => "urls",
        "save_location" | "save.location" | "SAVE_LOCATION" => "save_location",
        "d1_account_id" | "d1.account_id" | "CLOUDFLARE_ACCOUNT_ID" => "d1_account_id",
        "d1_database_id" | "d1.database_id" | "CLOUDFLARE_D1_DATABASE_ID"
        | "D1_APP_DATABASE_ID" => "d1_database_id",
        "d1_api_token" | "d1.api_token" | "CLOUDFLARE_API_TOKEN" => "d1_api_token",
        "d1_api_base_url" | "d1.base_url" | "CLOUDFLARE_API_BASE_URL" => "d1_api_base_url",
        "http_timeout_seconds" | "http.timeout_seconds" | "HTTP_TIMEOUT_SECONDS" => {
            "http_timeout_seconds"
        }
        "max_review_pages" | "reviews.max_pages" | "MAX_REVIEW_PAGES" => "max_review_pages",
        _ => key,
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(ToOwned::to_owned)
        .collect::<Vec<_>>()
}

fn non_empty(value: &str) -> Option<String> {
    (!value.trim().is_empty()).then(|| value.trim().to_string())
}

fn display_optional(value: Option<&str>) -> String {
    value.unwrap_or("not_set").to_string()
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

#[cfg(test)]
mod tests {
    use super::{Config, SaveLocation};
    use std::collections::HashMap;

    #[test]
    fn environment_overrides_defaults() {
        let env = HashMap::from([
            ("KEYWORD", "bible, prayer"),
            ("COUNTRY", "GB"),
            ("SAVE_LOCATION", "d1"),
            ("CLOUDFLARE_API_TOKEN", "secret"),
            ("URLS", "  "),
        ]);
        let mut config = Config::default();
        config
            .apply_env(|key| env.get(key).map(|value| value.to_string()))
            .expect("env applied");

        assert_eq!(config.keyword_list(), vec!["bible", "prayer"]);
        assert_eq!(config.country, "gb");
        assert_eq!(config.save_location, SaveLocation::Remote);
        assert!(config.url_list().is_empty());
        assert_eq!(config.get_value("d1_api_token").as_deref(), Some("***set***"));
    }

    #[test]
    fn rejects_unknown_save_location() {
        let mut config = Config::default();
        assert!(config.set_value("save_location", "s3").is_err());
        assert_eq!(config.save_location, SaveLocation::Local);
    }

    #[test]
    fn timeout_has_a_floor() {
        let mut config = Config::default();
        config.set_value("HTTP_TIMEOUT_SECONDS", "1").expect("timeout set");
        assert_eq!(config.http_timeout_seconds, 5);
    }

    #[test]
    fn loads_partial_json_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"country":"de","save_location":"both"}"#).expect("write");

        let config = Config::load(&path).expect("config loaded");
        assert_eq!(config.country, "de");
        assert!(config.save_location.writes_local());
        assert!(config.save_location.writes_remote());
        assert_eq!(config.keywords, "bible");
    }

    #[test]
    fn file_values_follow_setter_rules() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"max_review_pages":0,"country":" US ","d1_account_id":"acc","d1_database_id":"db",
            "d1_api_token":"  ","http_timeout_seconds":1,"d1_api_base_url":"https://d1.test/"}"#,
        )
        .expect("write");

        let config = Config::load(&path).expect("config loaded");

        assert_eq!(config.max_review_pages, None);
        assert_eq!(config.country, "us");
        assert_eq!(config.d1_api_token, None);
        assert!(!config.has_d1_credentials());
        assert_eq!(config.http_timeout_seconds, 5);
        assert_eq!(config.d1_api_base_url, "https://d1.test");
    }

    #[test]
    fn invalid_file_country_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"country":"usa"}"#).expect("write");

        let error = Config::load(&path).expect_err("country rejected");
        assert!(format!("{error:#}").contains("two-letter"));
    }
}
