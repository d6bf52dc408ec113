use crate::ingest::resolver::app_id_from_url;
use crate::store::{AppDetail, AppStore, RawReview};
use anyhow::{Context, Result, anyhow, bail};
use regex::Regex;
use scraper::{Html, Selector};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

const ITUNES_BASE_URL: &str = "https://itunes.apple.com";
const SEARCH_HINTS_BASE_URL: &str = "https://search.itunes.apple.com";
const APPS_BASE_URL: &str = "https://apps.apple.com";
const USER_AGENT: &str = concat!("appstore-harvest/", env!("CARGO_PKG_VERSION"));
const STORE_FRONT_HEADER: &str = "x-apple-store-front";
const US_STORE_FRONT: &str = "143441-1,29";
const SEARCH_LIMIT: &str = "50";
/// The customer review feed stops serving after this page.
pub const MAX_FEED_PAGES: u32 = 10;

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub itunes: String,
    pub search_hints: String,
    pub apps: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            itunes: ITUNES_BASE_URL.to_string(),
            search_hints: SEARCH_HINTS_BASE_URL.to_string(),
            apps: APPS_BASE_URL.to_string(),
        }
    }
}

pub struct ItunesClient {
    client: Client,
    endpoints: Endpoints,
    hint_term: Regex,
    anchor: Selector,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(rename = "trackId")]
    track_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    results: Vec<LookupResult>,
}

#[derive(Debug, Deserialize)]
struct LookupResult {
    #[serde(rename = "trackId")]
    track_id: u64,
    #[serde(rename = "trackName", default)]
    track_name: String,
    #[serde(default)]
    description: String,
    #[serde(rename = "artworkUrl512")]
    artwork_url_512: Option<String>,
    #[serde(rename = "artworkUrl100")]
    artwork_url_100: Option<String>,
    #[serde(rename = "trackViewUrl", default)]
    track_view_url: String,
    price: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    feed: Feed,
}

#[derive(Debug, Deserialize)]
struct Feed {
    entry: Option<OneOrMany<FeedEntry>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    author: Option<FeedAuthor>,
    updated: Option<Label>,
    #[serde(rename = "im:rating")]
    rating: Option<Label>,
    content: Option<Label>,
}

#[derive(Debug, Deserialize)]
struct FeedAuthor {
    name: Label,
}

#[derive(Debug, Deserialize)]
struct Label {
    label: String,
}

impl ItunesClient {
    pub fn new(timeout_seconds: u64) -> Result<Self> {
        Self::with_endpoints(Endpoints::default(), timeout_seconds)
    }

    pub fn with_endpoints(endpoints: Endpoints, timeout_seconds: u64) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_seconds))
            .default_headers(headers)
            .build()
            .context("Failed to create store HTTP client")?;

        let hint_term = Regex::new(r"<key>\s*term\s*</key>\s*<string>([^<]*)</string>")
            .context("Failed to compile search hint pattern")?;
        let anchor = Selector::parse("a[href]")
            .map_err(|error| anyhow!("Failed to compile anchor selector: {error:?}"))?;

        Ok(Self {
            client,
            endpoints,
            hint_term,
            anchor,
        })
    }

    fn endpoint(base: &str, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let raw = format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'));
        let parsed = if query.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, query)
        };

        parsed.with_context(|| format!("Invalid store URL: {raw}"))
    }

    fn get_text(&self, url: Url, headers: HeaderMap) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .headers(headers)
            .send()
            .with_context(|| format!("Store request failed: {url}"))?;

        let status = response.status();
        let body = response
            .text()
            .with_context(|| format!("Failed to read store response body: {url}"))?;

        if !status.is_success() {
            bail!("Store API error {} for {}: {}", status, url, body);
        }

        Ok(body)
    }

    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let body = self.get_text(url.clone(), HeaderMap::new())?;
        serde_json::from_str(&body)
            .with_context(|| format!("Failed to parse store response from {url}"))
    }

    fn parse_hints(&self, body: &str) -> Vec<String> {
        self.hint_term
            .captures_iter(body)
            .filter_map(|captures| captures.get(1))
            .map(|term| decode_xml_entities(term.as_str().trim()))
            .filter(|term| !term.is_empty())
            .collect::<Vec<_>>()
    }

    // Only anchor hrefs are read.
    fn parse_related_ids(&self, page_url: &Url, page: &str, app_id: &str) -> Vec<String> {
        let document = Html::parse_document(page);
        let mut seen = HashSet::new();

        document
            .select(&self.anchor)
            .filter_map(|anchor| anchor.value().attr("href"))
            .filter_map(|href| page_url.join(href.trim()).ok())
            .filter_map(|link| app_id_from_url(link.as_str()))
            .filter(|id| id != app_id)
            .filter(|id| seen.insert(id.clone()))
            .collect::<Vec<_>>()
    }
}

impl AppStore for ItunesClient {
    fn search(&self, term: &str, country: &str) -> Result<Vec<String>> {
        let url = Self::endpoint(
            &self.endpoints.itunes,
            "search",
            &[
                ("term", term),
                ("country", country),
                ("media", "software"),
                ("entity", "software"),
                ("limit", SEARCH_LIMIT),
            ],
        )?;
        let response: SearchResponse = self.get_json(url)?;

        Ok(response
            .results
            .into_iter()
            .filter_map(|result| result.track_id)
            .map(|id| id.to_string())
            .collect())
    }

    fn suggest(&self, term: &str) -> Result<Vec<String>> {
        let url = Self::endpoint(
            &self.endpoints.search_hints,
            "WebObjects/MZSearchHints.woa/wa/hints",
            &[("clientApplication", "Software"), ("term", term)],
        )?;

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(STORE_FRONT_HEADER),
            HeaderValue::from_static(US_STORE_FRONT),
        );

        let body = self.get_text(url, headers)?;
        Ok(self.parse_hints(&body))
    }

    fn app_detail(&self, app_id: &str, country: &str) -> Result<Option<AppDetail>> {
        let url = Self::endpoint(
            &self.endpoints.itunes,
            "lookup",
            &[("id", app_id), ("country", country), ("entity", "software")],
        )?;
        let response: LookupResponse = self.get_json(url)?;

        Ok(response.results.into_iter().next().map(|result| AppDetail {
            app_id: result.track_id.to_string(),
            title: result.track_name,
            description: result.description,
            icon: result
                .artwork_url_512
                .or(result.artwork_url_100)
                .unwrap_or_default(),
            url: result.track_view_url,
            free: result.price.unwrap_or_default() <= 0.0,
        }))
    }

    fn similar_apps(&self, app_id: &str, country: &str) -> Result<Vec<String>> {
        let url = Self::endpoint(
            &self.endpoints.apps,
            &format!("{country}/app/id{app_id}"),
            &[],
        )?;
        let page = self.get_text(url.clone(), HeaderMap::new())?;

        Ok(self.parse_related_ids(&url, &page, app_id))
    }

    fn reviews(&self, app_id: &str, country: &str, page: u32) -> Result<Vec<RawReview>> {
        if page == 0 {
            bail!("Review pages start at 1");
        }
        if page > MAX_FEED_PAGES {
            return Ok(Vec::new());
        }

        let url = Self::endpoint(
            &self.endpoints.itunes,
            &format!("{country}/rss/customerreviews/page={page}/id={app_id}/sortby=mostrecent/json"),
            &[],
        )?;
        let response: FeedResponse = self.get_json(url)?;

        let entries = match response.feed.entry {
            Some(OneOrMany::Many(entries)) => entries,
            Some(OneOrMany::One(entry)) => vec![entry],
            None => Vec::new(),
        };

        Ok(entries.into_iter().filter_map(feed_entry_to_review).collect())
    }
}

// Entries without a rating describe the app itself, not a review.
fn feed_entry_to_review(entry: FeedEntry) -> Option<RawReview> {
    let score = entry.rating?.label.trim().parse::<u8>().ok()?;

    Some(RawReview {
        score,
        user_name: entry.author.map(|author| author.name.label).unwrap_or_default(),
        updated: entry.updated.map(|updated| updated.label).unwrap_or_default(),
        text: entry.content.map(|content| content.label).unwrap_or_default(),
    })
}

fn decode_xml_entities(raw: &str) -> String {
    raw.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
