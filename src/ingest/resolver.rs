use crate::store::AppStore;
use std::collections::HashSet;
use tracing::{info, warn};
use url::{ParseError, Url};

const APP_PATH_SEGMENT: &str = "app";
const APP_ID_PREFIX: &str = "id";

/// Seeds followed by their store suggestions, deduplicated. Suggestions are not expanded again.
pub fn expand_keywords(store: &dyn AppStore, seeds: &[String]) -> Vec<String> {
    let suggestions = seeds
        .iter()
        .flat_map(|keyword| {
            store.suggest(keyword).unwrap_or_else(|error| {
                warn!(error = %error, keyword = %keyword, "failed to fetch keyword suggestions");
                Vec::new()
            })
        })
        .collect::<Vec<_>>();

    dedup(seeds.iter().cloned().chain(suggestions))
}

pub fn ids_from_keywords(store: &dyn AppStore, keywords: &[String], country: &str) -> Vec<String> {
    let ids = keywords.iter().flat_map(|keyword| {
        store.search(keyword, country).unwrap_or_else(|error| {
            warn!(error = %error, keyword = %keyword, "keyword search failed");
            Vec::new()
        })
    });

    dedup(ids)
}

/// Numeric id from a store URL such as `https://apps.apple.com/us/app/name/id1186271926`.
/// Links pasted without a scheme are read as `https://`.
pub fn app_id_from_url(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let url = match Url::parse(raw) {
        Err(ParseError::RelativeUrlWithoutBase) => Url::parse(&format!("https://{raw}")),
        parsed => parsed,
    }
    .ok()?;
    let segments = url.path_segments()?.collect::<Vec<_>>();
    let (last, parents) = segments.split_last()?;

    if !parents.contains(&APP_PATH_SEGMENT) {
        return None;
    }

    let id = last.strip_prefix(APP_ID_PREFIX)?;
    (!id.is_empty() && id.chars().all(|c| c.is_ascii_digit())).then(|| id.to_string())
}

pub fn resolve_app_ids(
    store: &dyn AppStore,
    keywords: &[String],
    urls: &[String],
    country: &str,
) -> Vec<String> {
    let keyword_ids = if keywords.is_empty() {
        Vec::new()
    } else {
        let expanded = expand_keywords(store, keywords);
        info!(keywords = expanded.len(), "expanded search keywords");
        ids_from_keywords(store, &expanded, country)
    };
    if keyword_ids.is_empty() {
        warn!(keywords = %keywords.join(","), "no apps found for keywords");
    }

    let url_ids = urls
        .iter()
        .filter_map(|url| app_id_from_url(url))
        .collect::<Vec<_>>();
    if !urls.is_empty() && url_ids.is_empty() {
        warn!(urls = %urls.join(","), "no app ids found in store URLs");
    }

    info!(
        keyword_ids = keyword_ids.len(),
        url_ids = url_ids.len(),
        "resolved app ids"
    );

    dedup(keyword_ids.into_iter().chain(url_ids))
}

fn dedup(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect::<Vec<_>>()
}
