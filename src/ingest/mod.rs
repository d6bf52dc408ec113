pub mod enrich;
pub mod records;
pub mod resolver;
pub mod reviews;

#[cfg(test)]
pub(crate) mod stub;

use crate::config::Config;
use crate::ingest::records::{AppRecord, ReviewRecord};
use crate::store::AppStore;
use tracing::info;

#[derive(Debug, Default)]
pub struct CollectionRun {
    pub apps: Vec<AppRecord>,
    pub reviews: Vec<ReviewRecord>,
}

/// Resolve ids, enrich each app, then page through every app's reviews, one call at a time.
pub fn run_collection(config: &Config, store: &dyn AppStore) -> CollectionRun {
    let keywords = config.keyword_list();
    let urls = config.url_list();

    let app_ids = resolver::resolve_app_ids(store, &keywords, &urls, &config.country);
    if app_ids.is_empty() {
        info!("no app ids resolved, nothing to collect");
        return CollectionRun::default();
    }

    let apps = enrich::enrich_apps(store, &app_ids, &config.country);

    let mut reviews = Vec::new();
    for app in &apps {
        reviews::collect_app_reviews(
            store,
            app,
            &config.keywords,
            config.max_review_pages,
            &mut reviews,
        );
    }

    info!(apps = apps.len(), reviews = reviews.len(), "collection finished");

    CollectionRun { apps, reviews }
}
