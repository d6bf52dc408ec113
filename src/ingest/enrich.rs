use crate::ingest::records::{AppRecord, PLATFORM_IOS, iso_timestamp, listing_type};
use crate::store::AppStore;
use chrono::Utc;
use tracing::{info, warn};

pub fn enrich_apps(store: &dyn AppStore, app_ids: &[String], country: &str) -> Vec<AppRecord> {
    let records = app_ids
        .iter()
        .filter_map(|app_id| build_app_record(store, app_id, country))
        .collect::<Vec<_>>();

    info!(
        requested = app_ids.len(),
        enriched = records.len(),
        "app details collected"
    );

    records
}

/// `None` when the detail lookup fails or returns nothing; a failed similar-apps lookup only
/// empties `also_bought`.
pub fn build_app_record(store: &dyn AppStore, app_id: &str, country: &str) -> Option<AppRecord> {
    let detail = match store.app_detail(app_id, country) {
        Ok(Some(detail)) => detail,
        Ok(None) => {
            warn!(app_id, "no app detail returned, skipping");
            return None;
        }
        Err(error) => {
            warn!(error = %error, app_id, "failed to fetch app detail, skipping");
            return None;
        }
    };

    let also_bought = store.similar_apps(app_id, country).unwrap_or_else(|error| {
        warn!(error = %error, app_id, "failed to fetch similar apps");
        Vec::new()
    });

    Some(AppRecord {
        platform: PLATFORM_IOS.to_string(),
        country: country.to_string(),
        listing_type: listing_type(detail.free).to_string(),
        category_id: None,
        category_name: None,
        app_name: detail.title,
        rank: None,
        app_id: detail.app_id,
        icon: detail.icon,
        link: detail.url,
        description: detail.description,
        updated_at: iso_timestamp(Utc::now()),
        also_bought,
    })
}
