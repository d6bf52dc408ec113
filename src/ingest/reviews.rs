use crate::ingest::records::{AppRecord, ReviewRecord, iso_timestamp};
use crate::store::{AppStore, RawReview};
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

/// Requests pages 1, 2, … until one comes back empty. A fetch error ends pagination and keeps
/// what was already gathered. `max_pages` adds an optional hard stop.
pub fn collect_raw_reviews(
    store: &dyn AppStore,
    app_id: &str,
    country: &str,
    max_pages: Option<u32>,
) -> Vec<RawReview> {
    let mut collected = Vec::new();
    let mut page = 1_u32;

    loop {
        if max_pages.is_some_and(|limit| page > limit) {
            info!(app_id, pages = page - 1, "review page limit reached");
            break;
        }

        match store.reviews(app_id, country, page) {
            Ok(reviews) if reviews.is_empty() => break,
            Ok(reviews) => {
                debug!(app_id, page, count = reviews.len(), "review page fetched");
                collected.extend(reviews);
                page += 1;
            }
            Err(error) => {
                warn!(
                    error = %error,
                    app_id,
                    page,
                    kept = collected.len(),
                    "failed to fetch review page, keeping partial results"
                );
                break;
            }
        }
    }

    collected
}

/// Collects every review of `app` and appends the mapped records to `sink`.
pub fn collect_app_reviews(
    store: &dyn AppStore,
    app: &AppRecord,
    keyword: &str,
    max_pages: Option<u32>,
    sink: &mut Vec<ReviewRecord>,
) -> usize {
    let raw = collect_raw_reviews(store, &app.app_id, &app.country, max_pages);
    let count = raw.len();

    sink.extend(
        raw.into_iter()
            .map(|review| to_review_record(review, app, keyword)),
    );
    info!(app_id = %app.app_id, reviews = count, "reviews collected");

    count
}

pub fn to_review_record(raw: RawReview, app: &AppRecord, keyword: &str) -> ReviewRecord {
    ReviewRecord {
        app_id: app.app_id.clone(),
        app_name: app.app_name.clone(),
        country: app.country.clone(),
        keyword: keyword.to_string(),
        score: raw.score,
        user_name: raw.user_name.trim().to_string(),
        date: normalize_timestamp(&raw.updated),
        review: normalize_review_text(&raw.text),
    }
}

/// Replaces the first `\r` and the first `\n` with spaces, then trims. Later line breaks stay.
pub fn normalize_review_text(text: &str) -> String {
    text.replacen('\r', " ", 1)
        .replacen('\n', " ", 1)
        .trim()
        .to_string()
}

pub fn normalize_timestamp(raw: &str) -> String {
    let trimmed = raw.trim();

    DateTime::parse_from_rfc3339(trimmed)
        .map(|parsed| iso_timestamp(parsed.with_timezone(&Utc)))
        .unwrap_or_else(|error| {
            debug!(error = %error, raw = trimmed, "keeping unparsable review timestamp");
            trimmed.to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::{collect_app_reviews, collect_raw_reviews, normalize_review_text, normalize_timestamp};
    use crate::ingest::enrich::build_app_record;
    use crate::ingest::stub::{StubStore, detail, raw_review};

    fn paged_store() -> StubStore {
        let mut store = StubStore::default();
        store.review_pages.insert(
            "42".into(),
            vec![
                vec![raw_review("r1", "a"), raw_review("r2", "b")],
                vec![raw_review("r3", "c")],
                vec![],
                vec![raw_review("never", "reached")],
            ],
        );
        store
    }

    #[test]
    fn stops_at_first_empty_page() {
        let store = paged_store();

        let reviews = collect_raw_reviews(&store, "42", "us", None);

        let names = reviews.iter().map(|r| r.user_name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["r1", "r2", "r3"]);
        assert_eq!(
            store.calls(),
            vec!["reviews:42:1", "reviews:42:2", "reviews:42:3"]
        );
    }

    #[test]
    fn fetch_error_keeps_partial_results() {
        let mut store = paged_store();
        store.failing_review_page.insert("42".into(), 2);

        let reviews = collect_raw_reviews(&store, "42", "us", None);

        assert_eq!(reviews.len(), 2);
        assert_eq!(store.calls().len(), 2);
    }

    #[test]
    fn page_limit_bounds_requests() {
        let store = paged_store();

        let reviews = collect_raw_reviews(&store, "42", "us", Some(1));

        assert_eq!(reviews.len(), 2);
        assert_eq!(store.calls(), vec!["reviews:42:1"]);
    }

    #[test]
    fn only_first_line_break_of_each_kind_is_replaced() {
        assert_eq!(normalize_review_text("line1\r\nline2\n"), "line1  line2");
        assert_eq!(normalize_review_text("a\nb\nc"), "a b\nc");
        assert_eq!(normalize_review_text("  plain  "), "plain");
    }

    #[test]
    fn timestamps_are_normalized_to_utc() {
        assert_eq!(
            normalize_timestamp("2024-03-01T10:00:00-07:00"),
            "2024-03-01T17:00:00.000Z"
        );
        assert_eq!(normalize_timestamp(" yesterday "), "yesterday");
    }

    #[test]
    fn records_carry_app_context_and_are_appended() {
        let mut store = paged_store();
        store.details.insert("42".into(), detail("42", "Holy", true));
        store.review_pages.insert(
            "42".into(),
            vec![vec![raw_review("  amy ", "so\r\ngood\n")]],
        );
        let app = build_app_record(&store, "42", "us").expect("record built");
        let mut sink = Vec::new();

        let count = collect_app_reviews(&store, &app, "bible", None, &mut sink);

        assert_eq!(count, 1);
        assert_eq!(sink[0].app_name, "Holy");
        assert_eq!(sink[0].keyword, "bible");
        assert_eq!(sink[0].user_name, "amy");
        assert_eq!(sink[0].review, "so  good");
        assert_eq!(sink[0].date, "2024-03-01T17:00:00.000Z");
    }
}
