use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const PLATFORM_IOS: &str = "ios";
pub const LISTING_TOP_FREE: &str = "top-free";
pub const LISTING_TOP_PAID: &str = "top-paid";

/// One resolved app, as written to `app-details-*.json` and `ios_app_data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppRecord {
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
    /// Store description; persisted under the historical `title` column.
    #[serde(rename = "title")]
    pub description: String,
    #[serde(rename = "updateAt")]
    pub updated_at: String,
    #[serde(rename = "alsoBought")]
    pub also_bought: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    #[serde(rename = "appid")]
    pub app_id: String,
    #[serde(rename = "appname")]
    pub app_name: String,
    pub country: String,
    pub keyword: String,
    pub score: u8,
    #[serde(rename = "userName")]
    pub user_name: String,
    pub date: String,
    pub review: String,
}

impl ReviewRecord {
    /// Stable key for the remote table, so repeated runs do not duplicate rows.
    pub fn row_id(&self) -> String {
        let digest = Sha256::digest(format!("{}-{}-{}", self.app_id, self.user_name, self.date));
        format!("{digest:x}")
    }
}

pub fn listing_type(free: bool) -> &'static str {
    if free { LISTING_TOP_FREE } else { LISTING_TOP_PAID }
}

pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::{ReviewRecord, iso_timestamp, listing_type};
    use chrono::{TimeZone, Utc};

    fn review() -> ReviewRecord {
        ReviewRecord {
            app_id: "42".to_string(),
            app_name: "Holy".to_string(),
            country: "us".to_string(),
            keyword: "bible".to_string(),
            score: 5,
            user_name: "amy".to_string(),
            date: "2024-03-01T17:00:00.000Z".to_string(),
            review: "great".to_string(),
        }
    }

    #[test]
    fn row_id_depends_on_app_user_and_date_only() {
        let first = review();
        let mut second = review();
        second.review = "changed text".to_string();
        second.score = 1;

        assert_eq!(first.row_id(), second.row_id());
        assert_eq!(first.row_id().len(), 64);

        second.user_name = "bob".to_string();
        assert_ne!(first.row_id(), second.row_id());
    }

    #[test]
    fn review_serializes_with_store_field_names() {
        let value = serde_json::to_value(review()).expect("serialize");
        assert_eq!(value["appid"], "42");
        assert_eq!(value["userName"], "amy");
    }

    #[test]
    fn timestamps_use_millisecond_utc() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).single().expect("valid time");
        assert_eq!(iso_timestamp(at), "2024-01-02T03:04:05.000Z");
        assert_eq!(listing_type(true), "top-free");
        assert_eq!(listing_type(false), "top-paid");
    }
}
