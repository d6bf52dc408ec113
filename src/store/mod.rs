pub mod itunes;

use anyhow::Result;

#[derive(Debug, Clone, PartialEq)]
pub struct AppDetail {
    pub app_id: String,
    pub title: String,
    pub description: String,
    pub icon: String,
    pub url: String,
    pub free: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawReview {
    pub score: u8,
    pub user_name: String,
    pub updated: String,
    pub text: String,
}

/// Lookups against an app store catalogue.
///
/// All calls are blocking. Review pages are numbered from 1, and an
/// implementation must eventually answer with an empty page: the review
/// collector keeps requesting pages until it sees one.
pub trait AppStore {
    fn search(&self, term: &str, country: &str) -> Result<Vec<String>>;

    fn suggest(&self, term: &str) -> Result<Vec<String>>;

    /// `Ok(None)` when the store has no data for the id.
    fn app_detail(&self, app_id: &str, country: &str) -> Result<Option<AppDetail>>;

    fn similar_apps(&self, app_id: &str, country: &str) -> Result<Vec<String>>;

    fn reviews(&self, app_id: &str, country: &str, page: u32) -> Result<Vec<RawReview>>;
}
