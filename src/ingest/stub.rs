use crate::store::{AppDetail, AppStore, RawReview};
use anyhow::{Result, bail};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

/// In-memory store for pipeline tests. Records every call as `"<op>:<arg>"`.
#[derive(Default)]
pub struct StubStore {
    pub suggestions: HashMap<String, Vec<String>>,
    pub search_results: HashMap<String, Vec<String>>,
    pub failing_terms: HashSet<String>,
    pub details: HashMap<String, AppDetail>,
    pub failing_details: HashSet<String>,
    pub similar: HashMap<String, Vec<String>>,
    pub failing_similar: HashSet<String>,
    pub review_pages: HashMap<String, Vec<Vec<RawReview>>>,
    pub failing_review_page: HashMap<String, u32>,
    calls: RefCell<Vec<String>>,
}

impl StubStore {
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn called(&self, call: &str) -> bool {
        self.calls.borrow().iter().any(|entry| entry == call)
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

pub fn detail(app_id: &str, title: &str, free: bool) -> AppDetail {
    AppDetail {
        app_id: app_id.to_string(),
        title: title.to_string(),
        description: format!("{title} description"),
        icon: format!("https://img.example/{app_id}.png"),
        url: format!("https://apps.apple.com/us/app/id{app_id}"),
        free,
    }
}

pub fn raw_review(user_name: &str, text: &str) -> RawReview {
    RawReview {
        score: 5,
        user_name: user_name.to_string(),
        updated: "2024-03-01T10:00:00-07:00".to_string(),
        text: text.to_string(),
    }
}

impl AppStore for StubStore {
    fn search(&self, term: &str, _country: &str) -> Result<Vec<String>> {
        self.record(format!("search:{term}"));
        if self.failing_terms.contains(term) {
            bail!("search unavailable for {term}");
        }
        Ok(self.search_results.get(term).cloned().unwrap_or_default())
    }

    fn suggest(&self, term: &str) -> Result<Vec<String>> {
        self.record(format!("suggest:{term}"));
        if self.failing_terms.contains(term) {
            bail!("suggest unavailable for {term}");
        }
        Ok(self.suggestions.get(term).cloned().unwrap_or_default())
    }

    fn app_detail(&self, app_id: &str, _country: &str) -> Result<Option<AppDetail>> {
        self.record(format!("detail:{app_id}"));
        if self.failing_details.contains(app_id) {
            bail!("detail unavailable for {app_id}");
        }
        Ok(self.details.get(app_id).cloned())
    }

    fn similar_apps(&self, app_id: &str, _country: &str) -> Result<Vec<String>> {
        self.record(format!("similar:{app_id}"));
        if self.failing_similar.contains(app_id) {
            bail!("similar unavailable for {app_id}");
        }
        Ok(self.similar.get(app_id).cloned().unwrap_or_default())
    }

    fn reviews(&self, app_id: &str, _country: &str, page: u32) -> Result<Vec<RawReview>> {
        self.record(format!("reviews:{app_id}:{page}"));
        if self.failing_review_page.get(app_id) == Some(&page) {
            bail!("review page {page} unavailable for {app_id}");
        }

        let index = page.saturating_sub(1) as usize;
        Ok(self
            .review_pages
            .get(app_id)
            .and_then(|pages| pages.get(index))
            .cloned()
            .unwrap_or_default())
    }
}
