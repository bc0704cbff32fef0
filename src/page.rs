//! Content pages and the publication gate.

use crate::error::NotFoundReason;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether a page can be addressed by URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PageKind {
    /// Regular page reachable through its urlname
    #[default]
    Content,
    /// Structural page (headers, footers) never resolved directly
    Layout,
}

/// A page as read from the store. Read-only to resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: i64,
    /// Path segment, unique within its language
    pub urlname: String,
    pub language_code: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub kind: PageKind,
    #[serde(default)]
    pub published: bool,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    /// End of the publication window; drives the cache max-age
    #[serde(default)]
    pub public_until: Option<DateTime<Utc>>,
    #[serde(default = "default_cache_page")]
    pub cache_page: bool,
    /// Restricted pages are only cached privately
    #[serde(default)]
    pub restricted: bool,
    #[serde(default)]
    pub contains_feed: bool,
    /// Pages sharing a group id are translations of each other
    #[serde(default)]
    pub translation_group: Option<i64>,
    /// Home page of its language
    #[serde(default)]
    pub is_root: bool,
}

fn default_cache_page() -> bool {
    true
}

impl Page {
    /// A published, cacheable content page with no title or body.
    pub fn new(id: i64, urlname: &str, language_code: &str, updated_at: DateTime<Utc>) -> Self {
        Self {
            id,
            urlname: urlname.to_string(),
            language_code: language_code.to_string(),
            title: String::new(),
            body: String::new(),
            kind: PageKind::Content,
            published: true,
            published_at: Some(updated_at),
            updated_at,
            public_until: None,
            cache_page: true,
            restricted: false,
            contains_feed: false,
            translation_group: None,
            is_root: false,
        }
    }

    /// Publication scheduling is decided by whoever writes pages; this only
    /// reads the flag.
    pub fn is_public(&self) -> bool {
        self.published
    }

    pub fn is_content(&self) -> bool {
        self.kind == PageKind::Content
    }

    /// Seconds until the page leaves its publication window, 0 if unbounded
    /// or already past.
    pub fn expiration_time(&self, now: DateTime<Utc>) -> u64 {
        self.public_until
            .map(|until| (until - now).num_seconds().max(0) as u64)
            .unwrap_or(0)
    }

    /// Content version; changes whenever the page is edited or republished.
    pub fn cache_version(&self) -> String {
        format!(
            "pages/{}-{}-{}",
            self.id,
            self.updated_at.timestamp_micros(),
            self.published_at
                .map(|at| at.timestamp_micros())
                .unwrap_or_default()
        )
    }
}

/// Lets only public pages through to canonicalization and caching.
pub struct PublicationGate;

impl PublicationGate {
    /// Admit a public page; an absent or unpublished page becomes a 404.
    pub fn admit(page: Option<Page>, path: &str) -> Result<Page, NotFoundReason> {
        match page {
            Some(page) if page.is_public() => Ok(page),
            _ => Err(NotFoundReason::PageNotFound {
                path: path.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    // ==================== Page Tests ====================

    #[test]
    fn test_expiration_time_without_window() {
        let page = Page::new(1, "about", "en", at(0));
        assert_eq!(page.expiration_time(at(0)), 0);
    }

    #[test]
    fn test_expiration_time_counts_down() {
        let mut page = Page::new(1, "about", "en", at(0));
        page.public_until = Some(at(0) + Duration::hours(1));
        assert_eq!(page.expiration_time(at(0)), 3600);
        assert_eq!(page.expiration_time(at(600)), 3000);
    }

    #[test]
    fn test_expiration_time_never_negative() {
        let mut page = Page::new(1, "about", "en", at(0));
        page.public_until = Some(at(0));
        assert_eq!(page.expiration_time(at(100)), 0);
    }

    #[test]
    fn test_cache_version_tracks_republishing() {
        let mut page = Page::new(1, "about", "en", at(0));
        let before = page.cache_version();
        page.published_at = Some(at(60));
        assert_ne!(before, page.cache_version());
    }

    #[test]
    fn test_deserialize_defaults() {
        let page: Page = serde_json::from_str(
            r#"{"id": 3, "urlname": "news", "language_code": "en", "updated_at": "2024-01-15T10:30:00Z"}"#,
        )
        .unwrap();
        assert!(page.cache_page);
        assert!(!page.published);
        assert_eq!(page.kind, PageKind::Content);
        assert!(page.translation_group.is_none());
    }

    // ==================== PublicationGate Tests ====================

    #[test]
    fn test_gate_admits_public_page() {
        let page = Page::new(1, "about", "en", at(0));
        assert_eq!(PublicationGate::admit(Some(page.clone()), "/about"), Ok(page));
    }

    #[test]
    fn test_gate_rejects_unpublished_page() {
        let mut page = Page::new(1, "about", "en", at(0));
        page.published = false;
        assert_eq!(
            PublicationGate::admit(Some(page), "/about"),
            Err(NotFoundReason::PageNotFound {
                path: "/about".to_string()
            })
        );
    }

    #[test]
    fn test_gate_rejects_missing_page() {
        assert!(PublicationGate::admit(None, "/missing").is_err());
    }
}
