//! HTTP freshness: cache headers and conditional-request evaluation.

use crate::page::Page;
use chrono::{DateTime, SubsecRound, Utc};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Identity of whoever makes the request, as far as caching cares.
///
/// Requesters with different `cache_key`s never share a validator, so a
/// signed-in user's personalized page is not served to anyone else.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requester {
    pub cache_key: Option<String>,
}

impl Requester {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_cache_key(key: impl Into<String>) -> Self {
        Self {
            cache_key: Some(key.into()),
        }
    }
}

/// Validation tag made of the page's content version and the requester's
/// own version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    pub page_version: String,
    pub requester_version: Option<String>,
}

impl Fingerprint {
    pub fn new(page: &Page, requester: &Requester) -> Self {
        Self {
            page_version: page.cache_version(),
            requester_version: requester.cache_key.clone(),
        }
    }

    /// Quoted entity tag. Each part is length-prefixed before hashing so no
    /// two different pairs produce the same input.
    pub fn etag(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update((self.page_version.len() as u64).to_be_bytes());
        hasher.update(self.page_version.as_bytes());
        match &self.requester_version {
            Some(version) => {
                hasher.update([1u8]);
                hasher.update((version.len() as u64).to_be_bytes());
                hasher.update(version.as_bytes());
            }
            None => hasher.update([0u8]),
        }
        format!("\"{:x}\"", hasher.finalize())
    }
}

/// Cache-Control policy for a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheControl {
    /// Never reuse
    NoCache,
    /// Reusable for `max_age` seconds, always revalidated afterwards
    Cacheable { max_age: u64, public: bool },
}

impl CacheControl {
    pub fn header_value(&self) -> String {
        match self {
            CacheControl::NoCache => "no-cache".to_string(),
            CacheControl::Cacheable { max_age, public } => format!(
                "max-age={}, {}, must-revalidate",
                max_age,
                if *public { "public" } else { "private" }
            ),
        }
    }
}

/// Headers computed for a rendered or not-modified response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHeaders {
    pub cache_control: CacheControl,
    pub etag: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl CacheHeaders {
    pub fn no_cache() -> Self {
        Self {
            cache_control: CacheControl::NoCache,
            etag: None,
            last_modified: None,
        }
    }

    pub fn last_modified_header(&self) -> Option<String> {
        self.last_modified.map(http_date)
    }
}

/// Conditional request headers as sent by the client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConditionalHeaders {
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
}

/// Result of evaluating a request against the page's validators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    /// The client's copy is still valid; answer 304
    Fresh(CacheHeaders),
    /// Render the page with these headers
    Stale(CacheHeaders),
}

impl Freshness {
    pub fn should_render(&self) -> bool {
        matches!(self, Freshness::Stale(_))
    }

    pub fn headers(&self) -> &CacheHeaders {
        match self {
            Freshness::Fresh(headers) | Freshness::Stale(headers) => headers,
        }
    }
}

pub struct FreshnessEvaluator;

impl FreshnessEvaluator {
    /// Decide whether `page` must be rendered for this request.
    ///
    /// Caching is off entirely when the page disables it or a one-shot
    /// notice is waiting to be shown.
    pub fn evaluate(
        page: &Page,
        requester: &Requester,
        pending_notice: bool,
        conditional: &ConditionalHeaders,
        now: DateTime<Utc>,
    ) -> Freshness {
        if !page.cache_page || pending_notice {
            debug!("Caching disabled for page {}", page.id);
            return Freshness::Stale(CacheHeaders::no_cache());
        }

        let headers = CacheHeaders {
            cache_control: CacheControl::Cacheable {
                max_age: page.expiration_time(now),
                public: !page.restricted,
            },
            etag: Some(Fingerprint::new(page, requester).etag()),
            last_modified: page.published_at.map(|at| at.trunc_subsecs(0)),
        };

        if is_fresh(conditional, &headers) {
            Freshness::Fresh(headers)
        } else {
            Freshness::Stale(headers)
        }
    }
}

/// HTTP/1.1 freshness: at least one validator must be sent, and every
/// validator sent must match.
fn is_fresh(conditional: &ConditionalHeaders, headers: &CacheHeaders) -> bool {
    if conditional.if_none_match.is_none() && conditional.if_modified_since.is_none() {
        return false;
    }

    if let Some(if_none_match) = &conditional.if_none_match {
        match &headers.etag {
            Some(etag) if etag_matches(if_none_match, etag) => {}
            _ => return false,
        }
    }

    if let Some(if_modified_since) = &conditional.if_modified_since {
        let since = match parse_http_date(if_modified_since) {
            Some(since) => since,
            None => return false,
        };
        match headers.last_modified {
            Some(modified) if since >= modified => {}
            _ => return false,
        }
    }

    true
}

/// Weak comparison against a comma-separated If-None-Match list.
fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    let etag = etag.trim_start_matches("W/");
    if_none_match.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.trim_start_matches("W/") == etag
    })
}

fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// IMF-fixdate, as used by Last-Modified.
pub fn http_date(at: DateTime<Utc>) -> String {
    at.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
