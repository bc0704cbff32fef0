//! Canonical URL enforcement.
//!
//! A page's canonical URL carries its locale as the first path segment,
//! except for content in the default locale, which never carries one. Both
//! checks here only ever produce a permanent redirect target or nothing.

use crate::i18n::LocalePolicy;
use crate::page::Page;

/// Routing parameters that never survive into a redirect's query string.
pub const RESERVED_PARAMS: [&str; 4] = ["action", "controller", "urlname", "locale"];

/// How the locale segment of a generated URL is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalePrefix<'a> {
    /// Prefix only when the policy prefixes the page's language
    Auto,
    /// Always prefix with this locale
    Force(&'a str),
    /// Never prefix
    Omit,
}

pub struct CanonicalizationPolicy<'a> {
    policy: &'a LocalePolicy,
}

impl<'a> CanonicalizationPolicy<'a> {
    pub fn new(policy: &'a LocalePolicy) -> Self {
        Self { policy }
    }

    /// Pre-lookup check: a redundant locale prefix redirects to the same
    /// path without it.
    pub fn strip_disallowed_prefix(
        &self,
        locale: Option<&str>,
        urlname: Option<&str>,
        extra: &[(String, String)],
    ) -> Option<String> {
        if self.policy.is_prefix_disallowed(locale) {
            Some(build_path(None, urlname, extra))
        } else {
            None
        }
    }

    /// A request without a locale reached a page outside the default locale.
    pub fn is_prefix_missing(&self, locale: Option<&str>, page: &Page) -> bool {
        self.policy.multi_language
            && locale.is_none()
            && page.language_code != self.policy.default_locale
    }

    /// Post-lookup check: redirect to the page's own locale prefix when it is
    /// missing. `urlname` is `None` for index requests.
    pub fn add_missing_prefix(
        &self,
        locale: Option<&str>,
        page: &Page,
        urlname: Option<&str>,
        extra: &[(String, String)],
    ) -> Option<String> {
        if self.is_prefix_missing(locale, page) {
            Some(self.page_url(
                page,
                urlname,
                LocalePrefix::Force(&page.language_code),
                extra,
            ))
        } else {
            None
        }
    }

    /// URL of `page`, keeping all non-routing query parameters.
    pub fn page_url(
        &self,
        page: &Page,
        urlname: Option<&str>,
        prefix: LocalePrefix<'_>,
        extra: &[(String, String)],
    ) -> String {
        let locale = match prefix {
            LocalePrefix::Auto if self.policy.prefixes(&page.language_code) => {
                Some(page.language_code.as_str())
            }
            LocalePrefix::Auto | LocalePrefix::Omit => None,
            LocalePrefix::Force(locale) => Some(locale),
        };
        build_path(locale, urlname, extra)
    }
}

/// Assemble `/{locale}/{urlname}?{extra}`, skipping absent parts and
/// reserved keys. Query pairs keep their order, repeated keys included.
pub fn build_path(
    locale: Option<&str>,
    urlname: Option<&str>,
    extra: &[(String, String)],
) -> String {
    let mut path = String::new();
    if let Some(locale) = locale {
        path.push('/');
        path.push_str(&urlencoding::encode(locale));
    }
    if let Some(urlname) = urlname {
        for segment in urlname.split('/').filter(|s| !s.is_empty()) {
            path.push('/');
            path.push_str(&urlencoding::encode(segment));
        }
    }
    if path.is_empty() {
        path.push('/');
    }

    let query: Vec<String> = extra
        .iter()
        .filter(|(key, _)| !RESERVED_PARAMS.contains(&key.as_str()))
        .map(|(key, value)| {
            format!(
                "{}={}",
                urlencoding::encode(key),
                urlencoding::encode(value)
            )
        })
        .collect();

    if !query.is_empty() {
        path.push('?');
        path.push_str(&query.join("&"));
    }
    path
}
