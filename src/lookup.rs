//! Page lookup for the active language, with cross-locale translation fallback.

use crate::error::StoreError;
use crate::i18n::Language;
use crate::page::Page;
use crate::store::PageStore;
use tracing::debug;

pub struct PageLookup<'a, S: PageStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: PageStore + ?Sized> PageLookup<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Home page of the language.
    pub fn find_root_page(&self, language: &Language) -> Result<Option<Page>, StoreError> {
        self.store.root_page(language.code())
    }

    /// Content page by urlname. An explicit locale from the URL scopes the
    /// lookup to exactly that locale, so a mismatch is a miss.
    pub fn find_by_urlname(
        &self,
        language: &Language,
        urlname: &str,
        explicit_locale: Option<&str>,
    ) -> Result<Option<Page>, StoreError> {
        let code = explicit_locale.unwrap_or(language.code());
        self.store.find_content_page(code, urlname)
    }

    /// Find the active-language translation of a page that carries `urlname`
    /// in another language.
    ///
    /// The store only hands out public siblings, so the result is always a
    /// valid redirect target.
    pub fn find_translation_across_locales(
        &self,
        urlname: &str,
        active_code: &str,
    ) -> Result<Option<Page>, StoreError> {
        let candidates = self.store.find_content_pages_any_language(urlname)?;

        for candidate in candidates
            .iter()
            .filter(|page| page.language_code != active_code)
        {
            if let Some(sibling) = self.store.translation_sibling(candidate, active_code)? {
                debug!(
                    "Page {} ({}) translates to {} in {}",
                    candidate.id, candidate.language_code, sibling.urlname, active_code
                );
                return Ok(Some(sibling));
            }
        }

        Ok(None)
    }
}
