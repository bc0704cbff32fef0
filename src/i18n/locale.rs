//! Locale binding and locale-prefix policy.

use crate::error::NotFoundReason;
use crate::i18n::{Language, LanguageRegistry};
use tracing::debug;

/// Which locale prefixes a URL may carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalePolicy {
    /// System default locale; its pages never carry a prefix
    pub default_locale: String,

    /// Whether more than one language is enabled
    pub multi_language: bool,
}

impl LocalePolicy {
    pub fn new(default_locale: impl Into<String>, multi_language: bool) -> Self {
        Self {
            default_locale: default_locale.into(),
            multi_language,
        }
    }

    /// Derive the policy from a registry and the configured default locale.
    pub fn for_registry(default_locale: impl Into<String>, registry: &LanguageRegistry) -> Self {
        Self::new(default_locale, registry.is_multi_language())
    }

    /// A supplied locale prefix is redundant in single-language mode or when
    /// it names the default locale.
    pub fn is_prefix_disallowed(&self, locale: Option<&str>) -> bool {
        match locale {
            Some(locale) => !self.multi_language || locale == self.default_locale,
            None => false,
        }
    }

    /// Whether URLs for content in `code` carry a locale prefix.
    pub fn prefixes(&self, code: &str) -> bool {
        self.multi_language && code != self.default_locale
    }
}

/// Binds the active language for a request.
pub struct LocaleResolver<'a> {
    registry: &'a LanguageRegistry,
}

impl<'a> LocaleResolver<'a> {
    pub fn new(registry: &'a LanguageRegistry) -> Self {
        Self { registry }
    }

    /// Resolve the requested locale, or the registry default when none was
    /// given. An unknown locale is a 404, never silently ignored.
    pub fn resolve(&self, locale: Option<&str>) -> Result<Language, NotFoundReason> {
        match locale {
            Some(code) => {
                let language = self.registry.find_by_code(code).ok_or_else(|| {
                    NotFoundReason::LanguageNotFound {
                        locale: code.to_string(),
                    }
                })?;
                debug!("Bound requested language {}", language.code());
                Ok(language)
            }
            None => Ok(self.registry.default_language()),
        }
    }
}
