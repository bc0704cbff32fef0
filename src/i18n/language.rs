//! Language type: a language validated against the registry.

use crate::i18n::LanguageConfig;

/// A validated, enabled site language.
///
/// Only the registry hands these out, so holding one means the code was
/// known and enabled when the request was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Language {
    code: String,
    name: String,
    is_default: bool,
}

impl Language {
    pub(crate) fn from_config(config: &LanguageConfig) -> Self {
        Self {
            code: config.code.clone(),
            name: config.name.clone(),
            is_default: config.is_default,
        }
    }

    /// Locale code as it appears in URLs.
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the registry marks this as the default language.
    pub fn is_default(&self) -> bool {
        self.is_default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_copies_fields() {
        let config = LanguageConfig::new("fr", "Français", false);
        let language = Language::from_config(&config);
        assert_eq!(language.code(), "fr");
        assert_eq!(language.name(), "Français");
        assert!(!language.is_default());
    }

    #[test]
    fn test_language_equality() {
        let a = Language::from_config(&LanguageConfig::new("en", "English", true));
        let b = Language::from_config(&LanguageConfig::new("en", "English", true));
        let c = Language::from_config(&LanguageConfig::new("fr", "Français", false));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
