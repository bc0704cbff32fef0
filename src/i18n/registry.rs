//! Language registry: the set of languages pages can be published in.
//!
//! The registry is built once from the content snapshot and shared read-only
//! across requests. Construction validates that exactly one language is
//! marked as the default, and that it is enabled.

use crate::error::RegistryError;
use crate::i18n::Language;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Configuration for a site language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageConfig {
    /// Locale code used in URLs (e.g., "en", "fr", "pt-BR")
    pub code: String,

    /// Display name (e.g., "English", "Français")
    #[serde(default)]
    pub name: String,

    /// Whether this is the language used when a request carries no locale
    #[serde(default)]
    pub is_default: bool,

    /// Whether pages in this language are reachable at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl LanguageConfig {
    pub fn new(code: &str, name: &str, is_default: bool) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            is_default,
            enabled: true,
        }
    }
}

/// Validated registry of site languages.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    languages: Vec<LanguageConfig>,
    default_index: usize,
}

impl LanguageRegistry {
    /// Build a registry, rejecting duplicate codes and anything other than
    /// exactly one enabled default language.
    pub fn new(languages: Vec<LanguageConfig>) -> Result<Self, RegistryError> {
        let mut seen = HashSet::new();
        for lang in &languages {
            if !seen.insert(lang.code.as_str()) {
                return Err(RegistryError::DuplicateCode {
                    code: lang.code.clone(),
                });
            }
        }

        let defaults: Vec<usize> = languages
            .iter()
            .enumerate()
            .filter(|(_, lang)| lang.is_default)
            .map(|(index, _)| index)
            .collect();

        let default_index = match defaults.as_slice() {
            [] => return Err(RegistryError::NoDefault),
            [index] => *index,
            _ => {
                return Err(RegistryError::MultipleDefaults {
                    codes: defaults
                        .iter()
                        .map(|&i| languages[i].code.clone())
                        .collect(),
                })
            }
        };

        if !languages[default_index].enabled {
            return Err(RegistryError::DisabledDefault {
                code: languages[default_index].code.clone(),
            });
        }

        Ok(Self {
            languages,
            default_index,
        })
    }

    /// Get an enabled language by its code.
    ///
    /// Disabled languages are treated as unknown.
    pub fn find_by_code(&self, code: &str) -> Option<Language> {
        self.languages
            .iter()
            .find(|lang| lang.enabled && lang.code == code)
            .map(Language::from_config)
    }

    /// The language bound to requests that carry no locale.
    pub fn default_language(&self) -> Language {
        Language::from_config(&self.languages[self.default_index])
    }

    /// Get all enabled languages.
    pub fn list_enabled(&self) -> Vec<&LanguageConfig> {
        self.languages.iter().filter(|lang| lang.enabled).collect()
    }

    /// More than one enabled language means URLs may carry a locale prefix.
    pub fn is_multi_language(&self) -> bool {
        self.list_enabled().len() > 1
    }
}
