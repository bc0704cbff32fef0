//! Site languages and locale handling.
//!
//! # Architecture
//!
//! - `registry`: the validated set of site languages, built from the content snapshot
//! - `language`: the `Language` handle handed out by the registry
//! - `locale`: binding the active language and deciding which locale prefixes are allowed
//!
//! # Example
//!
//! ```rust,ignore
//! use content_pages::i18n::{LanguageConfig, LanguageRegistry, LocaleResolver};
//!
//! let registry = LanguageRegistry::new(vec![
//!     LanguageConfig::new("en", "English", true),
//!     LanguageConfig::new("fr", "Français", false),
//! ])?;
//!
//! let active = LocaleResolver::new(&registry).resolve(Some("fr"))?;
//! ```

mod language;
mod locale;
mod registry;

pub use language::Language;
pub use locale::{LocalePolicy, LocaleResolver};
pub use registry::{LanguageConfig, LanguageRegistry};
