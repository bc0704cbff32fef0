//! Error types for page resolution.
//!
//! Expected, user-facing failures (unknown locale, missing page, bad format)
//! are [`NotFoundReason`]s and end the pipeline with a 404. Only store
//! failures and authorization denials escape as [`PipelineError`].

use thiserror::Error;

/// Why a request resolved to a 404.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFoundReason {
    /// The locale segment names no enabled language.
    #[error("language not found: {locale}")]
    LanguageNotFound { locale: String },

    /// No public page resolves for the language and urlname.
    #[error("page not found: {path}")]
    PageNotFound { path: String },

    /// The requested response format has no renderer.
    #[error("unsupported format: {format}")]
    UnsupportedFormat { format: String },

    /// A feed was requested for a page without feed content.
    #[error("page {page_id} has no feed")]
    FeedUnavailable { page_id: i64 },
}

/// Page/language store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached.
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// A stored record could not be turned into a page or language.
    #[error("invalid record: {message}")]
    InvalidRecord { message: String },
}

/// Failures that the serving layer turns into non-404 responses.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The authorization collaborator refused `show` for this page.
    #[error("access denied to page {page_id}")]
    AccessDenied { page_id: i64 },
}

/// Language registry construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("no default language configured")]
    NoDefault,

    #[error("multiple default languages configured: {codes:?}")]
    MultipleDefaults { codes: Vec<String> },

    #[error("duplicate language code: {code}")]
    DuplicateCode { code: String },

    #[error("default language {code} is disabled")]
    DisabledDefault { code: String },
}
