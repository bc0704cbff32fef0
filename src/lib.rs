//! Resolve localized URL paths to publishable content pages.
//!
//! A request resolves to exactly one of: a permanent redirect to the
//! canonical URL, a 404, a 304, or a page to render with cache headers.
//! See [`pipeline`] for the order of decisions.

pub mod canonical;
pub mod config;
pub mod db;
pub mod error;
pub mod freshness;
pub mod i18n;
pub mod lookup;
pub mod page;
pub mod pipeline;
pub mod render;
pub mod server;
pub mod store;

pub use error::{NotFoundReason, PipelineError, StoreError};
pub use pipeline::{RequestParams, RequestPipeline, ResolutionOutcome};
