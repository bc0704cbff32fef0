//! Content snapshot loading.
//!
//! Languages and pages are read once at startup, either from PostgreSQL or
//! from a JSON file, and served from memory afterwards. Expected tables:
//!
//! - `languages (code, name, is_default, enabled)`
//! - `pages (id, urlname, language_code, title, body, kind, published,
//!   published_at, updated_at, public_until, cache_page, restricted,
//!   contains_feed, is_root)`
//! - `page_translations (from_id, to_id)`

use crate::error::StoreError;
use crate::i18n::{LanguageConfig, LanguageRegistry};
use crate::page::{Page, PageKind};
use crate::store::{translation_groups_from_links, MemoryStore};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// Everything resolution reads, loaded in one go.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentSnapshot {
    pub languages: Vec<LanguageConfig>,
    pub pages: Vec<Page>,
    /// `(from_id, to_id)` pairs of pages that translate each other
    #[serde(default)]
    pub translations: Vec<(i64, i64)>,
}

impl ContentSnapshot {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse content snapshot JSON")
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .context(format!("Failed to read content file {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Validate languages and index pages.
    pub fn into_parts(mut self) -> Result<(LanguageRegistry, MemoryStore)> {
        let registry =
            LanguageRegistry::new(self.languages).context("Invalid language configuration")?;

        if !self.translations.is_empty() {
            translation_groups_from_links(&mut self.pages, &self.translations);
        }

        let known: HashSet<&str> = registry
            .list_enabled()
            .iter()
            .map(|lang| lang.code.as_str())
            .collect();
        let orphaned = self
            .pages
            .iter()
            .filter(|page| !known.contains(page.language_code.as_str()))
            .count();
        if orphaned > 0 {
            warn!(
                "{} pages belong to unknown or disabled languages and cannot be reached",
                orphaned
            );
        }

        let store = MemoryStore::new(self.pages);
        if store.is_empty() {
            warn!("Content snapshot has no pages; every request will be a 404");
        }

        info!(
            "Loaded {} languages and {} pages",
            registry.list_enabled().len(),
            store.len()
        );

        Ok((registry, store))
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LanguageRow {
    code: String,
    name: String,
    is_default: bool,
    enabled: bool,
}

impl From<LanguageRow> for LanguageConfig {
    fn from(row: LanguageRow) -> Self {
        Self {
            code: row.code,
            name: row.name,
            is_default: row.is_default,
            enabled: row.enabled,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PageRow {
    id: i64,
    urlname: String,
    language_code: String,
    title: String,
    body: String,
    kind: String,
    published: bool,
    published_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    public_until: Option<DateTime<Utc>>,
    cache_page: bool,
    restricted: bool,
    contains_feed: bool,
    is_root: bool,
}

impl TryFrom<PageRow> for Page {
    type Error = StoreError;

    fn try_from(row: PageRow) -> Result<Self, Self::Error> {
        let kind = match row.kind.as_str() {
            "content" => PageKind::Content,
            "layout" => PageKind::Layout,
            other => {
                return Err(StoreError::InvalidRecord {
                    message: format!("page {} has unknown kind '{}'", row.id, other),
                })
            }
        };

        Ok(Page {
            id: row.id,
            urlname: row.urlname,
            language_code: row.language_code,
            title: row.title,
            body: row.body,
            kind,
            published: row.published,
            published_at: row.published_at,
            updated_at: row.updated_at,
            public_until: row.public_until,
            cache_page: row.cache_page,
            restricted: row.restricted,
            contains_feed: row.contains_feed,
            translation_group: None,
            is_root: row.is_root,
        })
    }
}

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(database_url)
            .await
            .map_err(unavailable)
            .context("Failed to connect to PostgreSQL")?;

        Ok(Self { pool })
    }

    /// Read languages, pages and translation links.
    pub async fn load_snapshot(&self) -> Result<ContentSnapshot> {
        let languages: Vec<LanguageRow> =
            sqlx::query_as("SELECT code, name, is_default, enabled FROM languages ORDER BY code")
                .fetch_all(&self.pool)
                .await
                .map_err(unavailable)
                .context("Failed to load languages")?;

        let pages: Vec<PageRow> = sqlx::query_as(
            "SELECT id, urlname, language_code, title, body, kind, published, published_at,
                    updated_at, public_until, cache_page, restricted, contains_feed, is_root
             FROM pages
             ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(unavailable)
        .context("Failed to load pages")?;

        let translations: Vec<(i64, i64)> =
            sqlx::query_as("SELECT from_id, to_id FROM page_translations")
                .fetch_all(&self.pool)
                .await
                .map_err(unavailable)
                .context("Failed to load page translations")?;

        Ok(ContentSnapshot {
            languages: languages.into_iter().map(LanguageConfig::from).collect(),
            pages: pages
                .into_iter()
                .map(Page::try_from)
                .collect::<Result<Vec<_>, _>>()?,
            translations,
        })
    }
}

fn unavailable(err: sqlx::Error) -> StoreError {
    StoreError::Unavailable {
        message: err.to_string(),
    }
}
