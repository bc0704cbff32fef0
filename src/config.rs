use anyhow::{bail, Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // Server
    pub port: u16,

    // Content source (one of these must be set)
    pub database_url: Option<String>,
    pub content_file: Option<String>,

    // Locale policy
    pub default_locale: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let config = Self {
            port: std::env::var("PORT")
                .ok()
                .map(|v| v.parse())
                .transpose()
                .context("PORT must be a port number")?
                .unwrap_or(8080),

            database_url: non_empty_var("DATABASE_URL"),
            content_file: non_empty_var("CONTENT_FILE"),

            default_locale: std::env::var("DEFAULT_LOCALE").unwrap_or_else(|_| "en".to_string()),
        };

        if config.database_url.is_none() && config.content_file.is_none() {
            bail!("Either DATABASE_URL or CONTENT_FILE must be set");
        }

        Ok(config)
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
