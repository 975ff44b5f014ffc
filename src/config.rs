use std::env;

use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://books.toscrape.com/";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set; define it in the environment or in a .env file")]
    Missing(&'static str),
    #[error("invalid site address {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

/// The three addresses the crawl works from.
///
/// Listing links on the start page are relative to the site root, while on
/// every later page they are relative to the catalogue sub-path.
#[derive(Debug, Clone)]
pub struct SiteUrls {
    pub base: Url,
    pub catalogue: Url,
    pub start: Url,
}

impl SiteUrls {
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        let invalid = |source| ConfigError::InvalidUrl {
            url: base_url.to_string(),
            source,
        };

        // Url::join drops the last path segment unless the base ends in '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base = Url::parse(&normalized).map_err(invalid)?;
        let catalogue = base.join("catalogue/").map_err(invalid)?;
        let start = base.join("index.html").map_err(invalid)?;

        Ok(SiteUrls {
            base,
            catalogue,
            start,
        })
    }
}

/// Settings for a run that writes to storage. Validated once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub site: SiteUrls,
}

impl Config {
    /// Load `.env` if present, then read `DATABASE_URL` from the environment.
    pub fn from_env(base_url: &str) -> Result<Self, ConfigError> {
        let _ = dotenv::dotenv();
        Self::new(env::var(DATABASE_URL_VAR).ok(), base_url)
    }

    pub fn new(database_url: Option<String>, base_url: &str) -> Result<Self, ConfigError> {
        let database_url = database_url
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing(DATABASE_URL_VAR))?;

        Ok(Config {
            database_url,
            site: SiteUrls::new(base_url)?,
        })
    }
}
