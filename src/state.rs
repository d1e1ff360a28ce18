//! Application state management

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use crate::config::Config;
use crate::fetch::{Fetcher, HttpFetcher};
use crate::pdf::{BookletGenerator, PdfCatalog, PdfCombiner};

/// Error type for state initialization
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    booklet: BookletGenerator,
    combiner: PdfCombiner,
}

impl AppState {
    /// Create application state that fetches over HTTP
    pub fn new(config: Config, db: SqlitePool) -> Result<Self, StateError> {
        let fetcher = HttpFetcher::new(Duration::from_secs(config.fetch.timeout_secs))?;
        Ok(Self::with_fetcher(config, db, Arc::new(fetcher)))
    }

    /// Create application state around any fetcher
    pub fn with_fetcher(config: Config, db: SqlitePool, fetcher: Arc<dyn Fetcher>) -> Self {
        let booklet = BookletGenerator::new(fetcher.clone(), &config.booklet, config.fetch.concurrency);
        let combiner = PdfCombiner::new(fetcher, PdfCatalog::new(config.catalog.urls.clone()));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                booklet,
                combiner,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    /// Get the booklet generator
    pub fn booklet(&self) -> &BookletGenerator {
        &self.inner.booklet
    }

    /// Get the catalog combiner
    pub fn combiner(&self) -> &PdfCombiner {
        &self.inner.combiner
    }
}
