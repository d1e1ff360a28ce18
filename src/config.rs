//! Configuration management for Booklet Server

use std::env;

/// Remote PDFs offered by `/combine-pdfs` when no catalog is configured
pub const DEFAULT_CATALOG: [&str; 8] = [
    "https://rebelrooster.io/vg/nurnberg/pdf/Nuremberg_v1__01.pdf",
    "https://rebelrooster.io/vg/nurnberg/pdf/Nuremberg_v1__02.pdf",
    "https://rebelrooster.io/vg/nurnberg/pdf/Nuremberg_v1__03.pdf",
    "https://rebelrooster.io/vg/nurnberg/pdf/Nuremberg_v1__04.pdf",
    "https://rebelrooster.io/vg/nurnberg/pdf/Nuremberg_v1__05.pdf",
    "https://rebelrooster.io/vg/nurnberg/pdf/Nuremberg_v1__06.pdf",
    "https://rebelrooster.io/vg/nurnberg/pdf/Nuremberg_v1__07.pdf",
    "https://rebelrooster.io/vg/nurnberg/pdf/Nuremberg_v1__08.pdf",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub fetch: FetchConfig,
    pub catalog: CatalogConfig,
    pub booklet: BookletConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum accepted request body, in bytes
    pub body_limit: usize,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub timeout_secs: u64,
    /// Upper bound on simultaneous image downloads for one booklet
    pub concurrency: usize,
}

#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub urls: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BookletConfig {
    pub title: String,
    pub subtitle: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                body_limit: 50 * 1024 * 1024,
            },
            database: DatabaseConfig {
                url: "sqlite:./students.db".to_string(),
            },
            fetch: FetchConfig {
                timeout_secs: 30,
                concurrency: 8,
            },
            catalog: CatalogConfig::default(),
            booklet: BookletConfig::default(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            urls: DEFAULT_CATALOG.iter().map(|u| u.to_string()).collect(),
        }
    }
}

impl Default for BookletConfig {
    fn default() -> Self {
        BookletConfig {
            title: "Bucket List Adventure".to_string(),
            subtitle: "Here are some of your favorite places added to your bucket list!".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Config::default();

        Ok(Config {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_var("PORT", defaults.server.port)?,
                body_limit: parse_var("BODY_LIMIT_BYTES", defaults.server.body_limit)?,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
            },
            fetch: FetchConfig {
                timeout_secs: parse_var("FETCH_TIMEOUT_SECS", defaults.fetch.timeout_secs)?,
                concurrency: parse_var("FETCH_CONCURRENCY", defaults.fetch.concurrency)?.max(1),
            },
            catalog: match env::var("PDF_CATALOG_URLS") {
                Ok(raw) => CatalogConfig {
                    urls: parse_catalog(&raw)?,
                },
                Err(_) => defaults.catalog,
            },
            booklet: BookletConfig {
                title: env::var("BOOKLET_TITLE").unwrap_or(defaults.booklet.title),
                subtitle: env::var("BOOKLET_SUBTITLE").unwrap_or(defaults.booklet.subtitle),
            },
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("PDF_CATALOG_URLS must list at least one URL")]
    EmptyCatalog,
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}

/// Split a comma-separated catalog, keeping order and dropping blanks
fn parse_catalog(raw: &str) -> Result<Vec<String>, ConfigError> {
    let urls: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect();

    if urls.is_empty() {
        return Err(ConfigError::EmptyCatalog);
    }
    Ok(urls)
}
