use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use scanner_api::pagination::DEFAULT_PAGE_SIZE;
use scanner_ingest::RefreshPolicy;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    /// Comma-separated bootstrap servers. Ingestion stays off when unset.
    pub kafka_addr: Option<String>,
    pub kafka_group: String,
    pub page_size: i64,
    pub refresh_policy: RefreshPolicy,
    pub store_retries: u32,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let jwt_secret = var("SCANNER_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("SCANNER_JWT_SECRET is unset or still a placeholder");
        }

        let port = match var("SCANNER_PORT") {
            Some(v) => v.parse().context("SCANNER_PORT")?,
            None => 8080,
        };

        let page_size = match var("SCANNER_PAGE_SIZE") {
            Some(v) => v.parse().context("SCANNER_PAGE_SIZE")?,
            None => DEFAULT_PAGE_SIZE,
        };
        if page_size < 1 {
            bail!("SCANNER_PAGE_SIZE must be positive, got {page_size}");
        }

        let refresh_policy = match var("SCANNER_REFRESH_POLICY") {
            Some(v) => RefreshPolicy::parse(&v)
                .with_context(|| format!("SCANNER_REFRESH_POLICY: unknown policy {v:?}"))?,
            None => RefreshPolicy::default(),
        };

        let store_retries = match var("SCANNER_STORE_RETRIES") {
            Some(v) => v.parse().context("SCANNER_STORE_RETRIES")?,
            None => 3,
        };

        Ok(Self {
            host: var("SCANNER_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("SCANNER_DB_PATH")
                .unwrap_or_else(|| "scanner.db".into())
                .into(),
            jwt_secret,
            kafka_addr: var("SCANNER_KAFKA_ADDR").filter(|v| !v.trim().is_empty()),
            kafka_group: var("SCANNER_KAFKA_GROUP").unwrap_or_else(|| "scanner".into()),
            page_size,
            refresh_policy,
            store_retries,
        })
    }
}
