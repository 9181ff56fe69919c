//! HTTP fetching with snapshot caching.
//!
//! Fetches the banner page and optionally keeps a snapshot on disk so that
//! repeated runs within the cache TTL don't hit the wiki again.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::SourceConfig;

/// Errors that can occur during fetching.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Content too large: {size} bytes (max {max_size})")]
    ContentTooLarge { size: usize, max_size: usize },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A fetched page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub url: Url,
    pub body: String,
    pub content_type: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// Metadata stored alongside a cached snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub url: String,
    pub fetched_at: DateTime<Utc>,
    pub content_type: Option<String>,
}

/// Configuration for the HTTP fetcher.
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Directory for page snapshots
    pub cache_dir: PathBuf,

    /// How long a snapshot is considered fresh; zero disables caching
    pub cache_ttl: Duration,

    /// Maximum content size to fetch
    pub max_content_size: usize,

    /// Request timeout
    pub timeout: Duration,

    /// User agent string
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self::from_source(&SourceConfig::default(), PathBuf::from("./data/raw"))
    }
}

impl FetcherConfig {
    /// Fetcher settings for a configured source.
    pub fn from_source(source: &SourceConfig, cache_dir: PathBuf) -> Self {
        Self {
            cache_dir,
            cache_ttl: Duration::from_secs(source.cache_ttl_seconds),
            max_content_size: source.max_content_size,
            timeout: Duration::from_secs(source.timeout_seconds),
            user_agent: source.user_agent.clone(),
        }
    }
}

/// Anything that can produce the HTML of a page.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, url: &Url) -> Result<String, FetchError>;
}

/// A page source that always returns the same document.
#[derive(Debug, Clone)]
pub struct StaticPage(pub String);

#[async_trait]
impl PageSource for StaticPage {
    async fn fetch_page(&self, _url: &Url) -> Result<String, FetchError> {
        Ok(self.0.clone())
    }
}

/// HTTP fetcher with a local snapshot cache.
pub struct Fetcher {
    client: Client,
    config: FetcherConfig,
}

impl Fetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: FetcherConfig) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("banner-watch/0.1.0")),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml;q=0.9,*/*;q=0.8"),
        );

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    fn cache_enabled(&self) -> bool {
        !self.config.cache_ttl.is_zero()
    }

    /// Fetch a URL, using the snapshot if available and fresh.
    pub async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        if self.cache_enabled() {
            let cache_path = self.cache_path_for_url(url);
            let meta_path = self.meta_path_for_url(url);

            match self.check_cache(url, &cache_path, &meta_path).await {
                Ok(Some(page)) => return Ok(page),
                Ok(None) => {}
                Err(e) => warn!("Ignoring unreadable snapshot for {}: {}", url, e),
            }
        }

        self.fetch_fresh(url).await
    }

    /// Force fetch from network, ignoring the cache.
    pub async fn fetch_fresh(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        info!("Fetching {}", url);

        let response = self.client.get(url.as_str()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                status: status.as_u16(),
                message: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let content = response.bytes().await?;

        if content.len() > self.config.max_content_size {
            return Err(FetchError::ContentTooLarge {
                size: content.len(),
                max_size: self.config.max_content_size,
            });
        }

        let page = FetchedPage {
            url: url.clone(),
            body: String::from_utf8_lossy(&content).into_owned(),
            content_type,
            fetched_at: Utc::now(),
        };

        if self.cache_enabled() {
            if let Err(e) = self.store_snapshot(&page).await {
                warn!("Could not store snapshot for {}: {}", url, e);
            }
        }

        Ok(page)
    }

    /// Check if a snapshot is cached and fresh.
    async fn check_cache(
        &self,
        url: &Url,
        cache_path: &Path,
        meta_path: &Path,
    ) -> Result<Option<FetchedPage>, FetchError> {
        if !cache_path.exists() || !meta_path.exists() {
            return Ok(None);
        }

        let meta_content = fs::read_to_string(meta_path).await?;
        let meta: CacheMetadata = match serde_json::from_str(&meta_content) {
            Ok(m) => m,
            Err(_) => return Ok(None),
        };

        if !is_fresh(meta.fetched_at, self.config.cache_ttl, Utc::now()) {
            debug!("Snapshot expired for {}", url);
            return Ok(None);
        }

        info!("Serving {} from snapshot", url);
        Ok(Some(FetchedPage {
            url: url.clone(),
            body: fs::read_to_string(cache_path).await?,
            content_type: meta.content_type,
            fetched_at: meta.fetched_at,
        }))
    }

    /// Write the page body and its metadata next to each other.
    async fn store_snapshot(&self, page: &FetchedPage) -> Result<(), FetchError> {
        let cache_path = self.cache_path_for_url(&page.url);
        let meta_path = self.meta_path_for_url(&page.url);

        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&cache_path, &page.body).await?;

        let meta = CacheMetadata {
            url: page.url.to_string(),
            fetched_at: page.fetched_at,
            content_type: page.content_type.clone(),
        };
        fs::write(&meta_path, serde_json::to_string_pretty(&meta)?).await?;

        debug!("Stored snapshot at {:?}", cache_path);
        Ok(())
    }

    /// Generate a cache path for a URL.
    fn cache_path_for_url(&self, url: &Url) -> PathBuf {
        let hash = Self::url_hash(url);
        let host = url.host_str().unwrap_or("unknown");

        self.config
            .cache_dir
            .join(host)
            .join(format!("{}.html", hash))
    }

    /// Generate a metadata path for a URL.
    fn meta_path_for_url(&self, url: &Url) -> PathBuf {
        let hash = Self::url_hash(url);
        let host = url.host_str().unwrap_or("unknown");

        self.config
            .cache_dir
            .join(host)
            .join(format!("{}.meta.json", hash))
    }

    /// Hash a URL to a short string.
    fn url_hash(url: &Url) -> String {
        let mut hasher = Sha256::new();
        hasher.update(url.as_str().as_bytes());
        let result = hasher.finalize();
        hex::encode(&result[..8])
    }
}

#[async_trait]
impl PageSource for Fetcher {
    async fn fetch_page(&self, url: &Url) -> Result<String, FetchError> {
        Ok(self.fetch(url).await?.body)
    }
}

fn is_fresh(fetched_at: DateTime<Utc>, ttl: Duration, now: DateTime<Utc>) -> bool {
    let age = now.signed_duration_since(fetched_at);
    age.num_seconds() <= ttl.as_secs() as i64
}
