//! Banner service.
//!
//! Ties the page source, the banner pipeline and the endgame extractor
//! together behind one object built from `AppConfig`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::config::AppConfig;
use crate::extract::{BannerExtractor, BannerStrategy, EndgameExtractor, ExtractError, ExtractionReport};
use crate::fetch::{FetchError, Fetcher, FetcherConfig, PageSource};
use crate::models::{BannerRecord, EndgameContent};
use crate::storage::StorageConfig;

/// Errors surfaced by the service.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Extraction setup error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Invalid page URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
}

impl ServiceError {
    /// Whether the page could not be retrieved, as opposed to a setup problem.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ServiceError::Fetch(_))
    }
}

/// Builder for [`BannerService`].
pub struct BannerServiceBuilder {
    config: AppConfig,
    source: Option<Arc<dyn PageSource>>,
    strategy: Option<Box<dyn BannerStrategy>>,
}

impl BannerServiceBuilder {
    /// Use a custom page source instead of the HTTP fetcher.
    pub fn page_source(mut self, source: Arc<dyn PageSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Use a custom banner classification strategy.
    pub fn strategy(mut self, strategy: Box<dyn BannerStrategy>) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn build(self) -> Result<BannerService, ServiceError> {
        let page_url = Url::parse(&self.config.source.page_url).map_err(|source| {
            ServiceError::InvalidUrl {
                url: self.config.source.page_url.clone(),
                source,
            }
        })?;

        let mut extractor = BannerExtractor::from_config(&self.config)?;
        if let Some(strategy) = self.strategy {
            extractor = extractor.with_strategy(strategy);
        }

        let endgame = EndgameExtractor::new(
            extractor.selectors().clone(),
            self.config.endgame.countdown_offset_minutes,
        );

        let source = match self.source {
            Some(source) => source,
            None => {
                let storage = StorageConfig::new(self.config.data_dir.clone());
                let fetcher_config = FetcherConfig::from_source(&self.config.source, storage.raw_dir());
                Arc::new(Fetcher::new(fetcher_config)?) as Arc<dyn PageSource>
            }
        };

        Ok(BannerService {
            page_url,
            source,
            extractor,
            endgame,
        })
    }
}

/// Fetches the banner page and extracts banners and endgame countdowns.
pub struct BannerService {
    page_url: Url,
    source: Arc<dyn PageSource>,
    extractor: BannerExtractor,
    endgame: EndgameExtractor,
}

impl BannerService {
    pub fn builder(config: AppConfig) -> BannerServiceBuilder {
        BannerServiceBuilder {
            config,
            source: None,
            strategy: None,
        }
    }

    pub fn page_url(&self) -> &Url {
        &self.page_url
    }

    pub fn extractor(&self) -> &BannerExtractor {
        &self.extractor
    }

    /// Fetch the page and extract banners, failing on transport errors.
    pub async fn try_fetch_banners(&self, now: DateTime<Utc>) -> Result<ExtractionReport, ServiceError> {
        let html = self.source.fetch_page(&self.page_url).await?;
        Ok(self.extractor.extract(&html, now))
    }

    /// Current banners, or an empty list if the page could not be fetched.
    pub async fn fetch_banners(&self) -> Vec<BannerRecord> {
        match self.try_fetch_banners(Utc::now()).await {
            Ok(report) => report.banners,
            Err(e) => {
                error!("Could not fetch banners from {}: {}", self.page_url, e);
                Vec::new()
            }
        }
    }

    pub async fn try_fetch_endgame(&self) -> Result<Vec<EndgameContent>, ServiceError> {
        let html = self.source.fetch_page(&self.page_url).await?;
        Ok(self.endgame.extract(&html))
    }

    /// Endgame countdowns, or an empty list if the page could not be fetched.
    pub async fn fetch_endgame(&self) -> Vec<EndgameContent> {
        match self.try_fetch_endgame().await {
            Ok(entries) => entries,
            Err(e) => {
                error!("Could not fetch endgame content from {}: {}", self.page_url, e);
                Vec::new()
            }
        }
    }

    /// Extract from HTML already in hand, without touching the page source.
    pub fn extract_html(&self, html: &str, now: DateTime<Utc>) -> ExtractionReport {
        info!("Extracting banners from {} bytes of HTML", html.len());
        self.extractor.extract(html, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{PageSelectors, RejectReason, Verdict};
    use crate::fetch::StaticPage;
    use async_trait::async_trait;
    use scraper::ElementRef;

    const FIXTURE: &str = include_str!("../tests/fixtures/banners.html");

    struct Unreachable;

    #[async_trait]
    impl PageSource for Unreachable {
        async fn fetch_page(&self, _url: &Url) -> Result<String, FetchError> {
            Err(FetchError::HttpStatus {
                status: 503,
                message: "Service Unavailable".to_string(),
            })
        }
    }

    struct RejectEverything;

    impl BannerStrategy for RejectEverything {
        fn name(&self) -> &'static str {
            "reject-everything"
        }

        fn evaluate(&self, _candidate: ElementRef<'_>, _selectors: &PageSelectors) -> Verdict {
            Verdict::Rejected(RejectReason::NoFeaturedContent)
        }
    }

    fn service(source: Arc<dyn PageSource>) -> BannerService {
        BannerService::builder(AppConfig::default())
            .page_source(source)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_banners_from_static_page() {
        let service = service(Arc::new(StaticPage(FIXTURE.to_string())));

        let banners = service.fetch_banners().await;
        assert_eq!(banners.len(), 1);
        assert_eq!(banners[0].display_name, "Deadly Dancer");
    }

    #[tokio::test]
    async fn test_fetch_banners_empty_on_transport_failure() {
        let service = service(Arc::new(Unreachable));

        assert!(service.fetch_banners().await.is_empty());
        assert!(service.fetch_endgame().await.is_empty());
        assert!(matches!(
            service.try_fetch_banners(Utc::now()).await,
            Err(ServiceError::Fetch(FetchError::HttpStatus { status: 503, .. }))
        ));
    }

    #[tokio::test]
    async fn test_transport_failure_is_unavailable() {
        let service = service(Arc::new(Unreachable));

        let banners_err = service.try_fetch_banners(Utc::now()).await.unwrap_err();
        let endgame_err = service.try_fetch_endgame().await.unwrap_err();
        assert!(banners_err.is_unavailable());
        assert!(endgame_err.is_unavailable());

        let setup_err = ServiceError::InvalidUrl {
            url: "nope".to_string(),
            source: url::ParseError::RelativeUrlWithoutBase,
        };
        assert!(!setup_err.is_unavailable());
    }

    #[tokio::test]
    async fn test_custom_strategy_is_used() {
        let service = BannerService::builder(AppConfig::default())
            .page_source(Arc::new(StaticPage(FIXTURE.to_string())))
            .strategy(Box::new(RejectEverything))
            .build()
            .unwrap();

        let report = service.try_fetch_banners(Utc::now()).await.unwrap();
        assert!(report.banners.is_empty());
        assert_eq!(report.rejected, report.candidates);
    }

    #[test]
    fn test_build_rejects_bad_page_url() {
        let mut config = AppConfig::default();
        config.source.page_url = "not a url".to_string();

        let result = BannerService::builder(config)
            .page_source(Arc::new(StaticPage(String::new())))
            .build();
        assert!(matches!(result, Err(ServiceError::InvalidUrl { .. })));
    }
}
