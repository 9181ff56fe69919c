//! Responsive image URL resolution.

use scraper::ElementRef;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Errors from strict image resolution.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("No image markup")]
    Missing,

    #[error("Empty image reference")]
    Empty,

    #[error("Inline data URI is not a network location")]
    InlineData,

    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Invalid image URL {value:?}: {source}")]
    InvalidUrl {
        value: String,
        #[source]
        source: url::ParseError,
    },
}

/// Resolves `<picture>`/`<img>` markup to a single absolute URL.
#[derive(Debug, Clone)]
pub struct ImageResolver {
    /// Site root, used for relative paths
    origin: Url,
    default_url: String,
}

impl ImageResolver {
    pub fn new(origin: &str, default_url: impl Into<String>) -> Result<Self, url::ParseError> {
        let mut origin = Url::parse(origin)?;
        origin.set_path("/");
        origin.set_query(None);
        origin.set_fragment(None);

        Ok(Self {
            origin,
            default_url: default_url.into(),
        })
    }

    pub fn default_url(&self) -> &str {
        &self.default_url
    }

    /// Resolve the best image under `container`, or the default URL.
    pub fn resolve(&self, container: Option<ElementRef<'_>>) -> String {
        let Some(container) = container else {
            return self.default_url.clone();
        };

        match self.try_resolve(container) {
            Ok(url) => url,
            Err(e) => {
                debug!("Using default image: {}", e);
                self.default_url.clone()
            }
        }
    }

    /// Resolve the best image under `container` (inclusive).
    ///
    /// The first non-inline candidate list wins, taking its last (widest)
    /// entry. Otherwise the first `<img>` `src`/`data-src` is used.
    pub fn try_resolve(&self, container: ElementRef<'_>) -> Result<String, ImageError> {
        let elements: Vec<ElementRef<'_>> = container
            .descendants()
            .filter_map(ElementRef::wrap)
            .collect();

        for el in &elements {
            let srcset = el
                .value()
                .attr("srcset")
                .or_else(|| el.value().attr("data-srcset"));

            if let Some(candidate) = srcset.and_then(last_srcset_candidate) {
                if let Ok(url) = self.normalize(candidate) {
                    return Ok(url);
                }
            }
        }

        let mut fallback_error = ImageError::Missing;
        for el in elements.iter().filter(|el| el.value().name() == "img") {
            let src = el
                .value()
                .attr("src")
                .or_else(|| el.value().attr("data-src"));

            if let Some(src) = src {
                match self.normalize(src) {
                    Ok(url) => return Ok(url),
                    Err(e) => fallback_error = e,
                }
            }
        }

        Err(fallback_error)
    }

    /// Make `raw` absolute against the site origin and drop query/fragment.
    pub fn normalize(&self, raw: &str) -> Result<String, ImageError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ImageError::Empty);
        }
        if is_inline_data(raw) {
            return Err(ImageError::InlineData);
        }

        let mut url = match Url::parse(raw) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                self.origin
                    .join(raw)
                    .map_err(|source| ImageError::InvalidUrl {
                        value: raw.to_string(),
                        source,
                    })?
            }
            Err(source) => {
                return Err(ImageError::InvalidUrl {
                    value: raw.to_string(),
                    source,
                })
            }
        };

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ImageError::UnsupportedScheme(url.scheme().to_string()));
        }

        url.set_query(None);
        url.set_fragment(None);
        Ok(url.to_string())
    }
}

/// URL of the last entry in a `srcset` list, without its descriptor.
pub fn last_srcset_candidate(srcset: &str) -> Option<&str> {
    let srcset = srcset.trim();
    if is_inline_data(srcset) {
        return None;
    }

    srcset
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .last()?
        .split_whitespace()
        .next()
}

fn is_inline_data(value: &str) -> bool {
    value
        .get(..5)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("data:"))
}
