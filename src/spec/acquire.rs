//! Spec acquisition over HTTP
//!
//! Probes a fixed list of well-known spec paths under a base URL, decoding
//! the first JSON (or YAML) document that answers. When direct probing fails,
//! an optional [`SpecScraper`] collaborator is asked to pull the spec out of
//! a rendered documentation UI instead.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::{Endpoint, SpecExtractor};
use crate::error::QuiverError;

/// Well-known locations of OpenAPI documents, probed in order.
const SPEC_PROBE_PATHS: [&str; 6] = [
    "",
    "/openapi.json",
    "/swagger.json",
    "/api-docs",
    "/api-docs.json",
    "/swagger/v1/swagger.json",
];

/// Timeout for one probe request
const PROBE_TIMEOUT: Duration = Duration::from_secs(30);

/// Browser-automation collaborator that renders a documentation page and
/// extracts the parsed spec object from its client-side store.
///
/// Opaque from the acquirer's perspective: it either produces a document
/// or it does not.
#[async_trait]
pub trait SpecScraper: Send + Sync {
    async fn scrape(&self, url: &str) -> anyhow::Result<Option<Value>>;
}

/// Acquires endpoint records from a base URL.
///
/// One acquirer holds one HTTP client; the client is scoped to the acquirer
/// and dropped with it regardless of how acquisition ends.
pub struct SpecAcquirer {
    client: reqwest::Client,
    scraper: Option<Box<dyn SpecScraper>>,
}

impl SpecAcquirer {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .connect_timeout(Duration::from_secs(10))
            .user_agent("quiver/0.1")
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            scraper: None,
        }
    }

    /// Attach a scraping fallback for documentation-UI-only deployments.
    pub fn with_scraper(mut self, scraper: Box<dyn SpecScraper>) -> Self {
        self.scraper = Some(scraper);
        self
    }

    /// Acquire endpoints for `base_url`.
    ///
    /// Tries direct spec access first (unless disabled), then the scraping
    /// fallback. Fails with [`QuiverError::SpecUnavailable`] only after both
    /// paths are exhausted.
    #[instrument(skip(self, endpoint_filter))]
    pub async fn acquire(
        &self,
        base_url: &str,
        endpoint_filter: Option<&[String]>,
        try_direct: bool,
    ) -> Result<Vec<Endpoint>, QuiverError> {
        if try_direct {
            if let Some(document) = self.try_direct_spec_access(base_url).await {
                info!("Direct access successful, reading the JSON/YAML spec");
                return Ok(SpecExtractor::new(document).extract_filtered(endpoint_filter));
            }
            info!("Direct access failed, trying scraping");
        }

        if let Some(scraper) = &self.scraper {
            match scraper.scrape(base_url).await {
                Ok(Some(document)) => {
                    info!("Scraping produced a spec document");
                    return Ok(SpecExtractor::new(document).extract_filtered(endpoint_filter));
                }
                Ok(None) => debug!("Scraper returned no spec object"),
                Err(err) => warn!(error = %err, "Scraping fallback failed"),
            }
        }

        Err(QuiverError::SpecUnavailable {
            url: base_url.to_string(),
        })
    }

    /// Probe the well-known spec paths, returning the first document that
    /// decodes. Network errors, non-200 statuses, and non-JSON content types
    /// skip to the next candidate.
    async fn try_direct_spec_access(&self, base_url: &str) -> Option<Value> {
        let base = base_url.trim_end_matches('/');

        for path in SPEC_PROBE_PATHS {
            let full_url = format!("{base}{path}");

            let response = match self.client.get(&full_url).send().await {
                Ok(response) => response,
                Err(err) => {
                    warn!(url = %full_url, error = %err, "Error fetching candidate path");
                    continue;
                }
            };

            let status = response.status();
            if status != reqwest::StatusCode::OK {
                warn!(url = %full_url, %status, "Received non-200 status code");
                continue;
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            if !content_type.starts_with("application/json") {
                debug!(url = %full_url, content_type, "Content type is not application/json");
                continue;
            }

            let text = match response.text().await {
                Ok(text) => text,
                Err(err) => {
                    warn!(url = %full_url, error = %err, "Failed to read response body");
                    continue;
                }
            };

            match serde_json::from_str::<Value>(&text) {
                Ok(document) => {
                    debug!(url = %full_url, "Parsed JSON spec");
                    return Some(document);
                }
                Err(_) => {
                    // Any text decodes as a YAML scalar, so only mappings
                    // count as a successful YAML fallback.
                    match serde_yaml::from_str::<Value>(&text) {
                        Ok(document @ Value::Object(_)) => {
                            debug!(url = %full_url, "Parsed YAML spec");
                            return Some(document);
                        }
                        Ok(_) | Err(_) => {
                            warn!(url = %full_url, "Body is neither a JSON nor a YAML spec");
                            continue;
                        }
                    }
                }
            }
        }
        None
    }
}

impl Default for SpecAcquirer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FixedScraper(Option<Value>);

    #[async_trait]
    impl SpecScraper for FixedScraper {
        async fn scrape(&self, _url: &str) -> anyhow::Result<Option<Value>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn scraper_fallback_extracts_endpoints() {
        let spec = json!({"paths": {"/pets": {"get": {}}}});
        let acquirer = SpecAcquirer::new().with_scraper(Box::new(FixedScraper(Some(spec))));

        let endpoints = acquirer
            .acquire("http://docs.example", None, false)
            .await
            .unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].method, "GET");
    }

    #[tokio::test]
    async fn empty_scrape_is_spec_unavailable() {
        let acquirer = SpecAcquirer::new().with_scraper(Box::new(FixedScraper(None)));
        let err = acquirer
            .acquire("http://docs.example", None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, QuiverError::SpecUnavailable { .. }));
    }

    #[tokio::test]
    async fn no_scraper_and_direct_disabled_is_spec_unavailable() {
        let acquirer = SpecAcquirer::new();
        let err = acquirer
            .acquire("http://docs.example", None, false)
            .await
            .unwrap_err();
        assert!(matches!(err, QuiverError::SpecUnavailable { .. }));
    }
}
