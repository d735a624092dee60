//! HTTP client for rent.591.com.tw.

use crate::error::{Result, SourceError};
use crate::extract::extract_listing;
use crate::search::{discover_ids, search_url};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, StatusCode};
use rentscout_core::{
    District, FetchError, ListingFields, ListingId, ListingSource, SearchConfig, SourceConfig,
};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

/// Map an HTTP status to a fetch outcome. `None` means success.
#[must_use]
pub fn classify_status(status: StatusCode) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }
    Some(match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => {
            FetchError::NotFound(format!("HTTP {}", status.as_u16()))
        }
        _ => FetchError::Transient(format!("HTTP {}", status.as_u16())),
    })
}

fn classify_error(error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Transient(format!("timeout: {error}"))
    } else {
        FetchError::Transient(error.to_string())
    }
}

/// Listing source backed by the public 591 rental site.
#[derive(Debug, Clone)]
pub struct Rent591Source {
    client: Client,
    base_url: String,
}

impl Rent591Source {
    /// Build the HTTP client from source settings.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-TW,zh;q=0.9,en-US;q=0.8,en;q=0.7"),
        );

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SourceError::Client(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_html(&self, url: &str) -> std::result::Result<String, FetchError> {
        debug!(url = %url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_error(&e))?;

        if let Some(err) = classify_status(response.status()) {
            return Err(err);
        }
        response.text().await.map_err(|e| classify_error(&e))
    }
}

#[async_trait]
impl ListingSource for Rent591Source {
    async fn search(
        &self,
        district: &District,
        filters: &SearchConfig,
    ) -> std::result::Result<Vec<ListingId>, FetchError> {
        let mut seen = HashSet::new();
        let mut all = Vec::new();

        for page in 1..=filters.max_pages.max(1) {
            if page > 1 && filters.page_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(filters.page_delay_ms)).await;
            }

            let url = search_url(&self.base_url, district, filters, page);
            let html = match self.get_html(&url).await {
                Ok(html) => html,
                // Paging past the last result page
                Err(FetchError::NotFound(_)) if page > 1 => break,
                Err(e) => return Err(e),
            };

            let page_ids = discover_ids(&html);
            let before = all.len();
            for id in page_ids {
                if seen.insert(id.clone()) {
                    all.push(id);
                }
            }
            let new = all.len() - before;
            debug!(district = district.name, page, new, total = all.len(), "Search page");
            if new == 0 {
                break;
            }
        }

        info!(district = district.name, found = all.len(), "Search finished");
        Ok(all)
    }

    async fn fetch(&self, id: &ListingId) -> std::result::Result<ListingFields, FetchError> {
        let url = self.listing_url(id);
        let html = self.get_html(&url).await?;
        let mut fields = extract_listing(&html)?;
        fields.url = Some(url);
        Ok(fields)
    }

    fn listing_url(&self, id: &ListingId) -> String {
        format!("{}/{}", self.base_url, id)
    }
}
