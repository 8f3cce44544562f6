use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::config::{MarketplaceConfig, SourceConfig};
use crate::error::{FailoverError, TransportError};
use crate::models::ListingRow;
use crate::parsers::{extract_html, ListingLayout};
use crate::scrapers::ListingScraper;
use crate::utils::http::{FetchRequest, Fetcher};

/// Search-result pages fetched through a forwarding service that renders
/// them in a headless browser.
pub struct MarketplaceScraper {
    source: SourceConfig,
    market: MarketplaceConfig,
    api_key: String,
}

impl MarketplaceScraper {
    pub fn new(source: SourceConfig, market: MarketplaceConfig, api_key: String) -> Self {
        Self {
            source,
            market,
            api_key,
        }
    }

    fn layout(&self) -> ListingLayout {
        ListingLayout {
            base_domain: self.market.base_domain.clone(),
            path_prefix: self.market.path_prefix.clone(),
        }
    }

    fn page_request(&self, page: u32) -> FetchRequest {
        let target = format!("{}?page={}", self.market.search_url, page);
        let mut request = FetchRequest::get(&self.market.forward_endpoint, self.source.timeout())
            .param("api_key", &self.api_key)
            .param("url", target);
        if self.market.render {
            request = request.param("render", "true");
        }
        request.headers = self.source.headers.clone();
        request
    }

    async fn scrape_page(&self, fetcher: &dyn Fetcher, page: u32) -> Result<Vec<ListingRow>, TransportError> {
        let request = self.page_request(page);
        let response = fetcher.fetch(&request).await?;
        info!(page, status = response.status, "Fetched {} page {}", self.source.name, page);

        if !response.is_ok() {
            return Err(TransportError::Status {
                status: response.status,
                url: format!("{}?page={}", self.market.search_url, page),
            });
        }

        let rows = extract_html(&response.body, &self.layout());
        info!("Found {} listing anchors on page {}.", rows.len(), page);
        for row in &rows {
            debug!(title = row.title(), "Listing");
        }
        Ok(rows)
    }
}

#[async_trait]
impl ListingScraper for MarketplaceScraper {
    async fn scrape(&self, fetcher: &dyn Fetcher) -> Result<Vec<ListingRow>, FailoverError> {
        let mut rows = Vec::new();
        let mut fetched = 0;
        let mut last_error = None;

        for page in 1..=self.market.pages {
            info!("Fetching {} page {} via forwarding service...", self.source.name, page);
            match self.scrape_page(fetcher, page).await {
                Ok(page_rows) => {
                    fetched += 1;
                    rows.extend(page_rows);
                }
                Err(e) => {
                    error!(page, "Skipping {} page {}: {}", self.source.name, page, e);
                    last_error = Some(e);
                }
            }
        }

        // a page that loaded but held no listings still counts as fetched
        match last_error {
            Some(last) if fetched == 0 => Err(FailoverError::AllPagesFailed {
                target: self.market.search_url.clone(),
                pages: self.market.pages,
                last,
            }),
            _ => Ok(rows),
        }
    }

    fn source(&self) -> &SourceConfig {
        &self.source
    }
}
