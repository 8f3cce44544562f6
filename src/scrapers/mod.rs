use async_trait::async_trait;

use crate::config::{Config, Secrets, SourceConfig, SourceKind};
use crate::error::{ConfigError, FailoverError};
use crate::models::ListingRow;
use crate::utils::http::Fetcher;

mod marketplace;
mod rss_feed;

pub use marketplace::MarketplaceScraper;
pub use rss_feed::FeedScraper;

#[async_trait]
pub trait ListingScraper: Send + Sync {
    /// Fetches and extracts every configured page. Individual page failures
    /// are logged and skipped; only an exhausted source is an error.
    async fn scrape(&self, fetcher: &dyn Fetcher) -> Result<Vec<ListingRow>, FailoverError>;
    fn source(&self) -> &SourceConfig;
}

pub fn build_scrapers(
    config: &Config,
    secrets: &Secrets,
) -> Result<Vec<Box<dyn ListingScraper>>, ConfigError> {
    let mut scrapers: Vec<Box<dyn ListingScraper>> = Vec::new();

    for source in &config.sources {
        match &source.kind {
            SourceKind::Marketplace(market) => {
                let api_key = secrets
                    .scraper_api_key
                    .clone()
                    .ok_or(ConfigError::MissingEnv(crate::config::SCRAPER_API_KEY_ENV))?;
                scrapers.push(Box::new(MarketplaceScraper::new(
                    source.clone(),
                    market.clone(),
                    api_key,
                )));
            }
            SourceKind::Feed(feed) => {
                scrapers.push(Box::new(FeedScraper::new(source.clone(), feed.clone())));
            }
        }
    }

    Ok(scrapers)
}
