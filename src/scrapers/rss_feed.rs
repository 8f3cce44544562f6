use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::{FeedConfig, SourceConfig};
use crate::error::FailoverError;
use crate::models::ListingRow;
use crate::parsers::{extract_feed, has_entries, parse_entries};
use crate::scrapers::ListingScraper;
use crate::utils::http::Fetcher;
use crate::utils::proxy::fetch_via_proxies;

/// An RSS listing feed that blocks direct access often enough to need a
/// list of fallback proxies.
pub struct FeedScraper {
    source: SourceConfig,
    feed: FeedConfig,
}

impl FeedScraper {
    pub fn new(source: SourceConfig, feed: FeedConfig) -> Self {
        Self { source, feed }
    }
}

#[async_trait]
impl ListingScraper for FeedScraper {
    async fn scrape(&self, fetcher: &dyn Fetcher) -> Result<Vec<ListingRow>, FailoverError> {
        info!("Fetching {} listings...", self.source.name);

        let body = fetch_via_proxies(
            fetcher,
            &self.feed.feed_url,
            &self.feed.proxy_templates,
            &self.source.headers,
            self.source.timeout(),
            has_entries,
        )
        .await?;

        let entries = parse_entries(&body).unwrap_or_else(|e| {
            warn!(error = %e, "Feed stopped parsing after it was accepted");
            Vec::new()
        });
        let rows = extract_feed(&entries);
        info!("Fetched {} listings.", rows.len());

        Ok(rows)
    }

    fn source(&self) -> &SourceConfig {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, SourceKind};
    use crate::parsers::feed::tests::{EMPTY_RSS, THREE_ITEM_RSS};
    use crate::utils::http::testing::{Scripted, ScriptedFetcher};
    use crate::utils::proxy::proxied_url;

    fn scraper(templates: &[&str]) -> FeedScraper {
        let source = Config::load()
            .sources
            .into_iter()
            .find(|s| matches!(s.kind, SourceKind::Feed(_)))
            .unwrap();
        let mut feed = match &source.kind {
            SourceKind::Feed(f) => f.clone(),
            _ => unreachable!(),
        };
        feed.proxy_templates = templates.iter().map(|t| t.to_string()).collect();
        FeedScraper::new(source, feed)
    }

    const FEED_URL: &str = "https://www.bizbuysell.com/rss/listings/";

    #[tokio::test]
    async fn empty_feed_falls_through_to_next_proxy() {
        let mirror = "https://mirror.example/?u={url}";
        let fetcher = ScriptedFetcher::new()
            .on(FEED_URL, Scripted::Respond(200, EMPTY_RSS.to_string()))
            .on(&proxied_url(mirror, FEED_URL), Scripted::Respond(200, THREE_ITEM_RSS.to_string()));

        let rows = scraper(&["{raw_url}", mirror]).scrape(&fetcher).await.unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(fetcher.requests().len(), 2);
        assert_eq!(
            fetcher.requests()[0].headers,
            vec![(
                "Accept".to_string(),
                "application/rss+xml, application/xml;q=0.9, */*;q=0.8".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn blocked_everywhere_is_an_error() {
        let fetcher = ScriptedFetcher::new().on(FEED_URL, Scripted::Respond(403, "Forbidden".to_string()));

        let err = scraper(&["{raw_url}", "https://mirror.example/?u={url}"])
            .scrape(&fetcher)
            .await
            .unwrap_err();

        let FailoverError::AllProxiesFailed { attempts, .. } = err else {
            panic!("expected proxy exhaustion");
        };
        assert_eq!(attempts, 2);
    }
}
