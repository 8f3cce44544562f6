use std::sync::Arc;
use tracing::{error, info};

use crate::config::{Config, Secrets};
use crate::error::RunError;
use crate::scrapers::{build_scrapers, ListingScraper};
use crate::sheets::Sink;
use crate::utils::http::Fetcher;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub source: String,
    pub tab: String,
    pub scraped: usize,
    pub published: usize,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub sources: Vec<SourceReport>,
}

impl RunSummary {
    pub fn scraped(&self) -> usize {
        self.sources.iter().map(|s| s.scraped).sum()
    }

    pub fn published(&self) -> usize {
        self.sources.iter().map(|s| s.published).sum()
    }
}

/// Runs every source once: fetch, extract, then a single overwrite of the
/// source's tab. Nothing is kept between runs.
pub struct Orchestrator {
    config: Arc<Config>,
    scrapers: Vec<Box<dyn ListingScraper>>,
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn Sink>,
}

impl Orchestrator {
    pub fn new(
        config: Arc<Config>,
        scrapers: Vec<Box<dyn ListingScraper>>,
        fetcher: Arc<dyn Fetcher>,
        sink: Arc<dyn Sink>,
    ) -> Self {
        Self {
            config,
            scrapers,
            fetcher,
            sink,
        }
    }

    pub async fn run(&self) -> Result<RunSummary, RunError> {
        let mut summary = RunSummary::default();
        let result = self.run_sources(&mut summary).await;

        info!(
            scraped = summary.scraped(),
            published = summary.published(),
            "Total listings scraped: {}, published: {}",
            summary.scraped(),
            summary.published()
        );

        result.map(|_| summary)
    }

    async fn run_sources(&self, summary: &mut RunSummary) -> Result<(), RunError> {
        for scraper in &self.scrapers {
            let source = scraper.source();
            info!("Processing source: {}", source.name.to_uppercase());

            let rows = scraper
                .scrape(self.fetcher.as_ref())
                .await
                .map_err(|error| RunError::Fetch {
                    source_name: source.name.clone(),
                    error,
                })?;
            info!("Total {} listings scraped: {}", source.name, rows.len());

            let mut report = SourceReport {
                source: source.name.clone(),
                tab: source.tab.clone(),
                scraped: rows.len(),
                published: 0,
            };

            let target = self.config.sheet_target(source);
            match self.sink.publish(&source.header(), &rows, &target).await {
                Ok(published) => {
                    info!("{} listings updated.", source.name);
                    report.published = published;
                    summary.sources.push(report);
                }
                Err(error) => {
                    summary.sources.push(report);
                    return Err(RunError::Sink {
                        source_name: source.name.clone(),
                        error,
                    });
                }
            }
        }

        Ok(())
    }
}

/// Validates credentials, then runs every configured source. Nothing touches
/// the network when a credential is missing.
pub async fn execute<E, B>(
    config: Arc<Config>,
    env: E,
    fetcher: Arc<dyn Fetcher>,
    connect_sink: B,
) -> Result<RunSummary, RunError>
where
    E: Fn(&str) -> Option<String>,
    B: FnOnce(&Secrets) -> Arc<dyn Sink>,
{
    let secrets = Secrets::from_env(&config, env).map_err(|e| {
        error!("Configuration error: {}", e);
        e
    })?;
    let scrapers = build_scrapers(&config, &secrets)?;
    let sink = connect_sink(&secrets);

    Orchestrator::new(config, scrapers, fetcher, sink).run().await
}
