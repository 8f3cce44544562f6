use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

mod config;
mod error;
mod models;
mod orchestrator;
mod parsers;
mod scrapers;
mod sheets;
mod utils;

use crate::config::Config;
use crate::sheets::auth::{scopes_for, ServiceAccountTokens};
use crate::sheets::{GoogleSheets, SheetSink, Sink};
use crate::utils::http::{create_client, HttpFetcher};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("listing_sync=info".parse()?),
        )
        .init();

    info!("Starting Listing Sync");

    let config = Arc::new(Config::load());

    // One pooled client for page fetches, token exchange and sheet writes
    let client = create_client(
        &config.user_agent,
        Duration::from_secs(config.request_timeout_secs),
    )?;
    let fetcher = Arc::new(HttpFetcher::new(client.clone()));

    let scopes = scopes_for(&config.spreadsheet);
    let result = orchestrator::execute(
        config.clone(),
        |key: &str| std::env::var(key).ok(),
        fetcher,
        move |secrets| -> Arc<dyn Sink> {
            let tokens = ServiceAccountTokens::new(
                client.clone(),
                secrets.service_account.clone(),
                scopes,
            );
            Arc::new(SheetSink::new(GoogleSheets::new(client, tokens)))
        },
    )
    .await;

    match result {
        Ok(summary) => {
            for report in &summary.sources {
                info!(
                    "{}: {} scraped, {} written to '{}'",
                    report.source, report.scraped, report.published, report.tab
                );
            }
            info!(
                "Done! {} listings written across {} tabs.",
                summary.published(),
                summary.sources.len()
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("Run failed: {}", e);
            Ok(e.exit_code())
        }
    }
}
