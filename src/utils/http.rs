use async_trait::async_trait;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::{info, warn};

use crate::error::TransportError;

pub fn create_client(user_agent: &str, timeout: Duration) -> Result<Client, reqwest::Error> {
    ClientBuilder::new()
        .user_agent(user_agent)
        .timeout(timeout)
        .pool_max_idle_per_host(6)
        .build()
}

#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: String,
    pub params: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl FetchRequest {
    pub fn get(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            params: Vec::new(),
            headers: Vec::new(),
            timeout,
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }
}

/// Status and body exactly as the server sent them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

impl FetchResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// One GET per call. Retrying and status interpretation belong to the caller.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, TransportError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, TransportError> {
        if request.timeout.is_zero() {
            return Err(TransportError::ZeroTimeout {
                url: request.url.clone(),
            });
        }

        let mut builder = self
            .client
            .get(&request.url)
            .query(&request.params)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        // query params are left out of the log line: they may carry API keys
        let response = builder.send().await.map_err(|source| {
            warn!(target_url = %request.url, error = %source, "Request failed");
            TransportError::Request {
                url: request.url.clone(),
                source,
            }
        })?;

        let status = response.status().as_u16();
        info!(target_url = %request.url, status, "Fetched");

        let body = response
            .text()
            .await
            .map_err(|source| TransportError::Request {
                url: request.url.clone(),
                source,
            })?;

        Ok(FetchResponse { status, body })
    }
}
