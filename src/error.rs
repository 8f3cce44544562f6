use std::process::ExitCode;
use thiserror::Error;

/// Missing or unusable settings detected before any network call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is missing")]
    MissingEnv(&'static str),

    #[error("{var} does not hold a usable service account key: {source}")]
    InvalidCredentials {
        var: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// A request that never produced a usable HTTP response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    #[error("request timeout for {url} must be greater than zero")]
    ZeroTimeout { url: String },
}

/// Every alternative a source had was tried and none produced content.
#[derive(Debug, Error)]
pub enum FailoverError {
    #[error("all {attempts} proxies failed for {target}, last: {last}")]
    AllProxiesFailed {
        target: String,
        attempts: usize,
        last: String,
    },

    #[error("all {pages} pages of {target} failed, last: {last}")]
    AllPagesFailed {
        target: String,
        pages: u32,
        #[source]
        last: TransportError,
    },
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("spreadsheet {0} not found")]
    SpreadsheetNotFound(String),

    #[error("tab '{tab}' not found in spreadsheet {spreadsheet}")]
    TabNotFound { spreadsheet: String, tab: String },

    #[error("write rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("sheets request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Fatal outcome of a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("source {source_name}: {error}")]
    Fetch {
        source_name: String,
        #[source]
        error: FailoverError,
    },

    #[error("source {source_name}: {error}")]
    Sink {
        source_name: String,
        #[source]
        error: SinkError,
    },
}

impl RunError {
    pub fn code(&self) -> u8 {
        match self {
            RunError::Config(_) => 2,
            RunError::Fetch { .. } => 3,
            RunError::Sink { .. } => 4,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }
}
