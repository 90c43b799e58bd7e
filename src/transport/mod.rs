pub mod http;
pub mod replay;
pub mod wire;

use thiserror::Error;

pub use http::HttpTransport;
pub use replay::ReplayTransport;
pub use wire::{AjaxRequest, AjaxResponse, ProgressReport, ResponseBody, SubmissionMode};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("response from {url} is not valid JSON: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("could not read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no recorded response left for {url}")]
    Exhausted { url: String },

    #[error("transport worker for {url} panicked")]
    WorkerPanicked { url: String },
}

/// Carries requests to the server. Implementations block until the
/// response is complete; the lifecycle never holds page state across the
/// call.
pub trait Transport {
    fn send(&self, request: &AjaxRequest) -> Result<AjaxResponse, TransportError>;

    fn poll_progress(&self, url: &str, method: &str) -> Result<ProgressReport, TransportError>;
}
