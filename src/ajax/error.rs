use thiserror::Error;

use crate::transport::TransportError;

#[derive(Debug, Error)]
pub enum AjaxError {
    /// The callback URL is neither on the trusted list nor local to the page.
    #[error("The callback URL is not local and not trusted: {url}")]
    UntrustedUrl { url: String },

    /// Dialog options were supplied but are not a JSON object.
    #[error("An error occurred while attempting to process {url}: {message}")]
    InvalidDialogOptions { url: String, message: String },

    /// The transport failed (network error, timeout, non-2xx status).
    #[error("transport error for {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: TransportError,
    },

    /// The response lacked the verification header.
    #[error("{message} ({url})")]
    Verification { url: String, message: String },

    /// The response body was not a valid command list.
    #[error("could not parse response from {url}: {source}")]
    ResponseParse {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no AJAX descriptor registered as '{0}'")]
    UnknownDescriptor(String),

    #[error("element '{0}' is not part of this page")]
    UnknownElement(String),
}
