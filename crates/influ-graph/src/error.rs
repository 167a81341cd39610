use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    /// Network, TLS, or timeout failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response. `message` carries the Graph `error.message` when the
    /// body contained one.
    #[error("unexpected HTTP status {status} from {url}: {message}")]
    UnexpectedStatus {
        status: u16,
        url: String,
        message: String,
    },

    /// The body was not valid JSON or did not have the expected envelope.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The response parsed but a required field or insight was absent or empty.
    #[error("required data missing from {context}")]
    MissingData { context: String },

    #[error("pagination limit reached: exceeded {max_pages} pages")]
    PaginationLimit { max_pages: usize },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl GraphError {
    /// `true` for failures of the transport itself (network, timeout, non-2xx).
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, GraphError::Http(_) | GraphError::UnexpectedStatus { .. })
    }
}
