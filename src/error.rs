use thiserror::Error;

/// Failures at the edges of the crate: reading input, decoding tree lists,
/// talking to the trees API. Location parsing itself never fails.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid tree list: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },
}
