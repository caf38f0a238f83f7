use thiserror::Error;

/// Errors returned by a structured-generation backend.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("backend returned {status}: {body}")]
    Api { status: u16, body: String },

    /// The backend answered but produced no content.
    #[error("backend returned no content")]
    EmptyResponse,

    /// The content was not JSON or did not match the requested schema.
    #[error("malformed output for {context}: {source}")]
    Malformed {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// No backend is configured or it refused the request outright.
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}
