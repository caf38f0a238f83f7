use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The upstream answered with a non-2xx status.
    #[error("{url} returned HTTP {status}")]
    Status { status: u16, url: String },

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// The upstream succeeded but returned no usable text.
    #[error("no content returned for {0}")]
    EmptyContent(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
