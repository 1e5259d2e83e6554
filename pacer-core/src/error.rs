use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No target URLs provided")]
    NoUrls,

    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported scheme `{scheme}` in {url} (only plain http is supported)")]
    UnsupportedScheme { url: String, scheme: String },

    #[error("URL has no host: {url}")]
    MissingHost { url: String },

    #[error("Connection rate must be within (0, {}] req/s, got {0}", crate::MAX_RATE)]
    InvalidRate(f64),

    #[error("Run duration must be greater than zero")]
    InvalidDuration,

    #[error("Attempt timeout must be greater than zero")]
    InvalidAttemptTimeout,

    #[error("In-flight cap must be at least 1")]
    InvalidMaxInFlight,
}
