/// Top-level error type for the fallible, non-resolution parts of the API
/// (configuration, registry construction, recommendation parsing).
///
/// Cover resolution itself never returns an error; see [`crate::resolve`].
#[derive(Debug, thiserror::Error)]
pub enum CoverError {
    #[error("Provider lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Recommendation error: {0}")]
    Recommend(#[from] RecommendError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a provider's own candidate-building step (search request).
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Provider {provider} answered HTTP {status}")]
    Status { provider: String, status: u16 },

    #[error("Provider {provider} returned error: {message}")]
    ProviderError { provider: String, message: String },

    #[error("No results found for query")]
    NotFound,

    #[error("Rate limited by {provider}, retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },
}

/// Why a single candidate URL was rejected by the bounded probe.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("Resource is {size} bytes, exceeding limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("Could not decode image: {0}")]
    Decode(String),

    #[error("Image is {width}x{height}, below the usable threshold")]
    TooSmall { width: u32, height: u32 },

    #[error("No response within {ms}ms")]
    Timeout { ms: u64 },
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unknown key: {0}")]
    UnknownKey(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid JSON path '{path}' for provider {provider}: {message}")]
    InvalidJsonPath {
        provider: String,
        path: String,
        message: String,
    },

    #[error("Could not build HTTP client: {0}")]
    HttpClient(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum RecommendError {
    #[error("Malformed recommendation payload: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Book '{title}' has no usable ISBN")]
    InvalidIsbn { title: String },
}
