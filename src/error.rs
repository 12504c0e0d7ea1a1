//! Error types for each stage of the load pipeline.

/// Errors raised while fetching a value from a key-value store.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    HttpRequestFailed(String),
    #[error("HTTP status {status} for key {key}")]
    HttpStatus { key: String, status: u16 },
    #[error("key not found: {0}")]
    KeyNotFound(String),
    #[error("Request timed out")]
    Timeout,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("all {0} store nodes failed")]
    AllNodesFailed(usize),
}

/// Errors raised while turning raw bytes into a config document.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unsupported config data type {0}")]
    UnsupportedFormat(String),
    #[error("JSON decode error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML decode error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("{0}")]
    Custom(String),
}

/// Errors raised while parsing a path template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    #[error("unclosed tag at byte {0}")]
    Unclosed(usize),
    #[error("unknown template variable {0:?}")]
    UnknownVariable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ReaderError {
    #[error("invalid path template: {0}")]
    Template(#[from] TemplateError),
    #[error("fetch failed for key {key}: {source}")]
    Fetch {
        key: String,
        #[source]
        source: FetchError,
    },
    #[error("decode failed for key {key}: {source}")]
    Decode {
        key: String,
        #[source]
        source: DecodeError,
    },
    #[error("failed to build store client: {0}")]
    Store(String),
    #[error("no configuration has been read yet")]
    NotLoaded,
}

/// Errors returned by a single translator for a field that is present but
/// cannot be turned into an option.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TranslateError {
    #[error("invalid duration for {field} ({value:?}): {reason}")]
    InvalidDuration {
        field: String,
        value: String,
        reason: String,
    },
    #[error("unknown protocol: {0}")]
    UnknownProtocol(String),
    #[error("unsupported connection method: {0}")]
    UnsupportedConnectionMethod(String),
    #[error("unknown stats level: {0}")]
    UnknownStatsLevel(i32),
    #[error("unknown backoff type: {0}")]
    UnknownBackOffType(String),
    #[error("unknown backoff config key: {0}")]
    UnknownBackOffCfgKey(String),
    #[error("invalid retry policy: {0}")]
    InvalidRetryPolicy(String),
    #[error("unknown network: {0}")]
    UnknownNetwork(String),
    #[error("cannot resolve {network} address {address}: {reason}")]
    UnresolvableAddress {
        network: String,
        address: String,
        reason: String,
    },
    #[error("{0}")]
    Custom(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Reader(#[from] ReaderError),
    #[error("options have not been loaded yet")]
    NotLoaded,
}
