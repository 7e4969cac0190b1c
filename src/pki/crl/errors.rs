use thiserror::Error;

/// Failure to retrieve the raw bytes behind a distribution point URI.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("CRL not found at {uri}")]
    NotFound { uri: String },

    #[error("CRL distribution point {uri} is unreachable: {reason}")]
    Unreachable { uri: String, reason: String },

    #[error("Timeout while fetching CRL from {uri}")]
    Timeout { uri: String },

    #[error("Invalid CRL URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("CRL from {uri} exceeds the size limit of {limit} bytes")]
    TooLarge { uri: String, limit: usize },
}

impl FetchError {
    pub fn uri(&self) -> &str {
        match self {
            Self::NotFound { uri }
            | Self::Unreachable { uri, .. }
            | Self::Timeout { uri }
            | Self::InvalidUri { uri, .. }
            | Self::TooLarge { uri, .. } => uri,
        }
    }
}

/// Failure to decode fetched bytes into a CRL.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed CRL from {uri}: {reason}")]
    Malformed { uri: String, reason: String },
}

/// Outcome of a failed fetch-then-parse, as stored in the cache.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CrlError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Convenient Result type alias
pub type CrlResult<T> = Result<T, CrlError>;
