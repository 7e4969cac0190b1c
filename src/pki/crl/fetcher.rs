use std::io::{ErrorKind, Read};
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use tracing::{debug, info};
use url::Url;

use super::errors::FetchError;

/// Default maximum CRL size (10 MiB)
pub const DEFAULT_MAX_CRL_SIZE: usize = 10 * 1024 * 1024;

/// Default total request timeout
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Default TCP connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Retrieves the raw bytes a CRL URI points at.
///
/// Implementations block the calling thread for the duration of the I/O.
pub trait CrlFetcher: Send + Sync {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, FetchError>;
}

impl<T: CrlFetcher + ?Sized> CrlFetcher for std::sync::Arc<T> {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(uri)
    }
}

/// Serves `http`/`https` URIs over the network and `file` URIs from the
/// local filesystem.
#[derive(Debug, Clone)]
pub struct DefaultCrlFetcher {
    client: Client,
    max_size: usize,
}

impl DefaultCrlFetcher {
    /// Returns an error if the HTTP client cannot be initialized
    pub fn new(timeout: Duration, connect_timeout: Duration) -> Result<Self, reqwest::Error> {
        Self::with_max_size(timeout, connect_timeout, DEFAULT_MAX_CRL_SIZE)
    }

    /// Returns an error if the HTTP client cannot be initialized
    pub fn with_max_size(
        timeout: Duration,
        connect_timeout: Duration,
        max_size: usize,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout.min(timeout))
            .build()?;

        Ok(Self { client, max_size })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    fn fetch_http(&self, uri: &str, url: Url) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| classify_http_error(uri, e))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND || status == StatusCode::GONE {
            return Err(FetchError::NotFound {
                uri: uri.to_string(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Unreachable {
                uri: uri.to_string(),
                reason: format!("HTTP error {status}"),
            });
        }

        if response
            .content_length()
            .is_some_and(|len| len > self.max_size as u64)
        {
            return Err(self.too_large(uri));
        }

        // Content-Length may be absent, so the cap is enforced while reading
        let mut body = Vec::new();
        response
            .take(self.max_size as u64 + 1)
            .read_to_end(&mut body)
            .map_err(|e| classify_read_error(uri, e))?;
        if body.len() > self.max_size {
            return Err(self.too_large(uri));
        }

        Ok(body)
    }

    fn fetch_file(&self, uri: &str, url: &Url) -> Result<Vec<u8>, FetchError> {
        let path = url.to_file_path().map_err(|_| FetchError::InvalidUri {
            uri: uri.to_string(),
            reason: "not a local file path".to_string(),
        })?;

        let io_error = |e: std::io::Error| match e.kind() {
            ErrorKind::NotFound => FetchError::NotFound {
                uri: uri.to_string(),
            },
            _ => FetchError::Unreachable {
                uri: uri.to_string(),
                reason: e.to_string(),
            },
        };

        let metadata = std::fs::metadata(&path).map_err(io_error)?;
        if metadata.len() > self.max_size as u64 {
            return Err(self.too_large(uri));
        }

        std::fs::read(&path).map_err(io_error)
    }

    fn too_large(&self, uri: &str) -> FetchError {
        FetchError::TooLarge {
            uri: uri.to_string(),
            limit: self.max_size,
        }
    }
}

impl CrlFetcher for DefaultCrlFetcher {
    fn fetch(&self, uri: &str) -> Result<Vec<u8>, FetchError> {
        let url = Url::parse(uri).map_err(|e| FetchError::InvalidUri {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;

        debug!("Fetching CRL from: {}", uri);

        let bytes = match url.scheme() {
            "http" | "https" => self.fetch_http(uri, url)?,
            "file" => self.fetch_file(uri, &url)?,
            scheme => {
                return Err(FetchError::InvalidUri {
                    uri: uri.to_string(),
                    reason: format!("unsupported scheme '{scheme}'"),
                });
            }
        };

        info!("Fetched {} bytes of CRL data from {}", bytes.len(), uri);
        Ok(bytes)
    }
}

fn classify_http_error(uri: &str, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            uri: uri.to_string(),
        }
    } else {
        FetchError::Unreachable {
            uri: uri.to_string(),
            reason: error.to_string(),
        }
    }
}

fn classify_read_error(uri: &str, error: std::io::Error) -> FetchError {
    let timed_out = error.kind() == ErrorKind::TimedOut
        || error
            .get_ref()
            .and_then(|inner| inner.downcast_ref::<reqwest::Error>())
            .is_some_and(reqwest::Error::is_timeout);

    if timed_out {
        FetchError::Timeout {
            uri: uri.to_string(),
        }
    } else {
        FetchError::Unreachable {
            uri: uri.to_string(),
            reason: error.to_string(),
        }
    }
}
