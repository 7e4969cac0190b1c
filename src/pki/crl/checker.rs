use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::RevocationConfig;
use crate::pki::certificate::RevocableCertificate;

use super::cache::CrlCache;
use super::errors::{CrlError, CrlResult};
use super::fetcher::{CrlFetcher, DefaultCrlFetcher};
use super::parser::parse_crl;
use super::resolver::{NameResolver, PrefixRedirectResolver};
use super::types::{CachedCrl, RevokedEntry, SerialNumber};

/// Detailed outcome of a revocation check, before it is reduced to a
/// boolean verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevocationStatus {
    /// The CRL fetched from `uri` lists the certificate.
    Revoked {
        uri: String,
        serial: SerialNumber,
        entry: RevokedEntry,
    },
    /// At least one CRL was consulted and none listed the certificate.
    /// `failures` holds the distribution points that could not be loaded.
    NotRevoked {
        consulted: Vec<String>,
        failures: Vec<CrlError>,
    },
    /// The certificate carries no CRL distribution points.
    NoDistributionPoints,
    /// Every distribution point failed to load.
    Undetermined { failures: Vec<CrlError> },
}

impl RevocationStatus {
    /// Fail-open verdict: only an actual CRL listing counts as revoked.
    pub fn is_revoked(&self) -> bool {
        matches!(self, Self::Revoked { .. })
    }
}

/// Checks certificates against the CRLs named by their distribution points.
///
/// Resolution, fetching and caching are pluggable; the cache is shared
/// between clones of the checker.
#[derive(Clone)]
pub struct RevocationChecker {
    resolver: Arc<dyn NameResolver>,
    fetcher: Arc<dyn CrlFetcher>,
    cache: Arc<CrlCache>,
}

impl RevocationChecker {
    pub fn new(
        resolver: impl NameResolver + 'static,
        fetcher: impl CrlFetcher + 'static,
        cache: Arc<CrlCache>,
    ) -> Self {
        Self {
            resolver: Arc::new(resolver),
            fetcher: Arc::new(fetcher),
            cache,
        }
    }

    /// Build a checker backed by the process-wide cache.
    ///
    /// A dedicated cache is created instead when the configuration asks for
    /// an expiry policy other than the shared cache's.
    ///
    /// Returns an error if the HTTP client cannot be initialized
    pub fn from_config(config: &RevocationConfig) -> Result<Self, reqwest::Error> {
        let fetcher = DefaultCrlFetcher::with_max_size(
            Duration::from_secs(config.fetch_timeout_secs),
            Duration::from_secs(config.connect_timeout_secs),
            config.max_crl_size,
        )?;
        let resolver = PrefixRedirectResolver::new(config.redirects.iter().cloned());

        let shared = CrlCache::shared();
        let cache = if shared.expiry() == config.expiry {
            shared
        } else {
            Arc::new(CrlCache::with_expiry(config.expiry))
        };

        Ok(Self::new(resolver, fetcher, cache))
    }

    pub fn with_resolver(mut self, resolver: impl NameResolver + 'static) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    pub fn with_fetcher(mut self, fetcher: impl CrlFetcher + 'static) -> Self {
        self.fetcher = Arc::new(fetcher);
        self
    }

    pub fn with_cache(mut self, cache: Arc<CrlCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &Arc<CrlCache> {
        &self.cache
    }

    /// Whether `certificate` is listed as revoked by any of its CRLs.
    ///
    /// Fail-open: an absent certificate, a certificate without distribution
    /// points, and unreachable or malformed CRLs all yield `false`.
    pub fn is_revoked<C>(&self, certificate: Option<&C>) -> bool
    where
        C: RevocableCertificate + ?Sized,
    {
        let Some(certificate) = certificate else {
            return false;
        };

        match self.revocation_status(certificate) {
            RevocationStatus::Revoked { .. } => true,
            RevocationStatus::NotRevoked { .. } => false,
            RevocationStatus::NoDistributionPoints => {
                debug!("No CRL distribution points, treating certificate as not revoked");
                false
            }
            RevocationStatus::Undetermined { failures } => {
                warn!(
                    "Revocation status undetermined ({} distribution points failed), treating certificate as not revoked",
                    failures.len()
                );
                false
            }
        }
    }

    /// Walk the distribution points in extension order and report the
    /// first CRL that lists the certificate.
    pub fn revocation_status<C>(&self, certificate: &C) -> RevocationStatus
    where
        C: RevocableCertificate + ?Sized,
    {
        let names = match certificate.crl_distribution_points() {
            Some(names) if !names.is_empty() => names,
            _ => return RevocationStatus::NoDistributionPoints,
        };

        let serial = certificate.serial_number();
        let mut consulted = Vec::new();
        let mut failures = Vec::new();

        for name in &names {
            let uri = self.resolver.resolve(name);

            match self.load(&uri) {
                Ok(crl) => {
                    if let Some(entry) = crl.revocation_entry(&serial) {
                        info!(
                            "Certificate with serial {} issued by {} is revoked according to {}",
                            serial,
                            certificate.issuer(),
                            uri
                        );
                        return RevocationStatus::Revoked {
                            uri,
                            serial,
                            entry: entry.clone(),
                        };
                    }
                    debug!("Certificate {} not found in CRL from {}", serial, uri);
                    consulted.push(uri);
                }
                Err(e) => {
                    warn!("Skipping CRL distribution point {}: {}", name, e);
                    failures.push(e);
                }
            }
        }

        if consulted.is_empty() {
            RevocationStatus::Undetermined { failures }
        } else {
            RevocationStatus::NotRevoked {
                consulted,
                failures,
            }
        }
    }

    fn load(&self, uri: &str) -> CrlResult<Arc<CachedCrl>> {
        self.cache.get_or_load(uri, || {
            let bytes = self.fetcher.fetch(uri)?;
            Ok(parse_crl(uri, &bytes)?)
        })
    }
}

impl fmt::Debug for RevocationChecker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevocationChecker")
            .field("resolver", &"[OPAQUE]")
            .field("fetcher", &"[OPAQUE]")
            .field("cache", &self.cache)
            .finish()
    }
}
