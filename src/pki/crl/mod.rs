//! Certificate Revocation List (CRL) checking
//!
//! Determines whether a certificate has been revoked by its issuer, using
//! the CRLs named in the certificate's CRL Distribution Points extension.
//!
//! # Features
//! - Pluggable resolution of distribution point names to fetchable URIs
//! - CRL fetching over HTTP(S) or from local files, with a bounded timeout
//! - Parsing DER or PEM CRLs into immutable records
//! - Memoized per-URI outcomes, computed at most once even under contention
//! - A fail-open checking façade

mod cache;
mod checker;
mod errors;
mod fetcher;
mod parser;
mod resolver;
mod types;

// Re-export public types
pub use cache::{CrlCache, ExpiryPolicy};
pub use checker::{RevocationChecker, RevocationStatus};
pub use errors::{CrlError, CrlResult, FetchError, ParseError};
pub use fetcher::{
    CrlFetcher, DEFAULT_CONNECT_TIMEOUT, DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_CRL_SIZE,
    DefaultCrlFetcher,
};
pub use parser::parse_crl;
pub use resolver::{
    DefaultNameResolver, NameResolver, PrefixRedirectResolver, Redirect, strip_type_prefix,
};
pub use types::{CachedCrl, RevocationReason, RevokedEntry, SerialNumber};
