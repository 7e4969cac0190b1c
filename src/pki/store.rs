use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use walkdir::WalkDir;

use crate::pki::certificate::{CertificateEntry, CertificateError};

/// Error type for certificate store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Certificate error: {0}")]
    Certificate(#[from] CertificateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<walkdir::Error> for StoreError {
    fn from(e: walkdir::Error) -> Self {
        StoreError::Io(e.into())
    }
}

/// In-memory certificate store keyed by alias.
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MemoryCertificateStore {
    certificates: Arc<DashMap<String, CertificateEntry>>,
}

impl MemoryCertificateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every certificate below `base_path`, aliased by file stem.
    ///
    /// Files with a `.der`, `.pem`, `.crt` or `.cer` extension are
    /// considered; files that do not decode are skipped.
    pub fn load_dir(base_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let store = Self::new();
        let mut count = 0;

        for entry in WalkDir::new(base_path.as_ref()) {
            let entry = entry?;
            let path = entry.path();

            let Some(alias) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            if path
                .extension()
                .and_then(|s| s.to_str())
                .is_some_and(|ext| {
                    ["der", "pem", "crt", "cer"]
                        .iter()
                        .any(|known| ext.eq_ignore_ascii_case(known))
                })
            {
                match CertificateEntry::from_bytes(std::fs::read(path)?) {
                    Ok(cert_entry) => {
                        store.insert(alias, cert_entry);
                        count += 1;
                    }
                    Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
                }
            }
        }

        tracing::info!("Loaded {count} certificates from disk");
        Ok(store)
    }

    /// Insert a certificate, returning the one previously stored under `alias`.
    pub fn insert(
        &self,
        alias: impl Into<String>,
        certificate: CertificateEntry,
    ) -> Option<CertificateEntry> {
        self.certificates.insert(alias.into(), certificate)
    }

    /// Get a certificate by its alias.
    pub fn get(&self, alias: &str) -> Option<CertificateEntry> {
        self.certificates.get(alias).map(|e| e.value().clone())
    }

    pub fn remove(&self, alias: &str) -> Option<CertificateEntry> {
        self.certificates.remove(alias).map(|(_, cert)| cert)
    }

    /// Return the amount of certificates currently stored.
    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    /// Check if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// All aliases, sorted.
    pub fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<String> = self.certificates.iter().map(|e| e.key().clone()).collect();
        aliases.sort();
        aliases
    }
}
