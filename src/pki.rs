pub mod certificate;
pub mod crl;
pub mod store;

// Re-export commonly used types
pub use certificate::{CertificateEntry, CertificateError, RevocableCertificate};
pub use crl::{RevocationChecker, RevocationStatus};
pub use store::{MemoryCertificateStore, StoreError};
