use std::collections::HashMap;
use std::fmt;

use time::OffsetDateTime;

/// Certificate serial number as unsigned big-endian bytes.
///
/// Leading zero octets are dropped so that a DER INTEGER with a sign
/// padding byte compares equal to the same value without one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SerialNumber(Vec<u8>);

impl SerialNumber {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
        Self(bytes[first..].to_vec())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for SerialNumber {
    fn from(bytes: &[u8]) -> Self {
        Self::from_bytes(bytes)
    }
}

impl fmt::Display for SerialNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("00");
        }
        f.write_str(&hex::encode(&self.0))
    }
}

/// CRL entry reason codes (RFC 5280 §5.3.1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationReason {
    Unspecified,
    KeyCompromise,
    CaCompromise,
    AffiliationChanged,
    Superseded,
    CessationOfOperation,
    CertificateHold,
    RemoveFromCrl,
    PrivilegeWithdrawn,
    AaCompromise,
}

impl RevocationReason {
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Unspecified),
            1 => Some(Self::KeyCompromise),
            2 => Some(Self::CaCompromise),
            3 => Some(Self::AffiliationChanged),
            4 => Some(Self::Superseded),
            5 => Some(Self::CessationOfOperation),
            6 => Some(Self::CertificateHold),
            // 7 is not assigned
            8 => Some(Self::RemoveFromCrl),
            9 => Some(Self::PrivilegeWithdrawn),
            10 => Some(Self::AaCompromise),
            _ => None,
        }
    }
}

/// A single revoked certificate listed by a CRL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokedEntry {
    pub revocation_date: OffsetDateTime,
    pub reason: Option<RevocationReason>,
}

/// A decoded Certificate Revocation List.
///
/// Never mutated after construction; a newer CRL for the same URI replaces
/// the cached value as a whole.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedCrl {
    source_uri: String,
    issuer: String,
    this_update: OffsetDateTime,
    next_update: Option<OffsetDateTime>,
    revoked: HashMap<SerialNumber, RevokedEntry>,
}

impl CachedCrl {
    pub fn new(
        source_uri: impl Into<String>,
        issuer: impl Into<String>,
        this_update: OffsetDateTime,
        next_update: Option<OffsetDateTime>,
        revoked: impl IntoIterator<Item = (SerialNumber, RevokedEntry)>,
    ) -> Self {
        Self {
            source_uri: source_uri.into(),
            issuer: issuer.into(),
            this_update,
            next_update,
            revoked: revoked.into_iter().collect(),
        }
    }

    /// URI this CRL was fetched from
    pub fn source_uri(&self) -> &str {
        &self.source_uri
    }

    /// Distinguished name of the issuing authority
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn this_update(&self) -> OffsetDateTime {
        self.this_update
    }

    pub fn next_update(&self) -> Option<OffsetDateTime> {
        self.next_update
    }

    pub fn revoked_count(&self) -> usize {
        self.revoked.len()
    }

    pub fn revoked_entries(&self) -> impl Iterator<Item = (&SerialNumber, &RevokedEntry)> {
        self.revoked.iter()
    }

    /// Look up the revocation entry for a serial number, if listed.
    pub fn revocation_entry(&self, serial: &SerialNumber) -> Option<&RevokedEntry> {
        self.revoked.get(serial)
    }

    pub fn is_revoked(&self, serial: &SerialNumber) -> bool {
        self.revoked.contains_key(serial)
    }

    /// Whether the issuer has published (or should have published) a newer
    /// CRL by `now`. CRLs without `nextUpdate` never expire.
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.next_update.is_some_and(|next| now > next)
    }
}
