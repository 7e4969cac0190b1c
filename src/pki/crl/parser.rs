use ::time::OffsetDateTime;
use tracing::debug;
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::*;

use super::errors::ParseError;
use super::types::{CachedCrl, RevocationReason, RevokedEntry, SerialNumber};

const PEM_CRL_LABEL: &str = "X509 CRL";

/// Decode a DER or PEM encoded CRL fetched from `source_uri`.
///
/// Either the whole structure decodes or a [`ParseError`] is returned;
/// trailing bytes after the CRL are rejected.
pub fn parse_crl(source_uri: &str, bytes: &[u8]) -> Result<CachedCrl, ParseError> {
    let malformed = |reason: String| ParseError::Malformed {
        uri: source_uri.to_string(),
        reason,
    };

    let trimmed = bytes.trim_ascii_start();
    if trimmed.starts_with(b"-----BEGIN") {
        let (_, pem) = parse_x509_pem(trimmed).map_err(|e| malformed(format!("PEM: {e}")))?;
        if pem.label != PEM_CRL_LABEL {
            return Err(malformed(format!("unexpected PEM label '{}'", pem.label)));
        }
        return parse_der(source_uri, &pem.contents);
    }

    parse_der(source_uri, bytes)
}

fn parse_der(source_uri: &str, der: &[u8]) -> Result<CachedCrl, ParseError> {
    let malformed = |reason: String| ParseError::Malformed {
        uri: source_uri.to_string(),
        reason,
    };

    let (rest, crl) =
        CertificateRevocationList::from_der(der).map_err(|e| malformed(e.to_string()))?;
    if !rest.is_empty() {
        return Err(malformed(format!(
            "{} trailing bytes after CRL",
            rest.len()
        )));
    }

    let issuer = crl.issuer().to_string();
    let this_update = to_datetime(crl.last_update());
    let next_update = crl.next_update().map(to_datetime);

    let revoked = crl
        .iter_revoked_certificates()
        .map(|revoked_cert| {
            let reason = revoked_cert
                .reason_code()
                .and_then(|(_, code)| RevocationReason::from_u8(code.0));
            (
                SerialNumber::from_bytes(revoked_cert.raw_serial()),
                RevokedEntry {
                    revocation_date: to_datetime(revoked_cert.revocation_date),
                    reason,
                },
            )
        })
        .collect::<Vec<_>>();

    debug!(
        "Parsed CRL from {} issued by {} with {} revoked certificates",
        source_uri,
        issuer,
        revoked.len()
    );

    Ok(CachedCrl::new(
        source_uri,
        issuer,
        this_update,
        next_update,
        revoked,
    ))
}

fn to_datetime(time: ASN1Time) -> OffsetDateTime {
    time.to_datetime()
}
