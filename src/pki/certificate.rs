use std::sync::Arc;

use thiserror::Error;
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::*;

use crate::pki::crl::SerialNumber;

/// Error type for certificate decoding.
#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("X.509 error: {0}")]
    X509(#[from] X509Error),

    #[error("PEM error: {0}")]
    Pem(String),

    #[error("{0} trailing bytes after certificate")]
    TrailingData(usize),
}

/// What revocation checking needs to know about a certificate.
pub trait RevocableCertificate {
    /// Serial number as assigned by the issuer
    fn serial_number(&self) -> SerialNumber;

    /// Issuer distinguished name
    fn issuer(&self) -> String;

    /// Raw names from the CRL Distribution Points extension, in extension
    /// order. `None` when the extension is absent.
    fn crl_distribution_points(&self) -> Option<Vec<String>>;
}

impl<T: RevocableCertificate + ?Sized> RevocableCertificate for &T {
    fn serial_number(&self) -> SerialNumber {
        (**self).serial_number()
    }

    fn issuer(&self) -> String {
        (**self).issuer()
    }

    fn crl_distribution_points(&self) -> Option<Vec<String>> {
        (**self).crl_distribution_points()
    }
}

impl RevocableCertificate for X509Certificate<'_> {
    fn serial_number(&self) -> SerialNumber {
        SerialNumber::from_bytes(self.tbs_certificate.raw_serial())
    }

    fn issuer(&self) -> String {
        self.tbs_certificate.issuer.to_string()
    }

    fn crl_distribution_points(&self) -> Option<Vec<String>> {
        extract_crl_distribution_points(self)
    }
}

/// Extract the CRL Distribution Points extension as textual general names.
///
/// Every full name of every distribution point is rendered with its type
/// label (`URI:http://...`); a name relative to the CRL issuer becomes
/// `RelativeName:<rdn>`.
pub fn extract_crl_distribution_points(cert: &X509Certificate<'_>) -> Option<Vec<String>> {
    let points = cert.extensions().iter().find_map(|ext| match ext.parsed_extension() {
        ParsedExtension::CRLDistributionPoints(points) => Some(points),
        _ => None,
    })?;

    let mut names = Vec::new();
    for point in points.points.iter() {
        match &point.distribution_point {
            Some(DistributionPointName::FullName(general_names)) => {
                names.extend(general_names.iter().map(general_name_to_string));
            }
            Some(DistributionPointName::NameRelativeToCRLIssuer(rdn)) => {
                let attributes = rdn
                    .iter()
                    .map(|attr| format!("{}={}", attr.attr_type(), attr.as_str().unwrap_or("?")))
                    .collect::<Vec<_>>()
                    .join("+");
                names.push(format!("RelativeName:{attributes}"));
            }
            None => {}
        }
    }

    Some(names)
}

fn general_name_to_string(name: &GeneralName<'_>) -> String {
    match name {
        GeneralName::URI(uri) => format!("URI:{uri}"),
        GeneralName::DNSName(dns) => format!("DNS:{dns}"),
        GeneralName::RFC822Name(email) => format!("email:{email}"),
        GeneralName::DirectoryName(dn) => format!("DirName:{dn}"),
        GeneralName::IPAddress(ip) => format!("IP Address:{}", format_ip(ip)),
        GeneralName::RegisteredID(oid) => format!("Registered ID:{oid}"),
        GeneralName::OtherName(oid, _) => format!("othername:{oid}"),
        other => format!("{other:?}"),
    }
}

fn format_ip(bytes: &[u8]) -> String {
    match bytes.len() {
        4 => {
            let octets: [u8; 4] = [bytes[0], bytes[1], bytes[2], bytes[3]];
            std::net::Ipv4Addr::from(octets).to_string()
        }
        16 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(bytes);
            std::net::Ipv6Addr::from(octets).to_string()
        }
        _ => hex::encode(bytes),
    }
}

/// An owned, DER-backed certificate with its revocation-relevant fields
/// decoded up front.
#[derive(Debug, Clone)]
pub struct CertificateEntry {
    pub raw: Arc<Vec<u8>>,
    pub serial_number: SerialNumber,
    pub subject: String,
    pub issuer: String,
    pub distribution_points: Option<Vec<String>>,
}

impl CertificateEntry {
    /// Create a certificate entry from DER-encoded bytes
    pub fn from_der(der: impl AsRef<[u8]>) -> Result<Self, CertificateError> {
        let der_bytes = der.as_ref();
        let (rest, cert) =
            X509Certificate::from_der(der_bytes).map_err(|e| CertificateError::X509(e.into()))?;
        if !rest.is_empty() {
            return Err(CertificateError::TrailingData(rest.len()));
        }

        Ok(Self {
            serial_number: RevocableCertificate::serial_number(&cert),
            subject: cert.subject().to_string(),
            issuer: RevocableCertificate::issuer(&cert),
            distribution_points: extract_crl_distribution_points(&cert),
            raw: Arc::new(der_bytes.to_vec()),
        })
    }

    /// Create a certificate entry from a PEM `CERTIFICATE` block
    pub fn from_pem(pem: impl AsRef<[u8]>) -> Result<Self, CertificateError> {
        let (_, pem) =
            parse_x509_pem(pem.as_ref()).map_err(|e| CertificateError::Pem(e.to_string()))?;
        if pem.label != "CERTIFICATE" {
            return Err(CertificateError::Pem(format!(
                "unexpected PEM label '{}'",
                pem.label
            )));
        }
        Self::from_der(&pem.contents)
    }

    /// Accept either encoding, sniffing for a PEM armour header.
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Result<Self, CertificateError> {
        let bytes = bytes.as_ref();
        if bytes.trim_ascii_start().starts_with(b"-----BEGIN") {
            Self::from_pem(bytes.trim_ascii_start())
        } else {
            Self::from_der(bytes)
        }
    }

    /// Parse the certificate from stored DER bytes
    pub fn parse(&self) -> Result<X509Certificate<'_>, CertificateError> {
        let (_, cert) =
            X509Certificate::from_der(&self.raw).map_err(|e| CertificateError::X509(e.into()))?;
        Ok(cert)
    }
}

impl RevocableCertificate for CertificateEntry {
    fn serial_number(&self) -> SerialNumber {
        self.serial_number.clone()
    }

    fn issuer(&self) -> String {
        self.issuer.clone()
    }

    fn crl_distribution_points(&self) -> Option<Vec<String>> {
        self.distribution_points.clone()
    }
}
