//! Certificate identity extraction.
//!
//! Parses a DER-encoded X.509 certificate and pulls out the subject fields
//! that authentication policies match on. The Common Name doubles as the
//! application-facing username claim; the Organizational Unit and SAN
//! entries are available for custom policies (group mapping, workload
//! identities, host-based rules).

use x509_parser::certificate::X509Certificate;
use x509_parser::extensions::GeneralName;
use x509_parser::prelude::FromDer;

use crate::{Error, Result};

/// Subject fields extracted from a verified peer certificate.
///
/// Every field is optional; certificates in the wild omit most of them.
/// `display_name` is precomputed for log lines and audit events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertIdentity {
    /// Subject Common Name — the username claim for CN-based policies.
    pub common_name: Option<String>,

    /// First Organizational Unit in the subject, if any.
    pub organizational_unit: Option<String>,

    /// Subject Alternative Name DNS entries.
    pub san_dns_names: Vec<String>,

    /// Subject Alternative Name URI entries.
    pub san_uris: Vec<String>,

    /// Human-readable label: CN, else first DNS SAN, else `"<unknown>"`.
    pub display_name: String,
}

impl CertIdentity {
    /// Extract identity fields from a DER-encoded certificate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Certificate`] when the bytes are not a parseable
    /// X.509 certificate.
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| Error::Certificate(format!("cannot parse peer certificate: {e}")))?;

        let common_name = subject_cn(&cert);
        let organizational_unit = subject_ou(&cert);
        let (san_dns_names, san_uris) = subject_alt_names(&cert);

        let display_name = common_name
            .as_deref()
            .or_else(|| san_dns_names.first().map(String::as_str))
            .unwrap_or("<unknown>")
            .to_owned();

        Ok(Self {
            common_name,
            organizational_unit,
            san_dns_names,
            san_uris,
            display_name,
        })
    }

    /// `true` when the Subject CN equals `user` exactly (case-sensitive).
    #[must_use]
    pub fn cn_matches(&self, user: &str) -> bool {
        self.common_name.as_deref() == Some(user)
    }
}

fn subject_cn(cert: &X509Certificate<'_>) -> Option<String> {
    cert.subject()
        .iter_common_name()
        .next()
        .and_then(|attr| attr.as_str().ok())
        .map(str::to_owned)
}

fn subject_ou(cert: &X509Certificate<'_>) -> Option<String> {
    cert.subject()
        .iter_organizational_unit()
        .next()
        .and_then(|attr| attr.as_str().ok())
        .map(str::to_owned)
}

fn subject_alt_names(cert: &X509Certificate<'_>) -> (Vec<String>, Vec<String>) {
    let mut dns_names = Vec::new();
    let mut uris = Vec::new();

    if let Ok(Some(ext)) = cert.subject_alternative_name() {
        for name in &ext.value.general_names {
            match name {
                GeneralName::DNSName(dns) => dns_names.push((*dns).to_owned()),
                GeneralName::URI(uri) => uris.push((*uri).to_owned()),
                _ => {}
            }
        }
    }

    (dns_names, uris)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
