//! TLS plumbing: PEM loading, rustls server config, certificate generation.
//!
//! The authentication policies in this crate consume chains that a rustls
//! handshake has already verified. This module builds that handshake
//! configuration from a [`TlsConfig`] and provides an `rcgen`-backed
//! [`CertGenerator`] so operators and tests can mint a CA and leaf
//! certificates without external tooling.
//!
//! All files are expected in PEM format.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, Ia5String, IsCa, KeyPair,
    SanType,
};
use rustls::ServerConfig;
use rustls::pki_types::{CertificateDer, CertificateRevocationListDer, PrivateKeyDer};
use rustls::server::WebPkiClientVerifier;
use tracing::debug;

use crate::config::TlsConfig;
use crate::{Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Server config building
// ─────────────────────────────────────────────────────────────────────────────

/// Build a `rustls::ServerConfig` whose handshake verifies client
/// certificates against the configured CA.
///
/// With `require_client_cert: true` (the default), clients without a valid
/// certificate are rejected during the handshake. With `false`, the
/// handshake completes for unauthenticated clients and they surface to the
/// authenticator as connections with no verified chains.
///
/// # Errors
///
/// Returns [`Error::Config`] when a file cannot be read or parsed, or when
/// the certificate and key do not form a valid pair.
pub fn build_server_config(config: &TlsConfig) -> Result<ServerConfig> {
    let server_certs = load_certs(&config.server_cert)?;
    let server_key = load_private_key(&config.server_key)?;
    let ca_certs = load_certs(&config.ca_cert)?;

    let mut roots = rustls::RootCertStore::empty();
    for cert in ca_certs {
        roots
            .add(cert)
            .map_err(|e| Error::Config(format!("cannot add CA certificate to trust store: {e}")))?;
    }

    let verifier = client_verifier(config, roots)?;

    let server_config = ServerConfig::builder()
        .with_client_cert_verifier(verifier)
        .with_single_cert(server_certs, server_key)
        .map_err(|e| Error::Config(format!("server certificate/key rejected: {e}")))?;

    debug!(
        server_cert = %config.server_cert,
        ca_cert = %config.ca_cert,
        require_client_cert = config.require_client_cert,
        "TLS server config built"
    );

    Ok(server_config)
}

fn client_verifier(
    config: &TlsConfig,
    roots: rustls::RootCertStore,
) -> Result<Arc<dyn rustls::server::danger::ClientCertVerifier>> {
    let mut builder = WebPkiClientVerifier::builder(Arc::new(roots));

    if let Some(ref crl_path) = config.crl_path {
        builder = builder.with_crls(load_crls(crl_path)?);
    }
    if !config.require_client_cert {
        builder = builder.allow_unauthenticated();
    }

    builder
        .build()
        .map_err(|e| Error::Config(format!("cannot build client verifier: {e}")))
}

// ─────────────────────────────────────────────────────────────────────────────
// PEM loading
// ─────────────────────────────────────────────────────────────────────────────

/// Load every certificate from a PEM file.
///
/// # Errors
///
/// Returns [`Error::Config`] when the file is unreadable or contains no
/// certificate blocks.
pub fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>> {
    let pem = read_file(path)?;
    let certs = rustls_pemfile::certs(&mut pem.as_slice())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Config(format!("cannot parse certificates in '{path}': {e}")))?;

    if certs.is_empty() {
        return Err(Error::Config(format!("no certificates in '{path}'")));
    }
    Ok(certs)
}

/// Load the first private key from a PEM file (PKCS#8, RSA, or SEC1).
///
/// # Errors
///
/// Returns [`Error::Config`] when the file is unreadable or holds no key.
pub fn load_private_key(path: &str) -> Result<PrivateKeyDer<'static>> {
    let pem = read_file(path)?;
    rustls_pemfile::private_key(&mut pem.as_slice())
        .map_err(|e| Error::Config(format!("cannot parse private key in '{path}': {e}")))?
        .ok_or_else(|| Error::Config(format!("no private key in '{path}'")))
}

fn load_crls(path: &str) -> Result<Vec<CertificateRevocationListDer<'static>>> {
    let pem = read_file(path)?;
    rustls_pemfile::crls(&mut pem.as_slice())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Config(format!("cannot parse CRL in '{path}': {e}")))
}

fn read_file(path: &str) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::Config(format!("cannot read '{path}': {e}")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Certificate generation
// ─────────────────────────────────────────────────────────────────────────────

/// Parameters for a self-signed CA certificate.
#[derive(Debug)]
pub struct CaParams<'a> {
    /// Common Name of the root CA.
    pub cn: &'a str,
    /// Validity in days from now.
    pub validity_days: u32,
}

/// Parameters for a leaf certificate (server or client).
#[derive(Debug, Default)]
pub struct LeafParams<'a> {
    /// Common Name — for client certificates, the username claim.
    pub cn: &'a str,
    /// Organizational Unit, if any.
    pub ou: Option<&'a str>,
    /// SAN DNS entries.
    pub san_dns: Vec<String>,
    /// SAN URI entries (e.g. workload identities).
    pub san_uris: Vec<String>,
    /// Validity in days from now.
    pub validity_days: u32,
}

/// A generated certificate and its private key, both PEM-encoded.
#[derive(Debug)]
pub struct GeneratedCert {
    /// PEM certificate.
    pub cert_pem: String,
    /// PEM private key.
    pub key_pem: String,
}

impl GeneratedCert {
    /// Write `<stem>.crt` and `<stem>.key` under `dir`, creating it if
    /// necessary.
    pub fn write_to_dir(&self, dir: &Path, stem: &str) -> Result<()> {
        fs::create_dir_all(dir)?;
        fs::write(dir.join(format!("{stem}.crt")), &self.cert_pem)?;
        fs::write(dir.join(format!("{stem}.key")), &self.key_pem)?;
        Ok(())
    }
}

/// `rcgen`-backed generator for CA and leaf certificates.
pub struct CertGenerator;

impl CertGenerator {
    /// Generate a self-signed CA certificate able to sign leaves via
    /// [`CertGenerator::issue_leaf`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if key generation or signing fails.
    pub fn init_ca(params: &CaParams<'_>) -> Result<GeneratedCert> {
        let key = generate_key()?;

        let mut ca = CertificateParams::default();
        ca.distinguished_name = distinguished_name(params.cn, None);
        ca.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        ca.not_after = not_after(params.validity_days)?;

        let cert = ca
            .self_signed(&key)
            .map_err(|e| Error::Config(format!("CA self-signing failed: {e}")))?;

        Ok(GeneratedCert {
            cert_pem: cert.pem(),
            key_pem: key.serialize_pem(),
        })
    }

    /// Issue a leaf certificate signed by the given CA cert/key pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the CA material cannot be parsed, a
    /// SAN entry is invalid, or signing fails.
    pub fn issue_leaf(
        params: &LeafParams<'_>,
        ca_cert_pem: &str,
        ca_key_pem: &str,
    ) -> Result<GeneratedCert> {
        let ca_key = KeyPair::from_pem(ca_key_pem)
            .map_err(|e| Error::Config(format!("cannot parse CA key: {e}")))?;
        let ca_cert = CertificateParams::from_ca_cert_pem(ca_cert_pem)
            .map_err(|e| Error::Config(format!("cannot parse CA certificate: {e}")))?
            .self_signed(&ca_key)
            .map_err(|e| Error::Config(format!("cannot rebuild CA certificate: {e}")))?;

        let key = generate_key()?;

        let mut leaf = CertificateParams::default();
        leaf.distinguished_name = distinguished_name(params.cn, params.ou);
        leaf.not_after = not_after(params.validity_days)?;
        leaf.subject_alt_names = subject_alt_names(&params.san_dns, &params.san_uris)?;

        let cert = leaf
            .signed_by(&key, &ca_cert, &ca_key)
            .map_err(|e| Error::Config(format!("leaf signing failed: {e}")))?;

        Ok(GeneratedCert {
            cert_pem: cert.pem(),
            key_pem: key.serialize_pem(),
        })
    }
}

fn generate_key() -> Result<KeyPair> {
    KeyPair::generate().map_err(|e| Error::Config(format!("key generation failed: {e}")))
}

fn distinguished_name(cn: &str, ou: Option<&str>) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, cn);
    if let Some(ou) = ou {
        dn.push(DnType::OrganizationalUnitName, ou);
    }
    dn
}

fn subject_alt_names(dns: &[String], uris: &[String]) -> Result<Vec<SanType>> {
    let mut sans = Vec::with_capacity(dns.len() + uris.len());
    for name in dns {
        let ia5 = Ia5String::try_from(name.as_str())
            .map_err(|e| Error::Config(format!("invalid DNS SAN '{name}': {e}")))?;
        sans.push(SanType::DnsName(ia5));
    }
    for uri in uris {
        let ia5 = Ia5String::try_from(uri.as_str())
            .map_err(|e| Error::Config(format!("invalid URI SAN '{uri}': {e}")))?;
        sans.push(SanType::URI(ia5));
    }
    Ok(sans)
}

/// `now + days` as an `OffsetDateTime`, computed via the Unix clock so the
/// `time` crate's `std` feature is not required.
fn not_after(days: u32) -> Result<time::OffsetDateTime> {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| Error::Config(format!("system clock error: {e}")))?
        .as_secs();
    let expires = now.saturating_add(u64::from(days) * 86_400);

    time::OffsetDateTime::from_unix_timestamp(i64::try_from(expires).unwrap_or(i64::MAX))
        .map_err(|e| Error::Config(format!("validity out of range: {e}")))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
