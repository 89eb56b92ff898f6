//! TLS session state and the connection capability query.
//!
//! [`TlsState`] is an immutable snapshot of a connection's cryptographic
//! session at authentication time: zero or more [`VerifiedChain`]s, each an
//! ordered list of DER certificates from the peer's leaf up to a trusted
//! root. Chains are produced by the transport layer's handshake verification;
//! this crate only reads them.
//!
//! The [`Connection`] trait is the capability query an [`crate::Authenticator`]
//! uses to ask "is this connection backed by a verified-identity transport?".
//! A plaintext transport answers `None`; a mutually-authenticated TLS stream
//! answers with its state snapshot.

use rustls::pki_types::CertificateDer;

// ─────────────────────────────────────────────────────────────────────────────
// Verified chain
// ─────────────────────────────────────────────────────────────────────────────

/// An ordered certificate chain, leaf first, validated by the transport layer.
///
/// A chain is only ever constructed after the TLS stack has verified
/// signatures and the trust path; holding a `VerifiedChain` is the proof
/// token that verification happened. The ordering beyond "leaf first" is
/// whatever the transport produced and carries no further meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedChain {
    certificates: Vec<CertificateDer<'static>>,
}

impl VerifiedChain {
    /// Wrap an already-verified chain, leaf certificate first.
    #[must_use]
    pub fn new(certificates: Vec<CertificateDer<'static>>) -> Self {
        Self { certificates }
    }

    /// The peer's own certificate, if the chain is non-empty.
    #[must_use]
    pub fn leaf(&self) -> Option<&CertificateDer<'static>> {
        self.certificates.first()
    }

    /// All certificates in the chain, leaf first.
    #[must_use]
    pub fn certificates(&self) -> &[CertificateDer<'static>] {
        &self.certificates
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// TLS state snapshot
// ─────────────────────────────────────────────────────────────────────────────

/// Immutable snapshot of a TLS session's verified peer identity.
///
/// Captured once when the handshake completes and never mutated afterwards.
/// Multiple chains can exist when more than one trust anchor validates the
/// same leaf certificate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsState {
    verified_chains: Vec<VerifiedChain>,
}

impl TlsState {
    /// Build a snapshot from already-verified chains.
    #[must_use]
    pub fn new(verified_chains: Vec<VerifiedChain>) -> Self {
        Self { verified_chains }
    }

    /// Build a single-chain snapshot from the peer certificate list a rustls
    /// server connection exposes after a client-verified handshake.
    ///
    /// rustls hands back one chain (leaf first); an empty list yields a
    /// snapshot with no chains, which every built-in policy rejects.
    #[must_use]
    pub fn from_peer_certificates(certificates: &[CertificateDer<'static>]) -> Self {
        if certificates.is_empty() {
            return Self::default();
        }
        Self {
            verified_chains: vec![VerifiedChain::new(certificates.to_vec())],
        }
    }

    /// The verified chains, in the order the transport produced them.
    #[must_use]
    pub fn verified_chains(&self) -> &[VerifiedChain] {
        &self.verified_chains
    }

    /// `true` when no chain was verified (no client certificate presented).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.verified_chains.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection capability
// ─────────────────────────────────────────────────────────────────────────────

/// Capability query for transport-level identity.
///
/// Implemented by connection types that may or may not carry a verified
/// peer identity. Returning `None` means "this transport proves nothing
/// about the peer" and makes [`crate::Authenticator::authenticate`] fail
/// with [`crate::Error::NotSecured`] before any policy runs.
///
/// Implementations must be read-only: querying the state must not mutate
/// or close the connection.
pub trait Connection {
    /// The TLS state snapshot, or `None` for an unsecured transport.
    fn tls_state(&self) -> Option<TlsState>;
}

/// A plain TCP socket carries no identity proof.
impl Connection for tokio::net::TcpStream {
    fn tls_state(&self) -> Option<TlsState> {
        None
    }
}

/// Server-side TLS stream: a completed handshake always yields a snapshot.
/// The chain list is non-empty only when the client verifier accepted a
/// certificate; a certificate-less client surfaces as a snapshot with no
/// chains and is rejected by policy, not by the transport check.
impl<IO> Connection for tokio_rustls::server::TlsStream<IO> {
    fn tls_state(&self) -> Option<TlsState> {
        let (_, session) = self.get_ref();
        Some(TlsState::from_peer_certificates(
            session.peer_certificates().unwrap_or(&[]),
        ))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
