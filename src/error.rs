//! Error types for certauth

use std::io;

use thiserror::Error;

/// Result type alias for certauth
pub type Result<T> = std::result::Result<T, Error>;

/// Authentication and TLS configuration errors
#[derive(Error, Debug)]
pub enum Error {
    /// The connection is not backed by a verified-identity transport.
    ///
    /// Returned by [`crate::Authenticator::authenticate`] when the connection
    /// cannot produce a TLS state snapshot (e.g. a plaintext socket). The
    /// configured policy is never consulted in this case.
    #[error("connection is not a secured, identity-verifying transport")]
    NotSecured,

    /// The peer presented an identity proof, but it does not authorize the
    /// requested identity under the active policy.
    #[error("authentication failed")]
    AuthFailed,

    /// A policy rejected the request with a custom reason.
    ///
    /// The message is surfaced verbatim to the caller; policies must not put
    /// sensitive chain material in it.
    #[error("policy rejected request: {0}")]
    Policy(String),

    /// Certificate material could not be parsed.
    #[error("certificate error: {0}")]
    Certificate(String),

    /// TLS configuration error (bad paths, unparseable PEM, cert/key mismatch)
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error while reading certificate or key files
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    /// Create a custom policy rejection.
    pub fn policy(reason: impl Into<String>) -> Self {
        Self::Policy(reason.into())
    }

    /// `true` for rejections that carry an identity decision, as opposed to
    /// configuration or parse failures.
    #[must_use]
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::NotSecured | Self::AuthFailed | Self::Policy(_))
    }
}
