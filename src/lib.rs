//! certauth — certificate-based authentication for session servers
//!
//! Decides whether a connection's verified TLS peer identity authorizes a
//! requested identity (username, group, access path). The TLS handshake
//! itself, session lifecycle, and credential provisioning stay with the
//! embedding server; this crate evaluates the decision.
//!
//! # Pieces
//!
//! - **[`Authenticator`]**: queries a [`Connection`] for its verified TLS
//!   state and defers to a policy. Unsecured transports are rejected with
//!   [`Error::NotSecured`] before any policy runs.
//! - **[`Policy`]**: the pluggable decision contract. Closures qualify.
//! - **[`subject_cn`]** / **[`subject_cn_all_chains`]**: the built-in
//!   policies matching the requested username against leaf certificate
//!   Common Names.
//! - **[`tls`]** / **[`TlsConfig`]**: build the mutually-authenticating
//!   rustls listener whose handshake produces the verified chains, and
//!   generate test/operator certificates with `rcgen`.
//!
//! # Example
//!
//! ```no_run
//! use certauth::{AuthRequest, Authenticator, Connection, subject_cn};
//!
//! fn on_attach(conn: &dyn Connection) -> certauth::Result<()> {
//!     let authenticator = Authenticator::new(subject_cn());
//!     authenticator.authenticate(conn, &AuthRequest::new("alice", "staff", "/srv"))
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authenticator;
pub mod config;
pub mod error;
pub mod identity;
pub mod policy;
pub mod state;
pub mod tls;

pub use authenticator::Authenticator;
pub use config::TlsConfig;
pub use error::{Error, Result};
pub use identity::CertIdentity;
pub use policy::{
    AuthRequest, Policy, SubjectCnAllChainsPolicy, SubjectCnPolicy, subject_cn,
    subject_cn_all_chains,
};
pub use state::{Connection, TlsState, VerifiedChain};
