//! TLS listener configuration.
//!
//! A server embedding this crate typically carries one `tls:` block in its
//! configuration file; [`TlsConfig`] is that block. It feeds
//! [`crate::tls::build_server_config`], which produces the rustls server
//! config whose handshake yields the verified chains the policies consume.
//!
//! # Example YAML
//!
//! ```yaml
//! tls:
//!   server_cert: "/etc/fileserver/tls/server.crt"
//!   server_key:  "/etc/fileserver/tls/server.key"
//!   ca_cert:     "/etc/fileserver/tls/ca.crt"
//!   require_client_cert: true
//! ```

use serde::{Deserialize, Serialize};

/// TLS configuration for a mutually-authenticating listener.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TlsConfig {
    /// Path to the PEM-encoded server certificate.
    pub server_cert: String,

    /// Path to the PEM-encoded server private key.
    pub server_key: String,

    /// Path to the PEM-encoded CA bundle used to verify client certificates.
    pub ca_cert: String,

    /// Reject clients that do not present a certificate signed by `ca_cert`.
    ///
    /// Defaults to `true`. When `false` the listener still offers TLS but
    /// unauthenticated clients complete the handshake with no verified
    /// chains, and certificate policies reject them at authentication time
    /// instead of at the handshake.
    #[serde(default = "default_require_client_cert")]
    pub require_client_cert: bool,

    /// Optional PEM-encoded Certificate Revocation List.
    ///
    /// Passed through to rustls; revoked certificates fail the handshake.
    #[serde(default)]
    pub crl_path: Option<String>,
}

fn default_require_client_cert() -> bool {
    true
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
