//! The authentication adapter.
//!
//! Bridges a protocol-level authentication request to the transport's
//! cryptographic identity: query the connection for its TLS state, then
//! hand the decision to the configured [`Policy`]. An unsecured transport
//! is rejected before any policy runs.

use tracing::debug;

use crate::policy::{AuthRequest, Policy};
use crate::state::Connection;
use crate::{Error, Result};

/// Certificate-based authenticator for session establishment.
///
/// Stateless and synchronization-free: concurrent calls for independent
/// connections are safe. The authenticator only reads connection state; it
/// never mutates or closes the connection.
///
/// # Example
///
/// ```no_run
/// use certauth::{AuthRequest, Authenticator, subject_cn};
/// # use certauth::Connection;
/// # fn handle(conn: &dyn Connection) -> certauth::Result<()> {
/// let authenticator = Authenticator::new(subject_cn());
/// let request = AuthRequest::new("alice", "staff", "/srv/files");
/// authenticator.authenticate(conn, &request)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Authenticator<P> {
    policy: P,
}

impl<P: Policy> Authenticator<P> {
    /// Create an authenticator that defers decisions to `policy`.
    pub fn new(policy: P) -> Self {
        Self { policy }
    }

    /// Decide whether `conn`'s peer identity authorizes `request`.
    ///
    /// Returns [`Error::NotSecured`] when the connection is not backed by a
    /// verified-identity transport; the policy is never invoked in that
    /// case. Otherwise the policy's outcome is returned verbatim.
    ///
    /// # Errors
    ///
    /// [`Error::NotSecured`], [`Error::AuthFailed`], or any policy-specific
    /// rejection.
    pub fn authenticate(&self, conn: &dyn Connection, request: &AuthRequest) -> Result<()> {
        let Some(state) = conn.tls_state() else {
            debug!(user = %request.user, "rejecting unsecured transport");
            return Err(Error::NotSecured);
        };
        self.policy.decide(request, &state)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
