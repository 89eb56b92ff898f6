//! Authentication policies.
//!
//! A [`Policy`] is a pure decision function: given the client's requested
//! identity and the connection's verified TLS state, return `Ok(())` to
//! authorize or an error to reject. Policies hold no state and are invoked
//! once per authentication attempt.
//!
//! Two CN-match policies ship with the crate:
//!
//! - [`SubjectCnPolicy`] — checks the leaf certificate of the **first**
//!   verified chain only, rejecting immediately on mismatch. This mirrors
//!   the behavior servers in the field rely on; see the type docs for the
//!   exact contract.
//! - [`SubjectCnAllChainsPolicy`] — checks the leaf of **every** verified
//!   chain before rejecting. Prefer this when clients may validate under
//!   multiple trust anchors.
//!
//! Anything richer (group membership, access-path rules, SAN matching) is a
//! custom policy: implement [`Policy`] on your own type, or use a closure —
//! any `Fn(&AuthRequest, &TlsState) -> Result<()>` is a policy.

use tracing::debug;

use crate::identity::CertIdentity;
use crate::state::TlsState;
use crate::{Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Request and policy contract
// ─────────────────────────────────────────────────────────────────────────────

/// The identity tuple a client presents at the protocol layer.
///
/// All three fields are opaque strings; this crate imposes no format on
/// them. Which fields a policy actually inspects is up to the policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    /// Requested username.
    pub user: String,
    /// Requested group.
    pub group: String,
    /// Requested access path (e.g. a file tree or service name).
    pub access: String,
}

impl AuthRequest {
    /// Build a request from the protocol-level fields.
    pub fn new(
        user: impl Into<String>,
        group: impl Into<String>,
        access: impl Into<String>,
    ) -> Self {
        Self {
            user: user.into(),
            group: group.into(),
            access: access.into(),
        }
    }
}

/// Pluggable authentication decision.
///
/// `Ok(())` authorizes the request; any error rejects it and is returned
/// verbatim to the server. Implementations must be pure with respect to the
/// inputs and must not stash references to the state snapshot.
pub trait Policy: Send + Sync {
    /// Decide whether `request` is authorized by the verified `state`.
    fn decide(&self, request: &AuthRequest, state: &TlsState) -> Result<()>;
}

/// Closures are policies.
impl<F> Policy for F
where
    F: Fn(&AuthRequest, &TlsState) -> Result<()> + Send + Sync,
{
    fn decide(&self, request: &AuthRequest, state: &TlsState) -> Result<()> {
        self(request, state)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Subject CN policies
// ─────────────────────────────────────────────────────────────────────────────

/// Accept when the requested username equals the Subject Common Name of the
/// first verified chain's leaf certificate.
///
/// The comparison is exact and case-sensitive. The requested group and
/// access path are never inspected; group-based authorization belongs in a
/// custom [`Policy`].
///
/// # Contract
///
/// Only the first certificate of the first non-empty chain is consulted. A
/// CN mismatch there rejects the attempt outright, even when a later chain's
/// leaf would have matched. Use [`SubjectCnAllChainsPolicy`] to scan every
/// chain instead.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubjectCnPolicy;

/// A freshly constructed [`SubjectCnPolicy`].
#[must_use]
pub fn subject_cn() -> SubjectCnPolicy {
    SubjectCnPolicy
}

impl Policy for SubjectCnPolicy {
    fn decide(&self, request: &AuthRequest, state: &TlsState) -> Result<()> {
        for chain in state.verified_chains() {
            for cert in chain.certificates() {
                let identity = CertIdentity::from_der(cert.as_ref())?;
                if identity.cn_matches(&request.user) {
                    debug!(user = %request.user, "subject CN matched leaf certificate");
                    return Ok(());
                }
                // Mismatch on the primary path is final: remaining
                // certificates and chains are not consulted.
                debug!(
                    user = %request.user,
                    peer = %identity.display_name,
                    "subject CN mismatch"
                );
                return Err(Error::AuthFailed);
            }
        }
        debug!(user = %request.user, "no verified chains presented");
        Err(Error::AuthFailed)
    }
}

/// Accept when the requested username equals the Subject Common Name of
/// *any* verified chain's leaf certificate.
///
/// Like [`SubjectCnPolicy`] but without the first-chain short-circuit: every
/// chain's leaf is checked before the attempt is rejected. Group and access
/// path are still ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct SubjectCnAllChainsPolicy;

/// A freshly constructed [`SubjectCnAllChainsPolicy`].
#[must_use]
pub fn subject_cn_all_chains() -> SubjectCnAllChainsPolicy {
    SubjectCnAllChainsPolicy
}

impl Policy for SubjectCnAllChainsPolicy {
    fn decide(&self, request: &AuthRequest, state: &TlsState) -> Result<()> {
        for chain in state.verified_chains() {
            if let Some(leaf) = chain.leaf() {
                let identity = CertIdentity::from_der(leaf.as_ref())?;
                if identity.cn_matches(&request.user) {
                    debug!(user = %request.user, "subject CN matched a leaf certificate");
                    return Ok(());
                }
            }
        }
        debug!(user = %request.user, "no leaf certificate CN matched");
        Err(Error::AuthFailed)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
