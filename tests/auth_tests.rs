//! End-to-end authentication tests
//!
//! Exercises the full decision path with real rcgen-generated certificates:
//! - unsecured transports rejected before any policy runs
//! - subject-CN matching against leaf certificates
//! - the first-chain short-circuit of the default policy
//! - the all-chains variant
//! - custom policies via trait impls and closures

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use certauth::tls::{CaParams, CertGenerator, GeneratedCert, LeafParams, build_server_config};
use certauth::{
    AuthRequest, Authenticator, Connection, Error, Policy, TlsConfig, TlsState, VerifiedChain,
    subject_cn, subject_cn_all_chains,
};
use rustls::pki_types::{CertificateDer, ServerName};
use tokio_rustls::{TlsAcceptor, TlsConnector};

// ── fixtures ─────────────────────────────────────────────────────────────────

/// Issue a client certificate with the given CN under a throwaway CA and
/// return its DER bytes.
fn client_cert_der(cn: &str) -> CertificateDer<'static> {
    let ca = CertGenerator::init_ca(&CaParams {
        cn: "auth test CA",
        validity_days: 1,
    })
    .expect("CA generation");
    let leaf = CertGenerator::issue_leaf(
        &LeafParams {
            cn,
            ou: None,
            san_dns: vec![],
            san_uris: vec![],
            validity_days: 1,
        },
        &ca.cert_pem,
        &ca.key_pem,
    )
    .expect("leaf issuance");

    let ders = rustls_pemfile::certs(&mut leaf.cert_pem.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .expect("PEM parse");
    ders.into_iter().next().expect("one certificate")
}

fn state_with_leaf_cns(cns: &[&str]) -> TlsState {
    TlsState::new(
        cns.iter()
            .map(|cn| VerifiedChain::new(vec![client_cert_der(cn)]))
            .collect(),
    )
}

/// A plaintext connection: no transport identity.
struct PlainConn;

impl Connection for PlainConn {
    fn tls_state(&self) -> Option<TlsState> {
        None
    }
}

/// A secured connection with a captured handshake snapshot.
struct SecuredConn(TlsState);

impl Connection for SecuredConn {
    fn tls_state(&self) -> Option<TlsState> {
        Some(self.0.clone())
    }
}

fn request(user: &str) -> AuthRequest {
    AuthRequest::new(user, "staff", "/srv/files")
}

// ── scenario: requested user matches leaf CN ─────────────────────────────────

#[test]
fn matching_leaf_cn_authenticates() {
    let authenticator = Authenticator::new(subject_cn());
    let conn = SecuredConn(state_with_leaf_cns(&["alice"]));

    assert!(authenticator.authenticate(&conn, &request("alice")).is_ok());
}

#[test]
fn group_and_access_never_affect_cn_policy() {
    let authenticator = Authenticator::new(subject_cn());
    let conn = SecuredConn(state_with_leaf_cns(&["alice"]));

    for (group, access) in [("", ""), ("wheel", "/"), ("nobody", "/var/empty")] {
        let req = AuthRequest::new("alice", group, access);
        assert!(authenticator.authenticate(&conn, &req).is_ok());
    }
}

// ── scenario: leaf CN differs ────────────────────────────────────────────────

#[test]
fn mismatched_leaf_cn_fails_authentication() {
    let authenticator = Authenticator::new(subject_cn());
    let conn = SecuredConn(state_with_leaf_cns(&["bob"]));

    let err = authenticator
        .authenticate(&conn, &request("alice"))
        .unwrap_err();
    assert!(matches!(err, Error::AuthFailed));
}

// ── scenario: no verified chains ─────────────────────────────────────────────

#[test]
fn empty_chain_set_fails_authentication() {
    let authenticator = Authenticator::new(subject_cn());
    let conn = SecuredConn(TlsState::default());

    let err = authenticator
        .authenticate(&conn, &request("alice"))
        .unwrap_err();
    assert!(matches!(err, Error::AuthFailed));
}

// ── scenario: plaintext transport ────────────────────────────────────────────

#[test]
fn plaintext_transport_is_rejected_regardless_of_request() {
    let authenticator = Authenticator::new(subject_cn());

    for user in ["alice", "bob", ""] {
        let err = authenticator
            .authenticate(&PlainConn, &request(user))
            .unwrap_err();
        assert!(matches!(err, Error::NotSecured));
    }
}

#[test]
fn plaintext_transport_never_invokes_policy() {
    let calls = AtomicUsize::new(0);
    let counting = |_: &AuthRequest, _: &TlsState| -> certauth::Result<()> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    };
    let authenticator = Authenticator::new(&counting);

    let err = authenticator
        .authenticate(&PlainConn, &request("alice"))
        .unwrap_err();
    assert!(matches!(err, Error::NotSecured));
    assert_eq!(calls.load(Ordering::SeqCst), 0, "policy must not be called");
}

// ── scenario: first-chain short-circuit ──────────────────────────────────────

#[test]
fn default_policy_short_circuits_on_first_chain() {
    let authenticator = Authenticator::new(subject_cn());
    // First chain leaf mismatches; second chain would match.
    let conn = SecuredConn(state_with_leaf_cns(&["bob", "alice"]));

    let err = authenticator
        .authenticate(&conn, &request("alice"))
        .unwrap_err();
    assert!(matches!(err, Error::AuthFailed));
}

#[test]
fn all_chains_policy_accepts_second_chain_match() {
    let authenticator = Authenticator::new(subject_cn_all_chains());
    let conn = SecuredConn(state_with_leaf_cns(&["bob", "alice"]));

    assert!(authenticator.authenticate(&conn, &request("alice")).is_ok());
}

// ── custom policies ──────────────────────────────────────────────────────────

#[test]
fn custom_policy_error_propagates_verbatim() {
    let deny_root = |req: &AuthRequest, _: &TlsState| {
        if req.user == "root" {
            Err(Error::policy("root login is disabled"))
        } else {
            Ok(())
        }
    };
    let authenticator = Authenticator::new(deny_root);
    let conn = SecuredConn(state_with_leaf_cns(&["root"]));

    let err = authenticator
        .authenticate(&conn, &request("root"))
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "policy rejected request: root login is disabled"
    );

    assert!(authenticator.authenticate(&conn, &request("alice")).is_ok());
}

#[test]
fn trait_policy_can_combine_cn_and_group() {
    /// CN must match and the group must be on the roster.
    struct CnAndGroup {
        allowed_groups: Vec<String>,
    }

    impl Policy for CnAndGroup {
        fn decide(&self, request: &AuthRequest, state: &TlsState) -> certauth::Result<()> {
            subject_cn_all_chains().decide(request, state)?;
            if self.allowed_groups.iter().any(|g| *g == request.group) {
                Ok(())
            } else {
                Err(Error::policy("group not permitted"))
            }
        }
    }

    let authenticator = Authenticator::new(CnAndGroup {
        allowed_groups: vec!["staff".into()],
    });
    let conn = SecuredConn(state_with_leaf_cns(&["alice"]));

    assert!(
        authenticator
            .authenticate(&conn, &AuthRequest::new("alice", "staff", "/srv"))
            .is_ok()
    );
    let err = authenticator
        .authenticate(&conn, &AuthRequest::new("alice", "guests", "/srv"))
        .unwrap_err();
    assert!(matches!(err, Error::Policy(_)));
}

// ── loopback handshakes: the TLS stream surfaces its own state ───────────────

/// CA plus an acceptor that offers TLS without requiring a client cert.
struct TlsFixture {
    ca: GeneratedCert,
    acceptor: TlsAcceptor,
}

fn tls_fixture() -> TlsFixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let ca = CertGenerator::init_ca(&CaParams {
        cn: "handshake test CA",
        validity_days: 1,
    })
    .expect("CA generation");
    let server = CertGenerator::issue_leaf(
        &LeafParams {
            cn: "fs.example.org",
            ou: None,
            san_dns: vec!["fs.example.org".into()],
            san_uris: vec![],
            validity_days: 1,
        },
        &ca.cert_pem,
        &ca.key_pem,
    )
    .expect("server leaf");
    ca.write_to_dir(dir.path(), "ca").expect("write CA");
    server.write_to_dir(dir.path(), "server").expect("write server");

    let config = TlsConfig {
        server_cert: dir.path().join("server.crt").to_str().unwrap().into(),
        server_key: dir.path().join("server.key").to_str().unwrap().into(),
        ca_cert: dir.path().join("ca.crt").to_str().unwrap().into(),
        require_client_cert: false,
        crl_path: None,
    };
    let acceptor = TlsAcceptor::from(Arc::new(
        build_server_config(&config).expect("server config"),
    ));
    TlsFixture { ca, acceptor }
}

/// Client config trusting the fixture CA, with or without a client identity.
fn client_config(ca: &GeneratedCert, identity: Option<&GeneratedCert>) -> rustls::ClientConfig {
    let mut roots = rustls::RootCertStore::empty();
    for der in rustls_pemfile::certs(&mut ca.cert_pem.as_bytes())
        .collect::<Result<Vec<_>, _>>()
        .expect("CA PEM")
    {
        roots.add(der).expect("trust anchor");
    }
    let builder = rustls::ClientConfig::builder().with_root_certificates(roots);
    match identity {
        Some(leaf) => {
            let certs = rustls_pemfile::certs(&mut leaf.cert_pem.as_bytes())
                .collect::<Result<Vec<_>, _>>()
                .expect("leaf PEM");
            let key = rustls_pemfile::private_key(&mut leaf.key_pem.as_bytes())
                .expect("key PEM")
                .expect("key present");
            builder
                .with_client_auth_cert(certs, key)
                .expect("client identity")
        }
        None => builder.with_no_client_auth(),
    }
}

/// Complete a loopback handshake and hand back the server-side stream.
async fn handshake(
    fixture: &TlsFixture,
    client: rustls::ClientConfig,
) -> tokio_rustls::server::TlsStream<tokio::net::TcpStream> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let connector = TlsConnector::from(Arc::new(client));
    let server_name = ServerName::try_from("fs.example.org").expect("server name");
    let client_side = tokio::spawn(async move {
        let tcp = tokio::net::TcpStream::connect(addr).await.expect("connect");
        connector
            .connect(server_name, tcp)
            .await
            .expect("client handshake")
    });

    let (tcp, _) = listener.accept().await.expect("accept");
    let stream = fixture.acceptor.accept(tcp).await.expect("server handshake");
    let _client = client_side.await.expect("client task");
    stream
}

#[tokio::test]
async fn certless_tls_client_fails_policy_not_transport_check() {
    // A completed TLS session with no client certificate is still a secured
    // transport: the policy runs over an empty chain set and rejects with
    // AuthFailed, never NotSecured.
    let fixture = tls_fixture();
    let stream = handshake(&fixture, client_config(&fixture.ca, None)).await;

    let authenticator = Authenticator::new(subject_cn());
    let err = authenticator
        .authenticate(&stream, &request("alice"))
        .unwrap_err();
    assert!(matches!(err, Error::AuthFailed));
}

#[tokio::test]
async fn tls_client_certificate_authenticates_over_loopback() {
    let fixture = tls_fixture();
    let leaf = CertGenerator::issue_leaf(
        &LeafParams {
            cn: "alice",
            ou: None,
            san_dns: vec![],
            san_uris: vec![],
            validity_days: 1,
        },
        &fixture.ca.cert_pem,
        &fixture.ca.key_pem,
    )
    .expect("client leaf");
    let stream = handshake(&fixture, client_config(&fixture.ca, Some(&leaf))).await;

    let authenticator = Authenticator::new(subject_cn());
    assert!(authenticator.authenticate(&stream, &request("alice")).is_ok());
    let err = authenticator
        .authenticate(&stream, &request("bob"))
        .unwrap_err();
    assert!(matches!(err, Error::AuthFailed));
}

// ── concurrency: independent connections are independent attempts ────────────

#[test]
fn concurrent_attempts_on_independent_connections() {
    let authenticator = Authenticator::new(subject_cn());
    let alice = SecuredConn(state_with_leaf_cns(&["alice"]));
    let bob = SecuredConn(state_with_leaf_cns(&["bob"]));

    std::thread::scope(|scope| {
        let auth = &authenticator;
        let a = scope.spawn(move || auth.authenticate(&alice, &request("alice")));
        let b = scope.spawn(move || auth.authenticate(&bob, &request("alice")));
        assert!(a.join().unwrap().is_ok());
        assert!(matches!(b.join().unwrap(), Err(Error::AuthFailed)));
    });
}
