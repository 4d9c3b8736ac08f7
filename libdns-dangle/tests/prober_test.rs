use libdns_dangle::{create_http_pool, HttpProber, Probe, ProbeOutcome, Scheme, DEFAULT_USER_AGENT};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};
use tokio_rustls::{
    rustls::{
        crypto::ring,
        pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer},
        ServerConfig,
    },
    TlsAcceptor,
};
use wiremock::{
    matchers::{header, method},
    Mock, MockServer, ResponseTemplate,
};

fn prober() -> HttpProber {
    HttpProber::new(create_http_pool(DEFAULT_USER_AGENT).unwrap())
}

/// A port nothing listens on.
fn closed_port_host() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr.to_string()
}

/// Accepts connections and never answers.
async fn silent_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    addr.to_string()
}

/// Drops the connection on anything but GET, which gets a 200.
async fn head_rejecting_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                if buf[..n].starts_with(b"GET ") {
                    let _ = socket
                        .write_all(
                            b"HTTP/1.1 200 OK\r\nServer: quirky/1.0\r\nContent-Length: 5\r\nConnection: close\r\n\r\nhello",
                        )
                        .await;
                }
            });
        }
    });
    addr.to_string()
}

/// Answers every plain request with the given raw HTTP response.
async fn fixed_response_server(response: &'static [u8]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(response).await;
            });
        }
    });
    addr.to_string()
}

/// HTTPS only, with a freshly generated self-signed certificate. Plain HTTP
/// on the same port fails the handshake and gets the connection dropped.
async fn self_signed_tls_server() -> String {
    let rcgen::CertifiedKey { cert, key_pair } =
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key_pair.serialize_der()));
    let config = ServerConfig::builder_with_provider(Arc::new(ring::default_provider()))
        .with_safe_default_protocol_versions()
        .unwrap()
        .with_no_client_auth()
        .with_single_cert(vec![cert.der().clone()], key)
        .unwrap();
    let acceptor = TlsAcceptor::from(Arc::new(config));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let acceptor = acceptor.clone();
            tokio::spawn(async move {
                let Ok(mut tls) = acceptor.accept(socket).await else {
                    return;
                };
                let mut buf = [0u8; 4096];
                let _ = tls.read(&mut buf).await;
                let _ = tls
                    .write_all(
                        b"HTTP/1.1 202 Accepted\r\nServer: tls-only/2.0\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
                    )
                    .await;
                let _ = tls.shutdown().await;
            });
        }
    });
    addr.to_string()
}

#[tokio::test]
async fn head_success_records_status_and_server() {
    let mock_server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(header("user-agent", DEFAULT_USER_AGENT))
        .respond_with(ResponseTemplate::new(200).insert_header("Server", "nginx/1.25"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let host = mock_server.address().to_string();
    let outcome = prober().probe(&host, Duration::from_secs(5), true).await;

    match outcome {
        ProbeOutcome::HttpStatus { code, server, .. } => {
            assert_eq!(code, 200);
            assert_eq!(server.as_deref(), Some("nginx/1.25"));
        }
        other => panic!("expected HTTP status, got {other:?}"),
    }
}

#[tokio::test]
async fn error_status_is_still_a_response() {
    let mock_server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let host = mock_server.address().to_string();
    let outcome = prober().probe(&host, Duration::from_secs(5), true).await;

    assert!(outcome.is_response());
    assert_eq!(outcome.label(), "500");
    assert_eq!(outcome.server_label(), "Unknown");
}

#[tokio::test]
async fn unmatched_path_404_is_a_response() {
    let mock_server = MockServer::start().await;

    let host = mock_server.address().to_string();
    let outcome = prober().probe(&host, Duration::from_secs(5), true).await;

    assert_eq!(outcome.label(), "404");
}

#[tokio::test]
async fn refused_on_both_schemes() {
    let host = closed_port_host();
    let outcome = prober().probe(&host, Duration::from_secs(5), true).await;

    assert_eq!(outcome, ProbeOutcome::ConnectionRefused(Scheme::Https));
}

#[tokio::test]
async fn refused_without_fallback_is_no_response() {
    let host = closed_port_host();
    let outcome = prober().probe(&host, Duration::from_secs(5), false).await;

    assert_eq!(outcome, ProbeOutcome::NoResponse);
}

#[tokio::test]
async fn silent_server_times_out() {
    let host = silent_server().await;
    let timeout = Duration::from_millis(300);

    let start = Instant::now();
    let outcome = prober().probe(&host, timeout, true).await;

    assert_eq!(outcome, ProbeOutcome::Timeout(Scheme::Https));
    // Four attempts, each bounded by the timeout.
    assert!(start.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn get_fallback_catches_head_rejecting_server() {
    let host = head_rejecting_server().await;
    let outcome = prober().probe(&host, Duration::from_secs(5), true).await;

    match outcome {
        ProbeOutcome::HttpStatus { code, server, .. } => {
            assert_eq!(code, 200);
            assert_eq!(server.as_deref(), Some("quirky/1.0"));
        }
        other => panic!("expected GET fallback to succeed, got {other:?}"),
    }
}

#[tokio::test]
async fn head_rejecting_server_without_fallback() {
    let host = head_rejecting_server().await;
    let outcome = prober().probe(&host, Duration::from_secs(5), false).await;

    assert_eq!(outcome, ProbeOutcome::NoResponse);
}

#[tokio::test]
async fn non_ascii_server_header_is_kept() {
    let host = fixed_response_server(
        b"HTTP/1.1 200 OK\r\nServer: Caf\xe9/1.0\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
    )
    .await;
    let outcome = prober().probe(&host, Duration::from_secs(5), true).await;

    assert_eq!(outcome.label(), "200");
    assert_eq!(outcome.server_label(), "Caf\u{fffd}/1.0");
}

#[tokio::test]
async fn https_answers_after_http_fails() {
    let host = self_signed_tls_server().await;

    let strict = reqwest::Client::builder().use_rustls_tls().build().unwrap();
    assert!(strict
        .get(format!("https://{host}"))
        .send()
        .await
        .is_err());

    for allow_get_fallback in [true, false] {
        let outcome = prober()
            .probe(&host, Duration::from_secs(5), allow_get_fallback)
            .await;
        match outcome {
            ProbeOutcome::HttpStatus { code, server, .. } => {
                assert_eq!(code, 202);
                assert_eq!(server.as_deref(), Some("tls-only/2.0"));
            }
            other => panic!("expected HTTPS to answer, got {other:?}"),
        }
    }
}
