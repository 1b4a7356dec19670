//! Shared utilities for integration tests.

use std::net::SocketAddr;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use webssh_gateway::GatewayOptions;

/// Options for a gateway on an ephemeral loopback port, isolated from the
/// machine's known_hosts files.
pub fn local_options() -> GatewayOptions {
    GatewayOptions {
        address: "127.0.0.1".into(),
        port: 0,
        ssladdress: "127.0.0.1".into(),
        sslport: 0,
        hostfile: "/nonexistent/webssh/known_hosts".into(),
        syshostfile: "/nonexistent/webssh/known_hosts".into(),
        ..Default::default()
    }
}

/// Same as [`local_options`] with the test certificate and key configured.
#[allow(dead_code)]
pub fn tls_options() -> GatewayOptions {
    GatewayOptions {
        certfile: fixture("cert.pem"),
        keyfile: fixture("key.pem"),
        ..local_options()
    }
}

pub fn fixture(name: &str) -> String {
    format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

/// Start a TCP backend that echoes every byte back. Must be called on the
/// gateway's event loop.
#[allow(dead_code)]
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 1024];
                        loop {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => break,
                                Ok(n) => {
                                    if socket.write_all(&buf[..n]).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// A loopback port with nothing listening on it.
#[allow(dead_code)]
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// HTTP client for talking to a test gateway: no proxies, self-signed
/// certificates accepted.
#[allow(dead_code)]
pub fn http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .danger_accept_invalid_certs(true)
        .build()
        .unwrap()
}
