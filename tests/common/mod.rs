//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use edge_rules::config::EdgeConfig;
use edge_rules::{EdgeBundle, EdgeServer};

/// Start a mock origin that answers every request with its request target
/// as the body and echoes the `Cookie` header back as `x-origin-cookie`.
pub async fn start_echo_origin(addr: SocketAddr) {
    let listener = TcpListener::bind(addr).await.unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    tokio::spawn(async move {
                        let (read, mut write) = socket.into_split();
                        let mut lines = BufReader::new(read).lines();

                        let request_line = lines.next_line().await.ok().flatten().unwrap_or_default();
                        let target = request_line.split(' ').nth(1).unwrap_or("").to_string();

                        let mut cookie = String::new();
                        while let Ok(Some(line)) = lines.next_line().await {
                            if line.is_empty() {
                                break;
                            }
                            if let Some((name, value)) = line.split_once(':') {
                                if name.eq_ignore_ascii_case("cookie") {
                                    cookie = value.trim().to_string();
                                }
                            }
                        }

                        let response = format!(
                            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nCache-Control: max-age=60\r\nx-origin-cookie: {}\r\nConnection: close\r\n\r\n{}",
                            target.len(),
                            cookie,
                            target
                        );
                        let _ = write.write_all(response.as_bytes()).await;
                        let _ = write.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
}

/// Compile `config` and serve it on `proxy_addr` in the background.
pub async fn start_edge(config: EdgeConfig, proxy_addr: SocketAddr) {
    let bundle = EdgeBundle::compile(&config).unwrap().bundle;
    let server = EdgeServer::new(bundle, &config.preview).unwrap();
    let listener = TcpListener::bind(proxy_addr).await.unwrap();

    tokio::spawn(async move {
        let _ = server.run(listener, std::future::pending::<()>()).await;
    });

    tokio::time::sleep(Duration::from_millis(200)).await;
}

/// HTTP client that reports redirects instead of following them.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
