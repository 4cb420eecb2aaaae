//! In-process SOCKS5 proxy stub for tests.
//!
//! Speaks just enough of RFC 1928 (no-auth, CONNECT) to accept a tunnel,
//! records the requested target and the HTTP request head, then answers
//! with a canned response and closes.

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

#[derive(Clone)]
enum Behavior {
    Reply(Arc<Vec<u8>>),
    /// Accept the TCP connection and never answer.
    Silent,
}

#[derive(Default)]
struct Recorded {
    targets: Mutex<Vec<String>>,
    requests: Mutex<Vec<String>>,
    connections: AtomicUsize,
}

pub(crate) struct StubProxy {
    addr: SocketAddr,
    recorded: Arc<Recorded>,
}

impl StubProxy {
    /// Proxy answering every tunnel with `200 OK` and `body` as UTF-8 HTML.
    pub(crate) async fn ok(body: &str) -> Self {
        Self::start(Self::response("200 OK", "text/html; charset=utf-8", body.as_bytes())).await
    }

    pub(crate) async fn silent() -> Self {
        Self::spawn(Behavior::Silent).await
    }

    /// Proxy answering every tunnel with the raw bytes of `response`.
    pub(crate) async fn start(response: Vec<u8>) -> Self {
        Self::spawn(Behavior::Reply(Arc::new(response))).await
    }

    /// Build a complete HTTP/1.1 response.
    pub(crate) fn response(status: &str, content_type: &str, body: &[u8]) -> Vec<u8> {
        let mut out = format!(
            "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .into_bytes();
        out.extend_from_slice(body);
        out
    }

    async fn spawn(behavior: Behavior) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let recorded = Arc::new(Recorded::default());

        let shared = recorded.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                shared.connections.fetch_add(1, Ordering::SeqCst);
                let shared = shared.clone();
                let behavior = behavior.clone();
                tokio::spawn(async move {
                    let _ = serve(socket, behavior, shared).await;
                });
            }
        });

        Self { addr, recorded }
    }

    pub(crate) fn proxy_url(&self) -> String {
        format!("socks5h://{}", self.addr)
    }

    /// `host:port` targets clients asked the proxy to connect to.
    pub(crate) fn targets(&self) -> Vec<String> {
        self.recorded.targets.lock().unwrap().clone()
    }

    /// HTTP request heads received through the tunnel.
    pub(crate) fn requests(&self) -> Vec<String> {
        self.recorded.requests.lock().unwrap().clone()
    }

    pub(crate) fn connections(&self) -> usize {
        self.recorded.connections.load(Ordering::SeqCst)
    }
}

/// A `socks5h://` URL pointing at a port nothing listens on.
pub(crate) async fn refused_proxy_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("socks5h://{addr}")
}

async fn serve(mut socket: TcpStream, behavior: Behavior, recorded: Arc<Recorded>) -> std::io::Result<()> {
    let response = match behavior {
        Behavior::Reply(response) => response,
        Behavior::Silent => {
            let mut sink = [0u8; 256];
            while socket.read(&mut sink).await? > 0 {}
            return Ok(());
        }
    };

    // greeting: VER NMETHODS METHODS..
    let mut greeting = [0u8; 2];
    socket.read_exact(&mut greeting).await?;
    let mut methods = vec![0u8; greeting[1] as usize];
    socket.read_exact(&mut methods).await?;
    socket.write_all(&[0x05, 0x00]).await?;

    // request: VER CMD RSV ATYP DST.ADDR DST.PORT
    let mut request = [0u8; 4];
    socket.read_exact(&mut request).await?;
    let host = match request[3] {
        0x01 => {
            let mut octets = [0u8; 4];
            socket.read_exact(&mut octets).await?;
            Ipv4Addr::from(octets).to_string()
        }
        0x03 => {
            let mut len = [0u8; 1];
            socket.read_exact(&mut len).await?;
            let mut name = vec![0u8; len[0] as usize];
            socket.read_exact(&mut name).await?;
            String::from_utf8_lossy(&name).into_owned()
        }
        0x04 => {
            let mut octets = [0u8; 16];
            socket.read_exact(&mut octets).await?;
            Ipv6Addr::from(octets).to_string()
        }
        _ => return Ok(()),
    };
    let mut port = [0u8; 2];
    socket.read_exact(&mut port).await?;
    recorded.targets.lock().unwrap().push(format!("{host}:{}", u16::from_be_bytes(port)));

    socket.write_all(&[0x05, 0x00, 0x00, 0x01, 0, 0, 0, 0, 0, 0]).await?;

    let mut head = Vec::new();
    let mut chunk = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        head.extend_from_slice(&chunk[..n]);
    }
    recorded.requests.lock().unwrap().push(String::from_utf8_lossy(&head).into_owned());

    socket.write_all(&response).await?;
    socket.shutdown().await
}
