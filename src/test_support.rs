//! Minimal HTTP/1.1 responder for exercising the outbound clients.

use anyhow::{anyhow, Context, Result};
use std::net::SocketAddr;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::mpsc,
};
use url::Url;

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or("<binary>")
    }
}

/// Serves one canned response per connection, in order, then stops
/// accepting. Every request received is captured.
pub struct StubServer {
    addr: SocketAddr,
    requests: mpsc::UnboundedReceiver<CapturedRequest>,
}

impl StubServer {
    pub async fn start(responses: Vec<(u16, Vec<u8>)>) -> Result<Self> {
        let responses = responses
            .into_iter()
            .map(|(status, body)| {
                let declared = body.len();
                (status, body, declared)
            })
            .collect();
        Self::serve(responses).await
    }

    /// One response whose `Content-Length` promises more bytes than are sent
    /// before the connection closes.
    pub async fn truncated(status: u16, body: &[u8], declared_len: usize) -> Result<Self> {
        Self::serve(vec![(status, body.to_vec(), declared_len)]).await
    }

    async fn serve(responses: Vec<(u16, Vec<u8>, usize)>) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            for (status, body, declared) in responses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                match read_request(&mut socket).await {
                    Ok(req) => {
                        let _ = tx.send(req);
                    }
                    Err(_) => return,
                }
                let _ = write_response(&mut socket, status, &body, declared).await;
                let _ = socket.shutdown().await;
            }
        });

        Ok(StubServer { addr, requests: rx })
    }

    pub async fn reply(status: u16, body: &str) -> Result<Self> {
        Self::start(vec![(status, body.as_bytes().to_vec())]).await
    }

    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(Url::parse(&format!("http://{}{}", self.addr, path))?)
    }

    pub async fn request(&mut self) -> Result<CapturedRequest> {
        self.requests
            .recv()
            .await
            .ok_or_else(|| anyhow!("stub server closed before a request arrived"))
    }

    /// An address nothing is listening on.
    pub async fn unused_addr() -> Result<SocketAddr> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        Ok(listener.local_addr()?)
    }
}

async fn read_request(socket: &mut TcpStream) -> Result<CapturedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = find(&buf, b"\r\n\r\n") {
            break pos;
        }
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            return Err(anyhow!("connection closed mid-headers"));
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let request_line = lines.next().context("empty request")?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().context("missing method")?.to_string();
    let path = parts.next().context("missing path")?.to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Ok(CapturedRequest {
        method,
        path,
        headers,
        body,
    })
}

async fn write_response(
    socket: &mut TcpStream,
    status: u16,
    body: &[u8],
    content_length: usize,
) -> Result<()> {
    let head = format!(
        "HTTP/1.1 {} STUB\r\nContent-Length: {}\r\nContent-Type: application/json\r\nConnection: close\r\n\r\n",
        status, content_length
    );
    socket.write_all(head.as_bytes()).await?;
    socket.write_all(body).await?;
    socket.flush().await?;
    Ok(())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
