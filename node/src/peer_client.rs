//! # HTTP Peer Client
//!
//! The node's implementation of [`PeerClient`]: a plain HTTP/1.1 `GET
//! /blockchain` over a tokio `TcpStream`, one connection per fetch.
//!
//! ## Design Decisions
//!
//! - **No HTTP client crate.** The request is one fixed line and the response
//!   is read to EOF (`Connection: close`). Both fixed-length and chunked
//!   bodies are understood, which covers every server peers realistically
//!   run.
//! - **No timeout here.** The synchronizer wraps every fetch in its own
//!   timeout; this client just does I/O.
//! - **Bounded reads.** A peer cannot make the node buffer more than
//!   [`MAX_RESPONSE_BYTES`].

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use denarius_protocol::network::peers::PeerAddress;
use denarius_protocol::network::sync::{ChainResponse, PeerClient, PeerError};

/// Largest response body accepted from a peer.
pub const MAX_RESPONSE_BYTES: u64 = 64 * 1024 * 1024;

/// Path of the chain-fetch endpoint every node serves.
pub const CHAIN_PATH: &str = "/blockchain";

/// A raw HTTP response, split into status and decoded body.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Fetches peer chains over plain HTTP.
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpPeerClient;

impl HttpPeerClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn fetch_chain(&self, peer: &PeerAddress) -> Result<ChainResponse, PeerError> {
        let response = http_get(peer, CHAIN_PATH).await?;
        if response.status != 200 {
            return Err(PeerError::InvalidResponse(format!("HTTP {}", response.status)));
        }
        let value: serde_json::Value = serde_json::from_slice(&response.body)
            .map_err(|e| PeerError::InvalidResponse(format!("body is not JSON: {}", e)))?;
        ChainResponse::from_value(value)
    }
}

/// Issue `GET path` to `peer` and read the whole response.
pub async fn http_get(peer: &PeerAddress, path: &str) -> Result<HttpResponse, PeerError> {
    let authority = peer.to_string();
    let mut stream = TcpStream::connect(authority.as_str())
        .await
        .map_err(|e| PeerError::Unreachable(format!("{}: {}", authority, e)))?;

    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nAccept: application/json\r\nConnection: close\r\n\r\n",
        path, authority,
    );
    stream
        .write_all(request.as_bytes())
        .await
        .map_err(|e| PeerError::Unreachable(e.to_string()))?;

    let mut raw = Vec::new();
    (&mut stream)
        .take(MAX_RESPONSE_BYTES + 1)
        .read_to_end(&mut raw)
        .await
        .map_err(|e| PeerError::Unreachable(e.to_string()))?;
    if raw.len() as u64 > MAX_RESPONSE_BYTES {
        return Err(PeerError::InvalidResponse("response too large".into()));
    }

    parse_response(&raw)
}

/// Split a complete HTTP/1.1 response into status and body.
pub fn parse_response(raw: &[u8]) -> Result<HttpResponse, PeerError> {
    let split = find(raw, b"\r\n\r\n")
        .ok_or_else(|| PeerError::InvalidResponse("truncated HTTP response".into()))?;
    let head = std::str::from_utf8(&raw[..split])
        .map_err(|_| PeerError::InvalidResponse("non-UTF-8 response head".into()))?;
    let body = &raw[split + 4..];

    let mut lines = head.split("\r\n");
    let status = lines
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| PeerError::InvalidResponse("malformed status line".into()))?;

    let chunked = lines.any(|line| {
        line.split_once(':').is_some_and(|(name, value)| {
            name.trim().eq_ignore_ascii_case("transfer-encoding")
                && value.to_ascii_lowercase().contains("chunked")
        })
    });

    let body = if chunked {
        decode_chunked(body)?
    } else {
        body.to_vec()
    };
    Ok(HttpResponse { status, body })
}

fn decode_chunked(mut data: &[u8]) -> Result<Vec<u8>, PeerError> {
    let bad = |what: &str| PeerError::InvalidResponse(format!("bad chunked body: {}", what));
    let mut out = Vec::new();
    loop {
        let line_end = find(data, b"\r\n").ok_or_else(|| bad("missing size line"))?;
        let size_line = std::str::from_utf8(&data[..line_end]).map_err(|_| bad("size line"))?;
        let size_hex = size_line.split(';').next().unwrap_or_default().trim();
        let size = usize::from_str_radix(size_hex, 16).map_err(|_| bad("chunk size"))?;
        data = &data[line_end + 2..];
        if size == 0 {
            return Ok(out);
        }
        if size as u64 > MAX_RESPONSE_BYTES {
            return Err(bad("chunk too large"));
        }
        let framed = size.checked_add(2).ok_or_else(|| bad("chunk too large"))?;
        if data.len() < framed {
            return Err(bad("truncated chunk"));
        }
        out.extend_from_slice(&data[..size]);
        data = &data[framed..];
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use denarius_protocol::consensus::ProofOfWork;
    use denarius_protocol::storage::Chain;
    use tokio::net::TcpListener;

    /// Serve one canned response on an ephemeral port.
    async fn serve_once(response: Vec<u8>) -> PeerAddress {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket.write_all(&response).await.unwrap();
        });
        PeerAddress::new("127.0.0.1", port).unwrap()
    }

    fn http_ok(body: &str) -> Vec<u8> {
        format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
            body.len(),
            body
        )
        .into_bytes()
    }

    #[test]
    fn parses_fixed_length_response() {
        let parsed = parse_response(&http_ok("{\"a\":1}")).unwrap();
        assert_eq!(parsed.status, 200);
        assert_eq!(parsed.body, b"{\"a\":1}");
    }

    #[test]
    fn parses_chunked_response() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n4\r\n{\"a\"\r\n3\r\n:1}\r\n0\r\n\r\n";
        let parsed = parse_response(raw).unwrap();
        assert_eq!(parsed.body, b"{\"a\":1}");
    }

    #[test]
    fn rejects_truncated_response() {
        assert!(matches!(
            parse_response(b"HTTP/1.1 200 OK\r\nContent-Length: 5"),
            Err(PeerError::InvalidResponse(_))
        ));
    }

    #[test]
    fn oversized_chunk_size_is_invalid_response() {
        for size in ["ffffffffffffffff", "fffffffffffffffe", "4000001"] {
            let raw = format!(
                "HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n{}\r\nab\r\n0\r\n\r\n",
                size
            );
            assert_eq!(
                parse_response(raw.as_bytes()).unwrap_err(),
                PeerError::InvalidResponse("bad chunked body: chunk too large".into()),
                "chunk size {size}"
            );
        }
    }

    #[test]
    fn chunk_longer_than_body_is_truncated() {
        let raw = b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n10\r\nab\r\n";
        assert_eq!(
            parse_response(raw).unwrap_err(),
            PeerError::InvalidResponse("bad chunked body: truncated chunk".into())
        );
    }

    #[tokio::test]
    async fn hostile_chunked_peer_is_invalid_response() {
        let peer = serve_once(
            b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nffffffffffffffff\r\nab\r\n0\r\n\r\n"
                .to_vec(),
        )
        .await;
        let err = HttpPeerClient::new().fetch_chain(&peer).await.unwrap_err();
        assert!(matches!(err, PeerError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn fetches_chain_from_peer() {
        let engine = ProofOfWork::new("0");
        let chain = Chain::new_with_genesis(&engine);
        let body = serde_json::to_string(&ChainResponse::new(chain.blocks().to_vec())).unwrap();
        let peer = serve_once(http_ok(&body)).await;

        let response = HttpPeerClient::new().fetch_chain(&peer).await.unwrap();
        assert_eq!(response.length, 1);
        assert_eq!(response.chain, chain.blocks());
    }

    #[tokio::test]
    async fn non_success_status_is_invalid_response() {
        let peer = serve_once(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 0\r\n\r\n".to_vec()).await;
        let err = HttpPeerClient::new().fetch_chain(&peer).await.unwrap_err();
        assert_eq!(err, PeerError::InvalidResponse("HTTP 500".into()));
    }

    #[tokio::test]
    async fn garbage_body_is_invalid_response() {
        let peer = serve_once(http_ok("<html>not a chain</html>")).await;
        let err = HttpPeerClient::new().fetch_chain(&peer).await.unwrap_err();
        assert!(matches!(err, PeerError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let peer = PeerAddress::new("127.0.0.1", port).unwrap();
        let err = HttpPeerClient::new().fetch_chain(&peer).await.unwrap_err();
        assert!(matches!(err, PeerError::Unreachable(_)));
    }
}
