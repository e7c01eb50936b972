//! Remote side of the pipeline: finding and fetching featured images.
//!
//! Both halves share one HTTP client and one rejection filter.
//!
//! 1. **Locating** ([`locator`]): fetch an article page on note.com and list
//!    the usable image candidates inside its content container
//! 2. **Downloading** ([`downloader`]): fetch a candidate and store it under
//!    `img/blog/`, reusing a file that is already there
//!
//! Requests are sequential. Every request carries a fixed timeout and a
//! browser-like user agent; note.com serves bots an empty shell otherwise.

pub mod downloader;
pub mod locator;

use reqwest::Client;
use std::error::Error;
use std::time::Duration;

/// User agent sent with every request.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Build the HTTP client shared by the locator and the downloader.
pub fn build_client(user_agent: &str, timeout: Duration) -> Result<Client, Box<dyn Error>> {
    let client = Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// True when a URL points at something that is not a real featured image.
///
/// Rejects data URIs and anything whose URL mentions `empty` or `icon`
/// (case-insensitive). The `empty` match also covers note.com's
/// `note_empty_ogp` placeholder.
pub fn is_rejected_image_url(url: &str) -> bool {
    let lower = url.to_lowercase();
    lower.contains("data:") || lower.contains("empty") || lower.contains("icon")
}

#[cfg(test)]
pub(crate) mod test_server {
    //! Minimal one-shot HTTP server for exercising the client code.

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// A canned response keyed by request path.
    #[derive(Clone)]
    pub struct Route {
        pub path: &'static str,
        pub status: u16,
        pub content_type: &'static str,
        pub body: Vec<u8>,
    }

    /// Serve `routes` on an ephemeral port. Returns the base URL and a counter
    /// of requests received.
    pub async fn serve(routes: Vec<Route>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                counter.fetch_add(1, Ordering::SeqCst);

                let mut buf = vec![0u8; 8192];
                let mut read = 0;
                while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut buf[read..]).await {
                        Ok(0) | Err(_) => break,
                        Ok(n) => read += n,
                    }
                }
                let request = String::from_utf8_lossy(&buf[..read]);
                let path = request
                    .lines()
                    .next()
                    .and_then(|line| line.split_whitespace().nth(1))
                    .unwrap_or("/")
                    .to_string();

                let (status, content_type, body) = match routes.iter().find(|r| r.path == path) {
                    Some(r) => (r.status, r.content_type, r.body.clone()),
                    None => (404, "text/plain", b"not found".to_vec()),
                };
                let head = format!(
                    "HTTP/1.1 {status} X\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = socket.write_all(head.as_bytes()).await;
                let _ = socket.write_all(&body).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}"), hits)
    }
}
