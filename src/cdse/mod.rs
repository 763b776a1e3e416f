//! Copernicus Data Space Ecosystem (CDSE) catalog client.
//! Token authentication against the CDSE identity service, OData product
//! search, and streaming product downloads.
pub mod auth;
pub mod download;
pub mod query;

pub use auth::{Credentials, request_access_token};
pub use download::download_product;
pub use query::{ProductEntry, ProductQuery, search_products};

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors from the catalog client
#[derive(Debug, Error)]
pub enum CdseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Credentials file not found: {0:?} (create it with USER=... and PASSWORD=... lines)")]
    CredentialsNotFound(PathBuf),
    #[error("Missing `{0}` entry in credentials file")]
    MissingCredential(&'static str),
    #[error("Token request rejected (status {status}): {body}")]
    Auth { status: u16, body: String },
    #[error("Catalog query failed (status {status}): {body}")]
    Query { status: u16, body: String },
    #[error("Download of {product} failed: {reason}")]
    Download { product: String, reason: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Build the blocking HTTP client the catalog calls share.
///
/// Redirects are disabled: the download host sits behind a cross-origin
/// redirect that must keep its Authorization header, so hops are followed
/// by hand in [`download::download_product`]. The total-request timeout is
/// disabled as well, since product archives run to several hundred MB;
/// only the connect phase keeps a deadline.
pub fn http_client() -> Result<reqwest::blocking::Client, CdseError> {
    let client = reqwest::blocking::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .connect_timeout(Duration::from_secs(30))
        .timeout(None)
        .user_agent(concat!("s2rgb/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Loopback HTTP responder serving canned responses, one connection per
/// response, so the client paths can run against a local socket.
#[cfg(test)]
pub(crate) mod test_server {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread;

    /// Bind an ephemeral loopback listener and return it with its base URL.
    pub fn bind() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        (listener, base)
    }

    /// Answer one connection per canned response, in order. The handle
    /// yields the raw requests once every response has been served.
    pub fn serve(listener: TcpListener, responses: Vec<String>) -> thread::JoinHandle<Vec<String>> {
        thread::spawn(move || {
            responses
                .into_iter()
                .map(|response| {
                    let (mut stream, _) = listener.accept().unwrap();
                    let request = read_request(&mut stream);
                    stream.write_all(response.as_bytes()).unwrap();
                    request
                })
                .collect()
        })
    }

    /// Read one HTTP request: headers through the blank line, then the body
    /// for as many bytes as Content-Length declares.
    fn read_request(stream: &mut TcpStream) -> String {
        let mut bytes = Vec::new();
        let mut buf = [0u8; 1024];
        let header_end = loop {
            let n = stream.read(&mut buf).unwrap();
            bytes.extend_from_slice(&buf[..n]);
            if let Some(pos) = bytes.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
            if n == 0 {
                break bytes.len();
            }
        };
        let body_len = String::from_utf8_lossy(&bytes[..header_end])
            .to_lowercase()
            .lines()
            .find_map(|line| line.strip_prefix("content-length:").map(str::to_string))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        while bytes.len() < header_end + body_len {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            bytes.extend_from_slice(&buf[..n]);
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
