//! HTTP.
//!
//! This module contains the code to fetch pages and download files.

use anyhow::Context;
use reqwest::blocking::Response;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{instrument, trace};

/// Trait for everything that retrieves remote resources.
pub(crate) trait Fetch {
    /// Fetches the given URL and decodes the body as text.
    fn fetch_text(&self, url: &str) -> anyhow::Result<String>;

    /// Downloads the given URL to `dest` and returns the number of bytes written.
    fn download(&self, url: &str, dest: &Path) -> anyhow::Result<u64>;
}

/// [`Fetch`] implementation on top of a blocking [reqwest] client.
#[derive(Debug)]
pub(crate) struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Creates a new `HttpFetcher` that sends the given user agent.
    pub(crate) fn new(user_agent: &str) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder() //
            .user_agent(user_agent)
            .timeout(None::<Duration>)
            .build()?;

        Ok(Self { client })
    }
}

impl Fetch for HttpFetcher {
    #[instrument(level = "trace", skip(self))]
    fn fetch_text(&self, url: &str) -> anyhow::Result<String> {
        let response = self
            .client
            .get(url) //
            .header(reqwest::header::ACCEPT, "text/html")
            .send()?
            .error_for_status()?;

        // the charset of the content type wins, if there is one
        let text = response.text_with_charset("utf-8")?;
        trace!(len = text.len());

        Ok(text)
    }

    #[instrument(level = "trace", skip(self))]
    fn download(&self, url: &str, dest: &Path) -> anyhow::Result<u64> {
        let mut response = self
            .client
            .get(url) //
            .header(reqwest::header::ACCEPT, "application/octet-stream")
            .send()?
            .error_for_status()?;

        // download to a temporary name so an interrupted download never looks complete
        let mut part = dest.as_os_str().to_owned();
        part.push(".part");
        let part = PathBuf::from(part);
        let bytes_written = match save(&mut response, &part, dest) {
            Ok(bytes_written) => bytes_written,
            Err(err) => {
                if let Err(remove_err) = fs::remove_file(&part) {
                    trace!(?remove_err, "failed to remove partial download");
                }
                return Err(err);
            }
        };
        trace!(bytes_written);

        Ok(bytes_written)
    }
}

// Writes the body of the response to `part` and renames it to `dest`.
#[doc(hidden)]
fn save(response: &mut Response, part: &Path, dest: &Path) -> anyhow::Result<u64> {
    let mut part_file = File::create(part).with_context(|| format!("failed to create {}", part.display()))?;
    let bytes_written = response.copy_to(&mut part_file)?;
    drop(part_file);
    fs::rename(part, dest)?;

    Ok(bytes_written)
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::config::DEFAULT_USER_AGENT;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::{self, JoinHandle};
    use tempfile::tempdir;
    use test_log::test;

    // Serves the given raw response to a single connection and hands back the raw request.
    fn serve(response: Vec<u8>) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/downloads/windows/", listener.local_addr().unwrap());
        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            stream.write_all(&response).unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (url, handle)
    }

    fn response(status: &str, content_type: &str, content_length: usize, body: &[u8]) -> Vec<u8> {
        let head = format!("HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {content_length}\r\nConnection: close\r\n\r\n");
        let mut response = head.into_bytes();
        response.extend_from_slice(body);
        response
    }

    #[test]
    fn fetch_text_with_declared_charset() {
        let body = b"<p>Gr\xfc\xdfe</p>";
        let (url, server) = serve(response("200 OK", "text/html; charset=iso-8859-1", body.len(), body));
        let fetcher = HttpFetcher::new(DEFAULT_USER_AGENT).unwrap();

        let text = fetcher.fetch_text(&url).unwrap();

        assert_eq!(text, "<p>Grüße</p>");
        server.join().unwrap();
    }

    #[test]
    fn fetch_text_defaults_to_utf8() {
        let body = "<p>Grüße</p>".as_bytes();
        let (url, server) = serve(response("200 OK", "text/html", body.len(), body));
        let fetcher = HttpFetcher::new(DEFAULT_USER_AGENT).unwrap();

        let text = fetcher.fetch_text(&url).unwrap();

        assert_eq!(text, "<p>Grüße</p>");
        server.join().unwrap();
    }

    #[test]
    fn fetch_text_sends_user_agent() {
        let (url, server) = serve(response("200 OK", "text/html", 0, b""));
        let fetcher = HttpFetcher::new("pystand-init-test/1.0").unwrap();

        fetcher.fetch_text(&url).unwrap();

        let request = server.join().unwrap().to_lowercase();
        assert!(request.contains("user-agent: pystand-init-test/1.0\r\n"), "{request}");
    }

    #[test]
    fn fetch_text_not_found() {
        let (url, server) = serve(response("404 Not Found", "text/html", 9, b"not found"));
        let fetcher = HttpFetcher::new(DEFAULT_USER_AGENT).unwrap();

        assert!(fetcher.fetch_text(&url).is_err());
        server.join().unwrap();
    }

    #[test]
    fn download_renames_part_file() {
        let tempdir = tempdir().unwrap();
        let dest = tempdir.path().join("get-pip.py");
        let body = b"# get-pip";
        let (url, server) = serve(response("200 OK", "application/octet-stream", body.len(), body));
        let fetcher = HttpFetcher::new(DEFAULT_USER_AGENT).unwrap();

        let bytes_written = fetcher.download(&url, &dest).unwrap();

        assert_eq!(bytes_written, body.len() as u64);
        assert_eq!(fs::read(&dest).unwrap(), body);
        assert_eq!(fs::read_dir(tempdir.path()).unwrap().count(), 1);
        server.join().unwrap();
    }

    #[test]
    fn download_truncated_leaves_nothing_behind() {
        let tempdir = tempdir().unwrap();
        let dest = tempdir.path().join("python-3.8.10-embed-amd64.zip");
        let (url, server) = serve(response("200 OK", "application/octet-stream", 100_000, b"PK\x03\x04abc"));
        let fetcher = HttpFetcher::new(DEFAULT_USER_AGENT).unwrap();

        assert!(fetcher.download(&url, &dest).is_err());

        assert!(!dest.exists());
        assert_eq!(fs::read_dir(tempdir.path()).unwrap().count(), 0);
        server.join().unwrap();
    }
}
