//! Fetch a disclosure attachment and turn it into plain text.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{header::CONTENT_TYPE, Client};
use thiserror::Error;

use crate::telemetry;

mod pdf;
mod xml;

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Xml,
    Unknown,
}

type Extractor = fn(&[u8]) -> String;

// one entry per extractable kind; Unknown has none
const EXTRACTORS: &[(DocumentKind, Extractor)] = &[
    (DocumentKind::Pdf, pdf::extract_text),
    (DocumentKind::Xml, xml::extract_text),
];

impl DocumentKind {
    /// URL first, then the declared content type.
    pub fn classify(url: &str, content_type: Option<&str>) -> Self {
        let url = url.to_ascii_lowercase();
        let mime = content_type.unwrap_or_default().to_ascii_lowercase();
        if url.contains(".pdf") {
            DocumentKind::Pdf
        } else if url.contains(".xml") {
            DocumentKind::Xml
        } else if mime.contains("application/pdf") {
            DocumentKind::Pdf
        } else if mime.contains("application/xml") || mime.contains("text/xml") {
            DocumentKind::Xml
        } else {
            DocumentKind::Unknown
        }
    }

    fn extractor(self) -> Option<Extractor> {
        EXTRACTORS.iter().find(|(k, _)| *k == self).map(|(_, f)| *f)
    }
}

/// Extracted text for a classified body, or `None` for an unknown kind.
pub fn extract(kind: DocumentKind, body: &[u8]) -> Option<String> {
    kind.extractor().map(|f| f(body))
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("http status {0}")]
    Status(reqwest::StatusCode),
    #[error("unsupported document type (content-type {0:?})")]
    Unsupported(Option<String>),
}

#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Plain text behind `url`. `None` covers fetch failures and unknown
    /// document types alike; neither is retried.
    async fn fetch_text(&self, url: &str) -> Option<String>;
}

#[derive(Clone)]
pub struct HttpDocumentSource {
    http: Client,
}

impl HttpDocumentSource {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).user_agent(USER_AGENT).build()?;
        Ok(Self { http })
    }

    async fn download(&self, url: &str) -> Result<(Bytes, Option<String>), FetchError> {
        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.bytes().await?;
        Ok((body, content_type))
    }

    async fn try_fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let (body, content_type) = self.download(url).await?;
        let kind = DocumentKind::classify(url, content_type.as_deref());
        extract(kind, &body).ok_or(FetchError::Unsupported(content_type))
    }
}

#[async_trait]
impl DocumentSource for HttpDocumentSource {
    async fn fetch_text(&self, url: &str) -> Option<String> {
        match self.try_fetch_text(url).await {
            Ok(text) => Some(text),
            Err(e) => {
                telemetry::summarize().warn_kv("document unavailable", [("url", url.to_string()), ("error", e.to_string())]);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn extension_wins_over_content_type() {
        assert_eq!(DocumentKind::classify("https://x/a/ANN_123.PDF", Some("text/xml")), DocumentKind::Pdf);
        assert_eq!(DocumentKind::classify("https://x/a/brsr.xml", Some("application/pdf")), DocumentKind::Xml);
    }

    #[test]
    fn falls_back_to_content_type() {
        assert_eq!(DocumentKind::classify("https://x/download?id=1", Some("application/pdf")), DocumentKind::Pdf);
        assert_eq!(DocumentKind::classify("https://x/download?id=1", Some("text/xml; charset=utf-8")), DocumentKind::Xml);
        assert_eq!(DocumentKind::classify("https://x/download?id=1", Some("application/xml")), DocumentKind::Xml);
    }

    #[test]
    fn unknown_has_no_text() {
        assert_eq!(DocumentKind::classify("https://x/page", Some("text/html")), DocumentKind::Unknown);
        assert_eq!(DocumentKind::classify("https://x/page", None), DocumentKind::Unknown);
        assert_eq!(extract(DocumentKind::Unknown, b"<html>hi</html>"), None);
    }

    #[test]
    fn dispatch_routes_xml_body() {
        let text = extract(DocumentKind::Xml, b"<a><b>one</b><c>two</c></a>");
        assert_eq!(text.as_deref(), Some("one two"));
    }

    #[test]
    fn dispatch_routes_pdf_body() {
        assert_eq!(extract(DocumentKind::Pdf, b"not a pdf").as_deref(), Some(""));
    }

    /// Answer exactly one request with a canned response; returns its URL.
    async fn serve_once(status: &'static str, content_type: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = sock.read(&mut buf).await;
            let resp = format!(
                "HTTP/1.1 {status}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = sock.write_all(resp.as_bytes()).await;
            let _ = sock.shutdown().await;
        });
        format!("http://{addr}/filing")
    }

    fn source() -> HttpDocumentSource {
        HttpDocumentSource::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn xml_response_yields_text() {
        let url = serve_once("200 OK", "text/xml", "<r><a>quarterly</a><b>results</b></r>").await;
        assert_eq!(source().fetch_text(&url).await.as_deref(), Some("quarterly results"));
    }

    #[tokio::test]
    async fn non_success_status_yields_none() {
        let url = serve_once("404 Not Found", "text/xml", "<r>missing</r>").await;
        assert_eq!(source().fetch_text(&url).await, None);
    }

    #[tokio::test]
    async fn unknown_content_type_yields_none() {
        let url = serve_once("200 OK", "text/html", "<html><body>login</body></html>").await;
        assert_eq!(source().fetch_text(&url).await, None);
    }

    #[tokio::test]
    async fn refused_connection_yields_none() {
        assert_eq!(source().fetch_text("http://127.0.0.1:1/filing.pdf").await, None);
    }
}
