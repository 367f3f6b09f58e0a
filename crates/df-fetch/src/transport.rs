//! Raw HTTP access behind a trait so the fetcher can be tested offline.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use df_core::{Error, Result};

/// A completed HTTP exchange after redirects have been followed.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    /// URL of the last hop, after redirects.
    pub final_url: String,
    pub body: Bytes,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs a single GET. Only transport-level failures are errors; any HTTP
/// status is returned as a [`Response`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<Response>;
}

/// [`Transport`] backed by a shared `reqwest` client with a cookie store.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Response> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::download(url, format!("request failed: {e}")))?;

        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let body = resp
            .bytes()
            .await
            .map_err(|e| Error::download(url, format!("failed to read body: {e}")))?;

        Ok(Response {
            status,
            final_url,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn transport() -> HttpTransport {
        HttpTransport::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn returns_body_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slides/s1.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpeg".to_vec()))
            .mount(&server)
            .await;

        let url = format!("{}/slides/s1.jpg", server.uri());
        let resp = transport().get(&url).await.unwrap();
        assert!(resp.is_success());
        assert_eq!(resp.final_url, url);
        assert_eq!(&resp.body[..], b"jpeg");
    }

    #[tokio::test]
    async fn error_status_is_not_a_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let resp = transport()
            .get(&format!("{}/missing.jpg", server.uri()))
            .await
            .unwrap();
        assert_eq!(resp.status, 404);
        assert!(!resp.is_success());
    }

    #[tokio::test]
    async fn reports_final_url_after_redirect() {
        let server = MockServer::start().await;
        let not_found = format!("{}/error?sc=404", server.uri());
        Mock::given(method("GET"))
            .and(path("/talk.mp3"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", not_found.as_str()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/error"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not found</html>"))
            .mount(&server)
            .await;

        let resp = transport()
            .get(&format!("{}/talk.mp3", server.uri()))
            .await
            .unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.final_url, not_found);
    }

    #[tokio::test]
    async fn connection_failure_is_download_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let err = transport()
            .get(&format!("http://127.0.0.1:{port}/x"))
            .await
            .unwrap_err();
        assert!(err.is_download());
    }
}
