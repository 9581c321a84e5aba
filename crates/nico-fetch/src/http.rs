//! Direct download of a single media URL.

use std::path::Path;
use std::time::Instant;

use futures::StreamExt;
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use crate::error::DownloadError;

/// Streams one URL into one file.
///
/// Use the client of the session that resolved the URL, so the request
/// carries the same cookies.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Create (or truncate) `output`, then copy the response body into it.
    ///
    /// Returns the number of bytes written. The file is created before the
    /// request is sent, so a failed request leaves an empty or partial file
    /// behind.
    #[instrument(skip(self), level = "debug")]
    pub async fn download(&self, url: &str, output: &Path) -> Result<u64, DownloadError> {
        let mut file = File::create(output)
            .await
            .map_err(|e| DownloadError::io(output, e))?;

        info!(url = %url, path = %output.display(), "Starting download");
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                status,
                url: url.to_owned(),
            });
        }
        match response.content_length() {
            Some(len) => debug!(url = %url, content_length = len, "Response headers received"),
            None => debug!(url = %url, "Content length not available"),
        }

        let started = Instant::now();
        let mut written = 0u64;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(|e| DownloadError::copy(output, written, e))?;
            file.write_all(&chunk)
                .await
                .map_err(|e| DownloadError::copy(output, written, e))?;
            written += chunk.len() as u64;
        }
        file.flush()
            .await
            .map_err(|e| DownloadError::copy(output, written, e))?;

        info!(
            path = %output.display(),
            bytes = written,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Download complete"
        );
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn writes_body_to_file() {
        let server = MockServer::start().await;
        let body: Vec<u8> = (0..=255u8).cycle().take(64 * 1024 + 7).collect();
        Mock::given(method("GET"))
            .and(path("/v.mp4"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sm1.mp4");
        let written = HttpDownloader::new(Client::new())
            .download(&format!("{}/v.mp4", server.uri()), &out)
            .await
            .unwrap();

        assert_eq!(written, body.len() as u64);
        assert_eq!(tokio::fs::read(&out).await.unwrap(), body);
    }

    #[tokio::test]
    async fn error_status_is_network_class() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("gone.mp4");
        let err = HttpDownloader::new(Client::new())
            .download(&format!("{}/gone", server.uri()), &out)
            .await
            .unwrap_err();
        assert!(err.is_network(), "{err}");
        // Created before the request went out.
        assert!(out.exists());
    }

    #[tokio::test]
    async fn unwritable_target_fails_before_any_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("missing-dir").join("v.mp4");
        let err = HttpDownloader::new(Client::new())
            .download(&format!("{}/v.mp4", server.uri()), &out)
            .await
            .unwrap_err();
        assert!(matches!(err, DownloadError::Io { .. }), "{err}");
    }
}
