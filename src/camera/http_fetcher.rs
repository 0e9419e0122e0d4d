use crate::core::capture_source::SnapshotSource;
use crate::errors::FetchError;
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// Plain HTTP GET snapshot fetcher. One client is shared by every host so
/// connections are pooled across rounds.
#[derive(Clone)]
pub struct HttpSnapshotFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpSnapshotFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }

    fn classify(&self, err: reqwest::Error) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else {
            FetchError::Network(err)
        }
    }

    async fn copy_body(
        &self,
        mut response: reqwest::Response,
        file: &mut File,
        destination: &Path,
    ) -> Result<u64, FetchError> {
        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(|e| self.classify(e))? {
            file.write_all(&chunk).await.map_err(|source| FetchError::Write {
                path: destination.to_path_buf(),
                source,
            })?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|source| FetchError::Write {
            path: destination.to_path_buf(),
            source,
        })?;
        Ok(written)
    }
}

#[async_trait]
impl SnapshotSource for HttpSnapshotFetcher {
    async fn fetch(&self, url: &str, destination: &Path) -> Result<u64, FetchError> {
        debug!("Requesting snapshot from {}", url);
        let response = self.client.get(url).send().await.map_err(|e| self.classify(e))?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::BadStatus(response.status()));
        }

        let mut file = File::create(destination).await.map_err(|source| FetchError::FileCreate {
            path: destination.to_path_buf(),
            source,
        })?;

        match self.copy_body(response, &mut file, destination).await {
            Ok(written) => Ok(written),
            Err(err) => {
                drop(file);
                // A truncated image is worse than none.
                if let Err(e) = tokio::fs::remove_file(destination).await {
                    warn!("Could not remove partial snapshot '{}': {}", destination.display(), e);
                }
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const JPEG_BYTES: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0xFF, 0xD9];

    fn fetcher() -> HttpSnapshotFetcher {
        HttpSnapshotFetcher::new(Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn writes_full_body_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/snapshot.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG_BYTES))
            .expect(1)
            .mount(&server)
            .await;
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("shot.jpg");

        let written = fetcher()
            .fetch(&format!("{}/snapshot.jpg", server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(written, JPEG_BYTES.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), JPEG_BYTES);
    }

    #[tokio::test]
    async fn overwrites_an_existing_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG_BYTES))
            .mount(&server)
            .await;
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("shot.jpg");
        std::fs::write(&dest, vec![0u8; 4096]).unwrap();

        fetcher().fetch(&server.uri(), &dest).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), JPEG_BYTES);
    }

    #[tokio::test]
    async fn non_200_is_bad_status_and_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("camera on fire"))
            .mount(&server)
            .await;
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("shot.jpg");

        let err = fetcher().fetch(&server.uri(), &dest).await.unwrap_err();

        assert!(matches!(err, FetchError::BadStatus(s) if s == StatusCode::INTERNAL_SERVER_ERROR));
        assert!(err.to_string().contains("500"));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn other_2xx_codes_are_rejected_too() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("shot.jpg");

        let err = fetcher().fetch(&server.uri(), &dest).await.unwrap_err();

        assert!(matches!(err, FetchError::BadStatus(s) if s == StatusCode::NO_CONTENT));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn missing_destination_directory_is_file_create_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(JPEG_BYTES))
            .mount(&server)
            .await;
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("no-such-host").join("shot.jpg");

        let err = fetcher().fetch(&server.uri(), &dest).await.unwrap_err();

        assert!(matches!(err, FetchError::FileCreate { .. }));
    }

    #[tokio::test]
    async fn unreachable_host_is_network_error() {
        // Bind then drop to get a local port with nothing listening.
        let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("shot.jpg");

        let err = fetcher()
            .fetch(&format!("http://127.0.0.1:{}/snapshot.jpg", port), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, FetchError::Network(_)));
        assert!(!dest.exists());
    }

    /// Serves a 200 that promises more body than it sends, then either hangs
    /// up or goes quiet.
    async fn truncated_camera(hang_up: bool) -> String {
        use tokio::io::AsyncReadExt;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 1024];
            let _ = socket.read(&mut request).await;
            let head = "HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: 100000\r\n\r\n";
            socket.write_all(head.as_bytes()).await.unwrap();
            socket.write_all(&[0xAB; 5000]).await.unwrap();
            socket.flush().await.unwrap();
            if !hang_up {
                tokio::time::sleep(Duration::from_secs(30)).await;
            }
        });
        format!("http://{}/snapshot.jpg", addr)
    }

    #[tokio::test]
    async fn connection_dropped_mid_body_fails_and_leaves_no_file() {
        let url = truncated_camera(true).await;
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("shot.jpg");

        let err = fetcher().fetch(&url, &dest).await.unwrap_err();

        assert!(matches!(err, FetchError::Network(_) | FetchError::Timeout(_)), "got {:?}", err);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn stall_mid_body_times_out_and_leaves_no_file() {
        let url = truncated_camera(false).await;
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("shot.jpg");
        let fetcher = HttpSnapshotFetcher::new(Duration::from_millis(300)).unwrap();

        let err = fetcher.fetch(&url, &dest).await.unwrap_err();

        assert!(matches!(err, FetchError::Timeout(_)), "got {:?}", err);
        assert!(!dest.exists());
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn slow_camera_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(JPEG_BYTES)
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("shot.jpg");
        let fetcher = HttpSnapshotFetcher::new(Duration::from_millis(200)).unwrap();

        let err = fetcher.fetch(&server.uri(), &dest).await.unwrap_err();

        assert!(matches!(err, FetchError::Timeout(_)));
    }
}
