use async_trait::async_trait;
use std::time::{Duration, Instant};

use crate::error::Result;

/// What a probe observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status_code: u16,
    pub response_time: Duration,
}

/// Reachability check against a URL.
///
/// Any HTTP response, whatever its status code, is `Ok`. Only transport
/// problems (refused connection, DNS failure, deadline exceeded) are errors.
/// Dropping the returned future cancels the probe.
#[async_trait]
pub trait Checker: Send + Sync {
    async fn check(&self, url: &str, timeout: Duration) -> Result<ProbeResponse>;
}

/// HTTP/HTTPS checker. Redirects are followed (up to reqwest's default of
/// ten hops) and the final response's status is reported.
pub struct HttpChecker {
    client: reqwest::Client,
}

impl HttpChecker {
    /// `default_timeout` bounds the client as a whole; each call may pass a
    /// tighter deadline.
    pub fn new(default_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(default_timeout)
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Checker for HttpChecker {
    async fn check(&self, url: &str, timeout: Duration) -> Result<ProbeResponse> {
        let start = Instant::now();

        let response = self.client.get(url).timeout(timeout).send().await?;

        Ok(ProbeResponse {
            status_code: response.status().as_u16(),
            response_time: start.elapsed(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve a single canned HTTP response on a random local port
    async fn serve_once(status_line: &'static str, delay: Duration) -> String {
        serve_with_headers(status_line, String::new(), delay).await
    }

    async fn serve_with_headers(status_line: &'static str, headers: String, delay: Duration) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            tokio::time::sleep(delay).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\n{headers}content-length: 0\r\nconnection: close\r\n\r\n"
            );
            let _ = socket.write_all(response.as_bytes()).await;
        });

        format!("http://{addr}/")
    }

    #[tokio::test]
    async fn test_success_response() {
        let url = serve_once("200 OK", Duration::ZERO).await;
        let checker = HttpChecker::new(Duration::from_secs(5)).unwrap();

        let response = checker.check(&url, Duration::from_secs(5)).await.unwrap();

        assert_eq!(response.status_code, 200);
        assert!(response.response_time > Duration::ZERO);
    }

    #[tokio::test]
    async fn test_server_error_is_not_a_probe_failure() {
        let url = serve_once("500 Internal Server Error", Duration::ZERO).await;
        let checker = HttpChecker::new(Duration::from_secs(5)).unwrap();

        let response = checker.check(&url, Duration::from_secs(5)).await.unwrap();

        assert_eq!(response.status_code, 500);
    }

    #[tokio::test]
    async fn test_redirect_is_followed_to_final_status() {
        let destination = serve_once("200 OK", Duration::ZERO).await;
        let url = serve_with_headers(
            "301 Moved Permanently",
            format!("location: {destination}\r\n"),
            Duration::ZERO,
        )
        .await;
        let checker = HttpChecker::new(Duration::from_secs(5)).unwrap();

        let response = checker.check(&url, Duration::from_secs(5)).await.unwrap();

        assert_eq!(response.status_code, 200);
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let url = serve_once("200 OK", Duration::from_secs(2)).await;
        let checker = HttpChecker::new(Duration::from_secs(5)).unwrap();

        let err = checker.check(&url, Duration::from_millis(100)).await.unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        // bind then drop to get a port nobody listens on
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let checker = HttpChecker::new(Duration::from_secs(5)).unwrap();
        let err = checker.check(&format!("http://{addr}/"), Duration::from_secs(1)).await.unwrap_err();

        assert!(matches!(err, Error::Transport(_)));
    }
}
