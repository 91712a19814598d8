//! Uptime-Kuma push monitor
//!
//! A push monitor expects a GET on its URL at a fixed interval and alerts
//! when pings stop arriving.

use anyhow::Result;
use async_trait::async_trait;
use inline_limiter_core::scheduler::PeriodicTask;
use std::time::Duration;
use tracing::{debug, warn};

const PING_TIMEOUT: Duration = Duration::from_secs(10);

/// Periodic GET against a push URL
pub struct HealthPing {
    client: reqwest::Client,
    url: String,
    interval: Duration,
}

impl HealthPing {
    /// Create a pinger for `url`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, interval: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(PING_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
            interval,
        })
    }

    /// Issue one ping.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure or a non-success status.
    pub async fn ping(&self) -> Result<()> {
        self.client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl PeriodicTask for HealthPing {
    fn name(&self) -> &'static str {
        "health ping"
    }

    fn interval(&self) -> Duration {
        self.interval
    }

    async fn tick(&self) {
        match self.ping().await {
            Ok(()) => debug!("Health ping sent"),
            Err(e) => warn!("Health ping failed: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inline_limiter_core::scheduler::spawn_periodic;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    /// Answers every request with `status` and reports each request line.
    async fn push_endpoint(status: &'static str) -> Result<(String, mpsc::UnboundedReceiver<String>)> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = vec![0u8; 4096];
                let n = socket.read(&mut buf).await.unwrap_or(0);
                let request = String::from_utf8_lossy(&buf[..n]);
                let line = request.lines().next().unwrap_or_default().to_string();
                let _ = tx.send(line);
                let response =
                    format!("HTTP/1.1 {status}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        Ok((format!("http://{addr}/api/push/abc?status=up"), rx))
    }

    #[tokio::test]
    async fn test_ping_issues_get_on_push_url() -> Result<()> {
        let (url, mut requests) = push_endpoint("200 OK").await?;
        let pinger = HealthPing::new(url, Duration::from_secs(60))?;

        pinger.ping().await?;

        let line = requests.recv().await.unwrap_or_default();
        assert!(line.starts_with("GET /api/push/abc?status=up"), "got {line}");
        Ok(())
    }

    #[tokio::test]
    async fn test_ping_fails_on_error_status() -> Result<()> {
        let (url, _requests) = push_endpoint("404 Not Found").await?;
        let pinger = HealthPing::new(url, Duration::from_secs(60))?;

        assert!(pinger.ping().await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn test_periodic_ticks_keep_pinging() -> Result<()> {
        let (url, mut requests) = push_endpoint("200 OK").await?;
        let pinger = Arc::new(HealthPing::new(url, Duration::from_millis(50))?);

        let cancel = CancellationToken::new();
        let handle = spawn_periodic(pinger, cancel.clone());
        for _ in 0..2 {
            let line = tokio::time::timeout(Duration::from_secs(5), requests.recv())
                .await?
                .unwrap_or_default();
            assert!(line.starts_with("GET "), "got {line}");
        }
        cancel.cancel();
        handle.await?;
        Ok(())
    }
}
