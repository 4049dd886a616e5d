//! Reachability of the application under test
//!
//! The suite doesn't own the application; it only checks that the base URL
//! answers before launching any browser, so an outage shows up as one clear
//! error instead of every scenario failing on navigation.

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

/// Probe settings for the target application
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// Skip the probe entirely
    pub enabled: bool,

    /// Give up after this long
    pub timeout: Duration,

    /// Delay between attempts
    pub interval: Duration,

    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout: Duration::from_secs(15),
            interval: Duration::from_millis(500),
            request_timeout: Duration::from_secs(5),
        }
    }
}

/// Wait for the target to respond with a success status
pub async fn wait_for_target(base_url: &str, config: &ProbeConfig) -> E2eResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()?;

    let start = Instant::now();
    let mut attempts = 0;

    loop {
        attempts += 1;

        match client.get(base_url).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("Target {} is reachable", base_url);
                return Ok(());
            }
            Ok(resp) => {
                warn!("Target returned {}", resp.status());
            }
            Err(e) => {
                if attempts == 1 {
                    info!("Waiting for {} ...", base_url);
                }
                if !e.is_connect() && !e.is_timeout() {
                    warn!("Probe error: {}", e);
                }
            }
        }

        if start.elapsed() + config.interval >= config.timeout {
            break;
        }
        sleep(config.interval).await;
    }

    Err(E2eError::TargetUnreachable {
        url: base_url.to_string(),
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn disabled_probe_is_a_no_op() {
        let config = ProbeConfig {
            enabled: false,
            ..Default::default()
        };
        wait_for_target("http://127.0.0.1:1/", &config).await.unwrap();
    }

    #[tokio::test]
    async fn unreachable_target_reports_attempts() {
        // Bind then drop to get a port nothing listens on.
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let config = ProbeConfig {
            enabled: true,
            timeout: Duration::from_millis(300),
            interval: Duration::from_millis(50),
            request_timeout: Duration::from_millis(100),
        };

        let err = wait_for_target(&format!("http://127.0.0.1:{}/", port), &config)
            .await
            .unwrap_err();
        match err {
            E2eError::TargetUnreachable { attempts, .. } => assert!(attempts >= 2),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn reachable_target_passes() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok")
                .await
                .unwrap();
        });

        wait_for_target(&format!("http://{}/", addr), &ProbeConfig::default())
            .await
            .unwrap();
    }
}
