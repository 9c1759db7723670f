//! Existence probe ("shadowban" check)
//!
//! A shadowbanned or deleted account's public profile answers 404 to logged
//! out visitors. The probe fetches that page and treats 404 as "gone".

use std::future::Future;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::config::BotConfig;
use crate::platform::PlatformError;

/// Decides whether an account still exists
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ExistenceProbe: Send {
    /// True when the account is shadowbanned or deleted
    async fn is_gone(&mut self, username: &str) -> bool;
}

/// Linearly growing delay used between probe attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    step: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    #[must_use]
    pub fn new(base: Duration, step: Duration, max: Duration) -> Self {
        Self {
            base,
            step,
            max: max.max(base),
            current: base,
        }
    }

    #[must_use]
    pub fn from_config(config: &BotConfig) -> Self {
        Self::new(config.sleep_base(), config.sleep_step(), config.max_sleep())
    }

    #[must_use]
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Lengthen the delay by one step, up to the maximum
    pub fn grow(&mut self) {
        self.current = (self.current + self.step).min(self.max);
    }

    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

/// Outcome of a single probe request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeAttempt {
    /// The server answered with this status
    Status(u16),
    /// Could not reach the server; worth retrying
    ConnectionFailed,
    /// Request failed for some other reason
    Failed,
}

impl ProbeAttempt {
    fn from_result(result: Result<reqwest::Response, reqwest::Error>) -> Self {
        match result {
            Ok(response) => Self::Status(response.status().as_u16()),
            Err(e) if e.is_connect() || e.is_timeout() => {
                debug!("Probe connection failure: {e}");
                Self::ConnectionFailed
            }
            Err(e) => {
                warn!("Probe request failed: {e}");
                Self::Failed
            }
        }
    }
}

/// Run probe attempts until one completes.
///
/// Sleeps the current backoff delay before every attempt. Connection
/// failures grow the delay and retry with no attempt limit; any completed
/// attempt resets the delay. Only a 404 status counts as gone.
pub async fn probe_with_backoff<F, Fut>(
    backoff: &mut Backoff,
    username: &str,
    mut attempt: F,
) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeAttempt>,
{
    loop {
        tokio::time::sleep(backoff.current()).await;
        match attempt().await {
            ProbeAttempt::ConnectionFailed => {
                backoff.grow();
                warn!(
                    username = %username,
                    delay_secs = backoff.current().as_secs(),
                    "Connection failed while probing, retrying"
                );
            }
            ProbeAttempt::Status(status) => {
                backoff.reset();
                return status == StatusCode::NOT_FOUND.as_u16();
            }
            ProbeAttempt::Failed => {
                backoff.reset();
                return false;
            }
        }
    }
}

/// Probe backed by an unauthenticated HTTP GET of the user's profile
pub struct HttpProbe {
    client: Client,
    url_template: String,
    backoff: Backoff,
}

impl HttpProbe {
    /// Build a probe from the bot configuration
    ///
    /// # Errors
    ///
    /// Returns a `PlatformError` if the HTTP client cannot be built.
    pub fn new(config: &BotConfig) -> Result<Self, PlatformError> {
        let client = Client::builder().user_agent(config.user_agent()).build()?;
        Ok(Self {
            client,
            url_template: config.probe_url_template.clone(),
            backoff: Backoff::from_config(config),
        })
    }

    /// Public profile URL checked for `username`
    #[must_use]
    pub fn profile_url(&self, username: &str) -> String {
        self.url_template.replace("{username}", username)
    }
}

#[async_trait::async_trait]
impl ExistenceProbe for HttpProbe {
    async fn is_gone(&mut self, username: &str) -> bool {
        info!("Checking if /u/{username} is shadowbanned or deleted");
        let url = self.profile_url(username);
        let client = &self.client;
        let url = url.as_str();

        probe_with_backoff(&mut self.backoff, username, || async move {
            ProbeAttempt::from_result(client.get(url).send().await)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::time::Instant;

    fn backoff() -> Backoff {
        Backoff::new(
            Duration::from_secs(2),
            Duration::from_secs(2),
            Duration::from_secs(60),
        )
    }

    #[test]
    fn test_backoff_grows_and_resets() {
        let mut backoff = backoff();
        assert_eq!(backoff.current(), Duration::from_secs(2));
        backoff.grow();
        backoff.grow();
        assert_eq!(backoff.current(), Duration::from_secs(6));
        backoff.reset();
        assert_eq!(backoff.current(), Duration::from_secs(2));
    }

    #[test]
    fn test_backoff_is_capped() {
        let mut backoff = Backoff::new(
            Duration::from_secs(2),
            Duration::from_secs(5),
            Duration::from_secs(10),
        );
        for _ in 0..10 {
            backoff.grow();
        }
        assert_eq!(backoff.current(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_found_is_gone() {
        let mut backoff = backoff();
        let start = Instant::now();
        let gone = probe_with_backoff(&mut backoff, "carol", || async {
            ProbeAttempt::Status(404)
        })
        .await;
        assert!(gone);
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_outcomes_are_present() {
        let mut backoff = backoff();
        for attempt in [
            ProbeAttempt::Status(200),
            ProbeAttempt::Status(403),
            ProbeAttempt::Status(500),
            ProbeAttempt::Failed,
        ] {
            let gone = probe_with_backoff(&mut backoff, "alice", || async move { attempt }).await;
            assert!(!gone, "{attempt:?} should not count as gone");
        }
    }

    fn config_for(template: String) -> BotConfig {
        BotConfig {
            username: "prunebot".to_string(),
            sleep_base_secs: 0,
            probe_url_template: template,
            ..Default::default()
        }
    }

    /// Answer a single HTTP request with `status_line` and close
    async fn serve_once(status_line: &'static str) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind listener");
        let addr = listener.local_addr().expect("Failed to read local addr");
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {status_line}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n"
                );
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
        addr
    }

    #[test]
    fn test_profile_url() {
        let probe = HttpProbe::new(&BotConfig::default()).expect("Failed to build probe");
        assert_eq!(
            probe.profile_url("alice"),
            "https://www.reddit.com/user/alice/?limit=1"
        );
    }

    #[tokio::test]
    async fn test_closed_port_is_connection_failure() {
        let client = Client::new();
        let result = client.get("http://127.0.0.1:1/user/alice").send().await;
        assert_eq!(ProbeAttempt::from_result(result), ProbeAttempt::ConnectionFailed);
    }

    #[tokio::test]
    async fn test_profile_status_decides_gone() {
        let addr = serve_once("404 Not Found").await;
        let mut probe = HttpProbe::new(&config_for(format!("http://{addr}/user/{{username}}")))
            .expect("Failed to build probe");
        assert!(probe.is_gone("carol").await);

        let addr = serve_once("200 OK").await;
        let mut probe = HttpProbe::new(&config_for(format!("http://{addr}/user/{{username}}")))
            .expect("Failed to build probe");
        assert!(!probe.is_gone("alice").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_failures_retry_with_growing_delay() {
        let mut backoff = backoff();
        let mut outcomes = VecDeque::from([
            ProbeAttempt::ConnectionFailed,
            ProbeAttempt::ConnectionFailed,
            ProbeAttempt::Status(404),
        ]);
        let mut attempts = 0;
        let start = Instant::now();

        let gone = probe_with_backoff(&mut backoff, "carol", || {
            attempts += 1;
            let outcome = outcomes.pop_front().unwrap_or(ProbeAttempt::Status(200));
            async move { outcome }
        })
        .await;

        // The retried result is returned, not discarded
        assert!(gone);
        assert_eq!(attempts, 3);
        // 2s + 4s + 6s
        assert_eq!(start.elapsed(), Duration::from_secs(12));
        assert_eq!(backoff.current(), Duration::from_secs(2));
    }
}
