use crate::error::{FetchError, Result};
use rand::seq::IndexedRandom;
use reqwest::Client;
use reqwest::header::USER_AGENT;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Identifying headers rotated across requests when no fixed user agent is configured.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.10; rv:40.0) Gecko/20100101 Firefox/40.0",
    "Mozilla/5.0 (compatible, MSIE 11, Windows NT 6.3; Trident/7.0; rv:11.0) like Gecko",
    "Mozilla/5.0 (Windows NT 6.1) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/41.0.2228.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/41.0.2227.0 Safari/537.36",
];

/// Longest sleep between two attempts at the same URL.
pub const MAX_BACKOFF: Duration = Duration::from_secs(120);

/// Retrieves the document at a URL.
pub trait Fetch {
    fn fetch(&self, url: &str) -> impl Future<Output = std::result::Result<String, FetchError>> + Send;
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Fixed user agent. `None` picks one from [`USER_AGENTS`] per request.
    pub user_agent: Option<String>,
    pub timeout_secs: u64,
    pub retries: u32,
    pub backoff_factor: f64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: 10,
            retries: 8,
            backoff_factor: 2.0,
        }
    }
}

/// HTTP transport holding a single pooled client for the lifetime of a walk.
pub struct HttpFetcher {
    client: Client,
    options: FetchOptions,
}

impl HttpFetcher {
    pub fn new(options: FetchOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(options.timeout_secs))
            .connect_timeout(Duration::from_secs((options.timeout_secs / 2).max(1)))
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client, options })
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    fn user_agent(&self) -> &str {
        match &self.options.user_agent {
            Some(agent) => agent,
            None => USER_AGENTS
                .choose(&mut rand::rng())
                .copied()
                .unwrap_or(USER_AGENTS[0]),
        }
    }

    /// Delay before retry number `attempt` (1-based), capped at [`MAX_BACKOFF`].
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(64) as i32;
        let secs = self.options.backoff_factor * 2f64.powi(exponent);
        Duration::try_from_secs_f64(secs.max(0.0))
            .map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
    }

    async fn fetch_once(&self, url: &str) -> std::result::Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, self.user_agent())
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|e| classify(url, e))
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        let mut attempt = 0;
        loop {
            debug!("Fetching {}", url);
            match self.fetch_once(url).await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    if !e.is_retryable() || attempt >= self.options.retries {
                        return Err(e);
                    }
                    attempt += 1;
                    let delay = self.backoff(attempt);
                    warn!(
                        "Retryable error for {}, attempt {}/{}, retrying in {:?}: {}",
                        url, attempt, self.options.retries, delay, e
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

fn classify(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(url.to_string())
    } else {
        FetchError::Network(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{header, method, path},
    };

    fn options(retries: u32) -> FetchOptions {
        FetchOptions {
            user_agent: Some("strata-test/1.0".to_string()),
            timeout_secs: 5,
            retries,
            backoff_factor: 0.0,
        }
    }

    #[tokio::test]
    async fn test_fetch_returns_body_and_sends_user_agent() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("user-agent", "strata-test/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new(options(0)).unwrap();
        let body = fetcher
            .fetch(&format!("{}/page", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(body, "<html>ok</html>");
    }

    #[tokio::test]
    async fn test_fetch_not_found_is_not_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new(options(3)).unwrap();
        let err = fetcher
            .fetch(&format!("{}/missing", mock_server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_fetch_server_error_is_retried() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/flaky"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&mock_server)
            .await;

        let fetcher = HttpFetcher::new(options(2)).unwrap();
        let err = fetcher
            .fetch(&format!("{}/flaky", mock_server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn test_rotating_user_agent_comes_from_builtin_list() {
        let fetcher = HttpFetcher::new(FetchOptions::default()).unwrap();
        for _ in 0..10 {
            assert!(USER_AGENTS.contains(&fetcher.user_agent()));
        }
    }

    #[test]
    fn test_backoff_doubles() {
        let fetcher = HttpFetcher::new(FetchOptions {
            backoff_factor: 2.0,
            ..FetchOptions::default()
        })
        .unwrap();
        assert_eq!(fetcher.backoff(1), Duration::from_secs(2));
        assert_eq!(fetcher.backoff(2), Duration::from_secs(4));
        assert_eq!(fetcher.backoff(3), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_is_capped() {
        let fetcher = HttpFetcher::new(FetchOptions {
            retries: u32::MAX,
            backoff_factor: 2.0,
            ..FetchOptions::default()
        })
        .unwrap();
        assert_eq!(fetcher.backoff(7), Duration::from_secs(120));
        assert_eq!(fetcher.backoff(64), MAX_BACKOFF);
        assert_eq!(fetcher.backoff(u32::MAX), MAX_BACKOFF);
    }

    #[test]
    fn test_status_retryability() {
        let status = |status| FetchError::Status {
            status,
            url: "http://x".to_string(),
        };
        assert!(status(500).is_retryable());
        assert!(status(429).is_retryable());
        assert!(!status(404).is_retryable());
        assert!(!status(403).is_retryable());
        assert!(FetchError::Timeout("http://x".to_string()).is_retryable());
    }
}
