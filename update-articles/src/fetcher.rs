use crate::types::{FetchConfig, Result, UpdaterError};
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::{header, Client, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// HTTP transport for the feed, retrying transient failures.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// GETs `url` and returns the body. Transport errors and 5xx/429
    /// responses are retried; any other non-success status fails at once.
    pub async fn fetch_feed(&self, url: &str) -> Result<String> {
        let start_time = Instant::now();
        debug!("Fetching feed: {}", url);

        let retry_delay = Duration::from_secs(self.config.retry_delay_seconds);
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: retry_delay,
            initial_interval: retry_delay,
            max_interval: retry_delay * 16,
            multiplier: 2.0,
            max_elapsed_time: Some(retry_delay * 60),
            ..Default::default()
        };

        let mut last_error = None;

        for attempt in 0..=self.config.max_retries {
            let retryable = match self.fetch_once(url).await {
                Ok(body) => {
                    info!(
                        "Fetched feed {} ({} bytes in {}ms)",
                        url,
                        body.len(),
                        start_time.elapsed().as_millis()
                    );
                    return Ok(body);
                }
                Err(e) => {
                    let retryable = is_retryable(&e);
                    last_error = Some(e);
                    retryable
                }
            };

            if !retryable || attempt == self.config.max_retries {
                break;
            }
            match backoff.next_backoff() {
                Some(delay) => {
                    warn!("Attempt {} failed for {}, retrying in {:?}", attempt + 1, url, delay);
                    tokio::time::sleep(delay).await;
                }
                None => break,
            }
        }

        let err = last_error.unwrap_or(UpdaterError::FeedStatus { status: 0 });
        error!("Failed to fetch feed {}: {}", url, err);
        Err(err)
    }

    async fn fetch_once(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, &self.config.accept)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpdaterError::FeedStatus {
                status: status.as_u16(),
            });
        }

        let limit_bytes = self.config.max_feed_size_mb * 1024 * 1024;
        if let Some(content_length) = response.content_length() {
            if content_length as usize > limit_bytes {
                return Err(UpdaterError::FeedTooLarge {
                    size_mb: content_length as usize / (1024 * 1024),
                });
            }
        }

        let body = response.text().await?;
        if body.len() > limit_bytes {
            return Err(UpdaterError::FeedTooLarge {
                size_mb: body.len() / (1024 * 1024),
            });
        }
        Ok(body)
    }
}

fn is_retryable(err: &UpdaterError) -> bool {
    match err {
        UpdaterError::Http(_) => true,
        UpdaterError::FeedStatus { status } => StatusCode::from_u16(*status)
            .map(|s| s.is_server_error() || s == StatusCode::TOO_MANY_REQUESTS)
            .unwrap_or(false),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_failures_are_retried() {
        assert!(is_retryable(&UpdaterError::FeedStatus { status: 503 }));
        assert!(is_retryable(&UpdaterError::FeedStatus { status: 429 }));
        assert!(!is_retryable(&UpdaterError::FeedStatus { status: 404 }));
        assert!(!is_retryable(&UpdaterError::FeedTooLarge { size_mb: 11 }));
    }

    #[test]
    fn builds_with_default_config() {
        let fetcher = Fetcher::new(FetchConfig::default()).unwrap();
        assert_eq!(fetcher.config().user_agent, "Azure News Digest Bot 1.0");
    }

    #[tokio::test]
    #[ignore] // Requires network access
    async fn test_fetch_live_feed() {
        let fetcher = Fetcher::new(FetchConfig::default()).unwrap();
        let body = fetcher
            .fetch_feed(crate::config::DEFAULT_FEED_URL)
            .await
            .unwrap();
        assert!(body.contains("<rss") || body.contains("<feed"));
    }
}
