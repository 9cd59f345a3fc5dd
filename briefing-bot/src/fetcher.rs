use crate::traits::FeedTransport;
use crate::types::{BriefingError, FetchConfig, Result};
use async_trait::async_trait;
use backoff::{backoff::Backoff, exponential::ExponentialBackoff};
use reqwest::{Client, StatusCode};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// HTTP feed downloader with bounded retry on transient failures.
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

    fn retry_schedule(&self) -> ExponentialBackoff<backoff::SystemClock> {
        let delay = Duration::from_secs(self.config.retry_delay_seconds);
        ExponentialBackoff {
            current_interval: delay,
            initial_interval: delay,
            max_interval: delay * 8,
            multiplier: 2.0,
            max_elapsed_time: Some(Duration::from_secs(self.config.timeout_seconds * 2)),
            ..Default::default()
        }
    }

    async fn fetch_once(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(status_error(url, status));
        }

        if let Some(content_length) = response.content_length() {
            let size_mb = content_length as usize / (1024 * 1024);
            if size_mb > self.config.max_feed_size_mb {
                return Err(BriefingError::FeedTooLarge { size_mb });
            }
        }

        Ok(response.text().await?)
    }
}

fn status_error(url: &str, status: StatusCode) -> BriefingError {
    BriefingError::SourceFetch {
        source_label: url.to_string(),
        message: format!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        ),
    }
}

/// Whether another attempt could plausibly succeed.
fn is_transient(err: &BriefingError) -> bool {
    match err {
        BriefingError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        BriefingError::SourceFetch { message, .. } => message.starts_with("HTTP 5"),
        _ => false,
    }
}

#[async_trait]
impl FeedTransport for Fetcher {
    async fn get(&self, url: &str) -> Result<String> {
        let start_time = Instant::now();
        let mut backoff = self.retry_schedule();
        let mut attempt = 0;

        debug!("Fetching feed: {}", url);

        loop {
            match self.fetch_once(url).await {
                Ok(content) => {
                    info!(
                        "Fetched feed: {} ({} bytes, {} ms)",
                        url,
                        content.len(),
                        start_time.elapsed().as_millis()
                    );
                    return Ok(content);
                }
                Err(e) if is_transient(&e) && attempt < self.config.max_retries => {
                    attempt += 1;
                    match backoff.next_backoff() {
                        Some(delay) => {
                            warn!("Attempt {} failed for {}: {}, retrying in {:?}", attempt, url, e, delay);
                            tokio::time::sleep(delay).await;
                        }
                        None => return Err(e),
                    }
                }
                Err(e) => {
                    error!("Failed to fetch feed after {} attempts: {}", attempt + 1, url);
                    return Err(e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient_client_errors_are_not() {
        let busy = status_error("https://example.com/rss", StatusCode::SERVICE_UNAVAILABLE);
        let missing = status_error("https://example.com/rss", StatusCode::NOT_FOUND);
        assert!(is_transient(&busy));
        assert!(!is_transient(&missing));
        assert!(!is_transient(&BriefingError::Parse("bad xml".into())));
    }
}
