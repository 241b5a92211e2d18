//! Client for the external analysis backend that serves analyzed emails

use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use crate::config::FeedConfig;
use crate::error::{Result, TriageError};
use crate::models::EmailRecord;

/// Feed operations behind a trait for easier testing
#[async_trait]
pub trait AnalysisFeed: Send + Sync {
    /// Fetch the current batch of analyzed emails
    async fn fetch_records(&self, access_token: &str, limit: usize) -> Result<Vec<EmailRecord>>;
}

/// HTTP feed client with bearer auth and transient-failure retry
pub struct HttpAnalysisFeed {
    base_url: String,
    http: reqwest::Client,
    max_retries: u32,
}

impl HttpAnalysisFeed {
    pub fn new(config: &FeedConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TriageError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            max_retries: config.max_retries,
        })
    }

    async fn fetch_once(&self, access_token: &str, limit: usize) -> Result<Vec<EmailRecord>> {
        let url = format!("{}/emails", self.base_url);

        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token)
            .query(&[("limit", limit.to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(TriageError::from_feed_status(status, retry_after, body));
        }

        let records: Vec<EmailRecord> = response
            .json()
            .await
            .map_err(|e| TriageError::FeedFormatError(format!("Bad feed body: {}", e)))?;

        validate_batch(&records)?;
        Ok(records)
    }

    /// Execute an operation with exponential backoff on transient errors
    async fn with_retry<T, F, Fut>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut delay = Duration::from_secs(1);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_transient() && attempts <= self.max_retries => {
                    // A rate-limited response tells us exactly how long to wait
                    let wait = match &e {
                        TriageError::RateLimitExceeded { retry_after } => {
                            Duration::from_secs(*retry_after)
                        }
                        _ => delay,
                    };
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        operation_name,
                        attempts,
                        self.max_retries + 1,
                        e,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    delay = std::cmp::min(delay * 2, Duration::from_secs(30));
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl AnalysisFeed for HttpAnalysisFeed {
    async fn fetch_records(&self, access_token: &str, limit: usize) -> Result<Vec<EmailRecord>> {
        self.with_retry("Feed fetch", || self.fetch_once(access_token, limit))
            .await
    }
}

/// Reject batches the store cannot hold; warn on suspicious but usable data
fn validate_batch(records: &[EmailRecord]) -> Result<()> {
    for record in records {
        if record.id.is_empty() {
            return Err(TriageError::FeedFormatError(
                "Feed delivered a record with an empty id".to_string(),
            ));
        }
        if !record.has_address_shaped_sender() {
            warn!(
                "Record {} has a sender that is not address-shaped: {}",
                record.id, record.sender
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AnalysisResult, Sentiment, SentimentLabel};

    fn record(id: &str, sender: &str) -> EmailRecord {
        EmailRecord {
            id: id.to_string(),
            subject: "s".to_string(),
            sender: sender.to_string(),
            category: "Work".to_string(),
            analysis: AnalysisResult {
                priority_score: 0.5,
                sentiment: Sentiment {
                    label: SentimentLabel::Neutral,
                    score: 0.5,
                },
                summary: String::new(),
                suggested_actions: Vec::new(),
                response_time_hours: None,
            },
        }
    }

    #[test]
    fn test_validate_batch_rejects_empty_id() {
        let records = vec![record("", "a@b.co")];
        assert!(matches!(
            validate_batch(&records),
            Err(TriageError::FeedFormatError(_))
        ));
    }

    #[test]
    fn test_validate_batch_accepts_odd_sender() {
        // Logged but not fatal
        let records = vec![record("1", "not-an-address")];
        assert!(validate_batch(&records).is_ok());
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = FeedConfig {
            base_url: "http://example.com/".to_string(),
            ..FeedConfig::default()
        };
        let feed = HttpAnalysisFeed::new(&config).unwrap();
        assert_eq!(feed.base_url, "http://example.com");
    }
}
