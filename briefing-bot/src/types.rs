use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Body attached to a collected feed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemBody {
    /// Joined caption fragments of a video entry
    Transcript(String),
    /// Textual description carried by the feed entry
    Description(String),
    /// Neither transcript nor description could be found
    Unavailable,
    /// The source is configured to forward headlines only
    TitleOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    pub body: ItemBody,
    pub published_at: Option<DateTime<Utc>>,
    pub source_label: String,
}

impl FeedItem {
    pub fn body_text(&self) -> Option<&str> {
        match &self.body {
            ItemBody::Transcript(text) | ItemBody::Description(text) => Some(text.as_str()),
            ItemBody::Unavailable | ItemBody::TitleOnly => None,
        }
    }
}

/// Time boundary shared by every source adapter of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceWindow {
    pub since: DateTime<Utc>,
    pub now: DateTime<Utc>,
}

impl SourceWindow {
    pub fn ending_at(now: DateTime<Utc>, hours: u32) -> Self {
        Self {
            since: now - Duration::hours(i64::from(hours)),
            now,
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts > self.since
    }
}

/// What a source does with entries that carry no usable timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UndatedPolicy {
    Include,
    Exclude,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DigestResult {
    Text(String),
    Failure {
        reason: String,
        diagnostic: Option<String>,
    },
}

impl DigestResult {
    pub fn failure(reason: impl Into<String>, diagnostic: Option<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
            diagnostic,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Self::Text(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    pub success: bool,
    pub status: Option<u16>,
    pub body: Option<String>,
}

impl DeliveryOutcome {
    pub fn delivered(status: u16) -> Self {
        Self {
            success: true,
            status: Some(status),
            body: None,
        }
    }

    pub fn failed(status: Option<u16>, body: impl Into<String>) -> Self {
        Self {
            success: false,
            status,
            body: Some(body.into()),
        }
    }
}

/// Raw reply of an HTTP endpoint, before any interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptFragment {
    pub text: String,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub duration: f64,
}

#[derive(Debug)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub entries: Vec<ParsedEntry>,
}

#[derive(Debug, Clone)]
pub struct ParsedEntry {
    pub id: Option<String>,
    pub url: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_feed_size_mb: usize,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Briefing-Bot/1.0".to_string(),
            timeout_seconds: 30,
            max_retries: 1,
            retry_delay_seconds: 2,
            max_feed_size_mb: 10,
            max_redirects: 5,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BriefingError {
    /// URL is stripped on conversion: request URLs may carry credentials.
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Source {source_label} failed: {message}")]
    SourceFetch { source_label: String, message: String },

    #[error("Feed parse error: {0}")]
    Parse(String),

    #[error("No transcript for {video_id}: {message}")]
    TranscriptUnavailable { video_id: String, message: String },

    #[error("Transient generation failure: {0}")]
    GenerationTransient(String),

    #[error("Generation failed: {reason}")]
    GenerationPermanent {
        reason: String,
        body: Option<String>,
    },

    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Feed size exceeds limit: {size_mb}MB")]
    FeedTooLarge { size_mb: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for BriefingError {
    fn from(err: reqwest::Error) -> Self {
        BriefingError::Http(err.without_url())
    }
}

pub type Result<T> = std::result::Result<T, BriefingError>;
