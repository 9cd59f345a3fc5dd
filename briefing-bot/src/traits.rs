use crate::types::{
    DeliveryOutcome, FeedItem, RawResponse, Result, SourceWindow, TranscriptFragment,
};
use async_trait::async_trait;
use tracing::warn;

/// A configured content source (plain feed, video channel, ...)
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Category label used as the corpus section header
    fn label(&self) -> &str;

    /// Fetch the items published inside `window`, newest first, capped.
    async fn fetch(&self, window: &SourceWindow) -> Result<Vec<FeedItem>>;

    /// Fail-soft variant of [`SourceAdapter::fetch`]: an error is logged and
    /// reported as an empty source so other sources keep going.
    async fn collect(&self, window: &SourceWindow) -> Vec<FeedItem> {
        match self.fetch(window).await {
            Ok(items) => items,
            Err(e) => {
                warn!(source = self.label(), error = %e, "Source failed, continuing without it");
                Vec::new()
            }
        }
    }
}

/// Transport used to download feed documents.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<String>;
}

/// Captions lookup for video entries.
#[async_trait]
pub trait TranscriptService: Send + Sync {
    async fn fetch(&self, video_id: &str, languages: &[String]) -> Result<Vec<TranscriptFragment>>;
}

/// The external text-generation endpoint. Transport errors are `Err`, every
/// HTTP reply (whatever the status) is `Ok`.
#[async_trait]
pub trait GenerationEndpoint: Send + Sync {
    fn endpoint_name(&self) -> &str;

    async fn post(&self, prompt: &str) -> Result<RawResponse>;
}

/// Push-notification transport for the single recipient.
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, text: &str) -> DeliveryOutcome;
}
