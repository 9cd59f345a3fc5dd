use crate::config::{SourceConfig, SourceKind, YOUTUBE_FEED_BASE};
use crate::parser::FeedParser;
use crate::sources::select_recent;
use crate::traits::{FeedTransport, SourceAdapter, TranscriptService};
use crate::types::{
    BriefingError, FeedItem, ItemBody, ParsedEntry, Result, SourceWindow, UndatedPolicy,
};
use crate::utils::{text, url};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Video channel feed whose entries are enriched with their transcripts.
pub struct VideoChannelSource {
    label: String,
    channel_id: String,
    feed_base: String,
    max_items: usize,
    undated: UndatedPolicy,
    include_description: bool,
    max_body_chars: usize,
    languages: Vec<String>,
    transport: Arc<dyn FeedTransport>,
    transcripts: Arc<dyn TranscriptService>,
}

impl VideoChannelSource {
    pub fn new(
        label: String,
        channel_id: String,
        max_items: usize,
        transport: Arc<dyn FeedTransport>,
        transcripts: Arc<dyn TranscriptService>,
    ) -> Self {
        Self {
            label,
            channel_id,
            feed_base: YOUTUBE_FEED_BASE.to_string(),
            max_items,
            undated: UndatedPolicy::Exclude,
            include_description: true,
            max_body_chars: 15_000,
            languages: vec!["ko".to_string(), "en".to_string()],
            transport,
            transcripts,
        }
    }

    pub fn from_config(
        config: &SourceConfig,
        feed_base: &str,
        languages: &[String],
        max_body_chars: usize,
        transport: Arc<dyn FeedTransport>,
        transcripts: Arc<dyn TranscriptService>,
    ) -> Result<Self> {
        let SourceKind::VideoChannel { channel_id } = &config.kind else {
            return Err(BriefingError::Config(format!(
                "source '{}' is not a video channel",
                config.label
            )));
        };

        let mut source = Self::new(
            config.label.clone(),
            channel_id.clone(),
            config.max_items,
            transport,
            transcripts,
        );
        source.feed_base = feed_base.to_string();
        source.undated = config.undated_policy();
        source.include_description = config.include_description;
        source.max_body_chars = max_body_chars;
        source.languages = languages.to_vec();
        Ok(source)
    }

    pub fn feed_url(&self) -> String {
        format!("{}?channel_id={}", self.feed_base, self.channel_id)
    }

    /// Transcript, else description, else an explicit "unavailable" marker.
    async fn resolve_body(&self, entry: &ParsedEntry) -> ItemBody {
        match url::extract_video_id(entry.id.as_deref(), entry.url.as_deref()) {
            Some(video_id) => match self.transcripts.fetch(&video_id, &self.languages).await {
                Ok(fragments) => {
                    let joined = fragments
                        .iter()
                        .map(|f| f.text.trim())
                        .filter(|t| !t.is_empty())
                        .collect::<Vec<_>>()
                        .join(" ");
                    if !joined.is_empty() {
                        let capped = text::truncate_chars(&joined, self.max_body_chars);
                        return ItemBody::Transcript(capped.to_string());
                    }
                }
                Err(e) => debug!(source = %self.label, error = %e, "Transcript unavailable"),
            },
            None => warn!(source = %self.label, title = %entry.title, "Entry has no video id"),
        }

        match &entry.description {
            Some(description) if self.include_description => ItemBody::Description(
                text::truncate_chars(description, self.max_body_chars).to_string(),
            ),
            _ => ItemBody::Unavailable,
        }
    }
}

#[async_trait]
impl SourceAdapter for VideoChannelSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn fetch(&self, window: &SourceWindow) -> Result<Vec<FeedItem>> {
        let feed_url = self.feed_url();
        debug!("Scanning channel feed: {}", feed_url);

        let content = self.transport.get(&feed_url).await?;
        let parsed = FeedParser::parse_feed(&content)?;
        debug!(
            source = %self.label,
            channel = parsed.title.as_deref().unwrap_or("untitled"),
            entries = parsed.entries.len(),
            "Parsed channel feed"
        );
        let recent = select_recent(parsed.entries, window, self.undated, self.max_items);

        if recent.is_empty() {
            info!(source = %self.label, "No uploads inside the window");
            return Ok(Vec::new());
        }

        let mut items = Vec::with_capacity(recent.len());
        for entry in recent {
            info!(source = %self.label, title = %entry.title, "Found video");
            let body = self.resolve_body(&entry).await;
            items.push(FeedItem {
                title: entry.title,
                body,
                published_at: entry.published_at,
                source_label: self.label.clone(),
            });
        }

        Ok(items)
    }
}
