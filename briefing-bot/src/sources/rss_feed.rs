use crate::config::{SourceConfig, SourceKind};
use crate::parser::FeedParser;
use crate::sources::select_recent;
use crate::traits::{FeedTransport, SourceAdapter};
use crate::types::{BriefingError, FeedItem, ItemBody, Result, SourceWindow, UndatedPolicy};
use crate::utils::{text, url};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Generic RSS/Atom headline source
pub struct RssFeedSource {
    label: String,
    url: String,
    max_items: usize,
    undated: UndatedPolicy,
    include_description: bool,
    max_body_chars: usize,
    transport: Arc<dyn FeedTransport>,
}

impl RssFeedSource {
    pub fn new(label: String, url: String, max_items: usize, transport: Arc<dyn FeedTransport>) -> Self {
        Self {
            label,
            url,
            max_items,
            undated: UndatedPolicy::Include,
            include_description: false,
            max_body_chars: 15_000,
            transport,
        }
    }

    pub fn from_config(
        config: &SourceConfig,
        max_body_chars: usize,
        transport: Arc<dyn FeedTransport>,
    ) -> Result<Self> {
        let SourceKind::Rss { url } = &config.kind else {
            return Err(BriefingError::Config(format!(
                "source '{}' is not an RSS feed",
                config.label
            )));
        };
        if !url::is_valid_feed_url(url) {
            return Err(BriefingError::Config(format!("invalid feed URL: {}", url)));
        }

        Ok(Self::new(config.label.clone(), url.clone(), config.max_items, transport)
            .with_undated(config.undated_policy())
            .with_descriptions(config.include_description)
            .with_max_body_chars(max_body_chars))
    }

    pub fn with_undated(mut self, policy: UndatedPolicy) -> Self {
        self.undated = policy;
        self
    }

    pub fn with_descriptions(mut self, include: bool) -> Self {
        self.include_description = include;
        self
    }

    pub fn with_max_body_chars(mut self, max_body_chars: usize) -> Self {
        self.max_body_chars = max_body_chars;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl SourceAdapter for RssFeedSource {
    fn label(&self) -> &str {
        &self.label
    }

    async fn fetch(&self, window: &SourceWindow) -> Result<Vec<FeedItem>> {
        debug!("Pulling RSS feed: {}", self.url);

        let content = self.transport.get(&self.url).await?;
        if !FeedParser::is_valid_feed_content(&content) {
            return Err(BriefingError::Parse(format!(
                "{} did not return an RSS or Atom document",
                self.url
            )));
        }

        let parsed = FeedParser::parse_feed(&content)?;
        let found = parsed.entries.len();
        let parsed_title = parsed.title;
        let recent = select_recent(parsed.entries, window, self.undated, self.max_items);

        let items: Vec<FeedItem> = recent
            .into_iter()
            .map(|entry| {
                let body = match entry.description {
                    Some(description) if self.include_description => ItemBody::Description(
                        text::truncate_chars(&description, self.max_body_chars).to_string(),
                    ),
                    _ => ItemBody::TitleOnly,
                };
                FeedItem {
                    title: entry.title,
                    body,
                    published_at: entry.published_at,
                    source_label: self.label.clone(),
                }
            })
            .collect();

        info!(
            source = %self.label,
            feed = parsed_title.as_deref().unwrap_or("untitled"),
            found,
            kept = items.len(),
            "Pulled RSS feed"
        );
        Ok(items)
    }
}
