use crate::types::{BriefingError, ParsedEntry, ParsedFeed, Result};
use crate::utils::text;
use feed_rs::parser;
use tracing::debug;

pub struct FeedParser;

impl FeedParser {
    /// Parse an RSS or Atom document, keeping the feed's own entry order.
    pub fn parse_feed(content: &str) -> Result<ParsedFeed> {
        debug!("Parsing feed content ({} bytes)", content.len());

        let feed = parser::parse(content.as_bytes())
            .map_err(|e| BriefingError::Parse(format!("Failed to parse feed: {}", e)))?;

        let title = feed.title.map(|t| t.content);
        let entries: Vec<ParsedEntry> = feed
            .entries
            .into_iter()
            .filter_map(Self::parse_entry)
            .collect();

        debug!("Parsed feed with {} entries", entries.len());

        Ok(ParsedFeed { title, entries })
    }

    fn parse_entry(entry: feed_rs::model::Entry) -> Option<ParsedEntry> {
        let title = entry
            .title
            .map(|t| text::collapse_whitespace(&t.content))
            .unwrap_or_default();

        if title.is_empty() {
            debug!("Skipping entry without title: {}", entry.id);
            return None;
        }

        let id = if entry.id.is_empty() {
            None
        } else {
            Some(entry.id.clone())
        };

        let url = entry.links.first().map(|link| link.href.clone());

        // Video feeds carry their description inside the media group.
        let description = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .or_else(|| {
                entry
                    .media
                    .into_iter()
                    .find_map(|m| m.description.map(|d| d.content))
            })
            .map(|raw| text::strip_html(&raw))
            .filter(|d| !d.is_empty());

        let published_at = entry.published.or(entry.updated);

        Some(ParsedEntry {
            id,
            url,
            title,
            description,
            published_at,
        })
    }

    /// Cheap sniff test used before handing a body to the parser.
    pub fn is_valid_feed_content(content: &str) -> bool {
        let content_lower = content.to_lowercase();

        content_lower.contains("<rss")
            || content_lower.contains("<feed")
            || content_lower.contains("<channel")
            || content_lower.contains("<rdf:rdf")
    }
}
