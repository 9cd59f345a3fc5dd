#![allow(dead_code)]

use async_trait::async_trait;
use briefing_bot::{
    BriefingError, FeedTransport, Result, TranscriptFragment, TranscriptService,
};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, Once};

static INIT: Once = Once::new();

pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Fixed "now" shared by every test run.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 18, 7, 0, 0).unwrap()
}

pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    now() - Duration::hours(hours)
}

pub struct RssEntry<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub published: Option<DateTime<Utc>>,
}

pub fn entry<'a>(title: &'a str, hours: i64) -> RssEntry<'a> {
    RssEntry {
        title,
        description: None,
        published: Some(hours_ago(hours)),
    }
}

pub fn rss_document(entries: &[RssEntry]) -> String {
    let items: String = entries
        .iter()
        .map(|e| {
            let mut item = format!("<item><title>{}</title>", e.title);
            item.push_str(&format!("<link>https://news.example.com/{}</link>", e.title.replace(' ', "-")));
            if let Some(d) = e.description {
                item.push_str(&format!("<description>{}</description>", d));
            }
            if let Some(p) = e.published {
                item.push_str(&format!("<pubDate>{}</pubDate>", p.to_rfc2822()));
            }
            item.push_str("</item>");
            item
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><rss version="2.0"><channel><title>Test feed</title><link>https://news.example.com</link><description>t</description>{}</channel></rss>"#,
        items
    )
}

pub struct VideoEntry<'a> {
    pub video_id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub published: DateTime<Utc>,
}

pub fn video_feed(entries: &[VideoEntry]) -> String {
    let body: String = entries
        .iter()
        .map(|e| {
            let description = e
                .description
                .map(|d| format!("<media:description>{}</media:description>", d))
                .unwrap_or_default();
            format!(
                r#"<entry><id>yt:video:{id}</id><yt:videoId>{id}</yt:videoId><title>{title}</title><link rel="alternate" href="https://www.youtube.com/watch?v={id}"/><published>{published}</published><updated>{published}</updated><media:group><media:title>{title}</media:title>{description}</media:group></entry>"#,
                id = e.video_id,
                title = e.title,
                published = e.published.to_rfc3339(),
                description = description,
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><feed xmlns:yt="http://www.youtube.com/xml/schemas/2015" xmlns:media="http://search.yahoo.com/mrss/" xmlns="http://www.w3.org/2005/Atom"><id>yt:channel:UC1</id><title>Channel</title><updated>{}</updated>{}</feed>"#,
        now().to_rfc3339(),
        body
    )
}

/// Feed transport answering from an in-memory table. Unknown URLs time out.
#[derive(Default)]
pub struct StubTransport {
    responses: HashMap<String, std::result::Result<String, String>>,
    requests: Mutex<Vec<String>>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(mut self, url: &str, body: String) -> Self {
        self.responses.insert(url.to_string(), Ok(body));
        self
    }

    pub fn with_failure(mut self, url: &str, message: &str) -> Self {
        self.responses.insert(url.to_string(), Err(message.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl FeedTransport for StubTransport {
    async fn get(&self, url: &str) -> Result<String> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.responses.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(message)) => Err(BriefingError::SourceFetch {
                source_label: url.to_string(),
                message: message.clone(),
            }),
            None => Err(BriefingError::SourceFetch {
                source_label: url.to_string(),
                message: "operation timed out".to_string(),
            }),
        }
    }
}

/// Transcript lookup answering from an in-memory table.
#[derive(Default)]
pub struct StubTranscripts {
    transcripts: HashMap<String, Vec<String>>,
    calls: AtomicUsize,
    languages: Mutex<Vec<String>>,
}

impl StubTranscripts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transcript(mut self, video_id: &str, lines: &[&str]) -> Self {
        self.transcripts
            .insert(video_id.to_string(), lines.iter().map(|l| l.to_string()).collect());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_languages(&self) -> Vec<String> {
        self.languages.lock().unwrap().clone()
    }
}

#[async_trait]
impl TranscriptService for StubTranscripts {
    async fn fetch(&self, video_id: &str, languages: &[String]) -> Result<Vec<TranscriptFragment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.languages.lock().unwrap() = languages.to_vec();
        match self.transcripts.get(video_id) {
            Some(lines) => Ok(lines
                .iter()
                .enumerate()
                .map(|(i, text)| TranscriptFragment {
                    text: text.clone(),
                    start: i as f64 * 2.0,
                    duration: 2.0,
                })
                .collect()),
            None => Err(BriefingError::TranscriptUnavailable {
                video_id: video_id.to_string(),
                message: "captions disabled".to_string(),
            }),
        }
    }
}
