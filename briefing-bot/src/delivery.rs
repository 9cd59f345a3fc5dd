use crate::config::{DeliveryConfig, MessageFormat};
use crate::traits::DeliverySink;
use crate::types::{BriefingError, DeliveryOutcome, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::sync::Mutex;
use tracing::{error, info};

/// Telegram rejects messages longer than this many characters.
pub const TELEGRAM_MAX_CHARS: usize = 4096;

const MARKDOWN_V2_RESERVED: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\',
];

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
}

/// Telegram bot `sendMessage` sink.
pub struct TelegramSink {
    client: Client,
    url: String,
    chat_id: String,
    format: MessageFormat,
}

impl TelegramSink {
    pub fn new(config: &DeliveryConfig) -> Result<Self> {
        if config.bot_token.is_empty() || config.chat_id.is_empty() {
            return Err(BriefingError::Config(
                "bot token and chat id are required for delivery".into(),
            ));
        }
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            url: format!(
                "{}/bot{}/sendMessage",
                config.api_base.trim_end_matches('/'),
                config.bot_token
            ),
            chat_id: config.chat_id.clone(),
            format: config.format,
        })
    }

    async fn send_chunk(&self, text: &str) -> DeliveryOutcome {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: match self.format {
                MessageFormat::Plain => None,
                MessageFormat::MarkdownV2 => Some("MarkdownV2"),
            },
        };

        let response = match self.client.post(&self.url).json(&payload).send().await {
            Ok(response) => response,
            Err(e) => {
                // The URL holds the bot token.
                let e = e.without_url();
                error!(error = %e, "Telegram request failed");
                return DeliveryOutcome::failed(None, e.to_string());
            }
        };

        let status = response.status().as_u16();
        if response.status().is_success() {
            return DeliveryOutcome::delivered(status);
        }

        let body = response.text().await.unwrap_or_default();
        error!(status, body = %body, "Telegram rejected the message");
        DeliveryOutcome::failed(Some(status), body)
    }
}

#[async_trait]
impl DeliverySink for TelegramSink {
    async fn deliver(&self, text: &str) -> DeliveryOutcome {
        let chunks = prepare_chunks(text, self.format, TELEGRAM_MAX_CHARS);
        let total = chunks.len();

        let mut outcome = DeliveryOutcome::failed(None, "nothing to send");
        for (i, chunk) in chunks.iter().enumerate() {
            outcome = self.send_chunk(chunk).await;
            if !outcome.success {
                error!(chunk = i + 1, total, "Stopping delivery after failed chunk");
                return outcome;
            }
        }

        info!(chunks = total, "Message delivered");
        outcome
    }
}

/// Split `text` into sendable pieces of at most `max_chars` characters each.
///
/// For MarkdownV2 the raw text is split first and every piece is escaped on
/// its own, so an escape sequence never straddles two messages.
pub fn prepare_chunks(text: &str, format: MessageFormat, max_chars: usize) -> Vec<String> {
    match format {
        MessageFormat::Plain => split_message(text, max_chars),
        MessageFormat::MarkdownV2 => split_weighted(text, max_chars, escaped_width)
            .iter()
            .map(|chunk| escape_markdown_v2(chunk))
            .collect(),
    }
}

fn escaped_width(c: char) -> usize {
    if MARKDOWN_V2_RESERVED.contains(&c) {
        2
    } else {
        1
    }
}

/// Escape every character MarkdownV2 treats as syntax.
pub fn escape_markdown_v2(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        if MARKDOWN_V2_RESERVED.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Split on line boundaries so each piece has at most `max_chars` characters;
/// a single line longer than that is hard-split. Always yields one piece.
pub fn split_message(text: &str, max_chars: usize) -> Vec<String> {
    split_weighted(text, max_chars, |_| 1)
}

/// Same as [`split_message`], measuring each character with `width`.
fn split_weighted<F: Fn(char) -> usize>(text: &str, max_width: usize, width: F) -> Vec<String> {
    let max_width = max_width.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for line in text.split_inclusive('\n') {
        let line_width: usize = line.chars().map(&width).sum();

        if current_width + line_width <= max_width {
            current.push_str(line);
            current_width += line_width;
            continue;
        }

        if !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_width = 0;
        }

        if line_width <= max_width {
            current.push_str(line);
            current_width = line_width;
            continue;
        }

        for c in line.chars() {
            let w = width(c);
            if current_width + w > max_width && !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_width = 0;
            }
            current.push(c);
            current_width += w;
        }
    }

    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Sink that records every message instead of sending it.
#[derive(Default)]
pub struct RecordingSink {
    pub delivered: Mutex<Vec<String>>,
    fail_with: Option<u16>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the message but reports the given HTTP status as a failure.
    pub fn failing(status: u16) -> Self {
        Self {
            delivered: Mutex::new(Vec::new()),
            fail_with: Some(status),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.delivered.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DeliverySink for RecordingSink {
    async fn deliver(&self, text: &str) -> DeliveryOutcome {
        if let Ok(mut delivered) = self.delivered.lock() {
            delivered.push(text.to_string());
        }
        match self.fail_with {
            Some(status) => DeliveryOutcome::failed(Some(status), "recorded failure"),
            None => DeliveryOutcome::delivered(200),
        }
    }
}
