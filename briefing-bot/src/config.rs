use crate::types::{BriefingError, FetchConfig, Result, UndatedPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const YOUTUBE_FEED_BASE: &str = "https://www.youtube.com/feeds/videos.xml";
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Room reserved next to a full-length body for its title, numbering and
/// section header, on top of the section label itself.
pub const ITEM_OVERHEAD_CHARS: usize = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceKind {
    Rss { url: String },
    VideoChannel { channel_id: String },
}

/// One corpus category backed by a single feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub label: String,
    #[serde(flatten)]
    pub kind: SourceKind,
    pub max_items: usize,
    #[serde(default)]
    pub undated: Option<UndatedPolicy>,
    #[serde(default)]
    pub include_description: bool,
}

impl SourceConfig {
    pub fn rss(label: &str, url: &str, max_items: usize) -> Self {
        Self {
            label: label.to_string(),
            kind: SourceKind::Rss {
                url: url.to_string(),
            },
            max_items,
            undated: None,
            include_description: false,
        }
    }

    pub fn video_channel(label: &str, channel_id: &str, max_items: usize) -> Self {
        Self {
            label: label.to_string(),
            kind: SourceKind::VideoChannel {
                channel_id: channel_id.to_string(),
            },
            max_items,
            undated: None,
            include_description: true,
        }
    }

    /// Explicit policy, falling back to the per-kind default: headline feeds
    /// keep undated entries, video feeds drop them.
    pub fn undated_policy(&self) -> UndatedPolicy {
        self.undated.unwrap_or(match self.kind {
            SourceKind::Rss { .. } => UndatedPolicy::Include,
            SourceKind::VideoChannel { .. } => UndatedPolicy::Exclude,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffKind {
    Constant,
    Linear,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub kind: BackoffKind,
}

impl RetryPolicy {
    /// Pause before attempt `next_attempt` (2-based: the first retry is attempt 2).
    pub fn delay_before(&self, next_attempt: u32) -> Duration {
        match self.kind {
            BackoffKind::Constant => self.delay,
            BackoffKind::Linear => self.delay * next_attempt.saturating_sub(1),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
            kind: BackoffKind::Constant,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub retry: RetryPolicy,
    pub timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_base: GEMINI_API_BASE.to_string(),
            api_key: String::new(),
            model: "gemini-2.5-flash".to_string(),
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(120),
            request_timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MessageFormat {
    Plain,
    MarkdownV2,
}

#[derive(Debug, Clone)]
pub struct DeliveryConfig {
    pub api_base: String,
    pub bot_token: String,
    pub chat_id: String,
    pub format: MessageFormat,
    pub timeout: Duration,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            api_base: TELEGRAM_API_BASE.to_string(),
            bot_token: String::new(),
            chat_id: String::new(),
            format: MessageFormat::Plain,
            timeout: Duration::from_secs(30),
        }
    }
}

/// Everything a run needs, passed explicitly into the orchestrator.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub sources: Vec<SourceConfig>,
    pub window_hours: u32,
    pub max_corpus_chars: usize,
    pub max_body_chars: usize,
    pub transcript_languages: Vec<String>,
    pub transcript_api_url: Option<String>,
    pub video_feed_base: String,
    pub instructions: String,
    pub no_content_message: String,
    pub utc_offset_hours: i32,
    pub fetch: FetchConfig,
    pub generation: GenerationConfig,
    pub delivery: DeliveryConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    News,
    Youtube,
}

const NEWS_INSTRUCTIONS: &str = "You are a veteran policy expert and macroeconomic analyst.
Based on the headlines below, write the briefing I need this morning.

[Principles]
1. Do not simply list items. Identify the underlying flow.
2. Focus on policy implications and the impact on the economy and markets (stocks, ETFs).
3. Polite but crisp report style. Plain text only, no Markdown.

[News data]
{corpus}

[Output format]
{date} Morning briefing

1. Politics / policy
2. Economy / finance
3. World affairs

Insight of the day: (one line)";

const YOUTUBE_INSTRUCTIONS: &str = "You are a curator who summarizes key information from videos.
Analyze the transcripts of the political, social, economic and investment videos uploaded yesterday and brief the essentials.

[Principles]
1. Per video: summarize the core argument in three bullet points.
2. Implications: one sentence each for a policy planner and for a stock investor.
3. Clearly separate channel name and title. Plain text only, no Markdown.

[Video data]
{corpus}

[Output format]
{date} Daily video summary

1. (channel) - (title)
- (point 1)
- (point 2)
- (point 3)
Implication: (one line)

(repeat...)";

impl Preset {
    pub fn sources(self) -> Vec<SourceConfig> {
        match self {
            Preset::News => vec![
                SourceConfig::rss("Domestic politics / policy", "https://www.yna.co.kr/rss/politics.xml", 3),
                SourceConfig::rss("Economy / finance", "https://www.mk.co.kr/rss/30000001/", 3),
                SourceConfig::rss("World affairs (BBC)", "http://feeds.bbci.co.uk/news/world/rss.xml", 3),
            ],
            Preset::Youtube => vec![SourceConfig::video_channel(
                "Channel: 겸손은힘들다",
                "UCAAvO0ehWox1bbym3rXKBZw",
                5,
            )],
        }
    }

    pub fn instructions(self) -> &'static str {
        match self {
            Preset::News => NEWS_INSTRUCTIONS,
            Preset::Youtube => YOUTUBE_INSTRUCTIONS,
        }
    }

    pub fn no_content_message(self) -> &'static str {
        match self {
            Preset::News => "No new headlines were collected in the last 24 hours.",
            Preset::Youtube => {
                "No new videos were uploaded to the monitored channels in the last 24 hours."
            }
        }
    }
}

impl PipelineConfig {
    pub fn from_preset(preset: Preset) -> Self {
        Self {
            sources: preset.sources(),
            window_hours: 24,
            max_corpus_chars: 60_000,
            max_body_chars: 15_000,
            transcript_languages: vec!["ko".to_string(), "en".to_string()],
            transcript_api_url: None,
            video_feed_base: YOUTUBE_FEED_BASE.to_string(),
            instructions: preset.instructions().to_string(),
            no_content_message: preset.no_content_message().to_string(),
            utc_offset_hours: 9,
            fetch: FetchConfig::default(),
            generation: GenerationConfig::default(),
            delivery: DeliveryConfig::default(),
        }
    }

    /// Overlay the optional JSON file on top of the current values.
    pub fn apply_file(&mut self, path: &Path) -> Result<()> {
        let content = std::fs::read_to_string(path)?;
        let file: ConfigFile = serde_json::from_str(&content)?;
        file.apply_to(self);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(BriefingError::Config("at least one source is required".into()));
        }
        if let Some(source) = self.sources.iter().find(|s| s.max_items == 0) {
            return Err(BriefingError::Config(format!(
                "source '{}' must allow at least one item",
                source.label
            )));
        }
        if let Some(source) = self.sources.iter().find(|s| s.label.trim().is_empty()) {
            return Err(BriefingError::Config(format!(
                "source {:?} has an empty label",
                source.kind
            )));
        }
        if self.window_hours == 0 {
            return Err(BriefingError::Config("window_hours must be positive".into()));
        }
        let longest_label = self
            .sources
            .iter()
            .map(|s| s.label.chars().count())
            .max()
            .unwrap_or(0);
        let item_budget = self.max_body_chars + longest_label + ITEM_OVERHEAD_CHARS;
        if item_budget > self.max_corpus_chars {
            return Err(BriefingError::Config(format!(
                "max_corpus_chars ({}) must leave room for one full item: body {} + label {} + {} overhead",
                self.max_corpus_chars, self.max_body_chars, longest_label, ITEM_OVERHEAD_CHARS
            )));
        }
        if !self.instructions.contains("{corpus}") {
            return Err(BriefingError::Config(
                "instructions must contain the {corpus} placeholder".into(),
            ));
        }
        if self.generation.retry.max_attempts == 0 {
            return Err(BriefingError::Config("max_attempts must be at least 1".into()));
        }
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(BriefingError::Config(format!(
                "utc offset {} is out of range",
                self.utc_offset_hours
            )));
        }
        Ok(())
    }
}

/// Shape of the optional JSON configuration file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub sources: Option<Vec<SourceConfig>>,
    pub window_hours: Option<u32>,
    pub max_corpus_chars: Option<usize>,
    pub max_body_chars: Option<usize>,
    pub transcript_languages: Option<Vec<String>>,
    pub instructions: Option<String>,
    pub no_content_message: Option<String>,
    pub utc_offset_hours: Option<i32>,
    pub model: Option<String>,
    pub max_attempts: Option<u32>,
    pub retry_delay_secs: Option<u64>,
    pub backoff: Option<BackoffKind>,
}

impl ConfigFile {
    fn apply_to(self, config: &mut PipelineConfig) {
        if let Some(sources) = self.sources {
            config.sources = sources;
        }
        if let Some(v) = self.window_hours {
            config.window_hours = v;
        }
        if let Some(v) = self.max_corpus_chars {
            config.max_corpus_chars = v;
        }
        if let Some(v) = self.max_body_chars {
            config.max_body_chars = v;
        }
        if let Some(v) = self.transcript_languages {
            config.transcript_languages = v;
        }
        if let Some(v) = self.instructions {
            config.instructions = v;
        }
        if let Some(v) = self.no_content_message {
            config.no_content_message = v;
        }
        if let Some(v) = self.utc_offset_hours {
            config.utc_offset_hours = v;
        }
        if let Some(v) = self.model {
            config.generation.model = v;
        }
        if let Some(v) = self.max_attempts {
            config.generation.retry.max_attempts = v;
        }
        if let Some(v) = self.retry_delay_secs {
            config.generation.retry.delay = Duration::from_secs(v);
        }
        if let Some(v) = self.backoff {
            config.generation.retry.kind = v;
        }
    }
}
