use crate::config::{PipelineConfig, SourceConfig, SourceKind};
use crate::delivery::TelegramSink;
use crate::digest::DigestGenerator;
use crate::fetcher::Fetcher;
use crate::llm_adapter::GeminiEndpoint;
use crate::normalizer::{normalize, CategoryItems, Corpus};
use crate::sources::{HttpTranscriptService, NoTranscripts, RssFeedSource, VideoChannelSource};
use crate::traits::{DeliverySink, FeedTransport, SourceAdapter, TranscriptService};
use crate::types::{BriefingError, DeliveryOutcome, DigestResult, FeedItem, Result, SourceWindow};
use crate::utils::text;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Instrument};
use uuid::Uuid;

const DIAGNOSTIC_MAX_CHARS: usize = 2_000;

/// Process exit status when the briefing was delivered.
pub const EXIT_DELIVERED: u8 = 0;
/// Process exit status when the delivery attempt failed.
pub const EXIT_DELIVERY_FAILED: u8 = 1;
/// Process exit status when configuration or bootstrap failed.
pub const EXIT_CONFIG_ERROR: u8 = 2;

/// A source adapter together with its category cap.
pub struct ConfiguredSource {
    pub adapter: Box<dyn SourceAdapter>,
    pub max_items: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    pub label: String,
    pub items: usize,
}

/// What happened during one run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: Uuid,
    pub window: SourceWindow,
    pub sources: Vec<SourceReport>,
    pub corpus_items: usize,
    pub generation_skipped: bool,
    pub digest: DigestResult,
    pub delivered_text: String,
    pub delivery: DeliveryOutcome,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.delivery.success
    }

    pub fn exit_code(&self) -> u8 {
        if self.succeeded() {
            EXIT_DELIVERED
        } else {
            EXIT_DELIVERY_FAILED
        }
    }

    /// The delivery failure as an error, for the process exit status.
    pub fn ensure_delivered(&self) -> Result<()> {
        if self.delivery.success {
            return Ok(());
        }
        let status = self
            .delivery
            .status
            .map(|s| format!("HTTP {}", s))
            .unwrap_or_else(|| "no response".to_string());
        let body = self.delivery.body.as_deref().unwrap_or_default();
        Err(BriefingError::Delivery(format!("{}: {}", status, body)))
    }
}

/// Collect → normalize → generate → deliver, exactly one delivery per run.
pub struct Pipeline {
    sources: Vec<ConfiguredSource>,
    generator: DigestGenerator,
    sink: Arc<dyn DeliverySink>,
    window_hours: u32,
    max_corpus_chars: usize,
}

impl Pipeline {
    pub fn new(
        sources: Vec<ConfiguredSource>,
        generator: DigestGenerator,
        sink: Arc<dyn DeliverySink>,
        window_hours: u32,
        max_corpus_chars: usize,
    ) -> Self {
        Self {
            sources,
            generator,
            sink,
            window_hours,
            max_corpus_chars,
        }
    }

    /// Wire the production collaborators described by `config`.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        config.validate()?;

        let transport: Arc<dyn FeedTransport> = Arc::new(Fetcher::new(config.fetch.clone())?);
        let transcripts: Arc<dyn TranscriptService> = match &config.transcript_api_url {
            Some(url) => Arc::new(HttpTranscriptService::new(
                url,
                Duration::from_secs(config.fetch.timeout_seconds),
            )?),
            None => Arc::new(NoTranscripts),
        };

        let sources = config
            .sources
            .iter()
            .map(|source| build_source(config, source, transport.clone(), transcripts.clone()))
            .collect::<Result<Vec<_>>>()?;

        let endpoint = Arc::new(GeminiEndpoint::new(&config.generation)?);
        let generator = DigestGenerator::new(
            endpoint,
            config.instructions.clone(),
            config.no_content_message.clone(),
        )
        .with_retry(config.generation.retry.clone())
        .with_timeout(config.generation.timeout)
        .with_utc_offset(config.utc_offset_hours);

        let sink = Arc::new(TelegramSink::new(&config.delivery)?);

        Ok(Self::new(
            sources,
            generator,
            sink,
            config.window_hours,
            config.max_corpus_chars,
        ))
    }

    pub async fn run(&self) -> RunReport {
        self.run_at(Utc::now()).await
    }

    pub async fn run_at(&self, now: DateTime<Utc>) -> RunReport {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("briefing_run", %run_id);
        self.execute(run_id, now).instrument(span).await
    }

    /// Fetch every source concurrently; results come back in configured order.
    pub async fn collect(&self, window: &SourceWindow) -> Vec<Vec<FeedItem>> {
        join_all(self.sources.iter().map(|s| s.adapter.collect(window))).await
    }

    pub fn build_corpus(&self, collected: Vec<Vec<FeedItem>>) -> Corpus {
        let categories = self
            .sources
            .iter()
            .zip(collected)
            .map(|(source, items)| CategoryItems {
                label: source.adapter.label().to_string(),
                max_items: source.max_items,
                items,
            })
            .collect();
        normalize(categories, self.max_corpus_chars)
    }

    async fn execute(&self, run_id: Uuid, now: DateTime<Utc>) -> RunReport {
        let window = SourceWindow::ending_at(now, self.window_hours);
        info!(
            since = %window.since,
            now = %window.now,
            sources = self.sources.len(),
            "Collecting sources"
        );

        let collected = self.collect(&window).await;
        let sources: Vec<SourceReport> = self
            .sources
            .iter()
            .zip(&collected)
            .map(|(source, items)| SourceReport {
                label: source.adapter.label().to_string(),
                items: items.len(),
            })
            .collect();

        let corpus = self.build_corpus(collected);
        let corpus_items = corpus.item_count();
        let generation_skipped = corpus.is_empty();
        info!(corpus_items, "Corpus assembled");

        let digest = self.generator.generate(&corpus, now).await;
        let delivered_text = render_message(&digest);

        let delivery = self.sink.deliver(&delivered_text).await;
        if delivery.success {
            info!(status = ?delivery.status, "Briefing delivered");
        } else {
            error!(status = ?delivery.status, body = ?delivery.body, "Briefing delivery failed");
        }

        RunReport {
            run_id,
            window,
            sources,
            corpus_items,
            generation_skipped,
            digest,
            delivered_text,
            delivery,
        }
    }
}

fn build_source(
    config: &PipelineConfig,
    source: &SourceConfig,
    transport: Arc<dyn FeedTransport>,
    transcripts: Arc<dyn TranscriptService>,
) -> Result<ConfiguredSource> {
    let adapter: Box<dyn SourceAdapter> = match source.kind {
        SourceKind::Rss { .. } => Box::new(RssFeedSource::from_config(
            source,
            config.max_body_chars,
            transport,
        )?),
        SourceKind::VideoChannel { .. } => Box::new(VideoChannelSource::from_config(
            source,
            &config.video_feed_base,
            &config.transcript_languages,
            config.max_body_chars,
            transport,
            transcripts,
        )?),
    };
    Ok(ConfiguredSource {
        adapter,
        max_items: source.max_items,
    })
}

/// The text sent to the recipient for a digest outcome.
pub fn render_message(digest: &DigestResult) -> String {
    match digest {
        DigestResult::Text(text) => text.clone(),
        DigestResult::Failure { reason, diagnostic } => {
            let mut message = format!("🚨 Briefing generation failed: {}", reason);
            if let Some(diagnostic) = diagnostic.as_deref().filter(|d| !d.trim().is_empty()) {
                message.push_str("\n\n");
                message.push_str(text::truncate_chars(diagnostic, DIAGNOSTIC_MAX_CHARS));
            }
            message
        }
    }
}
