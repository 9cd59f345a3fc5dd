use anyhow::Context;
use briefing_bot::config::{BackoffKind, MessageFormat, PipelineConfig, Preset};
use briefing_bot::pipeline::EXIT_CONFIG_ERROR;
use briefing_bot::Pipeline;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Collect feeds, summarize them and push the briefing to one chat.
#[derive(Debug, Parser)]
#[command(name = "briefing-bot", version)]
struct Cli {
    /// Built-in source list and instructions
    #[arg(long, env = "BRIEFING_PRESET", value_enum, default_value = "news")]
    preset: Preset,

    /// JSON file overriding sources, caps and instructions
    #[arg(long, env = "BRIEFING_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    google_api_key: String,

    #[arg(long, env = "TELEGRAM_TOKEN", hide_env_values = true)]
    telegram_token: String,

    #[arg(long, env = "CHAT_ID")]
    chat_id: String,

    #[arg(long, env = "GEMINI_MODEL")]
    model: Option<String>,

    /// Only items published within this many hours are collected
    #[arg(long, env = "BRIEFING_WINDOW_HOURS")]
    window_hours: Option<u32>,

    #[arg(long, env = "BRIEFING_MAX_CORPUS_CHARS")]
    max_corpus_chars: Option<usize>,

    /// Captions endpoint; without it video items fall back to descriptions
    #[arg(long, env = "TRANSCRIPT_API_URL")]
    transcript_api_url: Option<String>,

    #[arg(long, env = "BRIEFING_UTC_OFFSET_HOURS", allow_hyphen_values = true)]
    utc_offset_hours: Option<i32>,

    #[arg(long, env = "BRIEFING_MAX_ATTEMPTS")]
    max_attempts: Option<u32>,

    #[arg(long, env = "BRIEFING_RETRY_DELAY_SECS")]
    retry_delay_secs: Option<u64>,

    #[arg(long, env = "BRIEFING_LINEAR_BACKOFF")]
    linear_backoff: bool,

    /// Overall bound on the generation step, retries included
    #[arg(long, env = "BRIEFING_GENERATION_TIMEOUT_SECS", default_value_t = 120)]
    generation_timeout_secs: u64,

    #[arg(long, env = "BRIEFING_MESSAGE_FORMAT", value_enum, default_value = "plain")]
    message_format: MessageFormat,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<PipelineConfig> {
        let mut config = PipelineConfig::from_preset(self.preset);

        if let Some(path) = &self.config {
            config
                .apply_file(path)
                .with_context(|| format!("reading configuration from {}", path.display()))?;
        }

        if let Some(v) = self.window_hours {
            config.window_hours = v;
        }
        if let Some(v) = self.max_corpus_chars {
            config.max_corpus_chars = v;
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
        if self.linear_backoff {
            config.generation.retry.kind = BackoffKind::Linear;
        }
        config.transcript_api_url = self.transcript_api_url.or(config.transcript_api_url);
        config.generation.timeout = Duration::from_secs(self.generation_timeout_secs);
        config.generation.api_key = self.google_api_key;
        config.delivery.bot_token = self.telegram_token;
        config.delivery.chat_id = self.chat_id;
        config.delivery.format = self.message_format;

        config.validate().context("validating configuration")?;
        Ok(config)
    }
}

fn bootstrap(cli: Cli) -> anyhow::Result<Pipeline> {
    let config = cli.into_config()?;
    Pipeline::from_config(&config).context("building pipeline")
}

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let preset = cli.preset;

    let pipeline = match bootstrap(cli) {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!("Configuration error: {:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    info!(?preset, "Starting briefing run");
    let report = pipeline.run().await;

    info!(
        run_id = %report.run_id,
        corpus_items = report.corpus_items,
        generation_skipped = report.generation_skipped,
        delivered = report.succeeded(),
        "Briefing run finished"
    );

    if let Err(e) = report.ensure_delivered() {
        error!(run_id = %report.run_id, "{}", e);
    }
    ExitCode::from(report.exit_code())
}
