pub mod config;
pub mod delivery;
pub mod digest;
pub mod fetcher;
pub mod llm_adapter;
pub mod normalizer;
pub mod parser;
pub mod pipeline;
pub mod sources;
pub mod traits;
pub mod types;
pub mod utils;

pub use config::{PipelineConfig, Preset, RetryPolicy, SourceConfig, SourceKind};
pub use delivery::{RecordingSink, TelegramSink};
pub use digest::DigestGenerator;
pub use fetcher::Fetcher;
pub use llm_adapter::{GeminiEndpoint, ScriptedEndpoint};
pub use normalizer::{normalize, CategoryItems, Corpus, CorpusSection};
pub use parser::FeedParser;
pub use pipeline::{ConfiguredSource, Pipeline, RunReport};
pub use sources::{RssFeedSource, VideoChannelSource};
pub use traits::{DeliverySink, FeedTransport, GenerationEndpoint, SourceAdapter, TranscriptService};
pub use types::*;
