use crate::config::RetryPolicy;
use crate::llm_adapter::GenerateResponse;
use crate::normalizer::Corpus;
use crate::traits::GenerationEndpoint;
use crate::types::{BriefingError, DigestResult, RawResponse, Result};
use crate::utils::time;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Turns a corpus into the digest text through the generation endpoint.
pub struct DigestGenerator {
    endpoint: Arc<dyn GenerationEndpoint>,
    instructions: String,
    no_content_message: String,
    retry: RetryPolicy,
    timeout: Duration,
    utc_offset_hours: i32,
}

impl DigestGenerator {
    pub fn new(endpoint: Arc<dyn GenerationEndpoint>, instructions: String, no_content_message: String) -> Self {
        Self {
            endpoint,
            instructions,
            no_content_message,
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(120),
            utc_offset_hours: 0,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_utc_offset(mut self, hours: i32) -> Self {
        self.utc_offset_hours = hours;
        self
    }

    pub fn no_content_message(&self) -> &str {
        &self.no_content_message
    }

    /// Instruction template with `{date}` and `{corpus}` filled in.
    pub fn build_prompt(&self, corpus: &Corpus, now: DateTime<Utc>) -> String {
        self.instructions
            .replace("{date}", &time::local_date(now, self.utc_offset_hours))
            .replace("{corpus}", &corpus.render())
    }

    pub async fn generate(&self, corpus: &Corpus, now: DateTime<Utc>) -> DigestResult {
        if corpus.is_empty() {
            info!("Corpus is empty, skipping generation");
            return DigestResult::Text(self.no_content_message.clone());
        }

        let prompt = self.build_prompt(corpus, now);
        info!(
            endpoint = self.endpoint.endpoint_name(),
            items = corpus.item_count(),
            prompt_chars = prompt.chars().count(),
            "Requesting digest"
        );

        match tokio::time::timeout(self.timeout, self.generate_with_retry(&prompt)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Generation exceeded {:?}", self.timeout);
                DigestResult::failure(
                    format!("generation timed out after {}s", self.timeout.as_secs()),
                    None,
                )
            }
        }
    }

    async fn generate_with_retry(&self, prompt: &str) -> DigestResult {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=max_attempts {
            let outcome = match self.endpoint.post(prompt).await {
                Ok(response) => classify(response),
                Err(e) => Err(e),
            };

            match outcome {
                Ok(text) => {
                    info!(attempt, "Digest generated");
                    return DigestResult::Text(text);
                }
                Err(BriefingError::GenerationPermanent { reason, body }) => {
                    warn!(attempt, reason = %reason, "Generation failed permanently");
                    return DigestResult::failure(reason, body);
                }
                Err(e) => {
                    let reason = transient_message(&e);
                    warn!(attempt, max_attempts, reason = %reason, "Generation attempt failed");
                    last_error = Some(reason);
                    if attempt < max_attempts {
                        let delay = self.retry.delay_before(attempt + 1);
                        debug!("Retrying generation in {:?}", delay);
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        DigestResult::failure(format!("server busy after {} attempts", max_attempts), last_error)
    }
}

fn transient_message(err: &BriefingError) -> String {
    match err {
        BriefingError::GenerationTransient(message) => message.clone(),
        other => other.to_string(),
    }
}

fn permanent(reason: impl Into<String>, body: String) -> BriefingError {
    BriefingError::GenerationPermanent {
        reason: reason.into(),
        body: Some(body),
    }
}

/// 2xx is parsed, 5xx is transient, anything else is permanent.
fn classify(response: RawResponse) -> Result<String> {
    let RawResponse { status, body } = response;
    match status {
        200..=299 => match GenerateResponse::from_body(&body) {
            GenerateResponse::Text(text) => Ok(text),
            GenerateResponse::Blocked(reason) => {
                Err(permanent(format!("response blocked ({})", reason), body))
            }
            GenerateResponse::ApiError(message) => {
                Err(permanent(format!("endpoint reported an error: {}", message), body))
            }
            GenerateResponse::Unrecognized => Err(permanent("unrecognized response shape", body)),
        },
        500..=599 => Err(BriefingError::GenerationTransient(format!(
            "HTTP {}: {}",
            status, body
        ))),
        400..=499 => Err(permanent(format!("client error (HTTP {})", status), body)),
        _ => Err(permanent(format!("unexpected status (HTTP {})", status), body)),
    }
}
