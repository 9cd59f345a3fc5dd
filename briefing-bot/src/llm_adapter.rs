use crate::config::GenerationConfig;
use crate::traits::GenerationEndpoint;
use crate::types::{BriefingError, RawResponse, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tracing::debug;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

impl<'a> GenerateRequest<'a> {
    fn from_prompt(prompt: &'a str) -> Self {
        Self {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateReply {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Debug, Deserialize)]
struct ReplyPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
}

/// Interpretation of a successful (2xx) generation reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateResponse {
    Text(String),
    Blocked(String),
    ApiError(String),
    Unrecognized,
}

impl GenerateResponse {
    pub fn from_body(body: &str) -> Self {
        let reply: GenerateReply = match serde_json::from_str(body) {
            Ok(reply) => reply,
            Err(e) => {
                debug!("Generation reply is not the expected JSON: {}", e);
                return Self::Unrecognized;
            }
        };

        if let Some(error) = reply.error {
            let code = error.code.map(|c| format!(" ({})", c)).unwrap_or_default();
            return Self::ApiError(format!("{}{}", error.message, code));
        }

        let text: String = reply
            .candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .take(1)
            .flat_map(|content| content.parts.iter().filter_map(|p| p.text.as_deref()))
            .collect();
        if !text.trim().is_empty() {
            return Self::Text(text);
        }

        if let Some(reason) = reply.prompt_feedback.and_then(|f| f.block_reason) {
            return Self::Blocked(reason);
        }
        if let Some(reason) = reply
            .candidates
            .first()
            .and_then(|c| c.finish_reason.clone())
            .filter(|r| r != "STOP")
        {
            return Self::Blocked(reason);
        }
        Self::Unrecognized
    }
}

/// Gemini `generateContent` endpoint.
pub struct GeminiEndpoint {
    client: Client,
    url: String,
    api_key: String,
    model: String,
}

impl GeminiEndpoint {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(BriefingError::Config("generation API key is empty".into()));
        }
        let client = Client::builder().timeout(config.request_timeout).build()?;
        let url = format!(
            "{}/v1/models/{}:generateContent",
            config.api_base.trim_end_matches('/'),
            config.model,
        );
        Ok(Self {
            client,
            url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl GenerationEndpoint for GeminiEndpoint {
    fn endpoint_name(&self) -> &str {
        &self.model
    }

    async fn post(&self, prompt: &str) -> Result<RawResponse> {
        let response = self
            .client
            .post(&self.url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(&GenerateRequest::from_prompt(prompt))
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }
}

/// Endpoint replaying a fixed script of replies, for development and tests.
/// Once the script is exhausted the last reply is repeated.
pub struct ScriptedEndpoint {
    script: Mutex<VecDeque<std::result::Result<RawResponse, String>>>,
    last: Mutex<Option<std::result::Result<RawResponse, String>>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedEndpoint {
    pub fn new(script: Vec<std::result::Result<RawResponse, String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every call answers 200 with a candidate holding `text`.
    pub fn always_text(text: &str) -> Self {
        Self::new(vec![Ok(RawResponse::new(200, candidate_body(text)))])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

/// JSON body of a successful reply carrying `text`.
pub fn candidate_body(text: &str) -> String {
    serde_json::json!({
        "candidates": [{ "content": { "parts": [{ "text": text }] }, "finishReason": "STOP" }]
    })
    .to_string()
}

#[async_trait]
impl GenerationEndpoint for ScriptedEndpoint {
    fn endpoint_name(&self) -> &str {
        "scripted"
    }

    async fn post(&self, prompt: &str) -> Result<RawResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        let reply = match next {
            Some(reply) => {
                if let Ok(mut last) = self.last.lock() {
                    *last = Some(reply.clone());
                }
                reply
            }
            None => self
                .last
                .lock()
                .ok()
                .and_then(|l| l.clone())
                .unwrap_or_else(|| Err("empty script".to_string())),
        };

        reply.map_err(BriefingError::GenerationTransient)
    }
}
