mod common;

use briefing_bot::config::{BackoffKind, GenerationConfig};
use briefing_bot::llm_adapter::candidate_body;
use briefing_bot::pipeline::render_message;
use briefing_bot::{
    normalize, CategoryItems, Corpus, DigestGenerator, DigestResult, FeedItem, GeminiEndpoint,
    GenerationEndpoint, ItemBody, RawResponse, Result, RetryPolicy, ScriptedEndpoint,
};
use async_trait::async_trait;
use common::*;
use std::sync::Arc;
use std::time::Duration;

const INSTRUCTIONS: &str = "Briefing for {date}\n\n{corpus}";
const NO_CONTENT: &str = "No news today.";

fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        delay: Duration::ZERO,
        kind: BackoffKind::Constant,
    }
}

fn generator(endpoint: Arc<dyn GenerationEndpoint>) -> DigestGenerator {
    DigestGenerator::new(endpoint, INSTRUCTIONS.to_string(), NO_CONTENT.to_string())
        .with_retry(fast_retry())
        .with_timeout(Duration::from_secs(10))
        .with_utc_offset(9)
}

fn sample_corpus() -> Corpus {
    normalize(
        vec![CategoryItems {
            label: "Economy".to_string(),
            max_items: 5,
            items: vec![FeedItem {
                title: "Rates held".to_string(),
                body: ItemBody::TitleOnly,
                published_at: Some(hours_ago(1)),
                source_label: "Economy".to_string(),
            }],
        }],
        60_000,
    )
}

fn busy() -> std::result::Result<RawResponse, String> {
    Ok(RawResponse::new(503, r#"{"error":{"code":503,"message":"overloaded"}}"#))
}

#[tokio::test]
async fn empty_corpus_skips_the_endpoint() {
    init_tracing();

    let endpoint = Arc::new(ScriptedEndpoint::always_text("unused"));
    let result = generator(endpoint.clone()).generate(&Corpus::default(), now()).await;

    assert_eq!(result, DigestResult::Text(NO_CONTENT.to_string()));
    assert_eq!(endpoint.calls(), 0);
}

#[tokio::test]
async fn prompt_carries_local_date_and_corpus() {
    init_tracing();

    let endpoint = Arc::new(ScriptedEndpoint::always_text("BRIEF"));
    let result = generator(endpoint.clone()).generate(&sample_corpus(), now()).await;

    assert_eq!(result, DigestResult::Text("BRIEF".to_string()));
    let prompts = endpoint.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].starts_with("Briefing for 2026-10-18"));
    assert!(prompts[0].contains("[Economy]\n1. Rates held\n"));
}

#[tokio::test]
async fn transient_errors_are_retried_until_success() {
    init_tracing();

    let endpoint = Arc::new(ScriptedEndpoint::new(vec![
        busy(),
        busy(),
        Ok(RawResponse::new(200, candidate_body("BRIEF"))),
    ]));
    let result = generator(endpoint.clone()).generate(&sample_corpus(), now()).await;

    assert_eq!(result, DigestResult::Text("BRIEF".to_string()));
    assert_eq!(endpoint.calls(), 3);
}

#[tokio::test]
async fn retry_budget_is_bounded() {
    init_tracing();

    let endpoint = Arc::new(ScriptedEndpoint::new(vec![busy()]));
    let result = generator(endpoint.clone()).generate(&sample_corpus(), now()).await;

    assert_eq!(endpoint.calls(), 3);
    match result {
        DigestResult::Failure { reason, diagnostic } => {
            assert!(reason.contains("3 attempts"), "reason was {}", reason);
            assert!(diagnostic.unwrap_or_default().contains("overloaded"));
        }
        other => panic!("expected failure, got {:?}", other),
    }
}

#[tokio::test]
async fn transport_errors_count_as_transient() {
    init_tracing();

    let endpoint = Arc::new(ScriptedEndpoint::new(vec![
        Err("connection reset".to_string()),
        Ok(RawResponse::new(200, candidate_body("BRIEF"))),
    ]));
    let result = generator(endpoint.clone()).generate(&sample_corpus(), now()).await;

    assert_eq!(result, DigestResult::Text("BRIEF".to_string()));
    assert_eq!(endpoint.calls(), 2);
}

#[tokio::test]
async fn client_errors_fail_without_retry() {
    init_tracing();

    let body = r#"{"error":{"code":400,"message":"API key not valid"}}"#;
    let endpoint = Arc::new(ScriptedEndpoint::new(vec![Ok(RawResponse::new(400, body))]));
    let result = generator(endpoint.clone()).generate(&sample_corpus(), now()).await;

    assert_eq!(endpoint.calls(), 1);
    assert_eq!(
        result,
        DigestResult::failure("client error (HTTP 400)", Some(body.to_string()))
    );
}

#[tokio::test]
async fn rate_limit_is_not_retried() {
    init_tracing();

    let endpoint = Arc::new(ScriptedEndpoint::new(vec![Ok(RawResponse::new(429, "slow down"))]));
    let result = generator(endpoint.clone()).generate(&sample_corpus(), now()).await;

    assert_eq!(endpoint.calls(), 1);
    assert!(!result.is_text());
}

#[tokio::test]
async fn redirect_status_is_reported_as_unexpected() {
    init_tracing();

    let endpoint = Arc::new(ScriptedEndpoint::new(vec![Ok(RawResponse::new(302, "moved"))]));
    let result = generator(endpoint.clone()).generate(&sample_corpus(), now()).await;

    assert_eq!(endpoint.calls(), 1);
    assert_eq!(
        result,
        DigestResult::failure("unexpected status (HTTP 302)", Some("moved".to_string()))
    );
}

#[tokio::test]
async fn unreachable_endpoint_diagnostic_never_contains_the_api_key() {
    init_tracing();

    let config = GenerationConfig {
        api_base: "http://127.0.0.1:1".to_string(),
        api_key: "SECRETKEY123".to_string(),
        request_timeout: Duration::from_secs(5),
        ..GenerationConfig::default()
    };
    let endpoint = Arc::new(GeminiEndpoint::new(&config).unwrap());
    let generator = generator(endpoint).with_retry(RetryPolicy {
        max_attempts: 1,
        delay: Duration::ZERO,
        kind: BackoffKind::Constant,
    });

    let result = generator.generate(&sample_corpus(), now()).await;
    let message = render_message(&result);

    assert!(!result.is_text());
    assert!(message.contains("server busy after 1 attempts"), "message was {}", message);
    assert!(!message.contains("SECRETKEY123"), "message was {}", message);
    assert!(!message.contains("key="), "message was {}", message);
}

#[tokio::test]
async fn malformed_success_body_is_a_failure_with_diagnostic() {
    init_tracing();

    let endpoint = Arc::new(ScriptedEndpoint::new(vec![Ok(RawResponse::new(
        200,
        r#"{"unexpected":true}"#,
    ))]));
    let result = generator(endpoint.clone()).generate(&sample_corpus(), now()).await;

    assert_eq!(endpoint.calls(), 1);
    assert_eq!(
        result,
        DigestResult::failure(
            "unrecognized response shape",
            Some(r#"{"unexpected":true}"#.to_string())
        )
    );
}

#[tokio::test]
async fn blocked_reply_is_a_failure() {
    init_tracing();

    let endpoint = Arc::new(ScriptedEndpoint::new(vec![Ok(RawResponse::new(
        200,
        r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#,
    ))]));
    let result = generator(endpoint).generate(&sample_corpus(), now()).await;

    match result {
        DigestResult::Failure { reason, .. } => assert!(reason.contains("SAFETY")),
        other => panic!("expected failure, got {:?}", other),
    }
}

struct SlowEndpoint;

#[async_trait]
impl GenerationEndpoint for SlowEndpoint {
    fn endpoint_name(&self) -> &str {
        "slow"
    }

    async fn post(&self, _prompt: &str) -> Result<RawResponse> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(RawResponse::new(200, candidate_body("too late")))
    }
}

#[tokio::test]
async fn generation_is_bounded_by_timeout() {
    init_tracing();

    let generator = DigestGenerator::new(
        Arc::new(SlowEndpoint),
        INSTRUCTIONS.to_string(),
        NO_CONTENT.to_string(),
    )
    .with_retry(fast_retry())
    .with_timeout(Duration::from_millis(50));

    let result = generator.generate(&sample_corpus(), now()).await;
    match result {
        DigestResult::Failure { reason, .. } => assert!(reason.contains("timed out")),
        other => panic!("expected timeout failure, got {:?}", other),
    }
}

#[test]
fn linear_backoff_grows_with_attempts() {
    let policy = RetryPolicy {
        max_attempts: 3,
        delay: Duration::from_secs(5),
        kind: BackoffKind::Linear,
    };
    assert_eq!(policy.delay_before(2), Duration::from_secs(5));
    assert_eq!(policy.delay_before(3), Duration::from_secs(10));
    assert_eq!(RetryPolicy::default().delay_before(3), Duration::from_secs(5));
}
