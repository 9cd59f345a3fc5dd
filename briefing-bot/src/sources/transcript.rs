use crate::traits::TranscriptService;
use crate::types::{BriefingError, Result, TranscriptFragment};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Captions lookup against an HTTP transcript endpoint.
///
/// `GET <base>?video_id=<id>&languages=ko,en` is expected to answer with a
/// JSON array of `{text, start, duration}` fragments; any other status means
/// no captions are available for that video.
pub struct HttpTranscriptService {
    client: Client,
    base_url: Url,
}

impl HttpTranscriptService {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: Url::parse(base_url)?,
        })
    }

    fn request_url(&self, video_id: &str, languages: &[String]) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut()
            .append_pair("video_id", video_id)
            .append_pair("languages", &languages.join(","));
        url
    }
}

#[async_trait]
impl TranscriptService for HttpTranscriptService {
    async fn fetch(&self, video_id: &str, languages: &[String]) -> Result<Vec<TranscriptFragment>> {
        let url = self.request_url(video_id, languages);
        debug!("Requesting transcript for {}", video_id);

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BriefingError::TranscriptUnavailable {
                video_id: video_id.to_string(),
                message: format!("HTTP {}", status.as_u16()),
            });
        }

        let fragments: Vec<TranscriptFragment> = response.json().await?;
        if fragments.iter().all(|f| f.text.trim().is_empty()) {
            return Err(BriefingError::TranscriptUnavailable {
                video_id: video_id.to_string(),
                message: "empty transcript".to_string(),
            });
        }
        Ok(fragments)
    }
}

/// Used when no transcript endpoint is configured.
pub struct NoTranscripts;

#[async_trait]
impl TranscriptService for NoTranscripts {
    async fn fetch(&self, video_id: &str, _languages: &[String]) -> Result<Vec<TranscriptFragment>> {
        Err(BriefingError::TranscriptUnavailable {
            video_id: video_id.to_string(),
            message: "no transcript service configured".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_url_carries_id_and_languages() {
        let service =
            HttpTranscriptService::new("https://captions.example.com/transcript", Duration::from_secs(5))
                .unwrap();
        let url = service.request_url("abc123", &["ko".to_string(), "en".to_string()]);
        assert_eq!(
            url.as_str(),
            "https://captions.example.com/transcript?video_id=abc123&languages=ko%2Cen"
        );
    }
}
