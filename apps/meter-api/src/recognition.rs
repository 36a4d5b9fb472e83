//! Image recognition adapter.
//!
//! Sends a reading image to a Gemini-style `generateContent` endpoint and
//! scans the reply for the first numeric token. The adapter is intentionally
//! tolerant: transport failures, non-2xx statuses, unusable bodies and
//! numberless text all come back as `None` so the lifecycle service can apply
//! one uniform rejection path.

use std::time::Duration;

use async_trait::async_trait;
use meter_core::{reading, ImagePayload};
use serde::{Deserialize, Serialize};

const RECOGNITION_INSTRUCTION: &str =
    "Extract the numeric reading from this utility bill image.";

/// Seam between the lifecycle service and the external recognition service.
#[async_trait]
pub trait ReadingRecognizer: Send + Sync {
    /// A parsed numeric reading, or `None` for "no confident reading".
    async fn extract_reading(&self, image: &ImagePayload) -> Option<f64>;
}

/// Production recognizer backed by the Gemini generateContent API.
pub struct GeminiRecognizer {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

impl GeminiRecognizer {
    /// `timeout` bounds the whole call; expiry degrades to "no reading"
    /// rather than blocking the request.
    pub fn new(api_key: String, url: String, timeout: Duration) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, url, api_key })
    }
}

#[async_trait]
impl ReadingRecognizer for GeminiRecognizer {
    async fn extract_reading(&self, image: &ImagePayload) -> Option<f64> {
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::text(RECOGNITION_INSTRUCTION),
                    Part::inline_image(image),
                ],
            }],
        };

        let response = match self
            .http
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("recognition call failed: {}", e);
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("recognition service returned {}", status);
            return None;
        }

        let parsed: GenerateContentResponse = match response.json().await {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("unparseable recognition response: {}", e);
                return None;
            }
        };

        let text = parsed.text();
        if text.is_empty() {
            tracing::warn!("recognition response carried no text");
            return None;
        }

        reading::first_number(&text)
    }
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inline_data", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: &str) -> Self {
        Part {
            text: Some(text.to_string()),
            inline_data: None,
        }
    }

    fn inline_image(image: &ImagePayload) -> Self {
        Part {
            text: None,
            inline_data: Some(InlineData {
                mime_type: image.format.mime_type().to_string(),
                data: image.base64_content(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate's parts.
    fn text(&self) -> String {
        self.candidates
            .first()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .iter()
                    .filter_map(|part| part.text.as_deref())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: ResponseContent,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}
