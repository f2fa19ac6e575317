use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::advice::TextProvider;
use crate::config::{ApiKey, ProviderConfig};
use crate::error::AdviceError;

// Structures matching the generateContent endpoint
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize, Debug, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    // usageMetadata, modelVersion, etc. are ignored
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    /// Text of the first candidate, or an empty string if there is none.
    fn into_text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|p| p.text)
                    .collect::<Vec<_>>()
                    .concat()
            })
            .unwrap_or_default()
    }
}

/// Google Gemini text generation over REST.
pub struct GeminiClient {
    client: Client,
    api_key: Option<ApiKey>,
    endpoint: String,
    temperature: f32,
    timeout: Duration,
}

impl GeminiClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, AdviceError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AdviceError::ServiceUnavailable(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                config.api_url.trim_end_matches('/'),
                config.model
            ),
            temperature: config.temperature,
            timeout: config.timeout,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    #[instrument(skip(self, prompt), fields(endpoint = %self.endpoint))]
    async fn generate_content(&self, prompt: &str) -> Result<String, AdviceError> {
        let api_key = self.api_key.as_ref().ok_or_else(|| {
            AdviceError::AuthenticationError(
                "API key not found. Set GOOGLE_API_KEY or pass --api-key".to_string(),
            )
        })?;

        let request_payload = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", api_key.expose())
            .json(&request_payload)
            .send()
            .await
            .map_err(|e| map_transport_error(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(%status, %error_body, "Gemini API request failed");
            return Err(map_status_error(status, &error_body));
        }

        let body = response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    map_transport_error(e, self.timeout)
                } else {
                    AdviceError::ServiceUnavailable(format!("Malformed response from Gemini API: {}", e))
                }
            })?;

        let text = body.into_text();
        debug!(response_len = text.len(), "Received Gemini response");
        Ok(text)
    }
}

impl TextProvider for GeminiClient {
    fn generate<'a>(&'a self, prompt: &'a str) -> BoxFuture<'a, Result<String, AdviceError>> {
        Box::pin(self.generate_content(prompt))
    }
}

fn map_transport_error(e: reqwest::Error, timeout: Duration) -> AdviceError {
    if e.is_timeout() {
        AdviceError::Timeout(timeout)
    } else {
        AdviceError::ServiceUnavailable(format!("Failed to reach Gemini API: {}", e))
    }
}

fn map_status_error(status: StatusCode, body: &str) -> AdviceError {
    let rejected_key = status == StatusCode::BAD_REQUEST && body.contains("API_KEY_INVALID");
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN || rejected_key {
        AdviceError::AuthenticationError(format!("Gemini API rejected the credential ({})", status))
    } else {
        AdviceError::ServiceUnavailable(format!("Gemini API returned {}", status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_format() {
        let payload = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: "hello" }],
            }],
            generation_config: GenerationConfig { temperature: 0.5 },
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{"parts": [{"text": "hello"}]}],
                "generationConfig": {"temperature": 0.5}
            })
        );
    }

    #[test]
    fn test_response_text_joins_parts_of_first_candidate() {
        let body: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                {"content": {"parts": [{"text": "Eat "}, {"text": "greens."}], "role": "model"}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ],
            "usageMetadata": {"totalTokenCount": 12}
        }))
        .unwrap();
        assert_eq!(body.into_text(), "Eat greens.");
    }

    #[test]
    fn test_response_without_candidates_is_empty() {
        let body: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(body.into_text(), "");

        let blocked: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();
        assert_eq!(blocked.into_text(), "");
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            map_status_error(StatusCode::FORBIDDEN, ""),
            AdviceError::AuthenticationError(_)
        ));
        assert!(matches!(
            map_status_error(StatusCode::BAD_REQUEST, r#"{"error":{"details":[{"reason":"API_KEY_INVALID"}]}}"#),
            AdviceError::AuthenticationError(_)
        ));
        assert!(matches!(
            map_status_error(StatusCode::BAD_REQUEST, "bad prompt"),
            AdviceError::ServiceUnavailable(_)
        ));
        assert!(matches!(
            map_status_error(StatusCode::INTERNAL_SERVER_ERROR, ""),
            AdviceError::ServiceUnavailable(_)
        ));
    }

    #[test]
    fn test_endpoint_includes_model() {
        let mut config = ProviderConfig::new(None, "http://localhost:9999/");
        config.model = "gemini-test".to_string();
        let client = GeminiClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint,
            "http://localhost:9999/v1beta/models/gemini-test:generateContent"
        );
        assert!(!client.has_api_key());
    }
}
