//! Gemini API client.

use reqwest::Client;
use tracing::debug;

use pinsmith_protocols::error::MatchError;

use crate::types::{GenerateContentRequest, GenerateContentResponse, GeminiError};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Thin client for the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_base_url(api_key, BASE_URL)
    }

    /// Override the API origin. Used by tests to point at a mock server.
    pub fn with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .timeout(std::time::Duration::from_secs(60))
                .build()
                .expect("Failed to build HTTP client"),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    /// Generate content (non-streaming).
    pub async fn generate_content(
        &self,
        model: &str,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse, MatchError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, model, self.api_key
        );

        debug!(model, "gemini generate_content");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| MatchError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| MatchError::Network(e.to_string()))?;

        if !status.is_success() {
            let message = match serde_json::from_str::<GeminiError>(&body) {
                Ok(e) => e.error.message,
                Err(_) => body,
            };
            return Err(MatchError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str(&body).map_err(|e| MatchError::Api {
            status: status.as_u16(),
            message: format!("failed to parse response: {e}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Content;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content::user("hello")],
        }
    }

    #[tokio::test]
    async fn test_generate_content_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": "Pets"}]},
                    "finishReason": "STOP"
                }]
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::with_base_url("test-key", server.uri());
        let response = client
            .generate_content("gemini-2.5-flash", request())
            .await
            .unwrap();
        assert_eq!(response.text().as_deref(), Some("Pets"));
    }

    #[tokio::test]
    async fn test_generate_content_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "error": {"code": 429, "message": "Resource has been exhausted"}
            })))
            .mount(&server)
            .await;

        let client = GeminiClient::with_base_url("test-key", server.uri());
        let err = client
            .generate_content("gemini-2.5-flash", request())
            .await
            .unwrap_err();
        match err {
            MatchError::Api { status, message } => {
                assert_eq!(status, 429);
                assert!(message.contains("exhausted"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_generate_content_unreachable() {
        let client = GeminiClient::with_base_url("test-key", "http://127.0.0.1:1");
        let err = client
            .generate_content("gemini-2.5-flash", request())
            .await
            .unwrap_err();
        assert!(matches!(err, MatchError::Network(_)));
    }
}
