//! Board matching on top of the Gemini client.

use async_trait::async_trait;
use tracing::debug;

use pinsmith_protocols::error::MatchError;
use pinsmith_protocols::matcher::BoardMatcher;

use crate::client::GeminiClient;
use crate::types::{Content, GenerateContentRequest};

/// Asks Gemini to pick the board a target name semantically belongs to.
pub struct GeminiBoardMatcher {
    client: GeminiClient,
    model: String,
}

impl GeminiBoardMatcher {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: GeminiClient::new(api_key),
            model: model.into(),
        }
    }

    /// Build a matcher over an existing client. Used by tests.
    pub fn with_client(client: GeminiClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    fn prompt(target: &str, candidates: &[String]) -> String {
        let list = serde_json::to_string(candidates).unwrap_or_else(|_| "[]".to_string());
        format!(
            "You are a smart organizational assistant.\n\
             Target Board Name: \"{target}\"\n\
             Available Boards: {list}\n\n\
             Task: Find the best matching board from the strict \"Available Boards\" list \
             that is semantically compatible with the \"Target Board Name\".\n\
             - If the target is very similar or conceptually fits perfectly into one of the \
             available boards (e.g. \"Cat Pics\" fits \"Pets\", \"Living Room\" fits \
             \"Home Decor\"), return that EXACT board name from the list.\n\
             - If no board is a good match, return \"null\".\n\n\
             Result must be ONLY the exact board name string or \"null\". No other text.\n\
             Do not create a new board name. Must pick from the list."
        )
    }
}

#[async_trait]
impl BoardMatcher for GeminiBoardMatcher {
    async fn best_match(
        &self,
        target: &str,
        candidates: &[String],
    ) -> Result<Option<String>, MatchError> {
        if candidates.is_empty() {
            return Ok(None);
        }

        let request = GenerateContentRequest {
            contents: vec![Content::user(Self::prompt(target, candidates))],
        };

        let response = self.client.generate_content(&self.model, request).await?;
        let text = response.text().ok_or(MatchError::EmptyResponse)?;

        let answer = text.trim().trim_matches('"').trim();
        debug!(target, answer, "gemini board match answer");

        if answer.is_empty() || answer.eq_ignore_ascii_case("null") {
            Ok(None)
        } else {
            Ok(Some(answer.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn matcher_against(server: &MockServer) -> GeminiBoardMatcher {
        GeminiBoardMatcher::with_client(
            GeminiClient::with_base_url("test-key", server.uri()),
            "gemini-2.5-flash",
        )
    }

    async fn mount_answer(server: &MockServer, answer: &str) {
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": {"role": "model", "parts": [{"text": answer}]}
                }]
            })))
            .mount(server)
            .await;
    }

    fn boards(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_best_match_returns_answer() {
        let server = MockServer::start().await;
        mount_answer(&server, "Home Decor").await;

        let matcher = matcher_against(&server).await;
        let answer = matcher
            .best_match("Living Room", &boards(&["Home Decor", "Pets"]))
            .await
            .unwrap();
        assert_eq!(answer.as_deref(), Some("Home Decor"));
    }

    #[tokio::test]
    async fn test_best_match_strips_quotes() {
        let server = MockServer::start().await;
        mount_answer(&server, "\"Pets\"").await;

        let matcher = matcher_against(&server).await;
        let answer = matcher
            .best_match("Cat Pics", &boards(&["Pets"]))
            .await
            .unwrap();
        assert_eq!(answer.as_deref(), Some("Pets"));
    }

    #[tokio::test]
    async fn test_best_match_null_sentinel() {
        let server = MockServer::start().await;
        mount_answer(&server, "null").await;

        let matcher = matcher_against(&server).await;
        let answer = matcher
            .best_match("Recipes", &boards(&["Pets"]))
            .await
            .unwrap();
        assert!(answer.is_none());
    }

    #[tokio::test]
    async fn test_best_match_quoted_null_sentinel() {
        let server = MockServer::start().await;
        mount_answer(&server, "\"null\"").await;

        let matcher = matcher_against(&server).await;
        let answer = matcher
            .best_match("Recipes", &boards(&["Pets"]))
            .await
            .unwrap();
        assert!(answer.is_none());
    }

    #[tokio::test]
    async fn test_best_match_empty_candidates_skips_api() {
        // No mock mounted: an API call would fail the test with a connection error.
        let server = MockServer::start().await;
        let matcher = matcher_against(&server).await;
        let answer = matcher.best_match("Recipes", &[]).await.unwrap();
        assert!(answer.is_none());
    }

    #[tokio::test]
    async fn test_best_match_propagates_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/gemini-2.5-flash:generateContent"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let matcher = matcher_against(&server).await;
        let err = matcher
            .best_match("Recipes", &boards(&["Pets"]))
            .await
            .unwrap_err();
        assert!(matches!(err, MatchError::Api { status: 500, .. }));
    }

    #[test]
    fn test_prompt_mentions_target_and_candidates() {
        let prompt =
            GeminiBoardMatcher::prompt("Living Room", &boards(&["Home Decor", "Pets"]));
        assert!(prompt.contains("Living Room"));
        assert!(prompt.contains("Home Decor"));
        assert!(prompt.contains("\"null\""));
    }
}
