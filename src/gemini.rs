use std::time::Duration;

use log::{debug, warn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::preset::ApiVersion;

/// Shown in place of a reply when the response carries no text.
pub const REPLY_UNAVAILABLE: &str = "Error: could not retrieve a reply.";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Gemini API error {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Deserialize, Default)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Default)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Default)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// Text of the first part of the first candidate, if it has any.
    fn reply_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
            .filter(|t| !t.is_empty())
    }
}

/// Where requests go: `{base_url}/{version}/models/{model}:generateContent`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub base_url: String,
    pub version: ApiVersion,
    pub model: String,
}

impl Endpoint {
    pub fn url(&self) -> String {
        format!(
            "{}/{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.version.as_str(),
            self.model
        )
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: Endpoint,
    api_key: String,
}

impl GeminiClient {
    pub fn new(endpoint: Endpoint, api_key: &str, timeout: Duration) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(timeout))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.to_string(),
        })
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Same key and transport, different model.
    pub fn with_endpoint(&self, endpoint: Endpoint) -> Self {
        Self {
            client: self.client.clone(),
            endpoint,
            api_key: self.api_key.clone(),
        }
    }

    /// Sends one stateless request carrying only `prompt`.
    ///
    /// A successful response without reply text yields [`REPLY_UNAVAILABLE`]
    /// rather than an error.
    pub async fn generate(&self, prompt: &str) -> Result<String, DispatchError> {
        let request = GenerateRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        debug!("POST {} ({} chars)", self.endpoint.url(), prompt.chars().count());

        let response = self
            .client
            .post(self.endpoint.url())
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Status { status, body });
        }

        let body = response.text().await?;
        let parsed: GenerateResponse = serde_json::from_str(&body)?;

        Ok(parsed.reply_text().unwrap_or_else(|| {
            warn!("response from {} had no reply text", self.endpoint.model);
            REPLY_UNAVAILABLE.to_string()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn endpoint(base_url: &str, version: ApiVersion, model: &str) -> Endpoint {
        Endpoint {
            base_url: base_url.to_string(),
            version,
            model: model.to_string(),
        }
    }

    fn client(base_url: &str) -> GeminiClient {
        GeminiClient::new(
            endpoint(base_url, ApiVersion::V1Beta, "gemini-2.0-flash-001"),
            "test-key",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_url() {
        let flash = endpoint("https://example.com/", ApiVersion::V1Beta, "gemini-2.0-flash-001");
        assert_eq!(
            flash.url(),
            "https://example.com/v1beta/models/gemini-2.0-flash-001:generateContent"
        );
        let pro = endpoint("https://example.com", ApiVersion::V1, "gemini-2.5-pro");
        assert_eq!(pro.url(), "https://example.com/v1/models/gemini-2.5-pro:generateContent");
    }

    #[test]
    fn test_reply_text_missing_fields() {
        let cases = [
            json!({}),
            json!({ "candidates": [] }),
            json!({ "candidates": [{}] }),
            json!({ "candidates": [{ "content": { "parts": [] } }] }),
            json!({ "candidates": [{ "content": { "parts": [{}] } }] }),
            json!({ "candidates": [{ "content": { "parts": [{ "text": "" }] } }] }),
        ];
        for case in cases {
            let parsed: GenerateResponse = serde_json::from_value(case.clone()).unwrap();
            assert_eq!(parsed.reply_text(), None, "case: {}", case);
        }
    }

    #[test]
    fn test_reply_text_takes_first_part_of_first_candidate() {
        let parsed: GenerateResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "parts": [{ "text": "first" }, { "text": "second" }] } },
                { "content": { "parts": [{ "text": "other" }] } }
            ]
        }))
        .unwrap();
        assert_eq!(parsed.reply_text().as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_generate_sends_single_user_turn() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-2.0-flash-001:generateContent")
            .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
            .match_body(Matcher::Json(json!({
                "contents": [{ "role": "user", "parts": [{ "text": "Hello there" }] }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"General Kenobi"}]}}]}"#)
            .expect(1)
            .create_async()
            .await;

        let reply = client(&server.url()).generate("Hello there").await.unwrap();
        assert_eq!(reply, "General Kenobi");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_generate_without_text_uses_sentinel() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1beta/models/gemini-2.0-flash-001:generateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#)
            .create_async()
            .await;

        let reply = client(&server.url()).generate("hi").await.unwrap();
        assert_eq!(reply, REPLY_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_generate_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1beta/models/gemini-2.0-flash-001:generateContent")
            .match_query(Matcher::Any)
            .with_status(403)
            .with_body("API key not valid")
            .create_async()
            .await;

        let err = client(&server.url()).generate("hi").await.unwrap_err();
        match err {
            DispatchError::Status { status, body } => {
                assert_eq!(status, StatusCode::FORBIDDEN);
                assert_eq!(body, "API key not valid");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_generate_malformed_json() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1beta/models/gemini-2.0-flash-001:generateContent")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let err = client(&server.url()).generate("hi").await.unwrap_err();
        assert!(matches!(err, DispatchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_generate_connection_refused() {
        // Nothing listens on the discard port
        let err = client("http://127.0.0.1:9").generate("hi").await.unwrap_err();
        assert!(matches!(err, DispatchError::Transport(_)));
    }

    #[tokio::test]
    async fn test_with_endpoint_switches_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/models/gemini-2.5-pro:generateContent")
            .match_query(Matcher::UrlEncoded("key".into(), "test-key".into()))
            .with_status(200)
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"pro"}]}}]}"#)
            .create_async()
            .await;

        let pro = client(&server.url())
            .with_endpoint(endpoint(&server.url(), ApiVersion::V1, "gemini-2.5-pro"));
        assert_eq!(pro.generate("hi").await.unwrap(), "pro");
        mock.assert_async().await;
    }
}
