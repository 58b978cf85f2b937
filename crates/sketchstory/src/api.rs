use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ApiConfig;
use crate::credential::Credential;
use crate::error::ServiceError;

// --- OpenAI-compatible request/response structs ---

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<OaiMessage>,
    pub max_tokens: u32,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct OaiMessage {
    pub role: &'static str,
    pub content: OaiContent,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum OaiContent {
    Text(String),
    Parts(Vec<OaiContentPart>),
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum OaiContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct ImageUrl {
    pub url: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl ChatCompletionRequest {
    /// One user message, plain text.
    pub fn text(model: &str, prompt: String, max_tokens: u32) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![OaiMessage {
                role: "user",
                content: OaiContent::Text(prompt),
            }],
            max_tokens,
        }
    }

    /// One user message carrying an instruction and an image.
    pub fn with_image(model: &str, prompt: String, image_url: String, max_tokens: u32) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![OaiMessage {
                role: "user",
                content: OaiContent::Parts(vec![
                    OaiContentPart::Text { text: prompt },
                    OaiContentPart::ImageUrl {
                        image_url: ImageUrl { url: image_url },
                    },
                ]),
            }],
            max_tokens,
        }
    }
}

/// Transport behaviour applied to every request.
///
/// No retry: each action sends exactly one request and a failure goes straight back
/// to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RequestPolicy {
    /// `None` leaves reqwest's default (no timeout) in place.
    pub timeout: Option<Duration>,
}

impl RequestPolicy {
    pub fn from_config(config: &ApiConfig) -> Self {
        Self {
            timeout: config.timeout(),
        }
    }
}

/// Something that answers chat-completion requests.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Send one request and return the first choice's content, which may be absent.
    async fn complete(
        &self,
        request: &ChatCompletionRequest,
        credential: &Credential,
    ) -> Result<Option<String>, ServiceError>;
}

/// Hosted OpenAI-compatible endpoint over HTTPS.
pub struct OpenAiBackend {
    client: reqwest::Client,
    endpoint: String,
    policy: RequestPolicy,
}

impl OpenAiBackend {
    pub fn new(config: &ApiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            policy: RequestPolicy::from_config(config),
        }
    }

    pub fn policy(&self) -> RequestPolicy {
        self.policy
    }

    fn build_request(
        &self,
        request: &ChatCompletionRequest,
        credential: &Credential,
    ) -> Result<reqwest::Request, ServiceError> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .bearer_auth(credential.expose())
            .header("content-type", "application/json")
            .json(request);
        if let Some(timeout) = self.policy.timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|e| ServiceError::Network(format!("could not build request: {e}")))
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn complete(
        &self,
        request: &ChatCompletionRequest,
        credential: &Credential,
    ) -> Result<Option<String>, ServiceError> {
        let http_request = self.build_request(request, credential)?;
        info!(model = %request.model, max_tokens = request.max_tokens, "Sending chat completion request");

        let response = self.client.execute(http_request).await.map_err(|e| {
            if e.is_timeout() {
                ServiceError::Timeout
            } else {
                ServiceError::Network(e.without_url().to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Chat completion request failed");
            return Err(error_for_status(status, body));
        }

        let body = response
            .text()
            .await
            .map_err(|e| ServiceError::Network(e.without_url().to_string()))?;
        let content = parse_response(&body)?;
        debug!(has_content = content.is_some(), "Chat completion response received");
        Ok(content)
    }
}

fn error_for_status(status: StatusCode, body: String) -> ServiceError {
    match status.as_u16() {
        401 | 403 => ServiceError::Unauthorized,
        429 => ServiceError::RateLimited,
        code @ 500..=599 => ServiceError::Server(code),
        code => ServiceError::Http { status: code, body },
    }
}

/// Pull the first choice's content out of a response body.
fn parse_response(body: &str) -> Result<Option<String>, ServiceError> {
    let parsed: ChatCompletionResponse =
        serde_json::from_str(body).map_err(|e| ServiceError::Malformed(e.to_string()))?;
    parsed
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content)
        .ok_or_else(|| ServiceError::Malformed("response has no choices".into()))
}

/// Scripted backend that records every request it receives.
#[cfg(test)]
pub(crate) mod mock {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    pub(crate) struct ScriptedBackend {
        replies: Mutex<VecDeque<Result<Option<String>, ServiceError>>>,
        requests: Mutex<Vec<ChatCompletionRequest>>,
    }

    impl ScriptedBackend {
        pub(crate) fn replying<I>(replies: I) -> Self
        where
            I: IntoIterator<Item = Result<Option<String>, ServiceError>>,
        {
            Self {
                replies: Mutex::new(replies.into_iter().collect()),
                requests: Mutex::default(),
            }
        }

        pub(crate) fn texts(texts: &[&str]) -> Self {
            Self::replying(texts.iter().map(|t| Ok(Some(t.to_string()))))
        }

        pub(crate) fn requests(&self) -> Vec<ChatCompletionRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        async fn complete(
            &self,
            request: &ChatCompletionRequest,
            _credential: &Credential,
        ) -> Result<Option<String>, ServiceError> {
            self.requests.lock().unwrap().push(request.clone());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(ServiceError::Network("no scripted reply left".into())))
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;

    fn backend(timeout_secs: u64) -> OpenAiBackend {
        OpenAiBackend::new(&ApiConfig {
            endpoint: "https://llm.example.test/v1/chat/completions".into(),
            model: "gpt-4o-mini".into(),
            timeout_secs,
        })
    }

    fn body_json(request: &reqwest::Request) -> Value {
        let bytes = request.body().and_then(|b| b.as_bytes()).unwrap();
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn image_request_serializes_as_text_and_image_parts() {
        let req = ChatCompletionRequest::with_image(
            "gpt-4o-mini",
            "Describe".into(),
            "data:image/png;base64,AAAA".into(),
            300,
        );
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "model": "gpt-4o-mini",
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "Describe"},
                        {"type": "image_url", "image_url": {"url": "data:image/png;base64,AAAA"}}
                    ]
                }],
                "max_tokens": 300
            })
        );
    }

    #[test]
    fn text_request_serializes_content_as_string() {
        let req = ChatCompletionRequest::text("gpt-4o-mini", "Tell a story".into(), 600);
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "model": "gpt-4o-mini",
                "messages": [{"role": "user", "content": "Tell a story"}],
                "max_tokens": 600
            })
        );
    }

    #[test]
    fn http_request_carries_auth_body_and_timeout() {
        let backend = backend(45);
        let cred = Credential::new("sk-test").unwrap();
        let req = ChatCompletionRequest::text("gpt-4o-mini", "hola".into(), 600);

        let http = backend.build_request(&req, &cred).unwrap();
        assert_eq!(http.method(), &reqwest::Method::POST);
        assert_eq!(http.url().as_str(), "https://llm.example.test/v1/chat/completions");
        assert_eq!(http.headers()["authorization"], "Bearer sk-test");
        assert_eq!(http.headers()["content-type"], "application/json");
        assert_eq!(http.timeout(), Some(&Duration::from_secs(45)));
        assert_eq!(body_json(&http), serde_json::to_value(&req).unwrap());
    }

    #[test]
    fn zero_timeout_leaves_transport_default() {
        let backend = backend(0);
        assert_eq!(backend.policy(), RequestPolicy { timeout: None });
        let cred = Credential::new("sk-test").unwrap();
        let req = ChatCompletionRequest::text("gpt-4o-mini", "hola".into(), 600);
        assert_eq!(backend.build_request(&req, &cred).unwrap().timeout(), None);
    }

    #[test]
    fn maps_http_statuses() {
        assert_eq!(error_for_status(StatusCode::UNAUTHORIZED, String::new()), ServiceError::Unauthorized);
        assert_eq!(error_for_status(StatusCode::FORBIDDEN, String::new()), ServiceError::Unauthorized);
        assert_eq!(error_for_status(StatusCode::TOO_MANY_REQUESTS, String::new()), ServiceError::RateLimited);
        assert_eq!(error_for_status(StatusCode::SERVICE_UNAVAILABLE, String::new()), ServiceError::Server(503));
        assert_eq!(
            error_for_status(StatusCode::BAD_REQUEST, "bad image".into()),
            ServiceError::Http { status: 400, body: "bad image".into() }
        );
    }

    #[test]
    fn parses_first_choice_content() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Un balón"}},{"message":{"content":"otro"}}]}"#;
        assert_eq!(parse_response(body).unwrap(), Some("Un balón".into()));
    }

    #[test]
    fn null_content_is_absent() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        assert_eq!(parse_response(body).unwrap(), None);
    }

    #[test]
    fn missing_choices_is_malformed() {
        assert!(matches!(parse_response(r#"{"choices":[]}"#), Err(ServiceError::Malformed(_))));
        assert!(matches!(parse_response("not json"), Err(ServiceError::Malformed(_))));
    }
}
