use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vendorlink_core::config::LlmConfig;
use vendorlink_core::domain::chat::{Message, Role};

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("llm transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("llm returned status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("llm response carried no completion text")]
    MalformedResponse,
}

/// Pluggable completion seam. The graph only ever needs text in, text out;
/// streaming is deliberately not part of this contract.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system: &str, history: &[Message]) -> Result<String, LlmError>;
}

/// Client for any OpenAI-compatible `chat/completions` endpoint.
///
/// Tool messages are internal bookkeeping and are not forwarded upstream;
/// the provider sees system, user, and assistant roles only.
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
}

impl OpenAiCompatClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone(),
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn complete(&self, system: &str, history: &[Message]) -> Result<String, LlmError> {
        let mut messages = vec![WireMessage { role: "system", content: system }];
        for message in history {
            let role = match message.role {
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::Tool => continue,
            };
            messages.push(WireMessage { role, content: &message.content });
        }

        let request = ChatRequest { model: &self.model, messages, temperature: 0.0 };
        let url = format!("{}/chat/completions", self.base_url);

        let mut builder = self.http.post(&url).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key.expose_secret());
        }

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status: status.as_u16(), body });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(LlmError::MalformedResponse)
    }
}

/// Deterministic test double: replays a scripted sequence of completions or
/// failures. Exposed publicly so downstream crates can exercise full turns
/// without a provider.
#[derive(Default)]
pub struct ScriptedLlm {
    steps: std::sync::Mutex<std::collections::VecDeque<Result<String, String>>>,
}

impl ScriptedLlm {
    pub fn replying(responses: &[&str]) -> Self {
        Self {
            steps: std::sync::Mutex::new(
                responses.iter().map(|response| Ok(response.to_string())).collect(),
            ),
        }
    }

    pub fn unavailable(detail: &str) -> Self {
        Self { steps: std::sync::Mutex::new([Err(detail.to_string())].into_iter().collect()) }
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, _system: &str, _history: &[Message]) -> Result<String, LlmError> {
        let step = self
            .steps
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .pop_front();
        match step {
            Some(Ok(text)) => Ok(text),
            Some(Err(body)) => Err(LlmError::Api { status: 503, body }),
            None => Err(LlmError::MalformedResponse),
        }
    }
}
