//! Reply generation behind `/api/chat`.
//!
//! [`RootAgent`] answers through a configured LLM provider when one is
//! available and otherwise echoes the input back after a short delay.

use std::{str::FromStr, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::Settings;

const SYSTEM_PROMPT: &str = "You are a helpful AI assistant.";
const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("llm request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("llm returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("llm response contained no text")]
    EmptyResponse,
    #[error("unsupported llm provider: {0}")]
    UnsupportedProvider(String),
    #[error("llm api key is not configured")]
    MissingApiKey,
}

#[async_trait]
pub trait Agent: Send + Sync {
    async fn respond(&self, input: &str) -> Result<String, AgentError>;
}

#[async_trait]
impl<T> Agent for Arc<T>
where
    T: Agent + ?Sized,
{
    async fn respond(&self, input: &str) -> Result<String, AgentError> {
        (**self).respond(input).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Google,
}

impl FromStr for LlmProvider {
    type Err = AgentError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(Self::Google),
            other => Err(AgentError::UnsupportedProvider(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptMessage {
    pub role: &'static str,
    pub content: String,
}

/// Flattens a message history into a single prompt, prefixing non-user turns with their role.
pub fn render_prompt(messages: &[PromptMessage]) -> String {
    messages
        .iter()
        .map(|message| {
            if message.role == "user" {
                message.content.clone()
            } else {
                format!("{}: {}", message.role, message.content)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone)]
pub struct EchoAgent {
    delay: Duration,
}

impl EchoAgent {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Agent for EchoAgent {
    async fn respond(&self, input: &str) -> Result<String, AgentError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(format!(
            "Echo from Root Agent (Dummy Mode): You said '{input}'"
        ))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Google Gemini `generateContent` client.
#[derive(Debug, Clone)]
pub struct GeminiAgent {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: Option<u32>,
}

impl GeminiAgent {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            max_output_tokens: None,
        }
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, messages: &[PromptMessage]) -> Result<String, AgentError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: render_prompt(messages),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|error| format!("<unreadable body: {error}>"));
            return Err(AgentError::Status { status, body });
        }

        let body: GenerateContentResponse = response.json().await?;
        let text: String = body
            .candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .next()
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(AgentError::EmptyResponse);
        }
        debug!(model = %self.model, reply_len = text.len(), "llm reply received");
        Ok(text)
    }
}

#[async_trait]
impl Agent for GeminiAgent {
    async fn respond(&self, input: &str) -> Result<String, AgentError> {
        let messages = [
            PromptMessage {
                role: "system",
                content: SYSTEM_PROMPT.to_string(),
            },
            PromptMessage {
                role: "user",
                content: input.to_string(),
            },
        ];
        self.generate(&messages).await
    }
}

enum Mode {
    Llm(Arc<dyn Agent>),
    Echo(EchoAgent),
}

/// Entry point for chat requests.
///
/// LLM failures are answered in-band with an apology rather than failing the request.
pub struct RootAgent {
    mode: Mode,
}

impl RootAgent {
    pub fn from_settings(settings: &Settings) -> Self {
        let echo = EchoAgent::new(settings.echo_delay());
        match build_llm(settings) {
            Ok(llm) => {
                info!(model = %llm.model(), "root agent using google llm");
                Self::llm(Arc::new(llm))
            }
            Err(error) => {
                warn!(%error, "could not initialize llm; using dummy mode");
                Self::echo(echo)
            }
        }
    }

    pub fn llm(agent: Arc<dyn Agent>) -> Self {
        Self {
            mode: Mode::Llm(agent),
        }
    }

    pub fn echo(agent: EchoAgent) -> Self {
        Self {
            mode: Mode::Echo(agent),
        }
    }

    pub fn is_dummy(&self) -> bool {
        matches!(self.mode, Mode::Echo(_))
    }
}

fn build_llm(settings: &Settings) -> Result<GeminiAgent, AgentError> {
    let provider = settings
        .llm_provider
        .as_deref()
        .ok_or_else(|| AgentError::UnsupportedProvider("<unset>".to_string()))?
        .parse::<LlmProvider>()?;
    let api_key = settings
        .llm_api_key
        .as_deref()
        .ok_or(AgentError::MissingApiKey)?;

    match provider {
        LlmProvider::Google => {
            let agent = GeminiAgent::new(&settings.llm_base_url, api_key, &settings.llm_model);
            Ok(match settings.llm_max_tokens {
                Some(max_tokens) => agent.with_max_output_tokens(max_tokens),
                None => agent,
            })
        }
    }
}

#[async_trait]
impl Agent for RootAgent {
    async fn respond(&self, input: &str) -> Result<String, AgentError> {
        match &self.mode {
            Mode::Echo(echo) => echo.respond(input).await,
            Mode::Llm(llm) => match llm.respond(input).await {
                Ok(reply) => Ok(reply),
                Err(err) => {
                    error!(error = %err, "error calling llm");
                    Ok(format!("Sorry, I encountered an error: {err}"))
                }
            },
        }
    }
}

#[cfg(test)]
#[path = "tests/agent_tests.rs"]
mod tests;
