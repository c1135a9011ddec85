use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::{parse_or, ConfigError};
use crate::errors::LlmError;

/// Upper bound for sampling temperature; reports must stay reproducible.
pub const MAX_TEMPERATURE: f32 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Gemini,
}

/// Configuration for the narrative model
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: usize,
    pub temperature: f32,
    pub timeout: Duration,
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::OpenAi,
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            max_tokens: 2000,
            temperature: MAX_TEMPERATURE,
            timeout: Duration::from_secs(60),
            base_url: None,
        }
    }
}

impl LlmConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    pub fn from_source<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match get("LLM_PROVIDER").map(|p| p.trim().to_lowercase()).as_deref() {
            None | Some("") | Some("openai") => ProviderKind::OpenAi,
            Some("gemini") => ProviderKind::Gemini,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "LLM_PROVIDER".into(),
                    value: other.to_string(),
                })
            }
        };

        let (fallback_key, default_model) = match provider {
            ProviderKind::OpenAi => ("OPENAI_API_KEY", "gpt-4o-mini"),
            ProviderKind::Gemini => ("GEMINI_API_KEY", "gemini-1.5-flash"),
        };

        let api_key = get("LLM_API_KEY")
            .or_else(|| get(fallback_key))
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        let temperature: f32 = parse_or(&get, "LLM_TEMPERATURE", MAX_TEMPERATURE)?;

        Ok(Self {
            provider,
            api_key,
            model: get("LLM_MODEL")
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| default_model.to_string()),
            max_tokens: parse_or(&get, "LLM_MAX_TOKENS", 2000)?,
            temperature: temperature.clamp(0.0, MAX_TEMPERATURE),
            timeout: Duration::from_secs(parse_or(&get, "LLM_TIMEOUT_SECS", 60)?),
            base_url: get("LLM_BASE_URL").filter(|u| !u.trim().is_empty()),
        })
    }
}

/// A single text-generation endpoint.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate a completion for `prompt` under the given system instruction
    async fn generate_completion(&self, system: &str, prompt: String) -> Result<String, LlmError>;
}

fn map_send_error(e: reqwest::Error) -> LlmError {
    if e.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::NetworkError(e.to_string())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = response.status();

    if status == 429 {
        return Err(LlmError::RateLimited);
    }

    if !status.is_success() {
        let error_text = response.text().await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(LlmError::ApiError(format!("HTTP {}: {}", status, error_text)));
    }

    Ok(response)
}

fn build_client(timeout: Duration) -> Result<Client, LlmError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::NetworkError(format!("failed to build HTTP client: {}", e)))
}

/// OpenAI chat-completions request/response structures
#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize, Clone)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

pub struct OpenAiProvider {
    api_key: String,
    model: String,
    max_tokens: usize,
    temperature: f32,
    endpoint: String,
    client: Client,
}

impl OpenAiProvider {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self, LlmError> {
        let base = config.base_url.as_deref().unwrap_or("https://api.openai.com/v1");
        Ok(Self {
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            endpoint: format!("{}/chat/completions", base.trim_end_matches('/')),
            client: build_client(config.timeout)?,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate_completion(&self, system: &str, prompt: String) -> Result<String, LlmError> {
        info!("Generating LLM completion (model: {}, max_tokens: {})", self.model, self.max_tokens);

        let request = OpenAiRequest {
            model: self.model.clone(),
            messages: vec![
                OpenAiMessage { role: "system".to_string(), content: system.to_string() },
                OpenAiMessage { role: "user".to_string(), content: prompt },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self.client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(map_send_error)?;

        let response: OpenAiResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        if let Some(usage) = &response.usage {
            info!("LLM completion generated. Tokens: {} prompt + {} completion = {} total",
                  usage.prompt_tokens, usage.completion_tokens, usage.total_tokens);
        }

        response.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))
    }
}

/// Gemini `generateContent` request/response structures
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    system_instruction: GeminiContent,
    contents: Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature: f32,
    max_output_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

pub struct GeminiProvider {
    api_key: String,
    model: String,
    max_tokens: usize,
    temperature: f32,
    base_url: String,
    client: Client,
}

impl GeminiProvider {
    pub fn new(config: &LlmConfig, api_key: String) -> Result<Self, LlmError> {
        let base = config
            .base_url
            .as_deref()
            .unwrap_or("https://generativelanguage.googleapis.com/v1beta");
        Ok(Self {
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            base_url: base.trim_end_matches('/').to_string(),
            client: build_client(config.timeout)?,
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    async fn generate_completion(&self, system: &str, prompt: String) -> Result<String, LlmError> {
        info!("Generating Gemini completion (model: {}, max_tokens: {})", self.model, self.max_tokens);

        let request = GeminiRequest {
            system_instruction: GeminiContent {
                role: None,
                parts: vec![GeminiPart { text: system.to_string() }],
            },
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        };

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self.client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(map_send_error)?;

        let response: GeminiResponse = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let text: String = response.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|content| content.parts.into_iter().map(|p| p.text).collect())
            .ok_or_else(|| LlmError::InvalidResponse("No candidates in response".to_string()))?;

        if text.trim().is_empty() {
            return Err(LlmError::InvalidResponse("Empty candidate text".to_string()));
        }
        Ok(text)
    }
}

/// Narrative model facade; holds no provider when no API key is configured.
pub struct LlmService {
    provider: Option<Arc<dyn LlmProvider>>,
}

impl LlmService {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let Some(api_key) = config.api_key.clone() else {
            warn!("LLM API key not configured. Narrative analysis disabled.");
            return Ok(Self { provider: None });
        };

        info!("Initializing LLM service with provider {:?} (model: {})", config.provider, config.model);
        let provider: Arc<dyn LlmProvider> = match config.provider {
            ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(config, api_key)?),
            ProviderKind::Gemini => Arc::new(GeminiProvider::new(config, api_key)?),
        };
        Ok(Self { provider: Some(provider) })
    }

    pub fn with_provider(provider: Arc<dyn LlmProvider>) -> Self {
        Self { provider: Some(provider) }
    }

    pub fn disabled() -> Self {
        Self { provider: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn generate_completion(&self, system: &str, prompt: String) -> Result<String, LlmError> {
        let provider = self.provider.as_ref()
            .ok_or(LlmError::Disabled)?;

        provider.generate_completion(system, prompt).await
    }
}
