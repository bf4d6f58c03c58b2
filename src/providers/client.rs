//! Provider trait and the request/response types shared by every tool.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::ProviderError;

const MAX_TEXT_CHARS: usize = 20_000;
const MAX_SPEECH_CHARS: usize = 5_000;
const MAX_SOURCE_BYTES: usize = 64 * 1024;
const MAX_CHAT_MESSAGES: usize = 50;

// ============================================================================
// Chat / translation
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl ChatRequest {
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.messages.is_empty() {
            return Err(invalid("messages must not be empty"));
        }
        if self.messages.len() > MAX_CHAT_MESSAGES {
            return Err(invalid(format!(
                "at most {} messages are allowed",
                MAX_CHAT_MESSAGES
            )));
        }
        if !self.messages.iter().any(|m| m.role == ChatRole::User) {
            return Err(invalid("at least one user message is required"));
        }
        let total: usize = self.messages.iter().map(|m| m.content.chars().count()).sum();
        if total > MAX_TEXT_CHARS {
            return Err(invalid(format!(
                "conversation exceeds {} characters",
                MAX_TEXT_CHARS
            )));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(invalid("temperature must be between 0 and 2"));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub content: String,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
    pub target_language: String,
    #[serde(default)]
    pub source_language: Option<String>,
}

impl TranslateRequest {
    pub fn validate(&self) -> Result<(), ProviderError> {
        validate_text(&self.text, MAX_TEXT_CHARS)?;
        if self.target_language.trim().is_empty() {
            return Err(invalid("target_language is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Translation {
    pub text: String,
    pub target_language: String,
}

// ============================================================================
// Detection / SEO
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetectRequest {
    pub text: String,
}

impl DetectRequest {
    pub fn validate(&self) -> Result<(), ProviderError> {
        validate_text(&self.text, MAX_TEXT_CHARS)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeoRequest {
    pub url: String,
}

impl SeoRequest {
    pub fn validate(&self) -> Result<(), ProviderError> {
        validate_http_url(&self.url).map(|_| ())
    }
}

// ============================================================================
// Speech
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SpeechRequest {
    pub text: String,
    /// Overrides the configured default voice
    #[serde(default)]
    pub voice_id: Option<String>,
}

impl SpeechRequest {
    pub fn validate(&self) -> Result<(), ProviderError> {
        validate_text(&self.text, MAX_SPEECH_CHARS)?;
        if let Some(voice) = &self.voice_id {
            if voice.is_empty() || !voice.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(invalid("voice_id must be alphanumeric"));
            }
        }
        Ok(())
    }
}

/// Encoded audio returned by the speech provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Audio {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

// ============================================================================
// Code execution
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub source_code: String,
    /// Judge0 language id (e.g. 71 = Python 3, 63 = JavaScript)
    pub language_id: u32,
    #[serde(default)]
    pub stdin: Option<String>,
}

impl ExecuteRequest {
    pub fn validate(&self) -> Result<(), ProviderError> {
        if self.source_code.trim().is_empty() {
            return Err(invalid("source_code must not be empty"));
        }
        if self.source_code.len() > MAX_SOURCE_BYTES {
            return Err(invalid(format!(
                "source_code exceeds {} bytes",
                MAX_SOURCE_BYTES
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    pub status: String,
    /// Wall time in seconds, as reported by the sandbox
    pub time: Option<String>,
    /// Peak memory in KB
    pub memory: Option<u64>,
}

// ============================================================================
// URL shortening
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShortenRequest {
    pub url: String,
    #[serde(default)]
    pub alias: Option<String>,
}

impl ShortenRequest {
    pub fn validate(&self) -> Result<(), ProviderError> {
        validate_http_url(&self.url)?;
        if let Some(alias) = &self.alias {
            let ok = (5..=30).contains(&alias.len())
                && alias
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
            if !ok {
                return Err(invalid(
                    "alias must be 5-30 letters, digits, dashes or underscores",
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortUrl {
    pub url: String,
    pub short_url: String,
}

// ============================================================================
// Trait
// ============================================================================

/// External APIs behind the metered tools.
///
/// Requests are assumed validated; implementations only talk to the provider.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ToolProviders: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, ProviderError>;

    async fn translate(&self, request: TranslateRequest) -> Result<Translation, ProviderError>;

    /// Raw detector verdict, relayed as-is.
    async fn detect_ai(&self, request: DetectRequest) -> Result<serde_json::Value, ProviderError>;

    async fn text_to_speech(&self, request: SpeechRequest) -> Result<Audio, ProviderError>;

    /// Raw audit report, relayed as-is.
    async fn seo_audit(&self, request: SeoRequest) -> Result<serde_json::Value, ProviderError>;

    async fn execute_code(&self, request: ExecuteRequest)
    -> Result<ExecutionResult, ProviderError>;

    async fn shorten_url(&self, request: ShortenRequest) -> Result<ShortUrl, ProviderError>;
}

// ============================================================================
// Helpers
// ============================================================================

fn invalid(message: impl Into<String>) -> ProviderError {
    ProviderError::InvalidInput(message.into())
}

fn validate_text(text: &str, max_chars: usize) -> Result<(), ProviderError> {
    if text.trim().is_empty() {
        return Err(invalid("text must not be empty"));
    }
    if text.chars().count() > max_chars {
        return Err(invalid(format!("text exceeds {} characters", max_chars)));
    }
    Ok(())
}

/// Only absolute http(s) URLs with a host are accepted.
pub fn validate_http_url(value: &str) -> Result<url::Url, ProviderError> {
    let parsed =
        url::Url::parse(value.trim()).map_err(|e| invalid(format!("invalid URL: {}", e)))?;

    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(invalid("URL must be an absolute http(s) address"));
    }

    Ok(parsed)
}

/// Turn a non-success provider response into an error, keeping the body for logs.
pub(crate) async fn check_status(
    provider: &'static str,
    response: reqwest::Response,
) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimited(provider));
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Status {
            provider,
            status: status.as_u16(),
            body,
        });
    }

    Ok(response)
}
