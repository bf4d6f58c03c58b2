//! Clients for the third-party APIs behind each metered tool.
//!
//! # Example
//!
//! ```ignore
//! use crate::providers::{HttpProviders, ToolProviders, ShortenRequest};
//!
//! let providers = HttpProviders::new(&config.providers)?;
//! let short = providers
//!     .shorten_url(ShortenRequest { url: "https://example.com".into(), alias: None })
//!     .await?;
//! ```

mod client;
mod elevenlabs;
mod error;
mod groq;
mod rapidapi;
mod tinyurl;

pub use client::{
    Audio, ChatMessage, ChatReply, ChatRequest, ChatRole, DetectRequest, ExecuteRequest,
    ExecutionResult, SeoRequest, ShortUrl, ShortenRequest, SpeechRequest, ToolProviders,
    TranslateRequest, Translation,
};
#[cfg(test)]
pub use client::MockToolProviders;
pub use elevenlabs::ElevenLabsClient;
pub use error::ProviderError;
pub use groq::GroqClient;
pub use rapidapi::{DetectorClient, Judge0Client, RapidApiService, SeoClient};
pub use tinyurl::TinyUrlClient;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::ProviderConfig;

/// Production providers: one HTTP client shared by every service.
pub struct HttpProviders {
    groq: GroqClient,
    detector: DetectorClient,
    seo: SeoClient,
    judge0: Judge0Client,
    speech: ElevenLabsClient,
    tinyurl: TinyUrlClient,
}

impl HttpProviders {
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .user_agent(concat!("toolhub/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let rapidapi = |provider: &'static str, host: &str| {
            RapidApiService::new(
                client.clone(),
                provider,
                config.rapidapi_url(host),
                host.to_string(),
                config.rapidapi_key_secret(),
            )
        };

        Ok(Self {
            groq: GroqClient::new(
                client.clone(),
                config.groq_base_url.clone(),
                config.groq_api_key_secret(),
                config.chat_model.clone(),
            ),
            detector: DetectorClient::new(rapidapi("ai-detector", &config.detector_host)),
            seo: SeoClient::new(rapidapi("seo-analyzer", &config.seo_host)),
            judge0: Judge0Client::new(rapidapi("judge0", &config.judge0_host)),
            speech: ElevenLabsClient::new(
                client.clone(),
                config.elevenlabs_base_url.clone(),
                config.elevenlabs_api_key_secret(),
                config.voice_id.clone(),
                config.speech_model.clone(),
            ),
            tinyurl: TinyUrlClient::new(
                client.clone(),
                config.tinyurl_base_url.clone(),
                config.tinyurl_api_token_secret(),
            ),
        })
    }
}

#[async_trait]
impl ToolProviders for HttpProviders {
    async fn chat(&self, request: ChatRequest) -> Result<ChatReply, ProviderError> {
        self.groq.chat(&request).await
    }

    async fn translate(&self, request: TranslateRequest) -> Result<Translation, ProviderError> {
        self.groq.translate(&request).await
    }

    async fn detect_ai(&self, request: DetectRequest) -> Result<serde_json::Value, ProviderError> {
        self.detector.detect(&request).await
    }

    async fn text_to_speech(&self, request: SpeechRequest) -> Result<Audio, ProviderError> {
        self.speech.synthesize(&request).await
    }

    async fn seo_audit(&self, request: SeoRequest) -> Result<serde_json::Value, ProviderError> {
        self.seo.audit(&request).await
    }

    async fn execute_code(
        &self,
        request: ExecuteRequest,
    ) -> Result<ExecutionResult, ProviderError> {
        self.judge0.execute(&request).await
    }

    async fn shorten_url(&self, request: ShortenRequest) -> Result<ShortUrl, ProviderError> {
        self.tinyurl.shorten(&request).await
    }
}
