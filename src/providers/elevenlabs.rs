//! ElevenLabs text-to-speech client.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::debug;

use super::client::{Audio, SpeechRequest, check_status};
use super::error::ProviderError;

const PROVIDER: &str = "elevenlabs";
const AUDIO_MPEG: &str = "audio/mpeg";

pub struct ElevenLabsClient {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
    default_voice: String,
    model: String,
}

impl ElevenLabsClient {
    pub fn new(
        client: Client,
        base_url: String,
        api_key: Option<SecretString>,
        default_voice: String,
        model: String,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            default_voice,
            model,
        }
    }

    pub async fn synthesize(&self, request: &SpeechRequest) -> Result<Audio, ProviderError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(ProviderError::NotConfigured("elevenlabs_api_key"))?;

        let voice = request.voice_id.as_deref().unwrap_or(&self.default_voice);
        let url = format!("{}/v1/text-to-speech/{}", self.base_url, voice);
        debug!(url = %url, chars = request.text.len(), "synthesizing speech");

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", api_key.expose_secret())
            .header(reqwest::header::ACCEPT, AUDIO_MPEG)
            .json(&SynthesisRequest {
                text: &request.text,
                model_id: &self.model,
            })
            .send()
            .await?;

        let response = check_status(PROVIDER, response).await?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(AUDIO_MPEG)
            .to_string();

        if !content_type.starts_with("audio/") {
            return Err(ProviderError::UnexpectedResponse {
                provider: PROVIDER,
                detail: format!("expected audio, got {}", content_type),
            });
        }

        let bytes = response.bytes().await?.to_vec();
        if bytes.is_empty() {
            return Err(ProviderError::UnexpectedResponse {
                provider: PROVIDER,
                detail: "empty audio body".to_string(),
            });
        }

        Ok(Audio {
            content_type,
            bytes,
        })
    }
}

#[derive(Debug, Serialize)]
struct SynthesisRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}
