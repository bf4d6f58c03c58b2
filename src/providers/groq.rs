//! Groq chat completions client (OpenAI-compatible API).

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::client::{
    ChatMessage, ChatReply, ChatRequest, ChatRole, TranslateRequest, Translation, check_status,
};
use super::error::ProviderError;

const PROVIDER: &str = "groq";

/// Groq client used for chat and translation.
pub struct GroqClient {
    client: Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
}

impl GroqClient {
    pub fn new(
        client: Client,
        base_url: String,
        api_key: Option<SecretString>,
        model: String,
    ) -> Self {
        Self {
            client,
            base_url,
            api_key,
            model,
        }
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ProviderError> {
        self.complete(&request.messages, request.temperature).await
    }

    pub async fn translate(
        &self,
        request: &TranslateRequest,
    ) -> Result<Translation, ProviderError> {
        let messages = translation_prompt(request);
        let reply = self.complete(&messages, Some(0.2)).await?;

        Ok(Translation {
            text: reply.content.trim().to_string(),
            target_language: request.target_language.clone(),
        })
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        temperature: Option<f32>,
    ) -> Result<ChatReply, ProviderError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(ProviderError::NotConfigured("groq_api_key"))?;

        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!(
            url = %url,
            model = %self.model,
            messages = messages.len(),
            "calling chat completions"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key.expose_secret())
            .json(&CompletionRequest {
                model: &self.model,
                messages,
                temperature,
            })
            .send()
            .await?;

        let response = check_status(PROVIDER, response).await?;
        let body: CompletionResponse = response.json().await?;

        parse_completion(body)
    }
}

fn translation_prompt(request: &TranslateRequest) -> Vec<ChatMessage> {
    let source = match &request.source_language {
        Some(source) if !source.trim().is_empty() => format!(" from {}", source.trim()),
        _ => String::new(),
    };

    vec![
        ChatMessage {
            role: ChatRole::System,
            content: format!(
                "You are a translation engine. Translate the user's text{} into {}. \
                 Reply with the translation only, preserving formatting.",
                source,
                request.target_language.trim()
            ),
        },
        ChatMessage {
            role: ChatRole::User,
            content: request.text.clone(),
        },
    ]
}

fn parse_completion(body: CompletionResponse) -> Result<ChatReply, ProviderError> {
    let content = body
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ProviderError::UnexpectedResponse {
            provider: PROVIDER,
            detail: "no completion choices".to_string(),
        })?;

    Ok(ChatReply {
        content,
        model: body.model,
    })
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    model: String,
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion() {
        let body: CompletionResponse = serde_json::from_str(
            r#"{
                "id": "chatcmpl-1",
                "model": "llama-3.3-70b-versatile",
                "choices": [{"index": 0, "message": {"role": "assistant", "content": "Hi!"}, "finish_reason": "stop"}],
                "usage": {"total_tokens": 12}
            }"#,
        )
        .unwrap();

        let reply = parse_completion(body).unwrap();
        assert_eq!(reply.content, "Hi!");
        assert_eq!(reply.model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn test_parse_empty_choices() {
        let body: CompletionResponse =
            serde_json::from_str(r#"{"model": "m", "choices": []}"#).unwrap();
        assert!(matches!(
            parse_completion(body),
            Err(ProviderError::UnexpectedResponse { .. })
        ));
    }

    #[test]
    fn test_translation_prompt() {
        let messages = translation_prompt(&TranslateRequest {
            text: "Bonjour".to_string(),
            target_language: "English".to_string(),
            source_language: Some("French".to_string()),
        });

        assert_eq!(messages.len(), 2);
        assert!(messages[0].content.contains("from French into English"));
        assert_eq!(messages[1].content, "Bonjour");
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let client = GroqClient::new(
            Client::new(),
            "http://127.0.0.1:9".to_string(),
            None,
            "m".to_string(),
        );
        let request = ChatRequest {
            messages: vec![ChatMessage {
                role: ChatRole::User,
                content: "hi".to_string(),
            }],
            temperature: None,
        };

        assert!(matches!(
            client.chat(&request).await,
            Err(ProviderError::NotConfigured("groq_api_key"))
        ));
    }

    // Hits the live API. Run with GROQ_API_KEY set and --ignored.
    #[tokio::test]
    #[ignore]
    async fn test_live_chat() {
        let key = std::env::var("GROQ_API_KEY").unwrap();
        let client = GroqClient::new(
            Client::new(),
            "https://api.groq.com/openai".to_string(),
            Some(SecretString::from(key)),
            "llama-3.3-70b-versatile".to_string(),
        );
        let reply = client
            .chat(&ChatRequest {
                messages: vec![ChatMessage {
                    role: ChatRole::User,
                    content: "Reply with the single word: pong".to_string(),
                }],
                temperature: Some(0.0),
            })
            .await
            .unwrap();
        assert!(reply.content.to_lowercase().contains("pong"));
    }
}
