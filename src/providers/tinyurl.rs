//! TinyURL client.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::client::{ShortUrl, ShortenRequest, check_status};
use super::error::ProviderError;

const PROVIDER: &str = "tinyurl";

pub struct TinyUrlClient {
    client: Client,
    base_url: String,
    api_token: Option<SecretString>,
}

impl TinyUrlClient {
    pub fn new(client: Client, base_url: String, api_token: Option<SecretString>) -> Self {
        Self {
            client,
            base_url,
            api_token,
        }
    }

    pub async fn shorten(&self, request: &ShortenRequest) -> Result<ShortUrl, ProviderError> {
        let token = self
            .api_token
            .as_ref()
            .ok_or(ProviderError::NotConfigured("tinyurl_api_token"))?;

        let url = format!("{}/create", self.base_url);
        debug!(url = %url, target = %request.url, "shortening URL");

        let response = self
            .client
            .post(&url)
            .bearer_auth(token.expose_secret())
            .json(&CreateRequest {
                url: request.url.trim(),
                domain: "tinyurl.com",
                alias: request.alias.as_deref(),
            })
            .send()
            .await?;

        let response = check_status(PROVIDER, response).await?;
        let body: CreateResponse = response.json().await?;

        parse_create(body)
    }
}

fn parse_create(body: CreateResponse) -> Result<ShortUrl, ProviderError> {
    // Failed requests carry `"data": []` rather than null.
    let data = serde_json::from_value::<CreateData>(body.data).ok();

    match data {
        Some(data) if body.errors.is_empty() => Ok(ShortUrl {
            url: data.url,
            short_url: data.tiny_url,
        }),
        _ => Err(ProviderError::UnexpectedResponse {
            provider: PROVIDER,
            detail: if body.errors.is_empty() {
                "missing data".to_string()
            } else {
                body.errors.join("; ")
            },
        }),
    }
}

#[derive(Debug, Serialize)]
struct CreateRequest<'a> {
    url: &'a str,
    domain: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    alias: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    #[serde(default)]
    data: serde_json::Value,
    #[serde(default)]
    errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CreateData {
    url: String,
    tiny_url: String,
}
