//! RapidAPI-hosted services: AI content detection, SEO audit, Judge0 code execution.
//!
//! All three authenticate with the same `X-RapidAPI-Key` and are routed by
//! `X-RapidAPI-Host`.

use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::client::{DetectRequest, ExecuteRequest, ExecutionResult, SeoRequest, check_status};
use super::error::ProviderError;

/// One RapidAPI-hosted endpoint.
pub struct RapidApiService {
    client: Client,
    provider: &'static str,
    base_url: String,
    host: String,
    api_key: Option<SecretString>,
}

impl RapidApiService {
    pub fn new(
        client: Client,
        provider: &'static str,
        base_url: String,
        host: String,
        api_key: Option<SecretString>,
    ) -> Self {
        Self {
            client,
            provider,
            base_url,
            host,
            api_key,
        }
    }

    fn request(&self, builder: RequestBuilder) -> Result<RequestBuilder, ProviderError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or(ProviderError::NotConfigured("rapidapi_key"))?;

        Ok(builder
            .header("X-RapidAPI-Key", api_key.expose_secret())
            .header("X-RapidAPI-Host", &self.host))
    }

    async fn send_json(&self, builder: RequestBuilder) -> Result<serde_json::Value, ProviderError> {
        let response = self.request(builder)?.send().await?;
        let response = check_status(self.provider, response).await?;
        Ok(response.json().await?)
    }
}

/// AI-generated content detector.
pub struct DetectorClient {
    service: RapidApiService,
}

impl DetectorClient {
    pub fn new(service: RapidApiService) -> Self {
        Self { service }
    }

    pub async fn detect(
        &self,
        request: &DetectRequest,
    ) -> Result<serde_json::Value, ProviderError> {
        let url = format!("{}/api/detectText/", self.service.base_url);
        debug!(url = %url, chars = request.text.len(), "calling AI detector");

        let builder = self
            .service
            .client
            .post(&url)
            .json(&serde_json::json!({ "text": request.text }));

        self.service.send_json(builder).await
    }
}

/// Website SEO audit.
pub struct SeoClient {
    service: RapidApiService,
}

impl SeoClient {
    pub fn new(service: RapidApiService) -> Self {
        Self { service }
    }

    pub async fn audit(&self, request: &SeoRequest) -> Result<serde_json::Value, ProviderError> {
        let url = format!("{}/analyze", self.service.base_url);
        debug!(url = %url, target = %request.url, "calling SEO analyzer");

        let builder = self
            .service
            .client
            .get(&url)
            .query(&[("url", request.url.trim())]);

        self.service.send_json(builder).await
    }
}

/// Judge0 sandboxed code execution.
pub struct Judge0Client {
    service: RapidApiService,
}

impl Judge0Client {
    pub fn new(service: RapidApiService) -> Self {
        Self { service }
    }

    /// Submit and wait for the result in one round trip.
    pub async fn execute(
        &self,
        request: &ExecuteRequest,
    ) -> Result<ExecutionResult, ProviderError> {
        let url = format!("{}/submissions", self.service.base_url);
        debug!(url = %url, language_id = request.language_id, "submitting code");

        let builder = self
            .service
            .client
            .post(&url)
            .query(&[("base64_encoded", "false"), ("wait", "true")])
            .json(&SubmissionRequest {
                source_code: &request.source_code,
                language_id: request.language_id,
                stdin: request.stdin.as_deref(),
            });

        let body = self.service.send_json(builder).await?;
        parse_submission(body)
    }
}

fn parse_submission(body: serde_json::Value) -> Result<ExecutionResult, ProviderError> {
    let submission: SubmissionResponse =
        serde_json::from_value(body).map_err(|e| ProviderError::UnexpectedResponse {
            provider: "judge0",
            detail: e.to_string(),
        })?;

    Ok(ExecutionResult {
        stdout: submission.stdout,
        stderr: submission.stderr,
        compile_output: submission.compile_output,
        status: submission
            .status
            .map(|s| s.description)
            .unwrap_or_else(|| "Unknown".to_string()),
        time: submission.time,
        memory: submission.memory,
    })
}

#[derive(Debug, Serialize)]
struct SubmissionRequest<'a> {
    source_code: &'a str,
    language_id: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    stdin: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SubmissionResponse {
    stdout: Option<String>,
    stderr: Option<String>,
    compile_output: Option<String>,
    status: Option<SubmissionStatus>,
    time: Option<String>,
    memory: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SubmissionStatus {
    description: String,
}
