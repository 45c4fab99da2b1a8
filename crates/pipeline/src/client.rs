//! Shared HTTP client for the speech/translation service
//!
//! All three endpoints (`/translate`, `/speech-to-text`, `/text-to-speech`)
//! authenticate with the `api-subscription-key` header and report failures
//! as non-2xx statuses with a text body.

use reqwest::multipart::Form;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use chat_gateway_config::SpeechConfig;

use crate::PipelineError;

const API_KEY_HEADER: &str = "api-subscription-key";

pub struct SpeechServiceClient {
    base_url: String,
    api_key: String,
    client: Client,
}

impl SpeechServiceClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PipelineError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(PipelineError::Configuration(
                "Speech service requires an API key".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PipelineError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into(),
            api_key,
            client,
        })
    }

    /// Build from settings, resolving the key from config or environment
    pub fn from_settings(config: &SpeechConfig) -> Result<Self, PipelineError> {
        let api_key = config.resolved_api_key().ok_or_else(|| {
            PipelineError::Configuration("Speech service requires SARVAM_AI_API_KEY".to_string())
        })?;
        Self::new(config.base_url.clone(), api_key, config.timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// POST a JSON body and decode a JSON reply
    pub async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp, PipelineError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// POST a multipart form and decode a JSON reply
    pub async fn post_multipart<Resp>(&self, path: &str, form: Form) -> Result<Resp, PipelineError>
    where
        Resp: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .header(API_KEY_HEADER, &self.api_key)
            .multipart(form)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<Resp: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<Resp, PipelineError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| PipelineError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_key_rejected() {
        let result = SpeechServiceClient::new("https://api.example", "  ", Duration::from_secs(1));
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
    }

    #[test]
    fn test_url_joining() {
        let client =
            SpeechServiceClient::new("https://api.example/", "k", Duration::from_secs(1)).unwrap();
        assert_eq!(client.url("/translate"), "https://api.example/translate");
        assert_eq!(client.url("speech-to-text"), "https://api.example/speech-to-text");
    }
}
