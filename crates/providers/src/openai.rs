use std::time::Duration;

use {
    async_trait::async_trait,
    parlor_common::types::ModelTier,
    parlor_config::{ProviderEntry, TierModels},
    secrecy::{ExposeSecret, Secret},
    tracing::{debug, trace, warn},
};

use crate::{
    error::{Error, Result},
    model::{ChatMessage, CompletionResponse, LlmProvider, Usage},
};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// OpenAI-compatible chat completions client.
pub struct OpenAiProvider {
    api_key: Secret<String>,
    base_url: String,
    models: TierModels,
    temperature: Option<f32>,
    provider_name: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(api_key: Secret<String>, base_url: String, models: TierModels) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            models,
            temperature: None,
            provider_name: "openai".into(),
            client,
        }
    }

    /// Build from a `[providers.openai]` config entry.
    pub fn from_entry(entry: &ProviderEntry) -> Result<Self> {
        let api_key = entry.api_key.clone().ok_or_else(|| Error::MissingApiKey {
            provider: "openai".into(),
        })?;
        let base_url = entry
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut provider = Self::new(api_key, base_url, entry.models.clone());
        provider.temperature = entry.temperature;
        Ok(provider)
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Run one chat completion against an explicit model.
    pub async fn complete_with_model(
        &self,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<CompletionResponse> {
        let openai_messages: Vec<serde_json::Value> =
            messages.iter().map(ChatMessage::to_openai_value).collect();
        let mut body = serde_json::json!({
            "model": model,
            "messages": openai_messages,
        });
        if let Some(temperature) = self.temperature {
            body["temperature"] = serde_json::json!(temperature);
        }

        debug!(
            model = %model,
            messages_count = messages.len(),
            "openai complete request"
        );
        trace!(body = %body, "openai request body");

        let http_resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = http_resp.status();
        if !status.is_success() {
            let body_text = http_resp.text().await.unwrap_or_default();
            warn!(
                status = %status,
                model = %model,
                provider = %self.provider_name,
                body = %body_text,
                "openai API error"
            );
            return Err(Error::Api {
                provider: self.provider_name.clone(),
                status: status.as_u16(),
                body: body_text,
            });
        }

        let resp = http_resp.json::<serde_json::Value>().await?;
        trace!(response = %resp, "openai raw response");

        let text = resp["choices"][0]["message"]["content"]
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let usage = Usage {
            input_tokens: token_count(&resp["usage"]["prompt_tokens"]),
            output_tokens: token_count(&resp["usage"]["completion_tokens"]),
        };
        Ok(CompletionResponse { text, usage })
    }
}

fn token_count(value: &serde_json::Value) -> u32 {
    value
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or_default()
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn model_for(&self, tier: ModelTier) -> &str {
        self.models.for_tier(tier).unwrap_or(DEFAULT_MODEL)
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        tier: ModelTier,
    ) -> anyhow::Result<CompletionResponse> {
        Ok(self.complete_with_model(self.model_for(tier), messages).await?)
    }
}
