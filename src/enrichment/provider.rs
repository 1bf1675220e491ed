//! Generative provider over an OpenAI-compatible chat endpoint.

use super::GenerativeProvider;
use crate::config::EnrichmentSettings;
use crate::error::{Result, TubescribeError};
use crate::openai::create_client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Chat-completions provider (Gemini's OpenAI-compatible API by default).
pub struct OpenAiCompatibleProvider {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiCompatibleProvider {
    pub fn new(api_base: &str, api_key: &str, model: &str) -> Result<Self> {
        Ok(Self {
            client: create_client(api_base, api_key)?,
            model: model.to_string(),
        })
    }

    /// Build from settings; `None` when no API key can be resolved.
    pub fn from_settings(settings: &EnrichmentSettings) -> Result<Option<Self>> {
        match settings.resolve_api_key() {
            Some(key) => Self::new(&settings.api_base, &key, &settings.model).map(Some),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl GenerativeProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        prompt: &str,
        temperature: f32,
        timeout: Option<Duration>,
    ) -> Result<String> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| TubescribeError::Enrichment(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(temperature)
            .build()
            .map_err(|e| TubescribeError::Enrichment(e.to_string()))?;

        let chat = self.client.chat();
        let call = chat.create(request);
        let response = match timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                TubescribeError::Enrichment(format!(
                    "generation timed out after {:.1}s",
                    limit.as_secs_f64()
                ))
            })?,
            None => call.await,
        }
        .map_err(|e| TubescribeError::OpenAI(format!("Failed to generate response: {}", e)))?;

        let text = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .cloned()
            .unwrap_or_default();

        debug!("{} returned {} chars", self.model, text.len());
        Ok(text)
    }
}
