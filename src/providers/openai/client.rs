//! OpenAI client
//!
//! Sends the conversation and tool catalog to a chat-completions endpoint
//! with `stream: true` and hands back the event stream. Only the initial
//! request is retried; see [`crate::retry`].

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde_json::{Value, json};

use super::streaming::{OpenAiEventConverter, into_chat_stream};
use crate::config::{ModelApiFlavor, ModelConfig};
use crate::error::{GatewayError, Result};
use crate::providers::ChatModel;
use crate::retry::retry_with_backoff;
use crate::types::{ChatRequest, ChatStream};

/// Streaming chat-completions client for OpenAI and Azure OpenAI.
#[derive(Debug, Clone)]
pub struct OpenAiChatModel {
    config: ModelConfig,
    http_client: reqwest::Client,
}

impl OpenAiChatModel {
    pub fn new(config: ModelConfig) -> Self {
        Self::with_http_client(config, reqwest::Client::new())
    }

    pub fn with_http_client(config: ModelConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Request body for one streaming turn.
    pub fn build_request_body(&self, request: &ChatRequest) -> Result<Value> {
        let params = &self.config.params;
        let mut body = json!({
            "model": self.config.model,
            "messages": serde_json::to_value(&request.messages)?,
            "stream": true,
            "temperature": params.temperature,
            "max_tokens": params.max_tokens,
            "frequency_penalty": params.frequency_penalty,
            "presence_penalty": params.presence_penalty,
        });

        if !request.tools.is_empty() {
            body["tools"] = Value::Array(
                request
                    .tools
                    .iter()
                    .map(|tool| tool.to_openai_tool())
                    .collect(),
            );
        }

        Ok(body)
    }

    fn request_builder(&self, body: &Value) -> reqwest::RequestBuilder {
        let builder = self
            .http_client
            .post(self.config.completions_url())
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .json(body);

        let key = self.config.api_key.expose_secret();
        match self.config.flavor {
            ModelApiFlavor::OpenAi => builder.bearer_auth(key),
            ModelApiFlavor::Azure { .. } => builder.header("api-key", key),
        }
    }

    async fn send_once(&self, body: &Value) -> Result<reqwest::Response> {
        let response = tokio::time::timeout(self.config.timeout, self.request_builder(body).send())
            .await
            .map_err(|_| {
                GatewayError::HttpError(format!(
                    "no response within {}s",
                    self.config.timeout.as_secs()
                ))
            })?
            .map_err(|e| GatewayError::HttpError(format!("Failed to send request: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GatewayError::api_error(status.as_u16(), error_text));
        }

        Ok(response)
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn chat_stream(&self, request: ChatRequest) -> Result<ChatStream> {
        let body = self.build_request_body(&request)?;

        tracing::debug!(
            model = %self.config.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "opening completion stream"
        );

        let response = retry_with_backoff(&self.config.retry, || self.send_once(&body)).await?;
        Ok(into_chat_stream(response, OpenAiEventConverter))
    }
}
