//! OpenRouter chat-completions client
//!
//! This module provides a typed client for the OpenAI-compatible
//! chat-completions endpoint served by OpenRouter, and implements
//! `CompletionProvider` on top of it.

mod models;
pub use models::*;

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;

use crate::config::{LlmConfig, ServiceConfig};
use crate::core::{ClientBuilder, CompletionProvider, CompletionRequest};
use crate::error::{ErrorContext, Result, ServiceError};
use crate::services::common::{parse_error_response, UserAgent};

const SERVICE_NAME: &str = "openrouter";

/// OpenRouter API client
pub struct OpenRouterClient {
    /// HTTP client
    http_client: Client,

    /// Configuration
    config: LlmConfig,
}

impl OpenRouterClient {
    /// Create a client from explicit configuration
    pub fn new_with_config(config: LlmConfig) -> Result<Self> {
        config.validate()?;

        let http_client = ClientBuilder::new()
            .auth_token(config.api_key.clone())
            .auth_type("Bearer")
            .header("HTTP-Referer", config.referer.clone())
            .header("X-Title", config.app_title.clone())
            .user_agent(UserAgent::for_client("openrouter").to_string())
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build_http_client()?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Model requests are sent to
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Send a chat completion request
    pub async fn chat_completion(
        &self,
        request: &ChatCompletionRequest,
        timeout: Option<Duration>,
    ) -> Result<ChatCompletionResponse> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        debug!(
            "Sending request to {}: POST {} (model={}, max_tokens={:?})",
            SERVICE_NAME, url, request.model, request.max_tokens
        );

        let mut builder = self.http_client.post(&url).json(request);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(parse_error_response(SERVICE_NAME, "chat/completions", response).await);
        }

        let body = response.text().await?;
        serde_json::from_str::<ChatCompletionResponse>(&body).map_err(|e| {
            ServiceError::parsing(format!("Malformed completion envelope: {}", e)).with_context(
                ErrorContext::for_service(SERVICE_NAME)
                    .endpoint("chat/completions")
                    .status_code(status.as_u16()),
            )
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let chat = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage::user(request.prompt)],
            max_tokens: Some(request.max_tokens),
            temperature: Some(request.temperature),
            stream: Some(false),
        };

        let response = self.chat_completion(&chat, request.timeout).await?;

        match response.first_content() {
            Some(content) => Ok(content.to_string()),
            None => {
                warn!("Completion response carried no content");
                Err(ServiceError::parsing("No completion content returned"))
            }
        }
    }
}
