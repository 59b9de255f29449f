//! HTTP client for the text/object generation endpoints

use std::time::Duration;

use once_cell::sync::Lazy;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, GenerateNotes, GenerateObject, GenerationError};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

static HTTP_CLIENT: Lazy<Client> = Lazy::new(|| {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .expect("Failed to build HTTP client")
});

#[derive(Debug, Serialize)]
struct TextRequest<'a> {
    messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
struct TextResponse {
    completion: String,
}

#[derive(Debug, Serialize)]
struct ObjectRequest<'a> {
    messages: &'a [ChatMessage],
    schema: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ObjectResponse {
    object: serde_json::Value,
}

/// Client for the text-generation collaborator family.
#[derive(Debug, Clone)]
pub struct ChatClient {
    text_endpoint: String,
    object_endpoint: String,
}

impl ChatClient {
    pub fn new(text_endpoint: impl Into<String>, object_endpoint: impl Into<String>) -> Self {
        Self {
            text_endpoint: text_endpoint.into(),
            object_endpoint: object_endpoint.into(),
        }
    }

    async fn post_json<B: Serialize>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<reqwest::Response, GenerationError> {
        let response = HTTP_CLIENT
            .post(endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| GenerationError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let message = response.text().await.unwrap_or_default();
            tracing::error!("Generation endpoint error ({}): {}", status.as_u16(), message);
            Err(GenerationError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

impl GenerateNotes for ChatClient {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, GenerationError> {
        let response = self
            .post_json(&self.text_endpoint, &TextRequest { messages })
            .await?;

        let body: TextResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        let text = body.completion.trim().to_string();
        if text.is_empty() {
            return Err(GenerationError::Empty);
        }

        tracing::info!("Generated {} chars of notes", text.len());
        Ok(text)
    }
}

impl GenerateObject for ChatClient {
    async fn generate_object(
        &self,
        messages: &[ChatMessage],
        schema: serde_json::Value,
    ) -> Result<serde_json::Value, GenerationError> {
        let response = self
            .post_json(&self.object_endpoint, &ObjectRequest { messages, schema })
            .await?;

        let body: ObjectResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::Parse(e.to_string()))?;

        Ok(body.object)
    }
}
