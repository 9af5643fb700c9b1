//! Client for a minimal chat endpoint.
//!
//! Request: `POST {"prompt": "..."}`. Success: `200 {"response": "..."}`.
//! Failure: a non-2xx status, optionally with `{"error": "..."}`.

use crate::http::{client_with_timeout, map_http_error, request_error};
use async_trait::async_trait;
use flowchat_core::{CompletionError, CompletionService};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const PROVIDER: &str = "chat endpoint";

#[derive(Clone, Debug)]
pub struct ChatEndpointClient {
    client: Client,
    endpoint: String,
}

impl ChatEndpointClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: client_with_timeout(timeout),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: Option<String>,
}

#[async_trait]
impl CompletionService for ChatEndpointClient {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        debug!(endpoint = %self.endpoint, prompt_len = prompt.len(), "Sending chat request");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&ChatRequest { prompt })
            .send()
            .await
            .map_err(|err| request_error(PROVIDER, err))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status, body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|err| CompletionError::Decode(err.to_string()))?;

        parsed
            .response
            .filter(|text| !text.trim().is_empty())
            .ok_or(CompletionError::EmptyResponse)
    }
}
