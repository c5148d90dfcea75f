//! Client for the hosted text-to-speech inference API.
//!
//! Sends `{"inputs": text}` with a bearer token and hands the raw
//! response back so the caller can stream the audio bytes through.

use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::TtsConfig;
use crate::error::{ProxyError, Result};

/// Inbound body from the voice-assistant widget.
#[derive(Debug, Deserialize)]
pub struct SynthesisRequest {
    pub text: String,
}

pub struct TtsClient {
    endpoint: String,
    api_token: String,
    content_type: String,
    max_chars: usize,
    http: Client,
}

impl TtsClient {
    pub fn new(config: &TtsConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        if config.api_token.is_empty() {
            warn!("No TTS API token configured, requests go out unauthenticated");
        }

        Ok(Self {
            endpoint: config.endpoint.clone(),
            api_token: config.api_token.clone(),
            content_type: config.content_type.clone(),
            max_chars: config.max_chars,
            http,
        })
    }

    /// Content type stamped on every relayed audio response.
    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Reject text the upstream model should never see.
    pub fn validate(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(ProxyError::InvalidRequest("empty text".into()));
        }
        let chars = text.chars().count();
        if chars > self.max_chars {
            return Err(ProxyError::InvalidRequest(format!(
                "text too long ({chars} chars, max {})",
                self.max_chars
            )));
        }
        Ok(())
    }

    /// Forward text to the inference endpoint. Returns the upstream
    /// response only on a 2xx status; the body is left unread.
    pub async fn synthesize(&self, text: &str) -> Result<Response> {
        self.validate(text)?;
        debug!("Forwarding {} chars to {}", text.chars().count(), self.endpoint);

        let mut request = self
            .http
            .post(&self.endpoint)
            .header(ACCEPT, &self.content_type)
            .json(&json!({ "inputs": text }));
        if !self.api_token.is_empty() {
            request = request.header(AUTHORIZATION, format!("Bearer {}", self.api_token));
        }

        let resp = request.send().await?;
        if !resp.status().is_success() {
            warn!("TTS inference API returned status {}", resp.status());
            return Err(ProxyError::UpstreamStatus(resp.status()));
        }
        Ok(resp)
    }
}
