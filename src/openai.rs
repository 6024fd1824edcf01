//! Minimal OpenAI-compatible client for word-pair generation.
//!
//! We only call chat.completions, once per request, with the original
//! three-turn conversation (instruction, assistant acknowledgement, user
//! payload). Calls are instrumented and log model name, latency, and
//! response sizes (not contents).
//!
//! NOTE: We never log the API key and we keep payload truncations short.

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{instrument, info, error};

use crate::config::Prompts;
use crate::domain::WordPair;
use crate::extract::extract_pairs;
use crate::util::trunc_for_log;

const REQUEST_TIMEOUT_SECS: u64 = 15;
const PAIR_TEMPERATURE: f32 = 0.7;
const PAIR_MAX_TOKENS: u32 = 1000;

/// How a provider call can fail. Every variant is masked at the round
/// boundary by the fixed fallback pair list.
#[derive(Debug, Error)]
pub enum ProviderError {
  #[error("transport error: {0}")]
  Transport(String),
  #[error("upstream HTTP {status}: {message}")]
  Upstream { status: u16, message: String },
  #[error("parse error: {0}")]
  Parse(String),
}

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, model })
  }

  /// Raw chat completion: returns the assistant reply text.
  #[instrument(level = "info", skip(self, messages), fields(model = %self.model, turns = messages.len()))]
  async fn chat_raw(&self, messages: Vec<ChatMessageReq>) -> Result<String, ProviderError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages,
      temperature: PAIR_TEMPERATURE,
      max_tokens: Some(PAIR_MAX_TOKENS),
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "wordmatch-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await
      .map_err(|e| ProviderError::Transport(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status().as_u16();
      let body = res.text().await.unwrap_or_default();
      let message = extract_openai_error(&body).unwrap_or(body);
      return Err(ProviderError::Upstream { status, message });
    }

    let body: ChatCompletionResponse = res
      .json()
      .await
      .map_err(|e| ProviderError::Transport(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.get(0)
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default().trim().to_string();

    Ok(text)
  }

  /// Ask the model for word pairs derived from the user's free-form text,
  /// then run the recovery chain on whatever came back. Stateless; no retry.
  #[instrument(level = "info", skip(self, prompts, freeform_text), fields(model = %self.model, input_len = freeform_text.len()))]
  pub async fn generate_word_pairs(
    &self,
    prompts: &Prompts,
    freeform_text: &str,
  ) -> Result<Vec<WordPair>, ProviderError> {
    let messages = vec![
      ChatMessageReq { role: "user".into(), content: prompts.pair_instruction.clone() },
      ChatMessageReq { role: "assistant".into(), content: prompts.pair_ack.clone() },
      ChatMessageReq { role: "user".into(), content: freeform_text.to_string() },
    ];

    let start = std::time::Instant::now();
    let reply = self.chat_raw(messages).await;
    let elapsed = start.elapsed();

    let reply = match reply {
      Ok(t) => {
        info!(?elapsed, reply_len = t.len(), "Model reply received");
        t
      }
      Err(e) => {
        error!(?elapsed, error = %e, "Model call failed during pair generation");
        return Err(e);
      }
    };

    match extract_pairs(&reply) {
      Ok(pairs) => {
        info!(count = pairs.len(), "Recovered word pairs from reply");
        Ok(pairs)
      }
      Err(e) => {
        error!(error = %e, preview = %trunc_for_log(&reply, 120), "Could not recover pairs from reply");
        Err(ProviderError::Parse(e))
      }
    }
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from an OpenAI-style error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn upstream_error_body_extraction() {
    let body = r#"{"error":{"message":"invalid api key","type":"auth"}}"#;
    assert_eq!(extract_openai_error(body).as_deref(), Some("invalid api key"));
    assert!(extract_openai_error("not json").is_none());
  }

  #[test]
  fn provider_error_display() {
    let e = ProviderError::Upstream { status: 429, message: "rate limited".into() };
    assert_eq!(e.to_string(), "upstream HTTP 429: rate limited");
  }
}
