//! OpenAI-backed worksheet generator.
//!
//! One chat.completions call per worksheet, asking for a strict JSON object in
//! the `GeneratedWorksheet` shape. Calls are instrumented and log model names,
//! latencies and response sizes (not contents).
//!
//! NOTE: We never log the API key.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::Prompts;
use crate::domain::GenerationRequest;
use crate::generator::{GeneratedWorksheet, GenerationError, WorksheetGenerator};
use crate::util::{fill_template, trunc_for_log};

const DEFAULT_PROBLEMS: u8 = 10;

#[derive(Clone)]
pub struct OpenAiGenerator {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub prompts: Prompts,
}

impl OpenAiGenerator {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env(prompts: Prompts) -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty())?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model = std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o".into());
    let timeout = std::env::var("OPENAI_TIMEOUT_SECS")
      .ok()
      .and_then(|s| s.parse::<u64>().ok())
      .unwrap_or(60);

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(timeout))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, model, prompts })
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(
    &self,
    system: &str,
    user: &str,
    temperature: f32,
  ) -> Result<T, GenerationError> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![
        ChatMessageReq { role: "system".into(), content: system.into() },
        ChatMessageReq { role: "user".into(), content: user.into() },
      ],
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "worksheet-wizard/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await
      .map_err(|e| GenerationError::Transport(e.to_string()))?;

    let status = res.status();
    if !status.is_success() {
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or_else(|| trunc_for_log(&body, 200));
      return Err(classify_status(status, msg));
    }

    let body: ChatCompletionResponse = res.json().await
      .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();
    debug!(response_len = text.len(), preview = %trunc_for_log(&text, 120), "OpenAI response");

    serde_json::from_str::<T>(&text).map_err(|e| GenerationError::MalformedResponse(format!("JSON parse error: {}", e)))
  }
}

fn classify_status(status: StatusCode, msg: String) -> GenerationError {
  match status {
    StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => GenerationError::Rejected(msg),
    _ => GenerationError::Upstream(format!("OpenAI HTTP {}: {}", status, msg)),
  }
}

fn join_or_none(items: &[String]) -> String {
  if items.is_empty() { "none".into() } else { items.join("; ") }
}

/// Render the user prompt for a request.
pub fn build_user_prompt(prompts: &Prompts, req: &GenerationRequest) -> String {
  let b = &req.basic_info;
  let f = &req.faith_integration;
  let c = &req.customization;

  let grade = b.grade_level.label();
  let faith_level = f.level.title();
  let denomination = f.denomination
    .and_then(|d| serde_json::to_value(d).ok())
    .and_then(|v| v.as_str().map(str::to_string))
    .unwrap_or_else(|| "unspecified".into());
  let num_problems = c.num_problems.unwrap_or(DEFAULT_PROBLEMS).clamp(1, 50).to_string();
  let minutes = b.estimated_time.to_string();
  let customization = serde_json::to_string(c).unwrap_or_else(|_| "{}".into());

  fill_template(
    &prompts.generation_user_template,
    &[
      ("grade", grade.as_str()),
      ("subject", b.subject.display_name()),
      ("topic", req.topic.main_topic.as_str()),
      ("subtopics", join_or_none(&req.topic.subtopics).as_str()),
      ("objectives", join_or_none(&req.topic.learning_objectives).as_str()),
      ("faith_level", faith_level),
      ("faith_description", f.level.description()),
      ("denomination", denomination.as_str()),
      ("requests", f.specific_requests.as_deref().unwrap_or("none")),
      ("num_problems", num_problems.as_str()),
      ("minutes", minutes.as_str()),
      ("customization", customization.as_str()),
      ("template_hint", c.template_id.as_deref().unwrap_or("any")),
    ],
  )
}

#[async_trait]
impl WorksheetGenerator for OpenAiGenerator {
  fn name(&self) -> &'static str { "openai" }

  #[instrument(level = "info", skip(self, request), fields(model = %self.model, topic_len = request.topic.main_topic.len()))]
  async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedWorksheet, GenerationError> {
    let user = build_user_prompt(&self.prompts, request);
    let mut generated: GeneratedWorksheet = self.chat_json(&self.prompts.generation_system, &user, 0.7).await?;
    if generated.metadata.model.is_none() {
      generated.metadata.model = Some(self.model.clone());
    }
    Ok(generated)
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

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

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::Denomination;
  use crate::generator::tests::fractions_request;

  #[test]
  fn prompt_carries_request_fields() {
    let mut req = fractions_request();
    req.faith_integration.denomination = Some(Denomination::NonDenominational);
    req.topic.subtopics = vec!["Halves".into(), "Quarters".into()];
    let p = build_user_prompt(&Prompts::default(), &req);

    assert!(p.contains("Grade 3 Math"));
    assert!(p.contains("\"Fractions\""));
    assert!(p.contains("Halves; Quarters"));
    assert!(p.contains("Christian Values"));
    assert!(p.contains("non_denominational"));
    assert!(p.contains("Include 10 problems"));
    assert!(!p.contains("{topic}"));
  }

  #[test]
  fn status_classification() {
    assert!(matches!(classify_status(StatusCode::BAD_REQUEST, "bad".into()), GenerationError::Rejected(_)));
    let e = classify_status(StatusCode::SERVICE_UNAVAILABLE, "busy".into());
    assert!(e.to_string().contains("busy"));
  }

  #[test]
  fn worksheet_json_parses_with_missing_fields() {
    let w: GeneratedWorksheet = serde_json::from_str(
      r#"{"metadata":{"template":{"name":"Fractions Practice"}},"problems":[{"type":"short","question":"1/2+1/2?","answer":"1"}]}"#,
    )
    .unwrap();
    assert_eq!(w.metadata.template.name, "Fractions Practice");
    assert_eq!(w.problems.len(), 1);
    assert!(w.answer_key.is_none());
  }

  #[test]
  fn extracts_error_message() {
    assert_eq!(extract_openai_error(r#"{"error":{"message":"nope"}}"#), Some("nope".into()));
    assert_eq!(extract_openai_error("plain"), None);
  }
}
