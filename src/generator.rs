//! Generation invoker.
//!
//! The worksheet itself is produced by an external collaborator behind the
//! `WorksheetGenerator` trait (the OpenAI client, or the offline template
//! generator). `GenerationInvoker` makes exactly one call per invocation and
//! maps the collaborator's richer output into the display-oriented
//! `WorksheetResult`. Fields the collaborator leaves empty get a fixed
//! placeholder so the result is never half-populated.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, instrument};

use crate::domain::{GenerationRequest, VisualAsset, WorksheetProblem, WorksheetResult};

pub const PLACEHOLDER_TITLE: &str = "Generated Worksheet";
pub const PLACEHOLDER_TEMPLATE_NAME: &str = "Unnamed Template";
pub const PLACEHOLDER_INSTRUCTIONS: &str = "Complete the following worksheet activities.";
pub const PLACEHOLDER_ANSWER_KEY: &str = "Generated by Enhanced Template System";

#[derive(Debug, Error)]
pub enum GenerationError {
  /// The collaborator refused the request as given.
  #[error("Generation request rejected: {0}")]
  Rejected(String),
  /// The collaborator failed internally.
  #[error("{0}")]
  Upstream(String),
  #[error("Could not reach the generation service: {0}")]
  Transport(String),
  #[error("Generation service returned an unreadable worksheet: {0}")]
  MalformedResponse(String),
  /// Anything we cannot classify.
  #[error("Generation failed")]
  Unknown,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateRef {
  #[serde(default)] pub id: String,
  #[serde(default)] pub name: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
  #[serde(default)] pub template: TemplateRef,
  #[serde(default)] pub model: Option<String>,
}

/// What a collaborator hands back. Richer than what the wizard displays.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedWorksheet {
  #[serde(default)] pub metadata: GenerationMetadata,
  /// Full worksheet body, markdown. Rendering belongs to the export side.
  #[serde(default)] pub content: String,
  #[serde(default)] pub instructions: Option<String>,
  #[serde(default)] pub problems: Vec<WorksheetProblem>,
  #[serde(default)] pub answer_key: Option<String>,
  #[serde(default)] pub extensions: Vec<String>,
  #[serde(default)] pub materials: Vec<String>,
  #[serde(default)] pub visual_assets: Vec<VisualAsset>,
}

#[async_trait]
pub trait WorksheetGenerator: Send + Sync {
  /// Short name for logs.
  fn name(&self) -> &'static str;

  async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedWorksheet, GenerationError>;
}

#[derive(Clone)]
pub struct GenerationInvoker {
  generator: Arc<dyn WorksheetGenerator>,
}

impl GenerationInvoker {
  pub fn new(generator: Arc<dyn WorksheetGenerator>) -> Self { Self { generator } }

  pub fn collaborator(&self) -> &'static str { self.generator.name() }

  /// One collaborator call, no retry.
  #[instrument(
    level = "info",
    skip(self, request),
    fields(collaborator = self.generator.name(), grade = request.basic_info.grade_level.value(), subject = %request.basic_info.subject)
  )]
  pub async fn generate(&self, request: &GenerationRequest) -> Result<WorksheetResult, GenerationError> {
    let start = std::time::Instant::now();
    match self.generator.generate(request).await {
      Ok(generated) => {
        info!(target: "generation", elapsed = ?start.elapsed(), template = %generated.metadata.template.name, problems = generated.problems.len(), "Worksheet generated");
        Ok(to_result(request, generated))
      }
      Err(e) => {
        error!(target: "generation", elapsed = ?start.elapsed(), error = %e, "Worksheet generation failed");
        Err(e)
      }
    }
  }
}

fn non_blank(s: Option<String>) -> Option<String> {
  s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn non_empty<T>(v: Vec<T>) -> Option<Vec<T>> {
  if v.is_empty() { None } else { Some(v) }
}

/// Lossy mapping from collaborator output to the displayed result.
pub fn to_result(request: &GenerationRequest, generated: GeneratedWorksheet) -> WorksheetResult {
  let basic = &request.basic_info;
  let main_topic = request.topic.main_topic.trim().to_string();
  let template_name = non_blank(Some(generated.metadata.template.name))
    .unwrap_or_else(|| PLACEHOLDER_TEMPLATE_NAME.to_string());

  let problems = generated
    .problems
    .into_iter()
    .enumerate()
    .map(|(i, p)| WorksheetProblem { id: i as u32 + 1, ..p })
    .collect();

  WorksheetResult {
    title: if main_topic.is_empty() { PLACEHOLDER_TITLE.to_string() } else { main_topic.clone() },
    grade: basic.grade_level.value().to_string(),
    subject: basic.subject.display_name().to_string(),
    topic: main_topic,
    description: format!("Enhanced worksheet using {}", template_name),
    instructions: non_blank(generated.instructions).unwrap_or_else(|| PLACEHOLDER_INSTRUCTIONS.to_string()),
    estimated_time: format!("{} minutes", basic.estimated_time),
    problems,
    answer_key: non_blank(generated.answer_key).unwrap_or_else(|| PLACEHOLDER_ANSWER_KEY.to_string()),
    extensions: non_empty(generated.extensions),
    materials: non_empty(generated.materials),
    visual_assets: non_empty(generated.visual_assets),
  }
}
