//! Built-in worksheet templates and the offline generator built on them.
//!
//! The catalog backs the Template step (listed over HTTP) and lets the service
//! produce a usable worksheet without any model behind it. Extra templates can
//! be supplied through the TOML config.

use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::domain::{FaithLevel, GenerationRequest, Subject, WorksheetProblem, MAX_GRADE};
use crate::generator::{
  GeneratedWorksheet, GenerationError, GenerationMetadata, TemplateRef, WorksheetGenerator,
};
use crate::util::fill_template;

const DEFAULT_PROBLEMS: u8 = 5;
const MAX_PROBLEMS: u8 = 50;

fn default_max_grade() -> u8 { MAX_GRADE }

/// A worksheet layout. Stems may use `{topic}`, `{grade}` and `{n}`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorksheetTemplate {
  pub id: String,
  pub name: String,
  #[serde(default)] pub description: String,
  /// Empty means any subject.
  #[serde(default)] pub subjects: Vec<Subject>,
  #[serde(default)] pub min_grade: u8,
  #[serde(default = "default_max_grade")] pub max_grade: u8,
  #[serde(default)] pub instructions: String,
  pub stems: Vec<String>,
}

impl WorksheetTemplate {
  pub fn fits(&self, req: &GenerationRequest) -> bool {
    let g = req.basic_info.grade_level.value();
    (self.subjects.is_empty() || self.subjects.contains(&req.basic_info.subject))
      && g >= self.min_grade
      && g <= self.max_grade
      && !self.stems.is_empty()
  }

  fn is_generic(&self) -> bool { self.subjects.is_empty() }
}

fn tpl(id: &str, name: &str, description: &str, subjects: &[Subject], grades: (u8, u8), instructions: &str, stems: &[&str]) -> WorksheetTemplate {
  WorksheetTemplate {
    id: id.into(),
    name: name.into(),
    description: description.into(),
    subjects: subjects.to_vec(),
    min_grade: grades.0,
    max_grade: grades.1,
    instructions: instructions.into(),
    stems: stems.iter().map(|s| s.to_string()).collect(),
  }
}

/// Templates shipped with the service.
pub fn builtin_templates() -> Vec<WorksheetTemplate> {
  vec![
    tpl("early-learner", "Early Learner Activity", "Big prompts, drawing and circling.", &[], (0, 2),
      "Listen to each question and draw or circle your answer.",
      &["Draw a picture that shows {topic}.", "Circle the things that go with {topic}.", "Tell a friend one thing about {topic}."]),
    tpl("guided-practice", "Guided Practice", "Mixed questions that build from recall to application.", &[], (0, 12),
      "Read each question carefully and show your thinking.",
      &["Explain {topic} in your own words.", "Give an example of {topic}.", "What is one question you still have about {topic}?", "How is {topic} used in everyday life?"]),
    tpl("math-drill", "Math Skill Drill", "Short practice items for fluency.", &[Subject::Math], (1, 12),
      "Solve each problem. Show your work in the space provided.",
      &["Problem {n}: solve a {topic} problem at the {grade} level.", "Problem {n}: write a word problem about {topic}, then solve it.", "Problem {n}: check your answer to the previous {topic} problem another way."]),
    tpl("science-lab", "Science Exploration", "Observe, predict, explain.", &[Subject::Science], (1, 12),
      "Think like a scientist: observe, predict, and explain.",
      &["What do you observe about {topic}?", "Make a prediction about {topic} and explain why.", "Describe an experiment that tests an idea about {topic}."]),
    tpl("reading-response", "Reading Response", "Comprehension and vocabulary.", &[Subject::LanguageArts], (1, 12),
      "Answer in complete sentences.",
      &["Summarize the main idea of {topic}.", "Find two new words related to {topic} and define them.", "Write three sentences about {topic} using descriptive language."]),
    tpl("history-timeline", "History Timeline", "Events, causes and consequences.", &[Subject::History], (2, 12),
      "Use dates and details to support your answers.",
      &["List three key events connected to {topic}.", "What caused {topic}?", "How did {topic} change people's lives?"]),
    tpl("map-explorer", "Map Explorer", "Places, features and regions.", &[Subject::Geography], (1, 12),
      "Use a map or atlas to help you.",
      &["Locate {topic} on a map and describe where it is.", "Name two physical features related to {topic}.", "How does the geography of {topic} affect the people who live there?"]),
    tpl("creative-studio", "Creative Studio", "Open-ended art prompts.", &[Subject::Art], (0, 12),
      "Be creative. There is no single right answer.",
      &["Sketch an idea inspired by {topic}.", "Which colors would you use to show {topic}? Why?", "Describe an artist or artwork connected to {topic}."]),
    tpl("scripture-study", "Scripture Study", "Reading and reflecting on a passage.", &[Subject::Bible], (1, 12),
      "Read the passage and answer each question.",
      &["What happens in the passage about {topic}?", "What does {topic} teach us about God?", "How can you apply {topic} this week?"]),
  ]
}

#[derive(Clone, Debug)]
pub struct TemplateCatalog {
  templates: Vec<WorksheetTemplate>,
}

impl TemplateCatalog {
  pub fn builtin() -> Self { Self { templates: builtin_templates() } }

  /// Built-ins plus configured templates. A configured template replaces a
  /// built-in with the same id.
  pub fn with_extra(extra: Vec<WorksheetTemplate>) -> Self {
    let mut templates = builtin_templates();
    for t in extra {
      match templates.iter_mut().find(|b| b.id == t.id) {
        Some(slot) => *slot = t,
        None => templates.push(t),
      }
    }
    Self { templates }
  }

  pub fn all(&self) -> &[WorksheetTemplate] { &self.templates }

  pub fn get(&self, id: &str) -> Option<&WorksheetTemplate> {
    self.templates.iter().find(|t| t.id == id)
  }

  /// The user's pick if it fits, else a subject-specific template, else a generic one.
  pub fn choose(&self, req: &GenerationRequest) -> Option<&WorksheetTemplate> {
    if let Some(id) = req.customization.template_id.as_deref() {
      if let Some(t) = self.get(id).filter(|t| t.fits(req)) {
        return Some(t);
      }
      debug!(target: "generation", %id, "requested template missing or does not fit; choosing another");
    }
    let fitting: Vec<&WorksheetTemplate> = self.templates.iter().filter(|t| t.fits(req)).collect();
    let specific: Vec<&WorksheetTemplate> = fitting.iter().copied().filter(|t| !t.is_generic()).collect();
    let pool = if specific.is_empty() { fitting } else { specific };
    pool.choose(&mut rand::thread_rng()).copied()
  }
}

fn faith_connection(level: FaithLevel, topic: &str) -> Option<String> {
  match level {
    FaithLevel::Secular => None,
    FaithLevel::Values => Some(format!("How can kindness or honesty show up when we work on {}?", topic)),
    FaithLevel::BiblicalThemes => Some(format!("Think of a Bible story that connects to {}.", topic)),
    FaithLevel::Doctrinal => Some(format!("What does your church teach that relates to {}?", topic)),
  }
}

/// Offline collaborator: fills a catalog template with the request's topic.
pub struct TemplateGenerator {
  catalog: Arc<TemplateCatalog>,
}

impl TemplateGenerator {
  pub fn new(catalog: Arc<TemplateCatalog>) -> Self { Self { catalog } }
}

#[async_trait]
impl WorksheetGenerator for TemplateGenerator {
  fn name(&self) -> &'static str { "template" }

  #[instrument(level = "info", skip(self, request), fields(topic = %request.topic.main_topic))]
  async fn generate(&self, request: &GenerationRequest) -> Result<GeneratedWorksheet, GenerationError> {
    let template = self.catalog.choose(request).ok_or_else(|| {
      GenerationError::Rejected(format!(
        "no template available for {} at {}",
        request.basic_info.subject,
        request.basic_info.grade_level.label()
      ))
    })?;

    let topic = request.topic.main_topic.as_str();
    let grade = request.basic_info.grade_level.label();
    let count = request.customization.num_problems.unwrap_or(DEFAULT_PROBLEMS).clamp(1, MAX_PROBLEMS);
    let connection = faith_connection(request.faith_integration.level, topic);

    let problems: Vec<WorksheetProblem> = (0..count as usize)
      .map(|i| {
        let n = (i + 1).to_string();
        let stem = &template.stems[i % template.stems.len()];
        WorksheetProblem {
          id: i as u32 + 1,
          kind: "open_response".into(),
          question: fill_template(stem, &[("topic", topic), ("grade", grade.as_str()), ("n", n.as_str())]),
          options: None,
          answer: "Answers will vary.".into(),
          explanation: String::new(),
          christian_connection: connection.clone(),
          materials: None,
        }
      })
      .collect();

    let mut content = format!("# {}\n\n{} · {}\n\n{}\n\n", topic, grade, request.basic_info.subject, template.instructions);
    for p in &problems {
      content.push_str(&format!("{}. {}\n", p.id, p.question));
    }

    info!(target: "generation", template = %template.id, problems = problems.len(), "Filled built-in template");

    Ok(GeneratedWorksheet {
      metadata: GenerationMetadata {
        template: TemplateRef { id: template.id.clone(), name: template.name.clone() },
        model: None,
      },
      content,
      instructions: Some(template.instructions.clone()),
      problems,
      answer_key: None,
      extensions: request.topic.learning_objectives.iter().map(|o| format!("Extend: {}", o)).collect(),
      materials: vec!["Pencil".into()],
      visual_assets: vec![],
    })
  }
}
