//! Loading wizard configuration (generation prompts + extra templates) from TOML.
//!
//! Example:
//!
//! ```toml
//! [prompts]
//! generation_system = "..."
//!
//! [[templates]]
//! id = "fractions"
//! name = "Fractions Practice"
//! subjects = ["Math"]
//! stems = ["Shade {topic} on the strip."]
//! ```

use std::path::PathBuf;

use serde::Deserialize;
use tracing::{error, info};

use crate::templates::WorksheetTemplate;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct WizardConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub templates: Vec<WorksheetTemplate>,
}

/// Prompts used by the OpenAI generator. The user template sees
/// `{grade}`, `{subject}`, `{topic}`, `{subtopics}`, `{objectives}`,
/// `{faith_level}`, `{faith_description}`, `{denomination}`, `{requests}`,
/// `{num_problems}`, `{minutes}`, `{customization}` and `{template_hint}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub generation_system: String,
  pub generation_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      generation_system: "You are an experienced teacher writing printable worksheets for Christian and secular classrooms. Respond ONLY with strict JSON.".into(),
      generation_user_template: concat!(
        "Write a worksheet for {grade} {subject} on \"{topic}\".\n",
        "Subtopics: {subtopics}\nLearning objectives: {objectives}\n",
        "Faith integration: {faith_level} ({faith_description}). Denomination: {denomination}. Special requests: {requests}\n",
        "Customization: {customization}\nPreferred template: {template_hint}\n",
        "Include {num_problems} problems and size it for about {minutes} minutes.\n\n",
        "Return JSON: {\"metadata\": {\"template\": {\"id\": string, \"name\": string}}, \"content\": string, ",
        "\"instructions\": string, \"problems\": [{\"type\": string, \"question\": string, \"options\": [string]?, ",
        "\"answer\": string, \"explanation\": string, \"christianConnection\": string?, \"materials\": string?}], ",
        "\"answerKey\": string, \"extensions\": [string], \"materials\": [string], ",
        "\"visualAssets\": [{\"description\": string, \"purpose\": string}]}.\n",
        "Only include christianConnection when faith integration is above secular."
      ).into(),
    }
  }
}

/// Attempt to load `WizardConfig` from WIZARD_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_wizard_config_from_env() -> Option<WizardConfig> {
  let path = std::env::var("WIZARD_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<WizardConfig>(&s) {
      Ok(cfg) => {
        info!(target: "worksheet_wizard", %path, templates = cfg.templates.len(), "Loaded wizard config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "worksheet_wizard", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "worksheet_wizard", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

/// Where export jobs are handed to the renderer. EXPORT_SPOOL_DIR, default `./exports`.
pub fn export_spool_dir() -> PathBuf {
  std::env::var("EXPORT_SPOOL_DIR").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("./exports"))
}
