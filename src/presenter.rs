//! Result presentation and export triggers.
//!
//! The presenter decides when a result may be shown or exported (a result
//! exists and no generation is pending) and forwards export requests to the
//! collaborator registered for the format. It does no rendering itself.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::WorksheetResult;
use crate::wizard::Wizard;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
  Pdf,
  Word,
}

impl ExportFormat {
  pub fn extension(self) -> &'static str {
    match self {
      ExportFormat::Pdf => "pdf",
      ExportFormat::Word => "docx",
    }
  }
}

#[derive(Debug, Error)]
pub enum ExportError {
  #[error("No finished worksheet to export")]
  NotPresentable,
  #[error("No exporter configured for {0:?}")]
  Unsupported(ExportFormat),
  #[error("Export hand-off failed: {0}")]
  HandOff(String),
}

/// External export collaborator. Produces the artifact as a side effect.
#[async_trait]
pub trait WorksheetExporter: Send + Sync {
  fn format(&self) -> ExportFormat;

  async fn export(&self, result: &WorksheetResult) -> Result<(), ExportError>;
}

/// The result to show, if any: present and not superseded by a pending call.
pub fn presentable(wizard: &Wizard) -> Option<&WorksheetResult> {
  if wizard.is_loading() { None } else { wizard.result() }
}

#[derive(Clone, Default)]
pub struct ResultPresenter {
  exporters: Vec<Arc<dyn WorksheetExporter>>,
}

impl ResultPresenter {
  pub fn new(exporters: Vec<Arc<dyn WorksheetExporter>>) -> Self { Self { exporters } }

  /// Spool-directory exporters for every format.
  pub fn spooling(dir: PathBuf) -> Self {
    Self::new(vec![
      Arc::new(SpoolExporter::new(dir.clone(), ExportFormat::Pdf)),
      Arc::new(SpoolExporter::new(dir, ExportFormat::Word)),
    ])
  }

  #[instrument(level = "info", skip(self, result), fields(?format, title = %result.title))]
  pub async fn export(&self, result: &WorksheetResult, format: ExportFormat) -> Result<(), ExportError> {
    let exporter = self
      .exporters
      .iter()
      .find(|e| e.format() == format)
      .ok_or(ExportError::Unsupported(format))?;
    exporter.export(result).await
  }
}

/// Hands the result to an out-of-process renderer by dropping a job file
/// (`<uuid>.<ext>.json`) into a spool directory.
pub struct SpoolExporter {
  dir: PathBuf,
  format: ExportFormat,
}

#[derive(Serialize)]
struct ExportJob<'a> {
  format: ExportFormat,
  result: &'a WorksheetResult,
}

impl SpoolExporter {
  pub fn new(dir: PathBuf, format: ExportFormat) -> Self { Self { dir, format } }
}

#[async_trait]
impl WorksheetExporter for SpoolExporter {
  fn format(&self) -> ExportFormat { self.format }

  async fn export(&self, result: &WorksheetResult) -> Result<(), ExportError> {
    let body = serde_json::to_vec_pretty(&ExportJob { format: self.format, result })
      .map_err(|e| ExportError::HandOff(e.to_string()))?;
    tokio::fs::create_dir_all(&self.dir).await.map_err(|e| ExportError::HandOff(e.to_string()))?;
    let path = self.dir.join(format!("{}.{}.json", Uuid::new_v4(), self.format.extension()));
    tokio::fs::write(&path, body).await.map_err(|e| ExportError::HandOff(e.to_string()))?;
    info!(target: "worksheet_wizard", path = %path.display(), "Export job spooled");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::generator::{tests::fractions_request, to_result, GeneratedWorksheet};
  use crate::validator::Step;
  use crate::wizard::{Transition, WizardCommand};
  use crate::request::{BasicInfoPatch, FaithPatch, TopicPatch};
  use crate::domain::{FaithLevel, GradeLevel};

  fn result() -> WorksheetResult { to_result(&fractions_request(), GeneratedWorksheet::default()) }

  fn ready_wizard() -> Wizard {
    let mut w = Wizard::new();
    w.apply(WizardCommand::UpdateBasicInfo(BasicInfoPatch { grade_level: GradeLevel::new(3), ..Default::default() }));
    w.apply(WizardCommand::UpdateTopic(TopicPatch { main_topic: Some("Fractions".into()), ..Default::default() }));
    w.apply(WizardCommand::UpdateFaith(FaithPatch { level: Some(FaithLevel::Values), ..Default::default() }));
    while w.step() != Step::Review {
      w.advance();
    }
    w
  }

  #[test]
  fn nothing_presentable_before_first_result_or_while_pending() {
    let mut w = ready_wizard();
    assert!(presentable(&w).is_none());

    assert!(matches!(w.advance(), Transition::Generate(_)));
    w.complete_generation(Ok(result()));
    assert!(presentable(&w).is_some());

    assert!(matches!(w.advance(), Transition::Generate(_)));
    assert!(presentable(&w).is_none());
  }

  #[tokio::test]
  async fn spool_exporter_writes_job_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let presenter = ResultPresenter::spooling(dir.path().to_path_buf());
    presenter.export(&result(), ExportFormat::Word).await.unwrap();

    let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().path()).collect();
    assert_eq!(entries.len(), 1);
    let name = entries[0].file_name().unwrap().to_string_lossy().to_string();
    assert!(name.ends_with(".docx.json"));
    let body: serde_json::Value = serde_json::from_slice(&std::fs::read(&entries[0]).unwrap()).unwrap();
    assert_eq!(body["format"], "word");
    assert_eq!(body["result"]["title"], "Fractions");
  }

  #[tokio::test]
  async fn missing_exporter_is_reported() {
    let presenter = ResultPresenter::default();
    let err = presenter.export(&result(), ExportFormat::Pdf).await.unwrap_err();
    assert!(matches!(err, ExportError::Unsupported(ExportFormat::Pdf)));
  }
}
