//! Command dispatch shared by both HTTP and WebSocket handlers.
//!
//! A command is applied to the session's wizard under the session lock. When
//! the transition asks for generation, the lock is released for the external
//! call and re-taken to record the outcome, so navigation and edits on the
//! same session keep working while the call is in flight.

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::GenerationRequest;
use crate::generator::GenerationError;
use crate::presenter::{presentable, ExportError, ExportFormat};
use crate::state::AppState;
use crate::wizard::{Transition, WizardCommand, WizardView};

#[derive(Debug, Error)]
pub enum SessionError {
  #[error("Unknown session: {0}")]
  UnknownSession(String),
  #[error(transparent)]
  Export(#[from] ExportError),
}

/// A command that has been applied. `generation` is set when the command
/// started an external call; the outcome is recorded by that task whether or
/// not anyone awaits it.
pub struct Dispatched {
  pub view: WizardView,
  pub generation: Option<JoinHandle<()>>,
}

/// Apply a command and return right away, leaving any generation running.
#[instrument(level = "info", skip(state, cmd), fields(%session_id))]
pub async fn dispatch_command(state: &AppState, session_id: &str, cmd: WizardCommand) -> Result<Dispatched, SessionError> {
  let (transition, epoch) = {
    let mut sessions = state.sessions.write().await;
    let wizard = sessions
      .get_mut(session_id)
      .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;
    (wizard.apply(cmd), wizard.epoch())
  };
  debug!(target: "wizard", %session_id, ?transition, "command applied");

  let generation = match transition {
    Transition::Generate(request) => Some(tokio::spawn(record_generation(
      state.clone(),
      session_id.to_string(),
      epoch,
      request,
    ))),
    _ => None,
  };

  let view = state
    .view(session_id)
    .await
    .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;
  Ok(Dispatched { view, generation })
}

/// Apply a command and, when it starts a generation, wait for the outcome.
pub async fn apply_command(state: &AppState, session_id: &str, cmd: WizardCommand) -> Result<WizardView, SessionError> {
  let dispatched = dispatch_command(state, session_id, cmd).await?;
  let Some(generation) = dispatched.generation else {
    return Ok(dispatched.view);
  };
  if let Err(e) = generation.await {
    error!(target: "generation", %session_id, error = %e, "Generation task lost");
  }
  state
    .view(session_id)
    .await
    .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))
}

/// Make the single external call and record its outcome. Runs detached from
/// the caller, so the wizard leaves the pending state even when the request
/// that started it is gone. A panicking collaborator reads as `Unknown`.
async fn record_generation(state: AppState, session_id: String, epoch: u64, request: GenerationRequest) {
  let invoker = state.invoker.clone();
  let outcome = match tokio::spawn(async move { invoker.generate(&request).await }).await {
    Ok(outcome) => outcome,
    Err(e) => {
      error!(target: "generation", %session_id, error = %e, "Generation task aborted");
      Err(GenerationError::Unknown)
    }
  };

  let mut sessions = state.sessions.write().await;
  match sessions.get_mut(&session_id) {
    Some(wizard) if wizard.epoch() == epoch => {
      wizard.complete_generation(outcome);
      debug!(target: "wizard", %session_id, failed = wizard.error().is_some(), "generation outcome recorded");
    }
    Some(_) => warn!(target: "wizard", %session_id, "wizard was reset during generation; dropping outcome"),
    None => warn!(target: "wizard", %session_id, "session closed during generation; dropping outcome"),
  }
}

#[instrument(level = "info", skip(state), fields(%session_id))]
pub async fn close_session(state: &AppState, session_id: &str) -> Result<(), SessionError> {
  if state.close_session(session_id).await {
    info!(target: "wizard", %session_id, "Session closed");
    Ok(())
  } else {
    Err(SessionError::UnknownSession(session_id.to_string()))
  }
}

#[instrument(level = "info", skip(state), fields(%session_id, ?format))]
pub async fn export_result(state: &AppState, session_id: &str, format: ExportFormat) -> Result<(), SessionError> {
  let result = {
    let sessions = state.sessions.read().await;
    let wizard = sessions
      .get(session_id)
      .ok_or_else(|| SessionError::UnknownSession(session_id.to_string()))?;
    presentable(wizard).cloned().ok_or(ExportError::NotPresentable)?
  };
  state.presenter.export(&result, format).await?;
  Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use std::sync::atomic::{AtomicUsize, Ordering};
  use std::sync::Arc;

  use async_trait::async_trait;
  use tokio::sync::Notify;

  use crate::domain::{FaithLevel, GradeLevel, Subject};
  use crate::generator::tests::StubGenerator;
  use crate::generator::{GeneratedWorksheet, GenerationInvoker, WorksheetGenerator};
  use crate::presenter::ResultPresenter;
  use crate::request::{BasicInfoPatch, FaithPatch, TopicPatch};
  use crate::templates::TemplateCatalog;
  use crate::validator::Step;

  pub(crate) fn state_with(generator: Arc<dyn WorksheetGenerator>) -> AppState {
    AppState::with_parts(
      GenerationInvoker::new(generator),
      ResultPresenter::default(),
      Arc::new(TemplateCatalog::builtin()),
    )
  }

  pub(crate) async fn fill_fractions(state: &AppState, id: &str) {
    let cmds = [
      WizardCommand::UpdateBasicInfo(BasicInfoPatch { grade_level: GradeLevel::new(3), ..Default::default() }),
      WizardCommand::UpdateBasicInfo(BasicInfoPatch { subject: Some(Subject::Math), ..Default::default() }),
      WizardCommand::UpdateTopic(TopicPatch { main_topic: Some("Fractions".into()), ..Default::default() }),
      WizardCommand::UpdateFaith(FaithPatch { level: Some(FaithLevel::Values), ..Default::default() }),
    ];
    for cmd in cmds {
      apply_command(state, id, cmd).await.unwrap();
    }
  }

  async fn walk_to_review(state: &AppState, id: &str) {
    for _ in 0..5 {
      apply_command(state, id, WizardCommand::Next).await.unwrap();
    }
    assert_eq!(state.view(id).await.unwrap().step, Step::Review.index());
  }

  /// Blocks inside the call until released.
  struct GatedGenerator {
    release: Notify,
    calls: AtomicUsize,
  }

  #[async_trait]
  impl WorksheetGenerator for GatedGenerator {
    fn name(&self) -> &'static str { "gated" }

    async fn generate(&self, _request: &GenerationRequest) -> Result<GeneratedWorksheet, GenerationError> {
      self.calls.fetch_add(1, Ordering::SeqCst);
      self.release.notified().await;
      Err(GenerationError::Upstream("released".into()))
    }
  }

  struct PanickingGenerator;

  #[async_trait]
  impl WorksheetGenerator for PanickingGenerator {
    fn name(&self) -> &'static str { "panicking" }

    async fn generate(&self, _request: &GenerationRequest) -> Result<GeneratedWorksheet, GenerationError> {
      panic!("collaborator bug")
    }
  }

  #[tokio::test]
  async fn full_walkthrough_presents_template_name() {
    let state = state_with(Arc::new(StubGenerator::named("Fractions Practice")));
    let (id, _) = state.open_session().await;
    fill_fractions(&state, &id).await;
    walk_to_review(&state, &id).await;

    let view = apply_command(&state, &id, WizardCommand::Next).await.unwrap();
    assert!(!view.loading);
    assert_eq!(view.step, Step::Review.index());
    let result = view.result.expect("result");
    assert!(result.description.contains("Fractions Practice"));
    assert_eq!(result.grade, "3");
  }

  #[tokio::test]
  async fn failed_generation_surfaces_error_and_stays_on_review() {
    let state = state_with(Arc::new(StubGenerator::failing("service unavailable")));
    let (id, _) = state.open_session().await;
    fill_fractions(&state, &id).await;
    walk_to_review(&state, &id).await;

    let view = apply_command(&state, &id, WizardCommand::Next).await.unwrap();
    assert!(!view.loading);
    assert_eq!(view.error.as_deref(), Some("service unavailable"));
    assert_eq!(view.step, Step::Review.index());
    assert!(view.result.is_none());
    assert_eq!(view.request.topic.main_topic.as_deref(), Some("Fractions"));
  }

  #[tokio::test]
  async fn pending_blocks_second_generation_not_navigation() {
    let gen = Arc::new(GatedGenerator { release: Notify::new(), calls: AtomicUsize::new(0) });
    let state = Arc::new(state_with(gen.clone()));
    let (id, _) = state.open_session().await;
    fill_fractions(&state, &id).await;
    walk_to_review(&state, &id).await;

    let first = {
      let state = state.clone();
      let id = id.clone();
      tokio::spawn(async move { apply_command(&state, &id, WizardCommand::Next).await })
    };

    let mut pending = false;
    for _ in 0..200 {
      if state.view(&id).await.unwrap().loading && gen.calls.load(Ordering::SeqCst) == 1 {
        pending = true;
        break;
      }
      tokio::task::yield_now().await;
    }
    assert!(pending, "generation never went pending");

    let view = apply_command(&state, &id, WizardCommand::Generate).await.unwrap();
    assert!(view.loading);
    let view = apply_command(&state, &id, WizardCommand::Back).await.unwrap();
    assert_eq!(view.step, Step::Template.index());
    assert_eq!(gen.calls.load(Ordering::SeqCst), 1);

    gen.release.notify_one();
    let view = first.await.unwrap().unwrap();
    assert!(!view.loading);
    assert_eq!(view.error.as_deref(), Some("released"));
    assert_eq!(view.step, Step::Template.index());
  }

  #[tokio::test]
  async fn panicking_collaborator_reads_generation_failed() {
    let state = state_with(Arc::new(PanickingGenerator));
    let (id, _) = state.open_session().await;
    fill_fractions(&state, &id).await;
    walk_to_review(&state, &id).await;

    let view = apply_command(&state, &id, WizardCommand::Next).await.unwrap();
    assert!(!view.loading);
    assert_eq!(view.error.as_deref(), Some("Generation failed"));
  }

  #[tokio::test]
  async fn unknown_session_is_an_error() {
    let state = state_with(Arc::new(StubGenerator::named("x")));
    let err = apply_command(&state, "nope", WizardCommand::Next).await.unwrap_err();
    assert!(matches!(err, SessionError::UnknownSession(_)));
  }

  #[tokio::test]
  async fn export_requires_a_result() {
    let state = state_with(Arc::new(StubGenerator::named("x")));
    let (id, _) = state.open_session().await;
    let err = export_result(&state, &id, ExportFormat::Pdf).await.unwrap_err();
    assert!(matches!(err, SessionError::Export(ExportError::NotPresentable)));
  }

  async fn wait_until_pending(state: &AppState, id: &str, gen: &GatedGenerator, calls: usize) {
    for _ in 0..200 {
      if state.view(id).await.map(|v| v.loading).unwrap_or(false) && gen.calls.load(Ordering::SeqCst) == calls {
        return;
      }
      tokio::task::yield_now().await;
    }
    panic!("generation never went pending");
  }

  async fn wait_until_settled(state: &AppState, id: &str) -> WizardView {
    for _ in 0..200 {
      let view = state.view(id).await.unwrap();
      if !view.loading {
        return view;
      }
      tokio::task::yield_now().await;
    }
    panic!("generation never settled");
  }

  #[tokio::test]
  async fn aborted_caller_still_records_outcome() {
    let gen = Arc::new(GatedGenerator { release: Notify::new(), calls: AtomicUsize::new(0) });
    let state = Arc::new(state_with(gen.clone()));
    let (id, _) = state.open_session().await;
    fill_fractions(&state, &id).await;
    walk_to_review(&state, &id).await;

    let caller = {
      let state = state.clone();
      let id = id.clone();
      tokio::spawn(async move { apply_command(&state, &id, WizardCommand::Next).await })
    };
    wait_until_pending(&state, &id, &gen, 1).await;
    caller.abort();
    assert!(caller.await.unwrap_err().is_cancelled());

    gen.release.notify_one();
    let view = wait_until_settled(&state, &id).await;
    assert_eq!(view.error.as_deref(), Some("released"));
    assert_eq!(view.step, Step::Review.index());

    // A fresh command retries.
    gen.release.notify_one();
    let view = apply_command(&state, &id, WizardCommand::Next).await.unwrap();
    assert!(!view.loading);
    assert_eq!(gen.calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn dispatch_returns_while_generation_runs() {
    let gen = Arc::new(GatedGenerator { release: Notify::new(), calls: AtomicUsize::new(0) });
    let state = state_with(gen.clone());
    let (id, _) = state.open_session().await;
    fill_fractions(&state, &id).await;
    walk_to_review(&state, &id).await;

    let dispatched = dispatch_command(&state, &id, WizardCommand::Next).await.unwrap();
    assert!(dispatched.view.loading);
    let generation = dispatched.generation.expect("generation started");

    let back = dispatch_command(&state, &id, WizardCommand::Back).await.unwrap();
    assert!(back.generation.is_none());
    assert_eq!(back.view.step, Step::Template.index());

    gen.release.notify_one();
    generation.await.unwrap();
    let view = state.view(&id).await.unwrap();
    assert!(!view.loading);
    assert_eq!(view.error.as_deref(), Some("released"));
  }

  #[tokio::test]
  async fn closing_a_pending_session_drops_the_outcome() {
    let gen = Arc::new(GatedGenerator { release: Notify::new(), calls: AtomicUsize::new(0) });
    let state = state_with(gen.clone());
    let (id, _) = state.open_session().await;
    fill_fractions(&state, &id).await;
    walk_to_review(&state, &id).await;

    let dispatched = dispatch_command(&state, &id, WizardCommand::Next).await.unwrap();
    let generation = dispatched.generation.expect("generation started");
    wait_until_pending(&state, &id, &gen, 1).await;

    close_session(&state, &id).await.unwrap();
    assert!(state.view(&id).await.is_none());

    gen.release.notify_one();
    generation.await.unwrap();
    assert!(state.sessions.read().await.is_empty());
    assert!(matches!(close_session(&state, &id).await, Err(SessionError::UnknownSession(_))));
  }
}
