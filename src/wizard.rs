//! The wizard state machine.
//!
//! A `Wizard` owns the step index, the request draft, the last result and the
//! pending/error condition of the single generation call. Every user action is
//! one `WizardCommand`; `Wizard::apply` performs the matching transition and
//! reports what happened. The generation call itself is not made here: when
//! forward navigation from the last step (or an explicit generate) is allowed,
//! the wizard marks itself pending and hands back the finalized request. The
//! caller runs the call and reports back through `complete_generation`.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{Customization, GenerationRequest, WorksheetResult};
use crate::generator::GenerationError;
use crate::request::{BasicInfoPatch, FaithPatch, RequestDraft, TopicPatch};
use crate::validator::{can_advance, Step};

/// One discrete user action.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WizardCommand {
  UpdateBasicInfo(BasicInfoPatch),
  UpdateTopic(TopicPatch),
  UpdateFaith(FaithPatch),
  UpdateCustomization(Customization),
  Next,
  Back,
  Generate,
  Reset,
}

/// What a command did.
#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
  /// A field group was merged into the draft.
  Updated,
  /// The step index changed.
  Moved(Step),
  /// The command was refused by a gate, or there was nowhere to go.
  Blocked,
  /// The wizard is now pending; the caller must run the generation call.
  Generate(GenerationRequest),
  Reset,
}

#[derive(Clone, Debug)]
pub struct Wizard {
  step: Step,
  draft: RequestDraft,
  result: Option<WorksheetResult>,
  loading: bool,
  error: Option<String>,
  /// Bumped on reset so a call started before the reset cannot land afterwards.
  epoch: u64,
}

impl Default for Wizard {
  fn default() -> Self { Self::new() }
}

impl Wizard {
  pub fn new() -> Self {
    Self { step: Step::BasicInfo, draft: RequestDraft::new(), result: None, loading: false, error: None, epoch: 0 }
  }

  pub fn step(&self) -> Step { self.step }
  pub fn draft(&self) -> &RequestDraft { &self.draft }
  pub fn result(&self) -> Option<&WorksheetResult> { self.result.as_ref() }
  pub fn is_loading(&self) -> bool { self.loading }
  pub fn error(&self) -> Option<&str> { self.error.as_deref() }
  pub fn epoch(&self) -> u64 { self.epoch }

  pub fn can_advance(&self) -> bool { can_advance(self.step, &self.draft) }

  /// Generation is offered from the Customize step onward once the draft is complete.
  pub fn can_generate(&self) -> bool {
    !self.loading && self.step.index() >= Step::Customize.index() && self.draft.is_complete()
  }

  pub fn apply(&mut self, cmd: WizardCommand) -> Transition {
    match cmd {
      WizardCommand::UpdateBasicInfo(p) => { self.draft.update_basic_info(p); Transition::Updated }
      WizardCommand::UpdateTopic(p) => { self.draft.update_topic(p); Transition::Updated }
      WizardCommand::UpdateFaith(p) => { self.draft.update_faith(p); Transition::Updated }
      WizardCommand::UpdateCustomization(p) => { self.draft.update_customization(p); Transition::Updated }
      WizardCommand::Next => self.advance(),
      WizardCommand::Back => self.retreat(),
      WizardCommand::Generate => self.request_generation(),
      WizardCommand::Reset => { self.reset(); Transition::Reset }
    }
  }

  /// Forward navigation. On the last step this starts generation instead of moving.
  pub fn advance(&mut self) -> Transition {
    if self.step.is_terminal() {
      return self.begin_generation();
    }
    if !can_advance(self.step, &self.draft) {
      debug!(target: "wizard", step = self.step.label(), "advance blocked by gate");
      return Transition::Blocked;
    }
    match self.step.next() {
      Some(next) => {
        self.step = next;
        debug!(target: "wizard", step = next.label(), "advanced");
        Transition::Moved(next)
      }
      None => Transition::Blocked,
    }
  }

  pub fn retreat(&mut self) -> Transition {
    match self.step.prev() {
      Some(prev) => {
        self.step = prev;
        debug!(target: "wizard", step = prev.label(), "retreated");
        Transition::Moved(prev)
      }
      None => Transition::Blocked,
    }
  }

  /// Explicit "generate" from any step at or after Customize. Never moves the step.
  pub fn request_generation(&mut self) -> Transition {
    if self.step.index() < Step::Customize.index() {
      return Transition::Blocked;
    }
    self.begin_generation()
  }

  fn begin_generation(&mut self) -> Transition {
    if self.loading {
      warn!(target: "wizard", "generation already in flight; ignoring");
      return Transition::Blocked;
    }
    match self.draft.finalize() {
      Ok(request) => {
        self.loading = true;
        self.error = None;
        info!(target: "wizard", step = self.step.label(), "generation started");
        Transition::Generate(request)
      }
      Err(missing) => {
        debug!(target: "wizard", %missing, "generation blocked: draft incomplete");
        Transition::Blocked
      }
    }
  }

  /// Report the outcome of the call started by a `Transition::Generate`.
  /// Always clears the pending flag. The step index is never touched.
  pub fn complete_generation(&mut self, outcome: Result<WorksheetResult, GenerationError>) {
    self.loading = false;
    match outcome {
      Ok(result) => {
        info!(target: "wizard", title = %result.title, "generation finished");
        self.result = Some(result);
        self.error = None;
      }
      Err(e) => {
        warn!(target: "wizard", error = %e, "generation failed");
        self.error = Some(e.to_string());
      }
    }
  }

  pub fn reset(&mut self) {
    let epoch = self.epoch + 1;
    *self = Wizard::new();
    self.epoch = epoch;
  }

  pub fn view(&self) -> WizardView {
    WizardView {
      step: self.step.index(),
      step_label: self.step.label(),
      step_count: Step::COUNT,
      can_advance: self.can_advance(),
      can_generate: self.can_generate(),
      loading: self.loading,
      error: self.error.clone(),
      request: self.draft().clone(),
      result: self.result.clone(),
    }
  }
}

/// Read-only projection handed to the presentation surface.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardView {
  pub step: usize,
  pub step_label: &'static str,
  pub step_count: usize,
  pub can_advance: bool,
  pub can_generate: bool,
  pub loading: bool,
  pub error: Option<String>,
  pub request: RequestDraft,
  pub result: Option<WorksheetResult>,
}
