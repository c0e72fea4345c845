//! Wizard steps and the per-step advance gates.

use serde::Serialize;

use crate::request::RequestDraft;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
  BasicInfo,
  Topic,
  FaithLevel,
  Customize,
  Template,
  Review,
}

impl Step {
  pub const ALL: [Step; 6] = [
    Step::BasicInfo,
    Step::Topic,
    Step::FaithLevel,
    Step::Customize,
    Step::Template,
    Step::Review,
  ];

  pub const COUNT: usize = Step::ALL.len();

  pub fn index(self) -> usize { self as usize }

  pub fn from_index(i: usize) -> Option<Step> { Step::ALL.get(i).copied() }

  pub fn label(self) -> &'static str {
    match self {
      Step::BasicInfo => "Basic Info",
      Step::Topic => "Topic",
      Step::FaithLevel => "Faith Level",
      Step::Customize => "Customize",
      Step::Template => "Template",
      Step::Review => "Review",
    }
  }

  pub fn next(self) -> Option<Step> { Step::from_index(self.index() + 1) }

  pub fn prev(self) -> Option<Step> { self.index().checked_sub(1).and_then(Step::from_index) }

  pub fn is_terminal(self) -> bool { self == Step::Review }
}

/// May the user leave `step` going forward, given the current draft?
///
/// Presence checks only: grade 0 and faith level `Secular` count as set.
pub fn can_advance(step: Step, request: &RequestDraft) -> bool {
  match step {
    Step::BasicInfo => request.basic_info.grade_level.is_some(),
    Step::Topic => request.main_topic().is_some(),
    Step::FaithLevel => request.faith_integration.level.is_some(),
    Step::Customize | Step::Template | Step::Review => true,
  }
}
