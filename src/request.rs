//! The request accumulator.
//!
//! `RequestDraft` is filled in one field-group at a time as the user moves
//! through the wizard. Each group is updated with a patch whose `None` fields
//! mean "leave as is", so an update never wipes a sibling that was set earlier.
//! Nothing here decides whether a step may advance; that lives in `validator`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{
  BasicInfo, Customization, Denomination, FaithIntegration, FaithLevel, GenerationRequest,
  GradeLevel, Subject, TopicInfo, DEFAULT_ESTIMATED_TIME,
};

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicInfoDraft {
  pub grade_level: Option<GradeLevel>,
  pub subject: Option<Subject>,
  pub estimated_time: Option<u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicDraft {
  pub main_topic: Option<String>,
  pub subtopics: Vec<String>,
  pub learning_objectives: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FaithDraft {
  pub level: Option<FaithLevel>,
  pub denomination: Option<Denomination>,
  pub specific_requests: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicInfoPatch {
  #[serde(default)] pub grade_level: Option<GradeLevel>,
  #[serde(default)] pub subject: Option<Subject>,
  #[serde(default)] pub estimated_time: Option<u32>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicPatch {
  #[serde(default)] pub main_topic: Option<String>,
  #[serde(default)] pub subtopics: Option<Vec<String>>,
  #[serde(default)] pub learning_objectives: Option<Vec<String>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaithPatch {
  #[serde(default)] pub level: Option<FaithLevel>,
  #[serde(default)] pub denomination: Option<Denomination>,
  #[serde(default)] pub specific_requests: Option<String>,
}

/// Which required field kept a draft from being finalized.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum IncompleteRequest {
  #[error("grade level has not been selected")]
  MissingGradeLevel,
  #[error("main topic is empty")]
  MissingMainTopic,
  #[error("faith integration level has not been chosen")]
  MissingFaithLevel,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDraft {
  pub basic_info: BasicInfoDraft,
  pub topic: TopicDraft,
  pub faith_integration: FaithDraft,
  pub customization: Customization,
}

impl RequestDraft {
  pub fn new() -> Self { Self::default() }

  pub fn update_basic_info(&mut self, patch: BasicInfoPatch) {
    let b = &mut self.basic_info;
    if patch.grade_level.is_some() { b.grade_level = patch.grade_level; }
    if patch.subject.is_some() { b.subject = patch.subject; }
    if patch.estimated_time.is_some() { b.estimated_time = patch.estimated_time; }
  }

  pub fn update_topic(&mut self, patch: TopicPatch) {
    let t = &mut self.topic;
    if patch.main_topic.is_some() { t.main_topic = patch.main_topic; }
    if let Some(subtopics) = patch.subtopics { t.subtopics = subtopics; }
    if let Some(objectives) = patch.learning_objectives { t.learning_objectives = objectives; }
  }

  pub fn update_faith(&mut self, patch: FaithPatch) {
    let f = &mut self.faith_integration;
    if patch.level.is_some() { f.level = patch.level; }
    if patch.denomination.is_some() { f.denomination = patch.denomination; }
    if patch.specific_requests.is_some() { f.specific_requests = patch.specific_requests; }
  }

  pub fn update_customization(&mut self, patch: Customization) {
    let c = &mut self.customization;
    if patch.scaffolding.is_some() { c.scaffolding = patch.scaffolding; }
    if patch.differentiation.is_some() { c.differentiation = patch.differentiation; }
    if patch.worksheet_style.is_some() { c.worksheet_style = patch.worksheet_style; }
    if patch.num_problems.is_some() { c.num_problems = patch.num_problems; }
    if patch.template_id.is_some() { c.template_id = patch.template_id; }
  }

  /// Main topic with surrounding whitespace removed; `None` when blank.
  pub fn main_topic(&self) -> Option<&str> {
    self.topic.main_topic.as_deref().map(str::trim).filter(|t| !t.is_empty())
  }

  pub fn missing_field(&self) -> Option<IncompleteRequest> {
    if self.basic_info.grade_level.is_none() {
      Some(IncompleteRequest::MissingGradeLevel)
    } else if self.main_topic().is_none() {
      Some(IncompleteRequest::MissingMainTopic)
    } else if self.faith_integration.level.is_none() {
      Some(IncompleteRequest::MissingFaithLevel)
    } else {
      None
    }
  }

  /// Ready to submit, independent of which steps were visited.
  pub fn is_complete(&self) -> bool { self.missing_field().is_none() }

  /// Build the immutable request. Subject and estimated time fall back to
  /// their defaults; the three required fields must have been set explicitly.
  pub fn finalize(&self) -> Result<GenerationRequest, IncompleteRequest> {
    let grade_level = self.basic_info.grade_level.ok_or(IncompleteRequest::MissingGradeLevel)?;
    let main_topic = self.main_topic().ok_or(IncompleteRequest::MissingMainTopic)?;
    let level = self.faith_integration.level.ok_or(IncompleteRequest::MissingFaithLevel)?;

    Ok(GenerationRequest {
      basic_info: BasicInfo {
        grade_level,
        subject: self.basic_info.subject.unwrap_or_default(),
        estimated_time: self.basic_info.estimated_time.unwrap_or(DEFAULT_ESTIMATED_TIME),
      },
      topic: TopicInfo {
        main_topic: main_topic.to_string(),
        subtopics: self.topic.subtopics.clone(),
        learning_objectives: self.topic.learning_objectives.clone(),
      },
      faith_integration: FaithIntegration {
        level,
        denomination: self.faith_integration.denomination,
        specific_requests: self.faith_integration.specific_requests.clone(),
      },
      customization: self.customization.clone(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn grade(g: u8) -> Option<GradeLevel> { GradeLevel::new(g) }

  #[test]
  fn subject_update_keeps_grade() {
    let mut d = RequestDraft::new();
    d.update_basic_info(BasicInfoPatch { grade_level: grade(4), ..Default::default() });
    d.update_basic_info(BasicInfoPatch { subject: Some(Subject::Science), ..Default::default() });
    assert_eq!(d.basic_info.grade_level, grade(4));
    assert_eq!(d.basic_info.subject, Some(Subject::Science));

    d.update_basic_info(BasicInfoPatch { grade_level: grade(0), ..Default::default() });
    assert_eq!(d.basic_info.subject, Some(Subject::Science));
    assert_eq!(d.basic_info.grade_level, Some(GradeLevel::KINDERGARTEN));
  }

  #[test]
  fn unrelated_groups_do_not_erase_required_fields() {
    let mut d = RequestDraft::new();
    d.update_basic_info(BasicInfoPatch { grade_level: grade(3), ..Default::default() });
    d.update_topic(TopicPatch { main_topic: Some("Fractions".into()), ..Default::default() });
    d.update_faith(FaithPatch { level: Some(FaithLevel::Values), ..Default::default() });

    d.update_topic(TopicPatch { subtopics: Some(vec!["Halves".into()]), ..Default::default() });
    d.update_faith(FaithPatch { denomination: Some(Denomination::Baptist), ..Default::default() });
    d.update_customization(Customization { num_problems: Some(12), ..Default::default() });

    assert_eq!(d.main_topic(), Some("Fractions"));
    assert_eq!(d.faith_integration.level, Some(FaithLevel::Values));
    assert_eq!(d.basic_info.grade_level, grade(3));
    assert!(d.is_complete());
  }

  #[test]
  fn blank_topic_is_not_complete() {
    let mut d = RequestDraft::new();
    d.update_basic_info(BasicInfoPatch { grade_level: grade(2), ..Default::default() });
    d.update_topic(TopicPatch { main_topic: Some("   ".into()), ..Default::default() });
    d.update_faith(FaithPatch { level: Some(FaithLevel::Secular), ..Default::default() });
    assert_eq!(d.missing_field(), Some(IncompleteRequest::MissingMainTopic));
    assert_eq!(d.finalize(), Err(IncompleteRequest::MissingMainTopic));
  }

  #[test]
  fn finalize_fills_defaults_and_trims_topic() {
    let mut d = RequestDraft::new();
    d.update_basic_info(BasicInfoPatch { grade_level: grade(0), ..Default::default() });
    d.update_topic(TopicPatch { main_topic: Some("  Shapes ".into()), ..Default::default() });
    d.update_faith(FaithPatch { level: Some(FaithLevel::Secular), ..Default::default() });

    let req = d.finalize().unwrap();
    assert_eq!(req.basic_info.grade_level, GradeLevel::KINDERGARTEN);
    assert_eq!(req.basic_info.subject, Subject::Math);
    assert_eq!(req.basic_info.estimated_time, DEFAULT_ESTIMATED_TIME);
    assert_eq!(req.topic.main_topic, "Shapes");
    assert_eq!(req.faith_integration.level, FaithLevel::Secular);
  }

  #[test]
  fn faith_level_must_be_chosen_explicitly() {
    let mut d = RequestDraft::new();
    d.update_basic_info(BasicInfoPatch { grade_level: grade(5), ..Default::default() });
    d.update_topic(TopicPatch { main_topic: Some("Plants".into()), ..Default::default() });
    d.update_faith(FaithPatch { denomination: Some(Denomination::Lutheran), ..Default::default() });
    assert_eq!(d.finalize(), Err(IncompleteRequest::MissingFaithLevel));
  }

  #[test]
  fn patch_deserializes_from_camel_case() {
    let p: BasicInfoPatch = serde_json::from_str(r#"{"gradeLevel":0,"estimatedTime":45}"#).unwrap();
    assert_eq!(p.grade_level, Some(GradeLevel::KINDERGARTEN));
    assert_eq!(p.estimated_time, Some(45));
    assert!(p.subject.is_none());
    assert!(serde_json::from_str::<BasicInfoPatch>(r#"{"gradeLevel":13}"#).is_err());
  }
}
