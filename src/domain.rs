//! Domain models: subjects, faith-integration levels, the finalized generation
//! request, and the worksheet result shown to the user.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Highest supported grade. Grade 0 is kindergarten.
pub const MAX_GRADE: u8 = 12;

/// Default worksheet length in minutes when the user never picks one.
pub const DEFAULT_ESTIMATED_TIME: u32 = 30;

/// School grade, 0 (kindergarten) through 12. Travels as the bare number.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct GradeLevel(u8);

impl GradeLevel {
  pub const KINDERGARTEN: GradeLevel = GradeLevel(0);

  pub fn new(value: u8) -> Option<Self> {
    (value <= MAX_GRADE).then_some(GradeLevel(value))
  }

  pub fn value(self) -> u8 { self.0 }

  /// Human label used by selection lists and prompts.
  pub fn label(self) -> String {
    if self == GradeLevel::KINDERGARTEN { "Kindergarten".into() } else { format!("Grade {}", self.0) }
  }
}

impl TryFrom<u8> for GradeLevel {
  type Error = String;

  fn try_from(v: u8) -> Result<Self, Self::Error> {
    GradeLevel::new(v).ok_or_else(|| format!("grade level must be 0-{}, got {}", MAX_GRADE, v))
  }
}

impl From<GradeLevel> for u8 {
  fn from(g: GradeLevel) -> u8 { g.0 }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Subject {
  Math,
  Science,
  #[serde(rename = "Language Arts")]
  LanguageArts,
  History,
  Geography,
  Art,
  Bible,
}

impl Subject {
  pub fn display_name(self) -> &'static str {
    match self {
      Subject::Math => "Math",
      Subject::Science => "Science",
      Subject::LanguageArts => "Language Arts",
      Subject::History => "History",
      Subject::Geography => "Geography",
      Subject::Art => "Art",
      Subject::Bible => "Bible",
    }
  }
}

impl Default for Subject {
  fn default() -> Self { Subject::Math }
}

impl fmt::Display for Subject {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.display_name())
  }
}

/// How much religious content the worksheet carries, ordered 0..=3.
/// On the wire this is the bare ordinal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum FaithLevel {
  Secular = 0,
  Values = 1,
  BiblicalThemes = 2,
  Doctrinal = 3,
}

impl FaithLevel {
  pub fn title(self) -> &'static str {
    match self {
      FaithLevel::Secular => "Secular Content",
      FaithLevel::Values => "Christian Values",
      FaithLevel::BiblicalThemes => "Biblical Themes",
      FaithLevel::Doctrinal => "Doctrinal Content",
    }
  }

  pub fn description(self) -> &'static str {
    match self {
      FaithLevel::Secular => "No faith elements - purely academic content",
      FaithLevel::Values => "General values like kindness, honesty, service",
      FaithLevel::BiblicalThemes => "Stories and themes naturally integrated",
      FaithLevel::Doctrinal => "Explicit denominational teaching and theology",
    }
  }
}

impl TryFrom<u8> for FaithLevel {
  type Error = String;

  fn try_from(v: u8) -> Result<Self, Self::Error> {
    match v {
      0 => Ok(FaithLevel::Secular),
      1 => Ok(FaithLevel::Values),
      2 => Ok(FaithLevel::BiblicalThemes),
      3 => Ok(FaithLevel::Doctrinal),
      other => Err(format!("faith level must be 0-3, got {}", other)),
    }
  }
}

impl From<FaithLevel> for u8 {
  fn from(level: FaithLevel) -> u8 { level as u8 }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Denomination {
  Catholic,
  Baptist,
  Methodist,
  Presbyterian,
  Lutheran,
  Pentecostal,
  NonDenominational,
  Orthodox,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scaffolding {
  Minimal,
  Moderate,
  Extensive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Differentiation {
  None,
  Below,
  OnLevel,
  Above,
  Mixed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorksheetStyle {
  Traditional,
  Colorful,
  Minimalist,
  Playful,
}

/// Finalized basic info. Only produced by `RequestDraft::finalize`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasicInfo {
  pub grade_level: GradeLevel,
  pub subject: Subject,
  pub estimated_time: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicInfo {
  pub main_topic: String,
  #[serde(default)] pub subtopics: Vec<String>,
  #[serde(default)] pub learning_objectives: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaithIntegration {
  pub level: FaithLevel,
  #[serde(default)] pub denomination: Option<Denomination>,
  #[serde(default)] pub specific_requests: Option<String>,
}

/// Optional customization knobs (Customize/Template steps). Every field may be absent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customization {
  #[serde(default, skip_serializing_if = "Option::is_none")] pub scaffolding: Option<Scaffolding>,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub differentiation: Option<Differentiation>,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub worksheet_style: Option<WorksheetStyle>,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub num_problems: Option<u8>,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub template_id: Option<String>,
}

/// Complete request handed to the generation collaborator. Immutable once built.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
  pub basic_info: BasicInfo,
  pub topic: TopicInfo,
  pub faith_integration: FaithIntegration,
  #[serde(default)] pub customization: Customization,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorksheetProblem {
  #[serde(default)]
  pub id: u32,
  #[serde(rename = "type")]
  pub kind: String,
  pub question: String,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub options: Option<Vec<String>>,
  pub answer: String,
  #[serde(default)]
  pub explanation: String,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub christian_connection: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub materials: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualAsset {
  pub description: String,
  pub purpose: String,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub image_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub source: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub attribution: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub attribution_url: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub license: Option<String>,
}

/// Display-ready worksheet. Read-only once produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorksheetResult {
  pub title: String,
  pub grade: String,
  pub subject: String,
  pub topic: String,
  pub description: String,
  pub instructions: String,
  pub estimated_time: String,
  pub problems: Vec<WorksheetProblem>,
  pub answer_key: String,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub extensions: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub materials: Option<Vec<String>>,
  #[serde(default, skip_serializing_if = "Option::is_none")] pub visual_assets: Option<Vec<VisualAsset>>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn faith_level_travels_as_ordinal() {
    let json = serde_json::to_string(&FaithLevel::Secular).unwrap();
    assert_eq!(json, "0");
    let back: FaithLevel = serde_json::from_str("2").unwrap();
    assert_eq!(back, FaithLevel::BiblicalThemes);
    assert!(serde_json::from_str::<FaithLevel>("4").is_err());
  }

  #[test]
  fn grade_level_rejects_out_of_range_values() {
    assert_eq!(GradeLevel::new(0), Some(GradeLevel::KINDERGARTEN));
    assert!(GradeLevel::new(13).is_none());
    assert!(serde_json::from_str::<GradeLevel>("13").is_err());
    assert_eq!(GradeLevel::new(0).unwrap().label(), "Kindergarten");
    assert_eq!(GradeLevel::new(7).unwrap().label(), "Grade 7");
  }

  #[test]
  fn subject_uses_display_names_on_the_wire() {
    let s: Subject = serde_json::from_str("\"Language Arts\"").unwrap();
    assert_eq!(s, Subject::LanguageArts);
    assert_eq!(serde_json::to_string(&Subject::Bible).unwrap(), "\"Bible\"");
  }
}
