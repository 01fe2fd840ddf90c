//! Tool input types
//!
//! Field names mirror the FogBugz XML column names (`ixBug`, `sFixFor`, ...)
//! so agents can move values between tool results and tool inputs verbatim.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Case identifier
pub type CaseId = i64;

/// How event text supplied by the caller should be interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TextType {
    #[default]
    Plain,
    Html,
    Markdown,
}

impl std::fmt::Display for TextType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TextType::Plain => write!(f, "plain"),
            TextType::Html => write!(f, "html"),
            TextType::Markdown => write!(f, "markdown"),
        }
    }
}

impl std::str::FromStr for TextType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" => Ok(TextType::Plain),
            "html" => Ok(TextType::Html),
            "markdown" => Ok(TextType::Markdown),
            _ => Err(format!("Unknown text type: {}", s)),
        }
    }
}

/// Category given either as an id or as a numeric string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Id(i64),
    Text(String),
}

/// Free-form field overrides (`fields` on edit/resolve/reactivate)
pub type FieldMap = Map<String, Value>;

/// Accept `fields` only as an object of scalars
fn deserialize_field_map<'de, D>(deserializer: D) -> Result<Option<FieldMap>, D::Error>
where
    D: Deserializer<'de>,
{
    let map: Option<FieldMap> = Option::deserialize(deserializer)?;
    if let Some(map) = &map {
        if let Some((key, _)) = map
            .iter()
            .find(|(_, v)| !(v.is_string() || v.is_number() || v.is_boolean()))
        {
            return Err(serde::de::Error::custom(format!(
                "fields.{} must be a string, number or boolean",
                key
            )));
        }
    }
    Ok(map)
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchCasesInput {
    pub q: String,
    #[serde(default)]
    pub cols: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewCaseInput {
    pub ix_bug: CaseId,
    #[serde(default)]
    pub cols: Option<String>,
    #[serde(default)]
    pub include_attachments: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCaseInput {
    pub title: String,
    #[serde(default)]
    pub event: Option<String>,
    pub ix_project: i64,
    #[serde(default)]
    pub ix_area: Option<i64>,
    #[serde(default)]
    pub ix_person_assigned_to: Option<i64>,
    #[serde(default)]
    pub ix_bug_parent: Option<CaseId>,
    #[serde(default)]
    pub ix_fix_for: Option<i64>,
    #[serde(default)]
    pub category: Option<CategoryRef>,
    #[serde(default)]
    pub user_story: Option<String>,
    /// Legacy name of the user-story input
    #[serde(default, rename = "21_UserStory")]
    pub legacy_user_story: Option<String>,
    #[serde(default)]
    pub text_type: Option<TextType>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCaseInput {
    pub ix_bug: CaseId,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default, deserialize_with = "deserialize_field_map")]
    pub fields: Option<FieldMap>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub user_story: Option<String>,
    #[serde(default, rename = "21_UserStory")]
    pub legacy_user_story: Option<String>,
    #[serde(default)]
    pub text_type: Option<TextType>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentInput {
    pub ix_bug: CaseId,
    pub text: String,
    #[serde(default)]
    pub text_type: Option<TextType>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub content_base64: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachFileInput {
    pub ix_bug: CaseId,
    pub filename: String,
    pub content_base64: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseIdInput {
    pub ix_bug: CaseId,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseOutlineInput {
    pub ix_bug: CaseId,
    #[serde(default)]
    pub cols: Option<String>,
}

/// Input shared by resolve_case and reactivate_case
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseEventInput {
    pub ix_bug: CaseId,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default, deserialize_with = "deserialize_field_map")]
    pub fields: Option<FieldMap>,
    #[serde(default)]
    pub text_type: Option<TextType>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectFilterInput {
    #[serde(default)]
    pub ix_project: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListStatusInput {
    #[serde(default)]
    pub ix_category: Option<i64>,
    #[serde(default)]
    pub f_resolved: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewStatusInput {
    #[serde(default)]
    pub ix_status: Option<i64>,
    #[serde(default)]
    pub s_status: Option<String>,
    #[serde(default)]
    pub ix_category: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewMilestoneInput {
    pub ix_fix_for: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMilestoneInput {
    pub ix_project: i64,
    pub s_fix_for: String,
    #[serde(default)]
    pub dt_start: Option<String>,
    #[serde(default)]
    pub dt_end: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditMilestoneInput {
    pub ix_fix_for: i64,
    #[serde(default)]
    pub ix_project: Option<i64>,
    #[serde(default)]
    pub s_fix_for: Option<String>,
    #[serde(default)]
    pub dt_start: Option<String>,
    #[serde(default)]
    pub dt_end: Option<String>,
    #[serde(default)]
    pub f_assignable: Option<bool>,
    #[serde(default)]
    pub f_deleted: Option<bool>,
    #[serde(default)]
    pub confirm_delete: bool,
}

impl EditMilestoneInput {
    pub fn has_edit(&self) -> bool {
        self.ix_project.is_some()
            || self.s_fix_for.is_some()
            || self.dt_start.is_some()
            || self.dt_end.is_some()
            || self.f_assignable.is_some()
            || self.f_deleted.is_some()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneDependencyInput {
    pub ix_fix_for: i64,
    pub ix_fix_for_depends_on: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAreaInput {
    pub ix_project: i64,
    pub s_area: String,
    #[serde(default)]
    pub ix_person_primary_contact: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditAreaInput {
    pub ix_area: i64,
    #[serde(default)]
    pub s_area: Option<String>,
    #[serde(default)]
    pub ix_project: Option<i64>,
    #[serde(default)]
    pub ix_person_primary_contact: Option<i64>,
}

impl EditAreaInput {
    pub fn has_edit(&self) -> bool {
        self.s_area.is_some() || self.ix_project.is_some() || self.ix_person_primary_contact.is_some()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchUsersInput {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub force_refresh: bool,
}
