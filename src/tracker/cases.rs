//! Case tools: search, view, create, edit, comment, attach, hierarchy

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Map, Value};

use super::{apply_fields, event_request, present, Tracker};
use crate::attachments::rewrite_case_attachments;
use crate::client::ApiRequest;
use crate::error::{FogbugzError, Result};
use crate::normalize::{
    add_column, apply_text_type, columns_with_defaults, field_to_string, id_field, set_id,
    value_as_number, with_user_story, USER_STORY_FIELD,
};
use crate::outline::build_outline;
use crate::types::{
    AttachFileInput, CaseEventInput, CaseId, CaseIdInput, CaseOutlineInput, CategoryRef,
    CommentInput, CreateCaseInput, EditCaseInput, SearchCasesInput, ViewCaseInput,
};
use crate::xml::{list_at, Field};

/// Event text used when `create_case` gets none
pub const DEFAULT_CREATE_EVENT: &str = "Created via MCP";

/// Columns requested when listing children through search
const CHILD_COLS: &str = "ixBug,sTitle,sStatus,ixPersonAssignedTo,dtLastUpdated";

/// Columns that carry custom field definitions
const CUSTOM_FIELD_COLS: &str = "plugin_customfield,plugin_customfields";

const CUSTOM_FIELD_NAME_KEYS: &[&str] = &["fieldname", "name", "Title", "title"];

impl Tracker {
    pub(super) async fn tool_search_cases(&self, input: SearchCasesInput) -> Result<Value> {
        let cols = columns_with_defaults(input.cols.as_deref());
        self.search_cases(&input.q, &cols).await
    }

    pub(super) async fn tool_case_events(&self, input: SearchCasesInput) -> Result<Value> {
        let cols = add_column(&columns_with_defaults(input.cols.as_deref()), "events");
        self.search_cases(&input.q, &cols).await
    }

    async fn search_cases(&self, q: &str, cols: &str) -> Result<Value> {
        let resp = self
            .call(ApiRequest::new("search").field("q", q).field("cols", cols))
            .await?;
        let cases: Vec<Value> = list_at(&resp, &["cases", "case"])
            .into_iter()
            .map(|item| normalize_case(item.clone(), None))
            .collect();
        Ok(json!({ "cases": cases, "raw": resp }))
    }

    pub(super) async fn tool_view_case(&self, input: ViewCaseInput) -> Result<Value> {
        let mut cols = columns_with_defaults(input.cols.as_deref());
        if input.include_attachments {
            cols = add_column(&cols, "events");
        }

        let resp = self
            .call(
                ApiRequest::new("view")
                    .field("ixBug", input.ix_bug)
                    .field("cols", &cols),
            )
            .await?;

        let (case, raw) = match present(&resp, "case") {
            Some(Value::Array(items)) => {
                let cases = items
                    .iter()
                    .map(|item| {
                        let source = item
                            .get("_source")
                            .cloned()
                            .unwrap_or_else(|| json!("view"));
                        with_source(normalize_case(item.clone(), Some(input.ix_bug)), source)
                    })
                    .collect();
                (Value::Array(cases), resp)
            }
            Some(item) => {
                let case = normalize_case(item.clone(), Some(input.ix_bug));
                (with_source(case, json!("view")), resp)
            }
            None => {
                tracing::debug!(ix_bug = input.ix_bug, "view returned no case; trying search");
                let fallback = self
                    .call(
                        ApiRequest::new("search")
                            .field("q", format!("ixbug:{}", input.ix_bug))
                            .field("cols", &cols),
                    )
                    .await?;
                let case = match list_at(&fallback, &["cases", "case"]).first() {
                    Some(first) => with_source(
                        normalize_case((*first).clone(), Some(input.ix_bug)),
                        json!("search"),
                    ),
                    None => Value::Null,
                };
                (case, fallback)
            }
        };

        let case = if input.include_attachments && !case.is_null() {
            let web_base = self.web_base();
            rewrite_case_attachments(&case, web_base.as_deref(), Some(self.config.token()))
        } else {
            case
        };
        Ok(json!({ "case": case, "raw": raw }))
    }

    pub(super) async fn tool_create_case(&self, input: CreateCaseInput) -> Result<Value> {
        let category = resolve_category(input.category.as_ref())?;
        let event = input
            .event
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or(DEFAULT_CREATE_EVENT);
        let rich = apply_text_type(input.text_type, Some(event), None);

        let mut request = ApiRequest::new("new")
            .field("sTitle", &input.title)
            .field("sEvent", rich.event_text.as_deref().unwrap_or(event))
            .field("ixProject", input.ix_project)
            .field_opt("ixArea", input.ix_area.filter(|v| *v != 0))
            .field_opt(
                "ixPersonAssignedTo",
                input.ix_person_assigned_to.filter(|v| *v != 0),
            )
            .field_opt("ixBugParent", input.ix_bug_parent.filter(|v| *v != 0))
            .field_opt("ixFixFor", input.ix_fix_for.filter(|v| *v != 0))
            .field_opt("ixCategory", category);
        if let Some(story) = user_story(&input.user_story, &input.legacy_user_story) {
            request.set(USER_STORY_FIELD, story);
        }
        if rich.is_rich() {
            request.set("fRichText", "1");
        }

        let resp = self.call(request).await?;
        let ix_bug = Field::of(&resp, "case")
            .first()
            .and_then(|case| id_field(case, "ixBug", None));
        tracing::info!(ix_bug = ?ix_bug, "Case created");
        Ok(json!({ "ixBug": ix_bug, "raw": resp }))
    }

    pub(super) async fn tool_edit_case(&self, input: EditCaseInput) -> Result<Value> {
        let rich = apply_text_type(input.text_type, input.event.as_deref(), input.fields.as_ref());

        let mut request = ApiRequest::new("edit").field("ixBug", input.ix_bug);
        if let Some(text) = rich.event_text.as_deref().filter(|t| !t.is_empty()) {
            request.set("sEvent", text);
        }
        if let Some(title) = input.title.as_deref().filter(|t| !t.is_empty()) {
            request.set("sTitle", title);
        }
        if let Some(story) = user_story(&input.user_story, &input.legacy_user_story) {
            request.set(USER_STORY_FIELD, story);
        }
        apply_fields(&mut request, rich.fields.as_ref());
        if rich.is_rich() {
            request.set("fRichText", "1");
        }

        self.call(request).await
    }

    pub(super) async fn tool_add_comment(&self, input: CommentInput) -> Result<Value> {
        let upload = match (input.filename.as_deref(), input.content_base64.as_deref()) {
            (None, None) => None,
            (Some(filename), Some(content)) if !filename.trim().is_empty() => {
                Some((filename.to_string(), decode_base64("add_comment", content)?))
            }
            _ => {
                return Err(FogbugzError::invalid(
                    "add_comment: filename and contentBase64 must be provided together.",
                ))
            }
        };
        let comment = event_request(
            "edit",
            input.ix_bug,
            Some(input.text.as_str()),
            None,
            input.text_type,
        );

        let Some((filename, content)) = upload else {
            return self.call(comment).await;
        };
        let attachment = self
            .call(attach_request(input.ix_bug, filename, content))
            .await?;
        let comment = self.call(comment).await?;
        Ok(json!({ "attachment": attachment, "comment": comment }))
    }

    pub(super) async fn tool_attach_file(&self, input: AttachFileInput) -> Result<Value> {
        if input.filename.trim().is_empty() {
            return Err(FogbugzError::invalid("attach_file: filename cannot be blank."));
        }
        let content = decode_base64("attach_file", &input.content_base64)?;
        let resp = self
            .call(attach_request(input.ix_bug, input.filename, content))
            .await?;
        Ok(resp)
    }

    pub(super) async fn tool_list_children(&self, input: CaseIdInput) -> Result<Value> {
        let parent = input.ix_bug;
        let view = self
            .call(
                ApiRequest::new("view")
                    .field("ixBug", parent)
                    .field("cols", "ixBugChildren"),
            )
            .await;
        match view {
            Ok(resp) => {
                let ids = child_ids(&resp);
                if !ids.is_empty() {
                    let children: Vec<Value> =
                        ids.into_iter().map(|id| json!({ "ixBug": id })).collect();
                    return Ok(json!({ "parent": parent, "children": children }));
                }
            }
            Err(e) => {
                tracing::debug!(ix_bug = parent, error = %e, "Child lookup via view failed; using search");
            }
        }

        let resp = self
            .call(
                ApiRequest::new("search")
                    .field("q", format!("parent:{}", parent))
                    .field("cols", CHILD_COLS),
            )
            .await?;
        let children: Vec<Value> = list_at(&resp, &["cases", "case"])
            .into_iter()
            .map(|item| {
                let mut child = Map::new();
                child.insert(
                    "ixBug".to_string(),
                    id_field(item, "ixBug", None).map_or(Value::Null, Value::from),
                );
                for key in ["sTitle", "sStatus", "ixPersonAssignedTo", "dtLastUpdated"] {
                    if let Some(value) = item.get(key) {
                        child.insert(key.to_string(), value.clone());
                    }
                }
                Value::Object(child)
            })
            .collect();
        Ok(json!({ "parent": parent, "children": children }))
    }

    pub(super) async fn tool_case_outline(&self, input: CaseOutlineInput) -> Result<Value> {
        let query = format!("outline:{}", input.ix_bug);
        let cols = columns_with_defaults(input.cols.as_deref());
        let resp = self
            .call(
                ApiRequest::new("search")
                    .field("sSearchFor", &query)
                    .field("cols", cols),
            )
            .await?;

        let cases = list_at(&resp, &["cases", "case"]);
        let outline = build_outline(&cases, input.ix_bug);
        Ok(json!({
            "query": query,
            "outline": outline.root,
            "forest": outline.forest,
            "total": outline.total,
            "raw": resp,
        }))
    }

    /// resolve_case and reactivate_case
    pub(super) async fn tool_case_event(&self, cmd: &str, input: CaseEventInput) -> Result<Value> {
        let request = event_request(
            cmd,
            input.ix_bug,
            input.comment.as_deref(),
            input.fields.as_ref(),
            input.text_type,
        );
        let resp = self.call(request).await?;
        tracing::info!(ix_bug = input.ix_bug, cmd = cmd, "Case state changed");
        Ok(json!({ "ok": true, "raw": resp }))
    }

    pub(super) async fn tool_list_custom_fields(&self, input: CaseIdInput) -> Result<Value> {
        let resp = self
            .call(
                ApiRequest::new("search")
                    .field("q", input.ix_bug)
                    .field("cols", CUSTOM_FIELD_COLS),
            )
            .await?;

        let cases = list_at(&resp, &["cases", "case"]);
        let target = cases
            .iter()
            .find(|case| id_field(case, "ixBug", None) == Some(input.ix_bug))
            .or_else(|| cases.first());

        let mut names = Vec::new();
        if let Some(case) = target {
            for key in ["plugin_customfields", "plugin_customfield"] {
                if let Some(source) = case.get(key) {
                    collect_custom_field_names(source, &mut names);
                }
            }
        }
        Ok(json!({
            "ixBug": input.ix_bug,
            "rawCount": names.len(),
            "customFields": names,
        }))
    }

    pub(super) fn tool_case_link(&self, input: CaseIdInput) -> Result<Value> {
        let base = self.web_base().ok_or_else(|| {
            FogbugzError::Config("FOGBUGZ_BASE must be set to derive the web link.".to_string())
        })?;
        Ok(json!({
            "ixBug": input.ix_bug,
            "url": format!("{}/f/cases/{}/", base, input.ix_bug),
        }))
    }
}

/// Coerce `ixBug` and add the `userStory` alias
fn normalize_case(mut case: Value, fallback: Option<CaseId>) -> Value {
    set_id(&mut case, "ixBug", fallback);
    with_user_story(case)
}

fn with_source(mut case: Value, source: Value) -> Value {
    if let Value::Object(map) = &mut case {
        map.insert("_source".to_string(), source);
    }
    case
}

fn user_story<'a>(story: &'a Option<String>, legacy: &'a Option<String>) -> Option<&'a str> {
    story
        .as_deref()
        .or(legacy.as_deref())
        .filter(|s| !s.is_empty())
}

/// Category ids may arrive as numbers or numeric strings; blank means unset
fn resolve_category(category: Option<&CategoryRef>) -> Result<Option<i64>> {
    match category {
        None => Ok(None),
        Some(CategoryRef::Id(id)) => Ok(Some(*id)),
        Some(CategoryRef::Text(text)) if text.trim().is_empty() => Ok(None),
        Some(CategoryRef::Text(text)) => text.trim().parse::<i64>().map(Some).map_err(|_| {
            FogbugzError::invalid("Unknown category value. Provide numeric FogBugz category id.")
        }),
    }
}

fn decode_base64(tool: &str, content: &str) -> Result<Vec<u8>> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD.decode(compact).map_err(|e| {
        FogbugzError::invalid(format!("{}: contentBase64 is not valid base64 ({}).", tool, e))
    })
}

fn attach_request(ix_bug: CaseId, filename: String, content: Vec<u8>) -> ApiRequest {
    ApiRequest::new("attach")
        .field("ixBug", ix_bug)
        .with_upload(filename, content)
}

/// Child ids from a `view` response: a repeated element or one
/// whitespace/comma separated string
fn child_ids(resp: &Value) -> Vec<i64> {
    let Some(case) = Field::of(resp, "case").first() else {
        return Vec::new();
    };
    Field::of(case, "ixBugChildren")
        .items()
        .into_iter()
        .flat_map(|value| {
            field_to_string(value)
                .split(|c: char| c.is_whitespace() || c == ',')
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter_map(|part| value_as_number(&Value::String(part)))
        .filter(|n| n.fract() == 0.0)
        .map(|n| n as i64)
        .collect()
}

/// Walk a custom-field container collecting field names, first seen first
fn collect_custom_field_names(source: &Value, names: &mut Vec<String>) {
    match source {
        Value::Array(items) => {
            for item in items {
                collect_custom_field_names(item, names);
            }
        }
        Value::String(text) => push_unique(names, text.trim()),
        Value::Object(map) => {
            let name = CUSTOM_FIELD_NAME_KEYS
                .iter()
                .filter_map(|key| map.get(*key))
                .find(|value| match value {
                    Value::String(s) => !s.is_empty(),
                    Value::Null | Value::Bool(false) => false,
                    _ => true,
                });
            if let Some(name) = name {
                push_unique(names, &field_to_string(name));
            }
            for value in map.values() {
                if value.is_object() || value.is_array() {
                    collect_custom_field_names(value, names);
                }
            }
        }
        _ => {}
    }
}

fn push_unique(names: &mut Vec<String>, name: &str) {
    if !name.is_empty() && !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}
