//! FogBugz tool layer
//!
//! [`Tracker`] turns one named tool call with JSON arguments into FogBugz
//! commands and shapes the decoded responses. Validation always runs before
//! the first remote call, so a rejected call never touches the network.

mod cases;
mod directory;
mod meta;
mod milestones;
mod reference;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::client::{ApiRequest, Gateway};
use crate::config::Config;
use crate::error::{FogbugzError, Result};
use crate::normalize::{apply_text_type, field_to_string};
use crate::people::PeopleCache;
use crate::types::{CaseId, FieldMap, TextType};

pub use meta::HELP_MARKDOWN;

/// Names of every tool [`Tracker::handle_tool_call`] understands
pub const TOOL_NAMES: &[&str] = &[
    "help",
    "version",
    "health",
    "search_cases",
    "case_events",
    "view_case",
    "create_case",
    "edit_case",
    "add_comment",
    "attach_file",
    "list_children",
    "case_outline",
    "resolve_case",
    "reactivate_case",
    "list_categories",
    "list_areas",
    "list_status",
    "view_status",
    "list_milestones",
    "view_milestone",
    "create_milestone",
    "edit_milestone",
    "add_milestone_dependency",
    "remove_milestone_dependency",
    "create_area",
    "edit_area",
    "list_custom_fields",
    "case_link",
    "search_users",
];

/// Tool layer over a FogBugz gateway
pub struct Tracker {
    gateway: Arc<dyn Gateway>,
    config: Arc<Config>,
    people: PeopleCache,
}

impl Tracker {
    pub fn new(gateway: Arc<dyn Gateway>, config: Arc<Config>) -> Self {
        Self {
            gateway,
            config,
            people: PeopleCache::default(),
        }
    }

    /// Replace the people cache (tests use a short TTL)
    pub fn with_people_cache(mut self, people: PeopleCache) -> Self {
        self.people = people;
        self
    }

    /// Run one tool. Unknown names are rejected as invalid input.
    pub async fn handle_tool_call(&self, name: &str, params: Value) -> Result<Value> {
        tracing::debug!(tool = name, "Tool call");
        match name {
            "help" => Ok(self.tool_help()),
            "version" => Ok(self.tool_version()),
            "health" => Ok(self.tool_health().await),
            // Cases
            "search_cases" => self.tool_search_cases(parse_input(name, params)?).await,
            "case_events" => self.tool_case_events(parse_input(name, params)?).await,
            "view_case" => self.tool_view_case(parse_input(name, params)?).await,
            "create_case" => self.tool_create_case(parse_input(name, params)?).await,
            "edit_case" => self.tool_edit_case(parse_input(name, params)?).await,
            "add_comment" => self.tool_add_comment(parse_input(name, params)?).await,
            "attach_file" => self.tool_attach_file(parse_input(name, params)?).await,
            "list_children" => self.tool_list_children(parse_input(name, params)?).await,
            "case_outline" => self.tool_case_outline(parse_input(name, params)?).await,
            "resolve_case" => {
                self.tool_case_event("resolve", parse_input(name, params)?)
                    .await
            }
            "reactivate_case" => {
                self.tool_case_event("reactivate", parse_input(name, params)?)
                    .await
            }
            "list_custom_fields" => {
                self.tool_list_custom_fields(parse_input(name, params)?)
                    .await
            }
            "case_link" => self.tool_case_link(parse_input(name, params)?),
            // Reference data
            "list_categories" => self.tool_list_categories().await,
            "list_areas" => self.tool_list_areas(parse_input(name, params)?).await,
            "list_status" => self.tool_list_status(parse_input(name, params)?).await,
            "view_status" => self.tool_view_status(parse_input(name, params)?).await,
            // Milestones
            "list_milestones" => self.tool_list_milestones(parse_input(name, params)?).await,
            "view_milestone" => self.tool_view_milestone(parse_input(name, params)?).await,
            "create_milestone" => {
                self.tool_create_milestone(parse_input(name, params)?)
                    .await
            }
            "edit_milestone" => self.tool_edit_milestone(parse_input(name, params)?).await,
            "add_milestone_dependency" => {
                self.tool_milestone_dependency(name, "addFixForDependency", parse_input(name, params)?)
                    .await
            }
            "remove_milestone_dependency" => {
                self.tool_milestone_dependency(
                    name,
                    "deleteFixForDependency",
                    parse_input(name, params)?,
                )
                .await
            }
            // Areas and people
            "create_area" => self.tool_create_area(parse_input(name, params)?).await,
            "edit_area" => self.tool_edit_area(parse_input(name, params)?).await,
            "search_users" => self.tool_search_users(parse_input(name, params)?).await,
            _ => Err(FogbugzError::invalid(format!("Unknown tool: {}", name))),
        }
    }

    async fn call(&self, request: ApiRequest) -> Result<Value> {
        self.gateway.call(request).await
    }

    fn web_base(&self) -> Option<String> {
        self.config.web_base()
    }
}

/// Deserialize tool arguments, treating missing arguments as `{}`
fn parse_input<T: DeserializeOwned>(tool: &str, params: Value) -> Result<T> {
    let params = match params {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(params)
        .map_err(|e| FogbugzError::invalid(format!("{}: invalid arguments: {}", tool, e)))
}

/// Build the payload shared by comment, resolve and reactivate.
///
/// Empty event text is left off; `fields` are stringified onto the payload
/// and `fRichText=1` marks non-plain bodies.
fn event_request(
    cmd: &str,
    ix_bug: CaseId,
    event_text: Option<&str>,
    fields: Option<&FieldMap>,
    text_type: Option<TextType>,
) -> ApiRequest {
    let rich = apply_text_type(text_type, event_text, fields);
    let mut request = ApiRequest::new(cmd).field("ixBug", ix_bug);
    if let Some(text) = rich.event_text.as_deref().filter(|t| !t.is_empty()) {
        request.set("sEvent", text);
    }
    apply_fields(&mut request, rich.fields.as_ref());
    if rich.is_rich() {
        request.set("fRichText", "1");
    }
    request
}

fn apply_fields(request: &mut ApiRequest, fields: Option<&FieldMap>) {
    for (key, value) in fields.into_iter().flatten() {
        request.set(key, field_to_string(value));
    }
}

/// FogBugz boolean flags travel as `1`/`0`
fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Non-empty, non-null entry of a decoded response
fn present<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(found) => Some(found),
    }
}
