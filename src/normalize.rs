//! Field normalization helpers
//!
//! Pure functions shared by every tool: id coercion, column sets, the
//! user-story alias, rich-text conversion and argument validation.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use pulldown_cmark::{html, Options, Parser};
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{FogbugzError, Result};
use crate::types::TextType;
use crate::xml::Field;

/// Raw column name of the "user story" custom field
pub const USER_STORY_FIELD: &str = "plugin_customfields_at_fogcreek_com_userxstoryh815";

/// Friendly alias exposed on every case record
pub const USER_STORY_ALIAS: &str = "userStory";

/// Columns every case-reading tool requests
pub const DEFAULT_COLS: &[&str] = &[
    "ixBug",
    "sTitle",
    "sStatus",
    "sFixFor",
    "ixBugParent",
    "ixBugChildren",
    "sLatestTextSummary",
    "sPersonAssignedTo",
    "sArea",
    "sProject",
    USER_STORY_FIELD,
];

static ISO_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static ISO_DATETIME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}T").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Read a JSON scalar as a number (numeric strings included)
pub fn value_as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
            }
        }
        _ => None,
    }
}

/// Coerce a decoded id field to an integer.
///
/// Absent, scalar and repeated shapes are handled alike: the first value
/// wins, and anything non-numeric yields `fallback`.
pub fn normalize_id(field: Field<'_>, fallback: Option<i64>) -> Option<i64> {
    field
        .first()
        .and_then(value_as_number)
        .filter(|n| n.fract() == 0.0)
        .map(|n| n as i64)
        .or(fallback)
}

/// Convenience over [`normalize_id`] for `record[key]`
pub fn id_field(record: &Value, key: &str, fallback: Option<i64>) -> Option<i64> {
    normalize_id(Field::of(record, key), fallback)
}

/// Overwrite `record[key]` with its coerced id (null when unresolvable)
pub fn set_id(record: &mut Value, key: &str, fallback: Option<i64>) {
    let id = id_field(record, key, fallback);
    if let Value::Object(map) = record {
        map.insert(key.to_string(), id.map(Value::from).unwrap_or(Value::Null));
    }
}

/// Coerce `record[key]` only when the key is present
pub fn set_optional_id(record: &mut Value, key: &str, fallback: Option<i64>) {
    if record.get(key).is_some() {
        set_id(record, key, fallback);
    }
}

fn split_columns(cols: &str) -> impl Iterator<Item = &str> {
    cols.split(',').map(str::trim).filter(|c| !c.is_empty())
}

fn join_unique<'a>(columns: impl Iterator<Item = &'a str>) -> String {
    let mut seen: Vec<&str> = Vec::new();
    for column in columns {
        if !seen.contains(&column) {
            seen.push(column);
        }
    }
    seen.join(",")
}

/// Union the caller's comma-separated columns with [`DEFAULT_COLS`].
///
/// Defaults come first in their fixed order, caller columns follow, and
/// duplicates are dropped.
pub fn columns_with_defaults(cols: Option<&str>) -> String {
    join_unique(
        DEFAULT_COLS
            .iter()
            .copied()
            .chain(cols.map(split_columns).into_iter().flatten()),
    )
}

/// Append one column to a comma-separated list, without duplicates
pub fn add_column(cols: &str, column: &str) -> String {
    join_unique(split_columns(cols).chain(std::iter::once(column)))
}

/// Mirror the raw user-story custom field under `userStory`.
///
/// Records already carrying the alias, or lacking the raw field, are
/// returned unchanged, so applying this twice is a no-op.
pub fn with_user_story(mut record: Value) -> Value {
    if let Value::Object(map) = &mut record {
        if !map.contains_key(USER_STORY_ALIAS) {
            if let Some(story) = map.get(USER_STORY_FIELD).cloned() {
                map.insert(USER_STORY_ALIAS.to_string(), story);
            }
        }
    }
    record
}

/// Render markdown to HTML
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    let parser = Parser::new_ext(markdown, options);
    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

/// Event text and field map after the caller's text type was applied
#[derive(Debug, Clone, PartialEq)]
pub struct RichText {
    pub text_type: TextType,
    pub event_text: Option<String>,
    pub fields: Option<Map<String, Value>>,
}

impl RichText {
    /// FogBugz needs `fRichText=1` whenever the body is not plain text
    pub fn is_rich(&self) -> bool {
        self.text_type != TextType::Plain
    }
}

/// Convert markdown bodies to HTML.
///
/// Applies to the event text and to an `sEvent` entry in `fields`. Plain
/// and HTML bodies pass through untouched.
pub fn apply_text_type(
    text_type: Option<TextType>,
    event_text: Option<&str>,
    fields: Option<&Map<String, Value>>,
) -> RichText {
    let text_type = text_type.unwrap_or_default();
    let mut event_text = event_text.map(str::to_string);
    let mut fields = fields.cloned();

    if text_type == TextType::Markdown {
        if let Some(text) = event_text.as_mut().filter(|t| !t.is_empty()) {
            *text = markdown_to_html(text);
        }
        if let Some(map) = fields.as_mut() {
            if let Some(body) = map.get("sEvent") {
                let converted = markdown_to_html(&field_to_string(body));
                map.insert("sEvent".to_string(), Value::String(converted));
            }
        }
    }

    RichText {
        text_type,
        event_text,
        fields,
    }
}

/// Stringify a field-map value the way FogBugz expects form values
pub fn field_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Blank means absent, empty, or whitespace only
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// Reject a present-but-blank string
pub fn require_not_blank(value: Option<&str>, message: &str) -> Result<()> {
    match value {
        Some(v) if v.trim().is_empty() => Err(FogbugzError::invalid(message)),
        _ => Ok(()),
    }
}

/// Reject a present non-positive id
pub fn require_positive(value: Option<i64>, message: &str) -> Result<()> {
    match value {
        Some(v) if v <= 0 => Err(FogbugzError::invalid(message)),
        _ => Ok(()),
    }
}

/// Whether a string looks like `YYYY-MM-DD` or `YYYY-MM-DDT...`
pub fn is_iso_date_like(value: &str) -> bool {
    let trimmed = value.trim();
    ISO_DATE.is_match(trimmed) || ISO_DATETIME.is_match(trimmed)
}

/// Parse an ISO 8601 date or date-time into a UTC instant.
///
/// Date-only values are midnight UTC. Date-times without an offset are
/// read as UTC.
pub fn parse_date(value: &str, field_name: &str) -> Result<DateTime<Utc>> {
    let trimmed = value.trim();
    if !is_iso_date_like(trimmed) {
        return Err(FogbugzError::invalid(format!(
            "{field_name} must be an ISO 8601 date (YYYY-MM-DD) or datetime (YYYY-MM-DDTHH:MM:SSZ). Received: \"{value}\"."
        )));
    }

    let parsed = if ISO_DATE.is_match(trimmed) {
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    } else {
        DateTime::parse_from_rfc3339(trimmed)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
                    .iter()
                    .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                    .map(|dt| dt.and_utc())
            })
    };

    parsed.ok_or_else(|| {
        FogbugzError::invalid(format!(
            "{field_name} could not be parsed as a valid date. Received: \"{value}\"."
        ))
    })
}

/// Validate an optional start/end pair: non-blank, ISO formatted, ordered
pub fn validate_date_range(
    tool: &str,
    dt_start: Option<&str>,
    dt_end: Option<&str>,
) -> Result<()> {
    require_not_blank(dt_start, &format!("{tool}: dtStart cannot be blank when provided."))?;
    require_not_blank(dt_end, &format!("{tool}: dtEnd cannot be blank when provided."))?;

    let start = dt_start.map(|v| parse_date(v, "dtStart")).transpose()?;
    let end = dt_end.map(|v| parse_date(v, "dtEnd")).transpose()?;
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(FogbugzError::invalid(format!(
                "{tool}: dtEnd must be the same day or after dtStart."
            )));
        }
    }
    Ok(())
}

/// Collapse whitespace runs and cut to `max` characters for log/error output
pub fn snippet(raw: &str, max: usize) -> String {
    let collapsed = WHITESPACE_RUN.replace_all(raw, " ");
    let cut: String = collapsed.chars().take(max).collect();
    if cut.is_empty() {
        "<empty>".to_string()
    } else {
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_normalize_id_shapes() {
        let record = json!({"a": "12", "b": ["7", "8"], "c": "abc", "d": 5, "e": ""});
        assert_eq!(id_field(&record, "a", None), Some(12));
        assert_eq!(id_field(&record, "b", None), Some(7));
        assert_eq!(id_field(&record, "c", Some(1)), Some(1));
        assert_eq!(id_field(&record, "d", None), Some(5));
        assert_eq!(id_field(&record, "e", None), None);
        assert_eq!(id_field(&record, "missing", Some(99)), Some(99));
        assert_eq!(id_field(&record, "missing", None), None);
    }

    #[test]
    fn test_set_id_writes_number_or_null() {
        let mut record = json!({"ixBug": ["42"], "ixArea": "x"});
        set_id(&mut record, "ixBug", None);
        set_id(&mut record, "ixArea", None);
        set_optional_id(&mut record, "ixProject", None);
        assert_eq!(record, json!({"ixBug": 42, "ixArea": null}));
    }

    #[test]
    fn test_columns_with_defaults() {
        let cols = columns_with_defaults(Some(" sTitle, events ,,dtOpened"));
        let parts: Vec<&str> = cols.split(',').collect();
        assert_eq!(&parts[..DEFAULT_COLS.len()], DEFAULT_COLS);
        assert_eq!(&parts[DEFAULT_COLS.len()..], &["events", "dtOpened"]);

        assert_eq!(columns_with_defaults(None), DEFAULT_COLS.join(","));
    }

    #[test]
    fn test_add_column() {
        assert_eq!(add_column("a,b", "events"), "a,b,events");
        assert_eq!(add_column("a,events", "events"), "a,events");
    }

    #[test]
    fn test_user_story_alias() {
        let record = json!({USER_STORY_FIELD: "As a user"});
        let aliased = with_user_story(record);
        assert_eq!(aliased["userStory"], "As a user");
        assert_eq!(aliased[USER_STORY_FIELD], "As a user");

        let existing = json!({USER_STORY_FIELD: "raw", "userStory": "kept"});
        assert_eq!(with_user_story(existing)["userStory"], "kept");

        let without = json!({"sTitle": "x"});
        assert!(with_user_story(without).get("userStory").is_none());
    }

    #[test]
    fn test_markdown_converts_event_and_fields() {
        let fields = json!({"sEvent": "*Note*", "ixFixFor": 12});
        let result = apply_text_type(
            Some(TextType::Markdown),
            Some("**Hello**"),
            fields.as_object(),
        );
        assert!(result.is_rich());
        assert!(result.event_text.unwrap().contains("<strong>Hello</strong>"));
        let fields = result.fields.unwrap();
        assert!(fields["sEvent"].as_str().unwrap().contains("<em>Note</em>"));
        assert_eq!(fields["ixFixFor"], 12);
    }

    #[test]
    fn test_plain_leaves_text_unchanged() {
        let result = apply_text_type(Some(TextType::Plain), Some("**Hello**"), None);
        assert!(!result.is_rich());
        assert_eq!(result.event_text.as_deref(), Some("**Hello**"));

        let default = apply_text_type(None, Some("Plain update"), None);
        assert_eq!(default.text_type, TextType::Plain);
    }

    #[test]
    fn test_html_is_rich_but_not_converted() {
        let result = apply_text_type(Some(TextType::Html), Some("<b>x</b>"), None);
        assert!(result.is_rich());
        assert_eq!(result.event_text.as_deref(), Some("<b>x</b>"));
    }

    #[test]
    fn test_parse_date_formats() {
        assert!(parse_date("2024-02-10", "dtStart").is_ok());
        assert!(parse_date("2024-02-10T10:00:00Z", "dtStart").is_ok());
        assert!(parse_date("2024-02-10T10:00:00", "dtStart").is_ok());
        assert!(parse_date("02/10/2024", "dtStart").is_err());
        assert!(parse_date("2024-13-45", "dtStart").is_err());
    }

    #[test]
    fn test_date_range_order() {
        assert!(validate_date_range("create_milestone", Some("2024-02-01"), Some("2024-02-01")).is_ok());
        let err = validate_date_range("create_milestone", Some("2024-02-10"), Some("2024-02-01"))
            .unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("dtEnd must be the same day or after dtStart"));

        let blank = validate_date_range("edit_milestone", Some("  "), None).unwrap_err();
        assert!(blank.to_string().contains("dtStart cannot be blank"));
    }

    #[test]
    fn test_field_to_string() {
        assert_eq!(field_to_string(&json!("a")), "a");
        assert_eq!(field_to_string(&json!(3)), "3");
        assert_eq!(field_to_string(&json!(true)), "true");
    }

    #[test]
    fn test_snippet() {
        assert_eq!(snippet("a \n\n b", 200), "a b");
        // Edge runs collapse to one space rather than disappearing
        assert_eq!(snippet("  a \n\n b  ", 200), " a b ");
        assert_eq!(snippet("\n<html>\n", 200), " <html> ");
        assert_eq!(snippet("", 200), "<empty>");
        assert_eq!(snippet(&"x".repeat(500), 200).len(), 200);
    }
}
