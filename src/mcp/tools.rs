//! MCP tool definitions for the FogBugz server

use serde_json::json;

use super::protocol::ToolDefinition;

/// All tool definitions: (name, description, input schema)
pub const TOOL_DEFINITIONS: &[(&str, &str, &str)] = &[
    // Meta
    (
        "help",
        "Explain how to configure and use the FogBugz MCP tools.",
        r#"{"type": "object", "properties": {}}"#,
    ),
    (
        "version",
        "Return the FogBugz MCP server version.",
        r#"{"type": "object", "properties": {}}"#,
    ),
    (
        "health",
        "Check FogBugz MCP configuration and API connectivity.",
        r#"{"type": "object", "properties": {}}"#,
    ),
    // Cases
    (
        "search_cases",
        "Search FogBugz cases (q supports FogBugz query syntax).",
        r#"{
            "type": "object",
            "properties": {
                "q": {"type": "string", "description": "FogBugz search query"},
                "cols": {"type": "string", "description": "Extra comma-separated columns"}
            },
            "required": ["q"]
        }"#,
    ),
    (
        "case_events",
        "Search cases and include full event history (can return large payloads). See FogBugz event codes: https://support.fogbugz.com/article/55756-fogbugz-xml-api-event-codes",
        r#"{
            "type": "object",
            "properties": {
                "q": {"type": "string", "description": "FogBugz search query"},
                "cols": {"type": "string", "description": "Extra comma-separated columns"}
            },
            "required": ["q"]
        }"#,
    ),
    (
        "view_case",
        "View a specific case with selected columns. Adds ixBug automatically.",
        r#"{
            "type": "object",
            "properties": {
                "ixBug": {"type": "integer", "description": "Case number"},
                "cols": {"type": "string", "description": "Extra comma-separated columns"},
                "includeAttachments": {"type": "boolean", "default": false, "description": "Include events with downloadable attachment links"}
            },
            "required": ["ixBug"]
        }"#,
    ),
    (
        "create_case",
        "Create a new FogBugz case.",
        r#"{
            "type": "object",
            "properties": {
                "title": {"type": "string"},
                "event": {"type": "string", "description": "Opening event text"},
                "ixProject": {"type": "integer"},
                "ixArea": {"type": "integer"},
                "ixPersonAssignedTo": {"type": "integer"},
                "ixBugParent": {"type": "integer"},
                "ixFixFor": {"type": "integer"},
                "category": {"type": ["string", "integer"], "description": "Numeric category id"},
                "userStory": {"type": "string"},
                "21_UserStory": {"type": "string", "description": "Legacy alias of userStory"},
                "textType": {"type": "string", "enum": ["plain", "html", "markdown"], "default": "plain"}
            },
            "required": ["title", "ixProject"]
        }"#,
    ),
    (
        "edit_case",
        "Edit a FogBugz case (fields mirror FogBugz XML names).",
        r#"{
            "type": "object",
            "properties": {
                "ixBug": {"type": "integer"},
                "event": {"type": "string"},
                "fields": {"type": "object", "additionalProperties": {"type": ["string", "number", "boolean"]}},
                "title": {"type": "string"},
                "userStory": {"type": "string"},
                "21_UserStory": {"type": "string"},
                "textType": {"type": "string", "enum": ["plain", "html", "markdown"], "default": "plain"}
            },
            "required": ["ixBug"]
        }"#,
    ),
    (
        "add_comment",
        "Add a comment to a case, optionally attaching a base64-encoded file first.",
        r#"{
            "type": "object",
            "properties": {
                "ixBug": {"type": "integer"},
                "text": {"type": "string"},
                "textType": {"type": "string", "enum": ["plain", "html", "markdown"], "default": "plain"},
                "filename": {"type": "string", "description": "Attachment name (requires contentBase64)"},
                "contentBase64": {"type": "string", "description": "Attachment content (requires filename)"}
            },
            "required": ["ixBug", "text"]
        }"#,
    ),
    (
        "attach_file",
        "Attach a base64-encoded file to a case.",
        r#"{
            "type": "object",
            "properties": {
                "ixBug": {"type": "integer"},
                "filename": {"type": "string"},
                "contentBase64": {"type": "string"}
            },
            "required": ["ixBug", "filename", "contentBase64"]
        }"#,
    ),
    (
        "list_children",
        "List child cases of a parent.",
        r#"{
            "type": "object",
            "properties": {
                "ixBug": {"type": "integer"}
            },
            "required": ["ixBug"]
        }"#,
    ),
    (
        "case_outline",
        "Return the full outline/descendant tree for a case (outline:<ixBug>).",
        r#"{
            "type": "object",
            "properties": {
                "ixBug": {"type": "integer"},
                "cols": {"type": "string"}
            },
            "required": ["ixBug"]
        }"#,
    ),
    (
        "resolve_case",
        "Resolve a case (optional comment/fields).",
        r#"{
            "type": "object",
            "properties": {
                "ixBug": {"type": "integer"},
                "comment": {"type": "string"},
                "fields": {"type": "object", "additionalProperties": {"type": ["string", "number", "boolean"]}},
                "textType": {"type": "string", "enum": ["plain", "html", "markdown"], "default": "plain"}
            },
            "required": ["ixBug"]
        }"#,
    ),
    (
        "reactivate_case",
        "Reactivate (reopen) a case (optional comment/fields).",
        r#"{
            "type": "object",
            "properties": {
                "ixBug": {"type": "integer"},
                "comment": {"type": "string"},
                "fields": {"type": "object", "additionalProperties": {"type": ["string", "number", "boolean"]}},
                "textType": {"type": "string", "enum": ["plain", "html", "markdown"], "default": "plain"}
            },
            "required": ["ixBug"]
        }"#,
    ),
    // Reference data
    (
        "list_categories",
        "List FogBugz categories (ixCategory + metadata).",
        r#"{"type": "object", "properties": {}}"#,
    ),
    (
        "list_areas",
        "List FogBugz areas (optionally filtered by project).",
        r#"{
            "type": "object",
            "properties": {
                "ixProject": {"type": "integer"}
            }
        }"#,
    ),
    (
        "list_status",
        "List FogBugz statuses (optionally filtered by category or resolved state).",
        r#"{
            "type": "object",
            "properties": {
                "ixCategory": {"type": "integer"},
                "fResolved": {"type": "boolean"}
            }
        }"#,
    ),
    (
        "view_status",
        "View a specific status (ixStatus or sStatus + ixCategory).",
        r#"{
            "type": "object",
            "properties": {
                "ixStatus": {"type": "integer"},
                "sStatus": {"type": "string"},
                "ixCategory": {"type": "integer"}
            }
        }"#,
    ),
    // Milestones
    (
        "list_milestones",
        "List FogBugz milestones (FixFors), optionally filtered by project.",
        r#"{
            "type": "object",
            "properties": {
                "ixProject": {"type": "integer", "minimum": 1}
            }
        }"#,
    ),
    (
        "view_milestone",
        "View a specific milestone (FixFor).",
        r#"{
            "type": "object",
            "properties": {
                "ixFixFor": {"type": "integer"}
            },
            "required": ["ixFixFor"]
        }"#,
    ),
    (
        "create_milestone",
        "Create a new milestone (FixFor).",
        r#"{
            "type": "object",
            "properties": {
                "ixProject": {"type": "integer", "minimum": 1},
                "sFixFor": {"type": "string", "description": "Milestone name"},
                "dtStart": {"type": "string", "description": "YYYY-MM-DD or ISO 8601 date-time"},
                "dtEnd": {"type": "string", "description": "YYYY-MM-DD or ISO 8601 date-time, not before dtStart"}
            },
            "required": ["ixProject", "sFixFor"]
        }"#,
    ),
    (
        "edit_milestone",
        "Edit an existing milestone (FixFor).",
        r#"{
            "type": "object",
            "properties": {
                "ixFixFor": {"type": "integer"},
                "ixProject": {"type": "integer", "minimum": 1},
                "sFixFor": {"type": "string"},
                "dtStart": {"type": "string"},
                "dtEnd": {"type": "string"},
                "fAssignable": {"type": "boolean"},
                "fDeleted": {"type": "boolean"},
                "confirmDelete": {"type": "boolean", "description": "Required with fDeleted=true"}
            },
            "required": ["ixFixFor"]
        }"#,
    ),
    (
        "add_milestone_dependency",
        "Add a dependency between two milestones (FixFors).",
        r#"{
            "type": "object",
            "properties": {
                "ixFixFor": {"type": "integer"},
                "ixFixForDependsOn": {"type": "integer"}
            },
            "required": ["ixFixFor", "ixFixForDependsOn"]
        }"#,
    ),
    (
        "remove_milestone_dependency",
        "Remove a dependency between two milestones (FixFors).",
        r#"{
            "type": "object",
            "properties": {
                "ixFixFor": {"type": "integer"},
                "ixFixForDependsOn": {"type": "integer"}
            },
            "required": ["ixFixFor", "ixFixForDependsOn"]
        }"#,
    ),
    // Areas
    (
        "create_area",
        "Create a new FogBugz area.",
        r#"{
            "type": "object",
            "properties": {
                "ixProject": {"type": "integer", "minimum": 1},
                "sArea": {"type": "string"},
                "ixPersonPrimaryContact": {"type": "integer"}
            },
            "required": ["ixProject", "sArea"]
        }"#,
    ),
    (
        "edit_area",
        "Edit an existing FogBugz area.",
        r#"{
            "type": "object",
            "properties": {
                "ixArea": {"type": "integer"},
                "sArea": {"type": "string"},
                "ixProject": {"type": "integer", "minimum": 1},
                "ixPersonPrimaryContact": {"type": "integer"}
            },
            "required": ["ixArea"]
        }"#,
    ),
    // Misc
    (
        "list_custom_fields",
        "List custom field names available on a case.",
        r#"{
            "type": "object",
            "properties": {
                "ixBug": {"type": "integer"}
            },
            "required": ["ixBug"]
        }"#,
    ),
    (
        "case_link",
        "Return the FogBugz web URL for a case.",
        r#"{
            "type": "object",
            "properties": {
                "ixBug": {"type": "integer"}
            },
            "required": ["ixBug"]
        }"#,
    ),
    (
        "search_users",
        "Search FogBugz people by name/email using a cached listPeople call (contains match).",
        r#"{
            "type": "object",
            "properties": {
                "query": {"type": "string"},
                "forceRefresh": {"type": "boolean", "default": false}
            }
        }"#,
    ),
];

/// Get all tool definitions as ToolDefinition structs
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    TOOL_DEFINITIONS
        .iter()
        .map(|(name, description, schema)| ToolDefinition {
            name: name.to_string(),
            description: description.to_string(),
            input_schema: serde_json::from_str(schema).unwrap_or(json!({})),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::TOOL_NAMES;
    use std::collections::HashSet;

    #[test]
    fn test_every_schema_is_valid_json_object() {
        for (name, _, schema) in TOOL_DEFINITIONS {
            let value: serde_json::Value = serde_json::from_str(schema)
                .unwrap_or_else(|e| panic!("{} schema does not parse: {}", name, e));
            assert_eq!(value["type"], "object", "{}", name);
        }
    }

    #[test]
    fn test_definitions_match_dispatch_table() {
        let defined: HashSet<&str> = TOOL_DEFINITIONS.iter().map(|(name, _, _)| *name).collect();
        let dispatched: HashSet<&str> = TOOL_NAMES.iter().copied().collect();
        assert_eq!(defined.len(), TOOL_DEFINITIONS.len(), "duplicate tool name");
        assert_eq!(defined, dispatched);
    }
}
