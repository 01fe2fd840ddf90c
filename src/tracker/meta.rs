//! help, version and health

use std::time::Instant;

use serde_json::{json, Value};

use super::Tracker;
use crate::client::ApiRequest;
use crate::xml::Field;

/// Usage guide served by the `help` tool and resource
pub const HELP_MARKDOWN: &str = include_str!("../../docs/help.md");

const CONFIG_HINT: &str =
    "Set FOGBUGZ_BASE/FOGBUGZ_TOKEN in your environment and restart the MCP server.";
const NETWORK_HINT: &str =
    "Network unavailable or FogBugz API unreachable. Check connectivity and try again.";

impl Tracker {
    pub(super) fn tool_help(&self) -> Value {
        Value::String(HELP_MARKDOWN.to_string())
    }

    pub(super) fn tool_version(&self) -> Value {
        json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": crate::VERSION,
        })
    }

    /// Never fails: problems are reported in the result body
    pub(super) async fn tool_health(&self) -> Value {
        let warnings = self.config.warnings();
        if !warnings.is_empty() {
            return json!({ "ok": false, "warnings": warnings, "hint": CONFIG_HINT });
        }

        let started = Instant::now();
        match self.call(ApiRequest::new("listCategories")).await {
            Ok(resp) => {
                let categories = Field::of(&resp, "categories")
                    .first()
                    .map(|c| Field::of(c, "category").items().len())
                    .unwrap_or(0);
                json!({
                    "ok": true,
                    "api": "listCategories",
                    "categories": categories,
                    "elapsedMs": started.elapsed().as_millis() as u64,
                })
            }
            Err(e) => {
                tracing::warn!(error = %e, "Health check failed");
                json!({ "ok": false, "error": e.to_string(), "hint": NETWORK_HINT })
            }
        }
    }
}
