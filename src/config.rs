//! Runtime configuration
//!
//! Values are read once at startup (see the `fogbugz-mcp` binary, which
//! fills this from flags and environment variables) and never reloaded.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{FogbugzError, Result};

/// Placeholder base URL shipped in sample configurations
pub const PLACEHOLDER_MARKER: &str = "<YOUR>";

/// Tokens shorter than this are almost certainly truncated
pub const MIN_TOKEN_LENGTH: usize = 10;

static API_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)/api\.asp.*$").unwrap());

/// FogBugz connection settings
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Full API endpoint, e.g. `https://acme.fogbugz.com/api.asp`
    pub base_url: Option<String>,
    /// Long-lived API token
    pub token: Option<String>,
    /// Verbose logging to stderr
    pub debug: bool,
    /// Append logs to this file as well
    pub log_file: Option<String>,
}

impl Config {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            token: Some(token.into()),
            ..Self::default()
        }
    }

    /// The API endpoint, or a configuration error when unset
    pub fn api_url(&self) -> Result<&str> {
        self.base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| FogbugzError::Config("FOGBUGZ_BASE is not set.".to_string()))
    }

    /// Token, empty when unset
    pub fn token(&self) -> &str {
        self.token.as_deref().unwrap_or("")
    }

    /// Browser-facing site root: the API URL without `/api.asp...` and
    /// without a trailing slash
    pub fn web_base(&self) -> Option<String> {
        let base = self.base_url.as_deref()?.trim();
        let stripped = API_SUFFIX.replace(base, "");
        let web = stripped.trim_end_matches('/');
        if web.is_empty() {
            None
        } else {
            Some(web.to_string())
        }
    }

    /// Problems that make API calls pointless
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        match self.base_url.as_deref() {
            None => warnings.push("FOGBUGZ_BASE is not set.".to_string()),
            Some(base) if base.contains(PLACEHOLDER_MARKER) => {
                warnings.push("FOGBUGZ_BASE is still using the placeholder value.".to_string())
            }
            _ => {}
        }
        match self.token.as_deref() {
            None => warnings.push("FOGBUGZ_TOKEN is not set.".to_string()),
            Some(token) if token.trim().len() < MIN_TOKEN_LENGTH => warnings
                .push("FOGBUGZ_TOKEN looks too short; check the value.".to_string()),
            _ => {}
        }
        warnings
    }
}
