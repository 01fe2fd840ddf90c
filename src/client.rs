//! Remote call gateway
//!
//! Every FogBugz command is a multipart POST to one endpoint carrying a
//! `cmd` field plus the API token. The reply is XML rooted at `<response>`,
//! holding either the payload or an `<error code="N">message</error>`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};

use crate::config::Config;
use crate::error::{FogbugzError, Result};
use crate::normalize::{snippet, value_as_number};
use crate::xml::{parse_document, Field, TEXT_KEY};

/// Characters of raw body quoted in errors and debug logs
pub const SNIPPET_LEN: usize = 200;

/// Error code reported when FogBugz omits one
pub const DEFAULT_ERROR_CODE: i64 = -32001;

/// Form field name FogBugz reads uploaded files from
pub const UPLOAD_FIELD: &str = "File1";

/// A file sent along with a command
#[derive(Debug, Clone, PartialEq)]
pub struct Upload {
    pub filename: String,
    pub content: Vec<u8>,
}

/// One FogBugz command: a flat field map plus an optional file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiRequest {
    pub fields: BTreeMap<String, String>,
    pub upload: Option<Upload>,
}

impl ApiRequest {
    pub fn new(cmd: &str) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert("cmd".to_string(), cmd.to_string());
        Self {
            fields,
            upload: None,
        }
    }

    /// Builder-style field setter
    pub fn field(mut self, key: &str, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    /// Builder-style setter that skips `None`
    pub fn field_opt<T: ToString>(mut self, key: &str, value: Option<T>) -> Self {
        if let Some(value) = value {
            self.set(key, value);
        }
        self
    }

    pub fn set(&mut self, key: &str, value: impl ToString) {
        self.fields.insert(key.to_string(), value.to_string());
    }

    pub fn with_upload(mut self, filename: impl Into<String>, content: Vec<u8>) -> Self {
        self.upload = Some(Upload {
            filename: filename.into(),
            content,
        });
        self
    }

    pub fn cmd(&self) -> &str {
        self.get("cmd").unwrap_or("")
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }
}

/// Transport for FogBugz commands
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Submit one command and return the decoded `<response>` contents
    async fn call(&self, request: ApiRequest) -> Result<Value>;
}

/// Gateway talking to a real FogBugz endpoint over HTTP
pub struct HttpGateway {
    client: reqwest::Client,
    config: Arc<Config>,
}

impl HttpGateway {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn build_form(&self, request: ApiRequest) -> Form {
        let mut form = Form::new().text("token", self.config.token().to_string());
        for (key, value) in request.fields {
            if key == "token" {
                continue;
            }
            form = form.text(key, value);
        }
        if let Some(upload) = request.upload {
            form = form.part(
                UPLOAD_FIELD,
                Part::bytes(upload.content).file_name(upload.filename),
            );
        }
        form
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn call(&self, request: ApiRequest) -> Result<Value> {
        let url = self.config.api_url()?;
        tracing::debug!(
            url = %url,
            fields = ?request.fields,
            has_files = request.upload.is_some(),
            "fbCall request"
        );

        let form = self.build_form(request);
        let response = self.client.post(url).multipart(form).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        tracing::debug!(
            status = status,
            snippet = %snippet(&body, SNIPPET_LEN),
            "fbCall raw response"
        );

        interpret_response(status, &body)
    }
}

/// Turn a raw HTTP reply into the `<response>` contents or an error
pub fn interpret_response(status: u16, body: &str) -> Result<Value> {
    let document = parse_document(body).map_err(|e| {
        tracing::debug!(error = %e, "FogBugz XML parse failure");
        FogbugzError::Parse {
            status,
            snippet: snippet(body, SNIPPET_LEN),
        }
    })?;

    let response = match document {
        Some(doc) if doc.root == "response" => doc.value,
        _ => {
            return Err(FogbugzError::InvalidResponse {
                status,
                snippet: snippet(body, SNIPPET_LEN),
            })
        }
    };

    let response = match response {
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() {
                json!({})
            } else {
                json!({ "value": text })
            }
        }
        other => other,
    };

    if let Some(error) = Field::of(&response, "error").first() {
        if let Some(err) = remote_error(error) {
            return Err(err);
        }
    }
    Ok(response)
}

fn remote_error(error: &Value) -> Option<FogbugzError> {
    match error {
        Value::String(message) if message.is_empty() => None,
        Value::String(message) => Some(FogbugzError::Api {
            code: DEFAULT_ERROR_CODE,
            message: message.clone(),
        }),
        Value::Object(_) => {
            let code = error
                .get("code")
                .and_then(value_as_number)
                .map(|n| n as i64)
                .unwrap_or(DEFAULT_ERROR_CODE);
            let message = error
                .get(TEXT_KEY)
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or("FogBugz error")
                .to_string();
            Some(FogbugzError::Api { code, message })
        }
        _ => None,
    }
}
