//! Attachment link rewriting
//!
//! FogBugz attachment URLs carry an `sTicket` session parameter that only
//! works inside a logged-in browser. Rewritten links drop the ticket and
//! carry the API `token` instead, resolved against the site root so they
//! can be fetched directly.

use serde_json::Value;
use url::Url;

/// Session ticket parameter FogBugz embeds in attachment links
pub const TICKET_PARAM: &str = "sTicket";

/// Parameter carrying the long-lived API token
pub const TOKEN_PARAM: &str = "token";

/// Event keys that may hold attachments (both spellings occur in the wild)
pub const ATTACHMENT_KEYS: &[&str] = &["rgAttachments", "attachments"];

/// Rewrite one attachment URL.
///
/// `&amp;` entities are decoded, `sTicket` is removed and `token` is set
/// (when non-empty). Relative URLs are resolved against `base_url`. If the
/// result cannot be parsed as a URL, the ticket-stripped input is returned
/// as-is; this never fails.
pub fn build_attachment_download_url(
    s_url: &str,
    base_url: Option<&str>,
    token: Option<&str>,
) -> String {
    if s_url.is_empty() {
        return String::new();
    }
    let cleaned = s_url.replace("&amp;", "&");
    let Some(base) = base_url.filter(|b| !b.is_empty()) else {
        return strip_ticket(&cleaned);
    };

    let normalized_base = if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{base}/")
    };
    let resolved = Url::parse(&normalized_base).and_then(|base| base.join(&cleaned));
    let mut url = match resolved {
        Ok(url) => url,
        Err(_) => return strip_ticket(&cleaned),
    };

    let token = token.filter(|t| !t.is_empty());
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != TICKET_PARAM && (token.is_none() || key != TOKEN_PARAM))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    if let Some(token) = token {
        pairs.push((TOKEN_PARAM.to_string(), token.to_string()));
    }

    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(pairs);
    }
    url.to_string()
}

/// Drop `sTicket` from a URL string without parsing it as a URL
fn strip_ticket(raw: &str) -> String {
    let (without_fragment, fragment) = match raw.split_once('#') {
        Some((head, frag)) => (head, Some(frag)),
        None => (raw, None),
    };
    let Some((path, query)) = without_fragment.split_once('?') else {
        return raw.to_string();
    };

    let kept: Vec<&str> = query
        .split('&')
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or("");
            !pair.is_empty() && key != TICKET_PARAM
        })
        .collect();

    let mut out = path.to_string();
    if !kept.is_empty() {
        out.push('?');
        out.push_str(&kept.join("&"));
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

/// Return a copy of a case payload (or array of cases) with every
/// attachment URL rewritten. The input is left untouched.
pub fn rewrite_case_attachments(case: &Value, base_url: Option<&str>, token: Option<&str>) -> Value {
    let mut copy = case.clone();
    rewrite_in_place(&mut copy, base_url, token);
    copy
}

fn rewrite_in_place(case: &mut Value, base_url: Option<&str>, token: Option<&str>) {
    if let Value::Array(items) = case {
        for item in items {
            rewrite_in_place(item, base_url, token);
        }
        return;
    }
    let Some(events) = case.get_mut("events") else {
        return;
    };
    for event in event_list_mut(events) {
        for key in ATTACHMENT_KEYS {
            let Some(container) = event.get_mut(*key) else {
                continue;
            };
            for attachment in attachment_list_mut(container) {
                if let Some(Value::String(url)) = attachment.get_mut("sURL") {
                    let updated = build_attachment_download_url(url, base_url, token);
                    if !updated.is_empty() {
                        *url = updated;
                    }
                }
            }
        }
    }
}

fn has_entry(value: &Value, key: &str) -> bool {
    match value.get(key) {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

/// Events appear as an array, a single object, or an `<events>` container
/// holding one or many `<event>` entries.
fn event_list_mut(events: &mut Value) -> Vec<&mut Value> {
    if has_entry(events, "event") {
        return match events.get_mut("event") {
            Some(Value::Array(items)) => items.iter_mut().collect(),
            Some(single) => vec![single],
            None => Vec::new(),
        };
    }
    if events.is_object() {
        return vec![events];
    }
    match events.as_array_mut() {
        Some(items) => items.iter_mut().collect(),
        None => Vec::new(),
    }
}

/// Attachments appear under an `attachment` key or directly in the container
fn attachment_list_mut(container: &mut Value) -> Vec<&mut Value> {
    let target = if has_entry(container, "attachment") {
        match container.get_mut("attachment") {
            Some(inner) => inner,
            None => return Vec::new(),
        }
    } else {
        container
    };
    if target.is_object() {
        return vec![target];
    }
    match target.as_array_mut() {
        Some(items) => items.iter_mut().collect(),
        None => Vec::new(),
    }
}
