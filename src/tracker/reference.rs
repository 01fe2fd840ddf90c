//! Categories, areas and statuses

use serde_json::{json, Value};

use super::{flag, Tracker};
use crate::client::ApiRequest;
use crate::error::{FogbugzError, Result};
use crate::normalize::{set_id, set_optional_id};
use crate::types::{ListStatusInput, ProjectFilterInput, ViewStatusInput};
use crate::xml::{list_at, Field};

impl Tracker {
    pub(super) async fn tool_list_categories(&self) -> Result<Value> {
        let resp = self.call(ApiRequest::new("listCategories")).await?;
        let categories = normalize_list(&resp, &["categories", "category"], |item| {
            set_id(item, "ixCategory", None);
        });
        Ok(json!({ "categories": categories, "raw": resp }))
    }

    pub(super) async fn tool_list_areas(&self, input: ProjectFilterInput) -> Result<Value> {
        let request =
            ApiRequest::new("listAreas").field_opt("ixProject", input.ix_project.filter(|p| *p != 0));
        let resp = self.call(request).await?;
        let areas = normalize_list(&resp, &["areas", "area"], |item| {
            set_id(item, "ixArea", None);
            set_optional_id(item, "ixProject", None);
        });
        Ok(json!({ "areas": areas, "raw": resp }))
    }

    pub(super) async fn tool_list_status(&self, input: ListStatusInput) -> Result<Value> {
        let request = ApiRequest::new("listStatus")
            .field_opt("ixCategory", input.ix_category.filter(|c| *c != 0))
            .field_opt("fResolved", input.f_resolved.map(flag));
        let resp = self.call(request).await?;
        let statuses = normalize_list(&resp, &["statuses", "status"], |item| {
            set_id(item, "ixStatus", None);
            set_optional_id(item, "ixCategory", None);
        });
        Ok(json!({ "statuses": statuses, "raw": resp }))
    }

    pub(super) async fn tool_view_status(&self, input: ViewStatusInput) -> Result<Value> {
        let ix_status = input.ix_status.filter(|s| *s != 0);
        let ix_category = input.ix_category.filter(|c| *c != 0);
        let s_status = input.s_status.as_deref().filter(|s| !s.is_empty());

        if ix_status.is_some() && (s_status.is_some() || ix_category.is_some()) {
            return Err(FogbugzError::invalid(
                "view_status: provide either ixStatus OR (sStatus + ixCategory), not both.",
            ));
        }
        if ix_status.is_none() && !(s_status.is_some() && ix_category.is_some()) {
            return Err(FogbugzError::invalid(
                "view_status requires ixStatus or (sStatus and ixCategory).",
            ));
        }

        let request = ApiRequest::new("viewStatus")
            .field_opt("ixStatus", ix_status)
            .field_opt("sStatus", s_status)
            .field_opt("ixCategory", ix_category);
        let resp = self.call(request).await?;
        let status = match Field::of(&resp, "status").first() {
            Some(found) => {
                let mut status = found.clone();
                set_id(&mut status, "ixStatus", ix_status);
                set_optional_id(&mut status, "ixCategory", ix_category);
                status
            }
            None => Value::Null,
        };
        Ok(json!({ "status": status, "raw": resp }))
    }
}

/// Clone the list at `path` and coerce each entry's ids in place
pub(super) fn normalize_list(
    resp: &Value,
    path: &[&str],
    coerce: impl Fn(&mut Value),
) -> Vec<Value> {
    list_at(resp, path)
        .into_iter()
        .map(|item| {
            let mut item = item.clone();
            coerce(&mut item);
            item
        })
        .collect()
}
