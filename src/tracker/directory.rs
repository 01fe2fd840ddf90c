//! Areas and the people directory

use chrono::SecondsFormat;
use serde_json::{json, Value};

use super::reference::normalize_list;
use super::Tracker;
use crate::client::ApiRequest;
use crate::error::{FogbugzError, Result};
use crate::normalize::{
    id_field, is_blank, require_not_blank, require_positive, set_id,
};
use crate::people::matches_person;
use crate::types::{CreateAreaInput, EditAreaInput, SearchUsersInput};
use crate::xml::Field;

impl Tracker {
    pub(super) async fn tool_create_area(&self, input: CreateAreaInput) -> Result<Value> {
        require_positive(
            Some(input.ix_project),
            "create_area: ixProject must be a positive integer.",
        )?;
        if is_blank(Some(input.s_area.as_str())) {
            return Err(FogbugzError::invalid(
                "create_area: sArea (area name) cannot be blank.",
            ));
        }

        let request = ApiRequest::new("newArea")
            .field("ixProject", input.ix_project)
            .field("sArea", &input.s_area)
            .field_opt("ixPersonPrimaryContact", input.ix_person_primary_contact);
        let resp = self.call(request).await?;

        let ix_area = Field::of(&resp, "area")
            .first()
            .and_then(|area| id_field(area, "ixArea", None))
            .or_else(|| id_field(&resp, "ixArea", None));
        tracing::info!(ix_area = ?ix_area, "Area created");
        Ok(json!({ "ixArea": ix_area, "raw": resp }))
    }

    pub(super) async fn tool_edit_area(&self, input: EditAreaInput) -> Result<Value> {
        if !input.has_edit() {
            return Err(FogbugzError::invalid(
                "edit_area requires at least one field to update (sArea, ixProject, ixPersonPrimaryContact).",
            ));
        }
        require_not_blank(
            input.s_area.as_deref(),
            "edit_area: sArea cannot be blank when provided.",
        )?;
        require_positive(
            input.ix_project,
            "edit_area: ixProject must be a positive integer when provided.",
        )?;

        let request = ApiRequest::new("editArea")
            .field("ixArea", input.ix_area)
            .field_opt("sArea", input.s_area.as_deref())
            .field_opt("ixProject", input.ix_project)
            .field_opt("ixPersonPrimaryContact", input.ix_person_primary_contact);
        self.call(request).await
    }

    pub(super) async fn tool_search_users(&self, input: SearchUsersInput) -> Result<Value> {
        require_not_blank(
            input.query.as_deref(),
            "search_users: query cannot be blank when provided.",
        )?;

        let lookup = self
            .people
            .get_or_fetch(input.force_refresh, || self.fetch_people())
            .await?;
        let snapshot = &lookup.snapshot;

        let needle = input
            .query
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .unwrap_or_default();
        let people: Vec<&Value> = snapshot
            .people
            .iter()
            .filter(|person| matches_person(person, &needle))
            .collect();

        let asof = snapshot
            .fetched_at
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        Ok(json!({
            "query": input.query,
            "match": if needle.is_empty() { "all" } else { "contains" },
            "asof": asof,
            "cache": {
                "asof": asof,
                "expiresAt": snapshot.expires_at.to_rfc3339_opts(SecondsFormat::Millis, true),
                "ttlSeconds": self.people.ttl().as_secs(),
                "fromCache": lookup.from_cache,
                "forcedRefresh": input.force_refresh,
            },
            "count": people.len(),
            "total": snapshot.people.len(),
            "people": people,
        }))
    }

    /// Full directory with `ixPerson` coerced
    async fn fetch_people(&self) -> Result<Vec<Value>> {
        let resp = self.call(ApiRequest::new("listPeople")).await?;
        Ok(normalize_list(&resp, &["people", "person"], |person| {
            set_id(person, "ixPerson", None);
        }))
    }
}
