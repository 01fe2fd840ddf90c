//! Milestone (FixFor) tools

use serde_json::{json, Value};

use super::reference::normalize_list;
use super::{flag, Tracker};
use crate::client::ApiRequest;
use crate::error::{FogbugzError, Result};
use crate::normalize::{
    id_field, is_blank, require_not_blank, require_positive, set_id, set_optional_id,
    validate_date_range,
};
use crate::types::{
    CreateMilestoneInput, EditMilestoneInput, MilestoneDependencyInput, ProjectFilterInput,
    ViewMilestoneInput,
};
use crate::xml::Field;

impl Tracker {
    pub(super) async fn tool_list_milestones(&self, input: ProjectFilterInput) -> Result<Value> {
        require_positive(
            input.ix_project,
            "list_milestones: ixProject must be a positive integer when provided.",
        )?;
        let resp = self
            .call(ApiRequest::new("listFixFors").field_opt("ixProject", input.ix_project))
            .await?;
        let milestones = normalize_list(&resp, &["fixfors", "fixfor"], |item| {
            set_id(item, "ixFixFor", None);
            set_optional_id(item, "ixProject", None);
        });
        Ok(json!({ "milestones": milestones, "raw": resp }))
    }

    pub(super) async fn tool_view_milestone(&self, input: ViewMilestoneInput) -> Result<Value> {
        let resp = self
            .call(ApiRequest::new("viewFixFor").field("ixFixFor", input.ix_fix_for))
            .await?;
        let milestone = match Field::of(&resp, "fixfor").first() {
            Some(found) => {
                let mut milestone = found.clone();
                set_id(&mut milestone, "ixFixFor", Some(input.ix_fix_for));
                set_optional_id(&mut milestone, "ixProject", None);
                milestone
            }
            None => Value::Null,
        };
        Ok(json!({ "milestone": milestone, "raw": resp }))
    }

    pub(super) async fn tool_create_milestone(&self, input: CreateMilestoneInput) -> Result<Value> {
        const TOOL: &str = "create_milestone";
        require_positive(
            Some(input.ix_project),
            "create_milestone: ixProject must be a positive integer.",
        )?;
        if is_blank(Some(input.s_fix_for.as_str())) {
            return Err(FogbugzError::invalid(
                "create_milestone: sFixFor (milestone name) cannot be blank.",
            ));
        }
        validate_date_range(TOOL, input.dt_start.as_deref(), input.dt_end.as_deref())?;

        let request = ApiRequest::new("newFixFor")
            .field("ixProject", input.ix_project)
            .field("sFixFor", &input.s_fix_for)
            .field_opt("dtStart", input.dt_start.as_deref())
            .field_opt("dtEnd", input.dt_end.as_deref());
        let resp = self.call(request).await?;

        let ix_fix_for = Field::of(&resp, "fixfor")
            .first()
            .and_then(|fixfor| id_field(fixfor, "ixFixFor", None))
            .or_else(|| id_field(&resp, "ixFixFor", None));
        tracing::info!(ix_fix_for = ?ix_fix_for, "Milestone created");
        Ok(json!({ "ixFixFor": ix_fix_for, "raw": resp }))
    }

    pub(super) async fn tool_edit_milestone(&self, input: EditMilestoneInput) -> Result<Value> {
        const TOOL: &str = "edit_milestone";
        if !input.has_edit() {
            return Err(FogbugzError::invalid(
                "edit_milestone requires at least one field to update (ixProject, sFixFor, dtStart, dtEnd, fAssignable, fDeleted).",
            ));
        }
        if input.f_deleted == Some(true) && !input.confirm_delete {
            return Err(FogbugzError::invalid(
                "edit_milestone: set confirmDelete=true to delete a milestone (fDeleted=true). This prevents accidental deletes.",
            ));
        }
        require_positive(
            input.ix_project,
            "edit_milestone: ixProject must be a positive integer when provided.",
        )?;
        require_not_blank(
            input.s_fix_for.as_deref(),
            "edit_milestone: sFixFor cannot be blank when provided.",
        )?;
        validate_date_range(TOOL, input.dt_start.as_deref(), input.dt_end.as_deref())?;

        let request = ApiRequest::new("editFixFor")
            .field("ixFixFor", input.ix_fix_for)
            .field_opt("ixProject", input.ix_project)
            .field_opt("sFixFor", input.s_fix_for.as_deref())
            .field_opt("dtStart", input.dt_start.as_deref())
            .field_opt("dtEnd", input.dt_end.as_deref())
            .field_opt("fAssignable", input.f_assignable.map(flag))
            .field_opt("fDeleted", input.f_deleted.map(flag));
        self.call(request).await
    }

    /// add_milestone_dependency and remove_milestone_dependency
    pub(super) async fn tool_milestone_dependency(
        &self,
        tool: &str,
        cmd: &str,
        input: MilestoneDependencyInput,
    ) -> Result<Value> {
        if input.ix_fix_for == input.ix_fix_for_depends_on {
            return Err(FogbugzError::invalid(format!(
                "{}: ixFixFor and ixFixForDependsOn must be different milestones.",
                tool
            )));
        }
        self.call(
            ApiRequest::new(cmd)
                .field("ixFixFor", input.ix_fix_for)
                .field("ixFixForDependsOn", input.ix_fix_for_depends_on),
        )
        .await
    }
}
