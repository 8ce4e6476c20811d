//! Server-rendered reviewer pages.

use axum::{
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    response::Html,
};
use chrono::Datelike;
use hvac_portal_core::render::{render_portal_page, render_print_document};
use hvac_portal_storage::ListParams;
use serde::Deserialize;

use crate::applicants::storage_problem;
use crate::auth::CurrentUser;
use crate::problem::ProblemResponse;
use crate::router::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PortalQuery {
    #[serde(default)]
    pub selected: Option<i64>,
}

/// Applicant selector with the selected card. An unknown `selected` id falls
/// back to the first applicant.
pub async fn portal(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    query: Result<Query<PortalQuery>, QueryRejection>,
) -> Result<Html<String>, ProblemResponse> {
    let Query(query) = query?;
    let applicants = state
        .storage()
        .applicants()
        .list(ListParams::default())
        .await
        .map_err(|err| storage_problem("list", err))?;

    let selected = query
        .selected
        .and_then(|id| applicants.iter().find(|applicant| applicant.id == id));

    Ok(Html(render_portal_page(
        &applicants,
        selected,
        state.now().year(),
    )))
}

/// Standalone A4 document for a single applicant.
pub async fn print(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Html<String>, ProblemResponse> {
    let Path(id) = id?;
    let applicant = state
        .storage()
        .applicants()
        .fetch(id)
        .await
        .map_err(|err| storage_problem("get", err))?
        .ok_or_else(|| {
            ProblemResponse::not_found(
                "applicant_not_found",
                format!("applicant {id} does not exist"),
            )
        })?;

    Ok(Html(render_print_document(&applicant, state.now().year())))
}
