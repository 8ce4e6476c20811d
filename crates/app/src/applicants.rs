use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use hvac_portal_core::{Applicant, ApplicantDraft, NewApplicant, StatusChange};
use hvac_portal_storage::{ApplicantError, ListParams};
use metrics::counter;
use serde::Deserialize;
use tracing::{error, info};

use crate::auth::CurrentUser;
use crate::problem::ProblemResponse;
use crate::router::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Applicant>>, ProblemResponse> {
    let Query(query) = query.map_err(|rejection| rejected("list", rejection))?;
    let params = ListParams {
        limit: query.limit,
        offset: query.offset,
    };
    let applicants = state
        .storage()
        .applicants()
        .list(params)
        .await
        .map_err(|err| storage_problem("list", err))?;

    record("list", "ok");
    Ok(Json(applicants))
}

pub async fn get(
    State(state): State<AppState>,
    CurrentUser(_user): CurrentUser,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Applicant>, ProblemResponse> {
    let Path(id) = id.map_err(|rejection| rejected("get", rejection))?;
    let applicant = state
        .storage()
        .applicants()
        .fetch(id)
        .await
        .map_err(|err| storage_problem("get", err))?
        .ok_or_else(|| {
            record("get", "not_found");
            not_found(id)
        })?;

    record("get", "ok");
    Ok(Json(applicant))
}

pub async fn create(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    draft: Result<Json<ApplicantDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Applicant>), ProblemResponse> {
    let Json(draft) = draft.map_err(|rejection| rejected("create", rejection))?;
    let new_applicant = NewApplicant::try_from(draft).map_err(|err| {
        record("create", "invalid");
        ProblemResponse::from(err)
    })?;

    let applicant = state
        .storage()
        .applicants()
        .insert(&new_applicant, state.now())
        .await
        .map_err(|err| storage_problem("create", err))?;

    info!(
        stage = "applicants",
        applicant_id = applicant.id,
        platform = %applicant.platform,
        user_id = user.id,
        "applicant created"
    );
    record("create", "ok");
    Ok((StatusCode::CREATED, Json(applicant)))
}

pub async fn update_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    id: Result<Path<i64>, PathRejection>,
    request: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<Json<Applicant>, ProblemResponse> {
    let Path(id) = id.map_err(|rejection| rejected("update_status", rejection))?;
    let Json(request) = request.map_err(|rejection| rejected("update_status", rejection))?;
    let change = StatusChange::parse(&request.status, request.notes).map_err(|err| {
        record("update_status", "invalid");
        ProblemResponse::from(err)
    })?;

    let applicant = state
        .storage()
        .applicants()
        .update_status(id, &change, state.now())
        .await
        .map_err(|err| match err {
            ApplicantError::NotFound => {
                record("update_status", "not_found");
                not_found(id)
            }
            other => storage_problem("update_status", other),
        })?;

    info!(
        stage = "applicants",
        applicant_id = applicant.id,
        status = applicant.status.as_str(),
        user_id = user.id,
        "applicant status updated"
    );
    counter!("applicant_status_updates_total", "status" => applicant.status.as_str()).increment(1);
    record("update_status", "ok");
    Ok(Json(applicant))
}

fn record(op: &'static str, result: &'static str) {
    counter!("applicant_requests_total", "op" => op, "result" => result).increment(1);
}

/// Malformed path, query, or body input answered as a validation failure.
pub(crate) fn rejected<R>(op: &'static str, rejection: R) -> ProblemResponse
where
    ProblemResponse: From<R>,
{
    record(op, "invalid");
    ProblemResponse::from(rejection)
}

fn not_found(id: i64) -> ProblemResponse {
    ProblemResponse::not_found("applicant_not_found", format!("applicant {id} does not exist"))
}

pub(crate) fn storage_problem(op: &'static str, err: ApplicantError) -> ProblemResponse {
    error!(stage = "applicants", op, error = %err, "applicant storage failure");
    record(op, "error");
    ProblemResponse::internal("failed to access applicant store")
}
