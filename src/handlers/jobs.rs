// handlers/jobs.rs - /api/jobs handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use tracing::info;
use uuid::Uuid;

use super::{parse_id, required, ApiJson};
use crate::database::models::{
    Account, AccountSummary, ApplicantView, ApplyOutcome, Job, JobPatch, JobView, NewJob,
};
use crate::database::Store;
use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentAccount;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub salary: Option<f64>,
    #[serde(default)]
    pub skills: Vec<String>,
}

fn check_salary(salary: Option<f64>) -> ApiResult<()> {
    match salary {
        Some(s) if !s.is_finite() || s < 0.0 => Err(ApiError::bad_request("salary must be a non-negative number")),
        _ => Ok(()),
    }
}

async fn accounts_by_id(store: &dyn Store, ids: Vec<Uuid>) -> ApiResult<HashMap<Uuid, Account>> {
    let accounts = store.find_accounts(&ids).await?;
    Ok(accounts.into_iter().map(|a| (a.id, a)).collect())
}

async fn load_job(store: &dyn Store, raw_id: &str) -> ApiResult<Job> {
    let id = parse_id(raw_id, "Job")?;
    store
        .find_job(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))
}

/// POST /api/jobs
pub async fn create_job(
    State(state): State<AppState>,
    CurrentAccount(caller): CurrentAccount,
    ApiJson(body): ApiJson<CreateJobRequest>,
) -> ApiResult<(StatusCode, Json<Job>)> {
    check_salary(body.salary)?;
    let new_job = NewJob {
        title: required(body.title, "title")?,
        description: required(body.description, "description")?,
        company: required(body.company, "company")?,
        location: required(body.location, "location")?,
        salary: body.salary,
        skills: body.skills,
    };

    let job = state.store.insert_job(caller.id, new_job).await?;
    info!("Job {} posted by {}", job.id, caller.id);
    Ok((StatusCode::CREATED, Json(job)))
}

/// GET /api/jobs
///
/// Newest first, each with its employer expanded.
pub async fn list_jobs(State(state): State<AppState>) -> ApiResult<Json<Vec<JobView>>> {
    let jobs = state.store.list_jobs().await?;

    let mut employer_ids: Vec<Uuid> = jobs.iter().map(|j| j.employer).collect();
    employer_ids.sort();
    employer_ids.dedup();
    let employers = accounts_by_id(state.store.as_ref(), employer_ids).await?;

    let views = jobs
        .into_iter()
        .map(|job| {
            let employer = employers.get(&job.employer);
            JobView::new(job, employer)
        })
        .collect();
    Ok(Json(views))
}

/// GET /api/jobs/:id
pub async fn get_job(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<JobView>> {
    let job = load_job(state.store.as_ref(), &id).await?;
    let employer = state.store.find_account(job.employer).await?;
    Ok(Json(JobView::new(job, employer.as_ref())))
}

/// PUT /api/jobs/:id
///
/// Partial update of the editable fields; employer and applicants stay as they are.
pub async fn update_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<JobPatch>,
) -> ApiResult<Json<Job>> {
    let id = parse_id(&id, "Job")?;
    check_salary(patch.salary)?;
    for (field, value) in [
        ("title", &patch.title),
        ("description", &patch.description),
        ("company", &patch.company),
        ("location", &patch.location),
    ] {
        if matches!(value, Some(v) if v.trim().is_empty()) {
            return Err(ApiError::bad_request(format!("{} cannot be empty", field)));
        }
    }

    let job = state
        .store
        .update_job(id, patch)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;
    Ok(Json(job))
}

/// DELETE /api/jobs/:id
pub async fn delete_job(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let id = parse_id(&id, "Job")?;
    if !state.store.delete_job(id).await? {
        return Err(ApiError::not_found("Job not found"));
    }
    info!("Job {} deleted", id);
    Ok(Json(json!({ "message": "Job deleted successfully" })))
}

/// POST /api/jobs/:id/apply
pub async fn apply(
    State(state): State<AppState>,
    CurrentAccount(caller): CurrentAccount,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let id = parse_id(&id, "Job")?;

    match state.store.add_applicant(id, caller.id).await? {
        ApplyOutcome::Added => {
            info!("Account {} applied to job {}", caller.id, id);
            Ok((StatusCode::CREATED, Json(json!({ "message": "Application submitted" }))))
        }
        ApplyOutcome::AlreadyApplied => Err(ApiError::bad_request("You have already applied for this job")),
        ApplyOutcome::OwnJob => Err(ApiError::bad_request("You cannot apply to your own job")),
        ApplyOutcome::JobMissing => Err(ApiError::not_found("Job not found")),
    }
}

/// GET /api/jobs/:id/applicants
pub async fn applicants(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<ApplicantView>>> {
    let job = load_job(state.store.as_ref(), &id).await?;

    let ids = job.applicants.iter().map(|a| a.user).collect();
    let accounts = accounts_by_id(state.store.as_ref(), ids).await?;

    let views = job
        .applicants
        .iter()
        .map(|applicant| ApplicantView {
            user: accounts.get(&applicant.user).map(AccountSummary::from),
            applied_at: applicant.applied_at,
        })
        .collect();
    Ok(Json(views))
}
