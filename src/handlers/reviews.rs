// handlers/reviews.rs - /api/reviews handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use super::{parse_id, ApiJson};
use crate::database::models::{NewReview, Review, ReviewView, ReviewerRef, MAX_RATING, MIN_RATING};
use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentAccount;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReviewRequest {
    pub job_id: Uuid,
    pub reviewee_id: Uuid,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

/// POST /api/reviews
pub async fn create_review(
    State(state): State<AppState>,
    CurrentAccount(caller): CurrentAccount,
    ApiJson(body): ApiJson<CreateReviewRequest>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    if body.reviewee_id == caller.id {
        return Err(ApiError::bad_request("You cannot review yourself"));
    }
    if !(MIN_RATING..=MAX_RATING).contains(&body.rating) {
        return Err(ApiError::bad_request(format!(
            "rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        )));
    }

    if state.store.find_job(body.job_id).await?.is_none() {
        return Err(ApiError::not_found("Job not found"));
    }
    if state.store.find_account(body.reviewee_id).await?.is_none() {
        return Err(ApiError::not_found("Reviewee not found"));
    }

    let review = state
        .store
        .insert_review(NewReview {
            job: body.job_id,
            reviewer: caller.id,
            reviewee: body.reviewee_id,
            rating: body.rating,
            comment: body.comment.filter(|c| !c.trim().is_empty()),
        })
        .await?;
    Ok((StatusCode::CREATED, Json(review)))
}

/// GET /api/reviews/:userId
pub async fn reviews_for_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> ApiResult<Json<Vec<ReviewView>>> {
    let user_id = parse_id(&user_id, "User")?;
    let reviews = state.store.reviews_for(user_id).await?;

    let mut reviewer_ids: Vec<Uuid> = reviews.iter().map(|r| r.reviewer).collect();
    reviewer_ids.sort();
    reviewer_ids.dedup();
    let reviewers: HashMap<Uuid, ReviewerRef> = state
        .store
        .find_accounts(&reviewer_ids)
        .await?
        .into_iter()
        .map(|a| (a.id, ReviewerRef { id: a.id, name: a.name }))
        .collect();

    let views = reviews
        .into_iter()
        .map(|r| ReviewView {
            id: r.id,
            job: r.job,
            reviewer: reviewers.get(&r.reviewer).cloned(),
            reviewee: r.reviewee,
            rating: r.rating,
            comment: r.comment,
            created_at: r.created_at,
        })
        .collect();
    Ok(Json(views))
}
