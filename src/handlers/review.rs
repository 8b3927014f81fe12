// src/handlers/review.rs
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::listing::MessageResponse;
use crate::dtos::review::{CreateReviewRequest, ReviewResponse, UpdateReviewRequest};
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::state::AppState;

// GET /reviews/listing/:listing_id - Reviews for a listing, newest first
#[instrument(skip(state), fields(listing_id = %listing_id))]
pub async fn list_for_listing(
    Path(listing_id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Vec<ReviewResponse>>, AppError> {
    let reviews = state.reviews.for_listing(listing_id).await?;
    Ok(Json(reviews.into_iter().map(ReviewResponse::from).collect()))
}

// POST /reviews - One review per user and listing
#[instrument(skip(state, auth, payload), fields(user_id = %auth.user_id))]
pub async fn create_review(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewResponse>), AppError> {
    payload.validate()?;
    let review = state
        .reviews
        .create(&auth, payload.listing_id, payload.rating, payload.comment)
        .await?;
    Ok((StatusCode::CREATED, Json(review.into())))
}

// PUT /reviews/:id - Author or admin
#[instrument(skip(state, auth, payload), fields(id = %id))]
pub async fn update_review(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(payload): Json<UpdateReviewRequest>,
) -> Result<Json<ReviewResponse>, AppError> {
    payload.validate()?;
    let review = state
        .reviews
        .update(&auth, id, payload.rating, payload.comment)
        .await?;
    Ok(Json(review.into()))
}

// DELETE /reviews/:id - Author or admin
#[instrument(skip(state, auth), fields(id = %id))]
pub async fn delete_review(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<MessageResponse>, AppError> {
    state.reviews.delete(&auth, id).await?;
    Ok(Json(MessageResponse::new("Review deleted successfully")))
}
